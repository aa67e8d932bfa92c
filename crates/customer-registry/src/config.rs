//! Configuration management for the Customer Registry
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local, Offset};
use reminder_common::policy::{self, ReminderPolicy};
use std::env;

use crate::storage::StoreBackend;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Where customer records live
    pub store: StoreBackend,

    /// Zone whose midnight reminder dates are normalized to
    pub reminder_tz: FixedOffset,

    /// Zone for the visit date stamp
    pub visit_tz: FixedOffset,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store = match var("STORE_BACKEND", "file").to_ascii_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            "file" => StoreBackend::File(var("STORE_PATH", "./data/customers.json").into()),
            "redis" => StoreBackend::Redis(var("REDIS_URL", "redis://127.0.0.1:6379")),
            other => anyhow::bail!("Unknown STORE_BACKEND: {} (expected memory, file or redis)", other),
        };

        let reminder_tz = match lookup("REMINDER_UTC_OFFSET") {
            Some(offset) => policy::parse_utc_offset(&offset).context("Invalid REMINDER_UTC_OFFSET")?,
            None => Local::now().offset().fix(),
        };

        let config = Config {
            api_host: var("REGISTRY_HOST", "0.0.0.0"),

            api_port: var("REGISTRY_PORT", "5001")
                .parse()
                .context("Invalid REGISTRY_PORT")?,

            store,

            reminder_tz,

            visit_tz: policy::parse_utc_offset(&var("VISIT_UTC_OFFSET", "+05:30"))
                .context("Invalid VISIT_UTC_OFFSET")?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("REGISTRY_PORT must be greater than 0");
        }

        if let StoreBackend::File(path) = &self.store {
            if path.as_os_str().is_empty() {
                anyhow::bail!("STORE_PATH must not be empty");
            }
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn policy(&self) -> ReminderPolicy {
        ReminderPolicy::new(self.reminder_tz, self.visit_tz)
    }

    /// Human-readable store description for startup logs
    pub fn store_description(&self) -> String {
        match &self.store {
            StoreBackend::Memory => "memory".to_string(),
            StoreBackend::File(path) => format!("file {}", path.display()),
            StoreBackend::Redis(url) => format!("redis {}", url),
        }
    }
}
