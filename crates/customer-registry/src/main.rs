//! Customer Registry Service
//!
//! REST API for customer reminders

use anyhow::{Context, Result};
use customer_registry::{create_router, storage, AppState, Config, CustomerService};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "customer_registry=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Customer Registry Service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Store: {}", config.store_description());
    info!(
        "Reminder offset: {}, visit offset: {}",
        config.reminder_tz, config.visit_tz
    );

    // Initialize storage
    let store = storage::open(&config.store)
        .await
        .context("Failed to initialize storage")?;

    // Create application state
    let state = AppState::new(CustomerService::new(store, config.policy()));

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Customer Registry running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
