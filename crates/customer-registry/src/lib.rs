//! Customer Registry Service
//!
//! Tracks store customers with a bill amount and a follow-up date so staff
//! can see whose medicines are due for a refill.
//!
//! ## Endpoints
//!
//! - `POST /customers` - Add a customer (replaces earlier records for the same contact)
//! - `GET /customers` - All customers, filtered/sorted by `q`, `sort`, `dir`
//! - `GET /customers/reminders` - Pending reminders, earliest first
//! - `GET /customers/reminders/due` - Pending reminders scheduled for today
//! - `GET /customers/export` - CSV download of the current view
//! - `PATCH /customers/{id}/complete` - Mark a reminder done
//! - `DELETE /customers/{id}` - Delete a customer
//! - `DELETE /customers/by-contact/{contact}` - Delete all records for a contact
//! - `POST /customers/deduplicate` - Keep only the newest record per contact
//! - `GET /health` - Health check

pub mod config;
pub mod handlers;
pub mod service;
pub mod storage;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use handlers::AppState;
pub use service::CustomerService;
pub use storage::{JsonFileStore, MemoryStore, RecordStore, RedisStore, StoreBackend};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/customers",
            post(handlers::create_customer_handler).get(handlers::list_customers_handler),
        )
        .route("/customers/reminders", get(handlers::list_reminders_handler))
        .route("/customers/reminders/due", get(handlers::list_due_handler))
        .route("/customers/export", get(handlers::export_handler))
        .route("/customers/deduplicate", post(handlers::deduplicate_handler))
        .route(
            "/customers/by-contact/{contact}",
            delete(handlers::delete_by_contact_handler),
        )
        .route("/customers/{id}", delete(handlers::delete_customer_handler))
        .route(
            "/customers/{id}/complete",
            patch(handlers::complete_customer_handler),
        )
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
