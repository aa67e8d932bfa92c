//! API request handlers for the customer registry

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use reminder_common::{export, CustomerRecord, Error, NewCustomer, ViewQuery};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::service::CustomerService;

/// Shared application state
pub struct AppState {
    pub service: CustomerService,
}

impl AppState {
    pub fn new(service: CustomerService) -> Self {
        Self { service }
    }
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "message": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => {
                error!("Request failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// Plain confirmation message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Number of records a bulk operation removed
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "customer-registry",
        "store": state.service.backend()
    }))
}

/// Add a customer, replacing earlier records with the same contact
pub async fn create_customer_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<(StatusCode, Json<CustomerRecord>), ApiError> {
    let Json(payload) = payload?;
    info!("Creating customer with contact: {}", payload.contact);

    let record = state.service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// All customers; newest first unless the query string says otherwise
pub async fn list_customers_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Json<Vec<CustomerRecord>>, ApiError> {
    let Query(view) = query?;
    let records = state.service.view(&view).await?;
    Ok(Json(records))
}

/// Pending reminders, earliest first
pub async fn list_reminders_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CustomerRecord>>, ApiError> {
    let reminders = state.service.list_pending().await?;
    Ok(Json(reminders))
}

/// Pending reminders scheduled for today
pub async fn list_due_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CustomerRecord>>, ApiError> {
    let due = state.service.list_due(Utc::now()).await?;
    Ok(Json(due))
}

/// Download the filtered and sorted view as CSV
pub async fn export_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(view) = query?;
    info!("Exporting customers: {:?}", view);

    let csv = state.service.export(&view).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::export_filename(Utc::now())
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// Delete a customer by id
pub async fn delete_customer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    info!("Deleting customer: {}", id);

    state.service.delete(&id).await?;
    Ok(Json(MessageResponse {
        message: "Deleted".to_string(),
    }))
}

/// Mark a reminder as completed
pub async fn complete_customer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CustomerRecord>, ApiError> {
    info!("Completing reminder for customer: {}", id);

    let record = state.service.complete(&id).await?;
    Ok(Json(record))
}

/// Delete every record for a contact number
pub async fn delete_by_contact_handler(
    State(state): State<Arc<AppState>>,
    Path(contact): Path<String>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state.service.delete_by_contact(&contact).await?;
    Ok(Json(RemovedResponse { removed }))
}

/// Keep only the newest record per contact
pub async fn deduplicate_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state.service.deduplicate().await?;
    Ok(Json(RemovedResponse { removed }))
}
