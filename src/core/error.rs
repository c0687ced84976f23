//! Typed error handling for the storefront backend.
//!
//! Core and storage code return [`StoreError`]; the HTTP boundary converts
//! each variant to a status code via [`IntoResponse`]. Handlers never pick
//! status codes inline.
//!
//! # Error categories
//!
//! - `Validation`: missing or malformed input, detected before any mutation
//! - `ProductNotFound`: a referenced product id does not exist
//! - `InsufficientInventory`: a line item asks for more units than are in stock
//! - `ProductExists`: a create request reuses an existing product id
//! - `Backend`: database unreachable, transaction failure, or other
//!   infrastructure fault; reported as a generic 500, never crashes the process

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// All errors surfaced by storefront operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{message}")]
    Validation { message: String },

    #[error("product with id '{id}' not found")]
    ProductNotFound { id: i64 },

    #[error(
        "insufficient inventory for product '{id}': requested {requested}, available {available}"
    )]
    InsufficientInventory {
        id: i64,
        requested: u32,
        available: u32,
    },

    #[error("product with id '{id}' already exists")]
    ProductExists { id: i64 },

    #[error("storage backend error: {0}")]
    Backend(anyhow::Error),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Backend(err)
    }
}

/// Error body returned to HTTP clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl StoreError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation {
            message: message.into(),
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Validation { .. } => StatusCode::BAD_REQUEST,
            StoreError::ProductNotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::InsufficientInventory { .. } => StatusCode::BAD_REQUEST,
            StoreError::ProductExists { .. } => StatusCode::CONFLICT,
            StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Validation { .. } => "VALIDATION_ERROR",
            StoreError::ProductNotFound { .. } => "PRODUCT_NOT_FOUND",
            StoreError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            StoreError::ProductExists { .. } => "PRODUCT_EXISTS",
            StoreError::Backend(_) => "STORAGE_ERROR",
        }
    }

    /// Convert to an error response body.
    ///
    /// Backend faults are reported with a generic message; the cause is
    /// logged at the boundary, not leaked to the client.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            StoreError::Backend(_) => "internal storage error".to_string(),
            other => other.to_string(),
        };
        ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            StoreError::ProductNotFound { id } => Some(serde_json::json!({ "id": id })),
            StoreError::InsufficientInventory {
                id,
                requested,
                available,
            } => Some(serde_json::json!({
                "id": id,
                "requested": requested,
                "available": available,
            })),
            StoreError::ProductExists { id } => Some(serde_json::json!({ "id": id })),
            _ => None,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.to_response())).into_response()
    }
}

/// A specialized Result type for storefront operations.
pub type StoreResult<T> = Result<T, StoreError>;
