//! Per-request error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::notifications::DeliveryError;
use crate::store::StoreError;

/// Outcome of a rejected or failed gateway request.
///
/// Every variant is handled at the request boundary and turned into a
/// status code plus a JSON body `{"error": ..., "code": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The request body could not be parsed.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// No subscription is registered under the handle.
    #[error("subscription not found")]
    NotFound,

    /// Delivery was requested with no payload, or the body could not be read.
    #[error("notification payload is empty or unreadable")]
    EmptyPayload,

    /// The subscription store failed.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// The push delivery capability reported an error.
    #[error("delivery failed: {0}")]
    DeliveryFailure(#[from] DeliveryError),
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::Storage(msg) => Self::StorageFailure(msg),
        }
    }
}

impl DispatchError {
    /// Caller-visible status code.
    ///
    /// Delivery failures stay 400 whatever the cause; the richer
    /// [`DeliveryError`] only reaches the logs.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedInput(_) | Self::DeliveryFailure(_) => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::EmptyPayload => StatusCode::NOT_FOUND,
            Self::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::EmptyPayload => "EMPTY_PAYLOAD",
            Self::StorageFailure(_) => "STORAGE_FAILURE",
            Self::DeliveryFailure(_) => "DELIVERY_FAILURE",
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Store internals stay in the logs.
            Self::StorageFailure(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        let body = json!({
            "error": message,
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
