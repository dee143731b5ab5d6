//! HTTP handlers for the gateway routes.

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::gateway::DispatchGateway;

/// Body returned by a successful registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Handle to address future deliveries to.
    pub key: String,
}

/// Body returned by the public key route.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    /// Base64url VAPID public key (`applicationServerKey`).
    pub public_key: String,
}

/// `POST /register`
pub(super) async fn register(
    State(gateway): State<DispatchGateway>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), DispatchError> {
    let body = body.map_err(|e| DispatchError::MalformedInput(e.body_text()))?;
    let key = gateway.register(&body).await.inspect_err(|e| {
        log::info!("Registration rejected: {}", e);
    })?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { key })))
}

/// `POST /subscriptions/{handle}`
pub(super) async fn deliver(
    State(gateway): State<DispatchGateway>,
    handle: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, DispatchError> {
    // A handle that does not even decode cannot have been minted here.
    let Path(handle) = handle.map_err(|e| {
        log::info!("Undecodable subscription handle: {}", e);
        DispatchError::NotFound
    })?;
    let payload = body
        .inspect_err(|e| log::info!("Unreadable payload: {}", e))
        .ok();
    gateway.deliver(&handle, payload.as_deref()).await?;
    Ok(StatusCode::CREATED)
}

/// `GET /vapid/public-key`
pub(super) async fn public_key(State(gateway): State<DispatchGateway>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: gateway.public_key().to_string(),
    })
}
