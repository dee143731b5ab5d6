//! Shared helpers for integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use http_body_util::BodyExt;
use pushgate::notifications::{
    DeliveryError, DeliveryOptions, PushDelivery, SubscriptionRecord, VapidKeys,
};
use pushgate::{DispatchGateway, SubscriptionStore};
use tower::ServiceExt;

/// One call observed by [`RecordingDelivery`].
#[derive(Clone, Debug)]
pub struct DeliveryCall {
    pub payload: Vec<u8>,
    pub record: SubscriptionRecord,
    pub public_key: String,
    pub options: DeliveryOptions,
}

/// Fake delivery capability that records calls and optionally fails.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    calls: Mutex<Vec<DeliveryCall>>,
    fail_with_status: Option<u16>,
}

impl RecordingDelivery {
    pub fn failing(status: u16) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with_status: Some(status),
        }
    }

    pub fn calls(&self) -> Vec<DeliveryCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushDelivery for RecordingDelivery {
    async fn deliver(
        &self,
        payload: &[u8],
        record: &SubscriptionRecord,
        keys: &VapidKeys,
        options: &DeliveryOptions,
    ) -> Result<(), DeliveryError> {
        self.calls.lock().unwrap().push(DeliveryCall {
            payload: payload.to_vec(),
            record: record.clone(),
            public_key: keys.public_key_base64url().to_string(),
            options: options.clone(),
        });

        match self.fail_with_status {
            Some(410) => Err(DeliveryError::Gone(410)),
            Some(status) => Err(DeliveryError::Rejected {
                status,
                body: String::new(),
            }),
            None => Ok(()),
        }
    }
}

pub const SUBSCRIBER: &str = "ops@example.com";

pub const SUBSCRIPTION_JSON: &str =
    r#"{"endpoint":"https://push.example/abc","keys":{"p256dh":"X","auth":"Y"}}"#;

/// Gateway over an in-memory store and the given fake delivery.
pub fn test_gateway(delivery: Arc<RecordingDelivery>) -> DispatchGateway {
    DispatchGateway::new(
        VapidKeys::generate().unwrap(),
        SubscriptionStore::open_in_memory().unwrap(),
        delivery,
        SUBSCRIBER,
    )
}

/// Send one request through the router.
pub async fn send(app: axum::Router, method: Method, uri: &str, body: impl Into<Body>) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
