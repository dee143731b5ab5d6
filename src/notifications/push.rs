//! Web push subscriptions and message delivery.
//!
//! A [`SubscriptionRecord`] is what a browser hands out from
//! `PushManager.subscribe()`. [`WebPushDelivery`] encrypts a payload for
//! it (RFC 8291) and sends it with VAPID authentication (RFC 8292).

// Rust guideline compliant 2026-02

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::vapid::VapidKeys;

/// Time-to-live, in seconds, the push service should hold an undelivered
/// message.
pub const DEFAULT_TTL_SECS: u32 = 30;

/// A browser's push subscription.
///
/// Contains everything needed to send a web push message to this browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Client encryption parameters, normally `p256dh` and `auth` (base64url).
    pub keys: BTreeMap<String, String>,
}

impl SubscriptionRecord {
    /// Parse a subscription descriptor as sent by a browser.
    ///
    /// Extra top-level fields such as `expirationTime` are ignored. The
    /// endpoint must be an absolute http(s) URL.
    pub fn from_json(body: &[u8]) -> Result<Self, String> {
        let record: Self = serde_json::from_slice(body).map_err(|e| e.to_string())?;

        let url = reqwest::Url::parse(&record.endpoint)
            .map_err(|e| format!("endpoint is not a valid URL: {e}"))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(format!("endpoint scheme '{}' is not http(s)", url.scheme()));
        }

        Ok(record)
    }

    /// Browser's P-256 ECDH public key, if present.
    pub fn p256dh(&self) -> Option<&str> {
        self.keys.get("p256dh").map(String::as_str)
    }

    /// Shared auth secret, if present.
    pub fn auth(&self) -> Option<&str> {
        self.keys.get("auth").map(String::as_str)
    }
}

/// Per-delivery options passed to a [`PushDelivery`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryOptions {
    /// Service identity placed in the VAPID `sub` claim.
    pub subscriber: String,
    /// Seconds the push service may queue the message.
    pub ttl: u32,
}

impl DeliveryOptions {
    /// Options with the default TTL.
    pub fn new(subscriber: impl Into<String>) -> Self {
        Self {
            subscriber: subscriber.into(),
            ttl: DEFAULT_TTL_SECS,
        }
    }

    /// Subscriber as a VAPID `sub` claim.
    ///
    /// Push services require a `mailto:` or `https:` URI. Bare values are
    /// treated as email addresses.
    pub fn subject_claim(&self) -> String {
        if self.subscriber.starts_with("mailto:") || self.subscriber.starts_with("https:") {
            self.subscriber.clone()
        } else {
            format!("mailto:{}", self.subscriber)
        }
    }
}

/// Why a delivery attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The stored record lacks an encryption parameter.
    #[error("subscription is missing the '{0}' key")]
    MissingKey(&'static str),
    /// Signing the VAPID JWT failed.
    #[error("failed to sign VAPID claims: {0}")]
    Vapid(String),
    /// Building the encrypted message failed (bad client keys, oversize payload).
    #[error("failed to build web push message: {0}")]
    Encryption(String),
    /// The HTTP request to the push service did not complete.
    #[error("web push request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The push service reports the subscription no longer exists.
    #[error("subscription expired (HTTP {0})")]
    Gone(u16),
    /// The push service refused the message.
    #[error("push service rejected message (HTTP {status}): {body}")]
    Rejected {
        /// Response status code.
        status: u16,
        /// Response body, for logs.
        body: String,
    },
}

/// The delivery capability: encrypt and transmit one payload to one endpoint.
///
/// Implementations must not retry; retry policy belongs to the caller.
#[async_trait]
pub trait PushDelivery: Send + Sync {
    /// Deliver `payload` to `record`, authenticated with `keys`.
    async fn deliver(
        &self,
        payload: &[u8],
        record: &SubscriptionRecord,
        keys: &VapidKeys,
        options: &DeliveryOptions,
    ) -> Result<(), DeliveryError>;
}

/// Production [`PushDelivery`] using the `web-push` crate for encryption and
/// VAPID signing, and reqwest for transport.
///
/// Holds one `reqwest::Client` for connection pooling across deliveries.
#[derive(Clone, Debug, Default)]
pub struct WebPushDelivery {
    client: reqwest::Client,
}

impl WebPushDelivery {
    /// Create a delivery backed by the given client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PushDelivery for WebPushDelivery {
    async fn deliver(
        &self,
        payload: &[u8],
        record: &SubscriptionRecord,
        keys: &VapidKeys,
        options: &DeliveryOptions,
    ) -> Result<(), DeliveryError> {
        use web_push::{
            ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessageBuilder,
        };

        let p256dh = record.p256dh().ok_or(DeliveryError::MissingKey("p256dh"))?;
        let auth = record.auth().ok_or(DeliveryError::MissingKey("auth"))?;
        let sub_info = SubscriptionInfo::new(record.endpoint.as_str(), p256dh, auth);

        let mut sig_builder =
            VapidSignatureBuilder::from_base64(keys.private_key_base64url(), &sub_info)
                .map_err(|e| DeliveryError::Vapid(e.to_string()))?;
        sig_builder.add_claim("sub", options.subject_claim());
        let sig = sig_builder
            .build()
            .map_err(|e| DeliveryError::Vapid(e.to_string()))?;

        let mut builder = WebPushMessageBuilder::new(&sub_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(sig);
        builder.set_ttl(options.ttl);

        let message = builder
            .build()
            .map_err(|e| DeliveryError::Encryption(e.to_string()))?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }

        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }

        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");

            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }

            request = request.body(push_payload.content);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();

        match status {
            200..=299 => Ok(()),
            404 | 410 => Err(DeliveryError::Gone(status)),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(DeliveryError::Rejected { status, body })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_accepts_browser_subscription() {
        let body = br#"{"endpoint":"https://push.example/abc","expirationTime":null,"keys":{"p256dh":"X","auth":"Y"}}"#;
        let record = SubscriptionRecord::from_json(body).expect("valid subscription");

        assert_eq!(record.endpoint, "https://push.example/abc");
        assert_eq!(record.p256dh(), Some("X"));
        assert_eq!(record.auth(), Some("Y"));
    }

    #[test]
    fn test_from_json_rejects_non_json() {
        assert!(SubscriptionRecord::from_json(b"hello").is_err());
    }

    #[test]
    fn test_from_json_rejects_missing_keys() {
        assert!(SubscriptionRecord::from_json(br#"{"endpoint":"https://push.example/abc"}"#).is_err());
    }

    #[test]
    fn test_from_json_rejects_relative_endpoint() {
        let body = br#"{"endpoint":"/abc","keys":{}}"#;
        assert!(SubscriptionRecord::from_json(body).is_err());
    }

    #[test]
    fn test_from_json_rejects_non_http_scheme() {
        let body = br#"{"endpoint":"ftp://push.example/abc","keys":{}}"#;
        let err = SubscriptionRecord::from_json(body).unwrap_err();
        assert!(err.contains("ftp"), "{err}");
    }

    #[test]
    fn test_subject_claim_prefixes_bare_subscriber() {
        assert_eq!(
            DeliveryOptions::new("ops@example.com").subject_claim(),
            "mailto:ops@example.com"
        );
        assert_eq!(
            DeliveryOptions::new("mailto:ops@example.com").subject_claim(),
            "mailto:ops@example.com"
        );
        assert_eq!(
            DeliveryOptions::new("https://example.com").subject_claim(),
            "https://example.com"
        );
    }

    #[test]
    fn test_default_ttl_is_thirty_seconds() {
        assert_eq!(DeliveryOptions::new("x").ttl, 30);
    }

    #[tokio::test]
    async fn test_missing_auth_key_fails_before_network() {
        let record = SubscriptionRecord {
            endpoint: "https://push.invalid/abc".to_string(),
            keys: BTreeMap::from([("p256dh".to_string(), "X".to_string())]),
        };
        let keys = VapidKeys::generate().unwrap();

        let err = WebPushDelivery::default()
            .deliver(b"hi", &record, &keys, &DeliveryOptions::new("ops@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::MissingKey("auth")));
    }
}
