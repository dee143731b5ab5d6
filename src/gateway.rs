//! Registration and delivery dispatch.
//!
//! [`DispatchGateway`] is the service context every request handler
//! receives. It is built once by [`DispatchGateway::initialize`] before the
//! server starts and is cheap to clone (everything is behind `Arc`).
//!
//! Each request runs independently:
//!
//! ```text
//! register: parse body ─▶ mint handle ─▶ store.put ─▶ handle
//! deliver:  store.get(handle) ─▶ check payload ─▶ PushDelivery ─▶ ()
//! ```
//!
//! Store calls run on the blocking pool and finish before any network I/O
//! starts, so no transaction is held open across a delivery.

// Rust guideline compliant 2026-02

use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::config::Config;
use crate::error::DispatchError;
use crate::notifications::{
    DeliveryOptions, PushDelivery, SubscriptionRecord, VapidKeys, WebPushDelivery,
};
use crate::persistence;
use crate::store::{StoreError, SubscriptionStore};

/// Service context shared by all request handlers.
#[derive(Clone)]
pub struct DispatchGateway {
    keys: Arc<VapidKeys>,
    store: Arc<SubscriptionStore>,
    delivery: Arc<dyn PushDelivery>,
    options: Arc<DeliveryOptions>,
}

impl std::fmt::Debug for DispatchGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchGateway")
            .field("keys", &self.keys)
            .field("store", &self.store)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DispatchGateway {
    /// Assemble a gateway from already-initialized parts.
    pub fn new(
        keys: VapidKeys,
        store: SubscriptionStore,
        delivery: Arc<dyn PushDelivery>,
        subscriber: impl Into<String>,
    ) -> Self {
        Self {
            keys: Arc::new(keys),
            store: Arc::new(store),
            delivery,
            options: Arc::new(DeliveryOptions::new(subscriber)),
        }
    }

    /// Startup phase: load or create the VAPID keys, open the store, and
    /// wire up web push delivery.
    ///
    /// Any error here means the process must not serve traffic.
    pub fn initialize(config: &Config) -> Result<Self> {
        let keys = persistence::load_or_generate_vapid_keys(&config.creds_path)
            .context("Failed to initialize VAPID keys")?;

        let store = SubscriptionStore::open(&config.db_path).with_context(|| {
            format!(
                "Failed to open subscription store at {}",
                config.db_path.display()
            )
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("pushgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        log::info!("Using subscriber {}", config.subscriber);
        Ok(Self::new(
            keys,
            store,
            Arc::new(WebPushDelivery::new(client)),
            config.subscriber.clone(),
        ))
    }

    /// The VAPID public key browsers subscribe against.
    pub fn public_key(&self) -> &str {
        self.keys.public_key_base64url()
    }

    /// The underlying store.
    pub fn store(&self) -> &SubscriptionStore {
        &self.store
    }

    /// Register a subscription descriptor and return its new handle.
    pub async fn register(&self, body: &[u8]) -> Result<String, DispatchError> {
        let record = SubscriptionRecord::from_json(body).map_err(DispatchError::MalformedInput)?;

        let handle = Uuid::new_v4().to_string();
        let store = Arc::clone(&self.store);
        let key = handle.clone();
        run_blocking(move || store.put(&key, &record)).await?;

        log::info!("Registered subscription {}", short(&handle));
        Ok(handle)
    }

    /// Deliver `payload` to the subscription under `handle`.
    ///
    /// The handle is checked first; `None` means the body could not be read
    /// and is treated like an empty payload.
    pub async fn deliver(&self, handle: &str, payload: Option<&[u8]>) -> Result<(), DispatchError> {
        let store = Arc::clone(&self.store);
        let key = handle.to_string();
        let record = match run_blocking(move || store.get(&key)).await {
            Ok(record) => record,
            Err(DispatchError::NotFound) => {
                log::info!("Subscription {} not found", short(handle));
                return Err(DispatchError::NotFound);
            }
            Err(e) => return Err(e),
        };

        let payload = match payload {
            Some(payload) if !payload.is_empty() => payload,
            _ => {
                log::info!("Empty payload for subscription {}", short(handle));
                return Err(DispatchError::EmptyPayload);
            }
        };

        self.delivery
            .deliver(payload, &record, &self.keys, &self.options)
            .await
            .map_err(|e| {
                log::warn!("Delivery to {} failed: {}", short(handle), e);
                DispatchError::from(e)
            })?;

        log::info!(
            "Delivered {} byte(s) to subscription {}",
            payload.len(),
            short(handle)
        );
        Ok(())
    }

    /// Release the store. Called once the server has stopped.
    pub fn close(&self) -> Result<()> {
        self.store
            .close()
            .context("Failed to close subscription store")
    }
}

/// Run a store operation on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T, DispatchError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DispatchError::StorageFailure(format!("store task failed: {e}")))?;

    result.map_err(|e| {
        if let StoreError::Storage(msg) = &e {
            log::error!("Subscription store error: {}", msg);
        }
        DispatchError::from(e)
    })
}

/// First 8 characters of a handle, for logs.
fn short(handle: &str) -> &str {
    handle
        .char_indices()
        .nth(8)
        .map_or(handle, |(i, _)| &handle[..i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_truncates_on_char_boundary() {
        assert_eq!(short("0123456789"), "01234567");
        assert_eq!(short("abc"), "abc");
        assert_eq!(short("ééééééééé"), "éééééééé");
    }
}
