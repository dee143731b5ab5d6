//! Web push notification infrastructure.
//!
//! Holds the VAPID identity and the delivery capability used to reach
//! browser push services.
//!
//! # Architecture
//!
//! ```text
//! Application POSTs payload to /subscriptions/{handle}
//!     ↓
//! Gateway sends web push (RFC 8030) to browser push service
//!     ↓
//! Push service delivers to service worker
//!     ↓
//! Service worker shows browser notification
//! ```
//!
//! # VAPID Keys
//!
//! The gateway holds one P-256 ECDSA keypair (VAPID, RFC 8292). The public
//! key is given to browsers so they can subscribe; the private key signs
//! every outbound message.
//!
//! # Push Subscriptions
//!
//! Browsers send their push subscription (endpoint + keys) to the gateway,
//! which stores it under an opaque handle and uses it to send web push
//! messages when the application asks.

// Rust guideline compliant 2026-02

pub mod push;
pub mod vapid;

pub use push::{
    DeliveryError, DeliveryOptions, PushDelivery, SubscriptionRecord, WebPushDelivery,
    DEFAULT_TTL_SECS,
};
pub use vapid::{KeyError, VapidKeys};
