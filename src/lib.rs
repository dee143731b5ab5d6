//! pushgate - VAPID web push gateway.
//!
//! Applications register browser push subscriptions under opaque handles
//! and later deliver notification payloads to those handles over HTTP.
//!
//! # Architecture
//!
//! - **Server** - axum route table, one task per request
//! - **Gateway** - registration and delivery dispatch, the service context
//! - **Store** - durable handle → subscription mapping (SQLite)
//! - **Notifications** - VAPID identity and the web push delivery capability
//!
//! # Modules
//!
//! - [`gateway`] - Registration/delivery orchestration
//! - [`store`] - Subscription persistence
//! - [`notifications`] - VAPID keys, subscription records, web push sending
//! - [`persistence`] - VAPID key file handling
//! - [`server`] - HTTP routes and serving
//! - [`config`] - Configuration loading

pub mod config;
pub mod error;
pub mod gateway;
pub mod notifications;
pub mod persistence;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::DispatchError;
pub use gateway::DispatchGateway;
pub use store::{StoreError, SubscriptionStore};
