//! Snapdash Relay
//!
//! Cache/Notify relay for dashboard views. A write stores the latest payload
//! for a view under `dashboard:<view_id>` and then announces it on the
//! `dashboard_updates` channel; new notifications are announced on
//! `dashboard_notifications`. Every process running a relay re-broadcasts
//! what it hears to its local subscribers (WebSocket sessions).
//!
//! ```text
//! POST /api/update ──► ViewRelay::publish_update ──► SET + PUBLISH
//!                                                      │
//!                         pub/sub listener ◄───────────┘
//!                               │
//!                               ▼
//!                    broadcast::Sender<RelayEvent> ──► subscribers
//! ```
//!
//! Delivery is at-most-once. The SET and PUBLISH are not atomic, and events
//! emitted while a subscriber is lagging or disconnected are not replayed.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

pub mod error;
pub mod event;
pub mod memory;
pub mod redis_relay;

pub use error::{RelayError, Result};
pub use event::{
    now_ms, time_ago, view_key, NotificationEvent, RelayEvent, UpdateEvent, DEFAULT_VIEW_ID,
    NOTIFICATIONS_CHANNEL, UPDATES_CHANNEL,
};
pub use memory::MemoryRelay;
pub use redis_relay::RedisRelay;

/// Capacity of the local fan-out channel
pub const EVENT_BUFFER: usize = 256;

#[async_trait]
pub trait ViewRelay: Send + Sync {
    /// Store `payload` as the latest value for `view_id`, then announce it
    async fn publish_update(&self, view_id: &str, payload: Value) -> Result<UpdateEvent>;

    /// Latest payload stored for `view_id`
    async fn cached_view(&self, view_id: &str) -> Result<Option<Value>>;

    async fn broadcast_notification(&self, event: NotificationEvent) -> Result<()>;

    /// Receive every event heard from now on
    fn subscribe(&self) -> broadcast::Receiver<RelayEvent>;

    /// Round-trip to the backing transport
    async fn health(&self) -> Result<()>;

    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;
}

pub(crate) fn validate_view_id(view_id: &str) -> Result<&str> {
    let trimmed = view_id.trim();
    if trimmed.is_empty() {
        return Err(RelayError::InvalidViewId(view_id.to_string()));
    }
    Ok(trimmed)
}
