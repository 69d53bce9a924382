//! Events carried over the relay channels

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RelayError, Result};

/// Channel announcing cached view writes
pub const UPDATES_CHANNEL: &str = "dashboard_updates";

/// Channel carrying new-notification events
pub const NOTIFICATIONS_CHANNEL: &str = "dashboard_notifications";

/// Cache key prefix for view payloads
pub const VIEW_KEY_PREFIX: &str = "dashboard";

/// View id used when a caller does not name one
pub const DEFAULT_VIEW_ID: &str = "default";

pub fn view_key(view_id: &str) -> String {
    format!("{}:{}", VIEW_KEY_PREFIX, view_id)
}

/// Published after every cached view write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub view_id: String,
    pub payload: Value,
}

/// Published after a notification is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: i64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub icon: String,
    pub priority: String,
    /// Human-relative creation time, see [`time_ago`]
    pub time: String,
    pub related_order_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Update(UpdateEvent),
    Notification(NotificationEvent),
}

impl RelayEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            RelayEvent::Update(_) => UPDATES_CHANNEL,
            RelayEvent::Notification(_) => NOTIFICATIONS_CHANNEL,
        }
    }

    /// Decode a pub/sub message by channel name
    pub fn decode(channel: &str, payload: &str) -> Result<Self> {
        match channel {
            UPDATES_CHANNEL => Ok(RelayEvent::Update(serde_json::from_str(payload)?)),
            NOTIFICATIONS_CHANNEL => Ok(RelayEvent::Notification(serde_json::from_str(payload)?)),
            other => Err(RelayError::UnknownChannel(other.to_string())),
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Render the age of `created_at_ms` relative to `now_ms`.
///
/// Under a minute is "just now"; then whole minutes, hours and days,
/// each truncated.
pub fn time_ago(created_at_ms: i64, now_ms: i64) -> String {
    let seconds = (now_ms - created_at_ms).max(0) / 1000;
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86_400)
    }
}
