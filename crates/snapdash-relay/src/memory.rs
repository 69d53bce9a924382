//! In-process relay used in tests and when no Redis is configured

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use crate::error::Result;
use crate::event::{NotificationEvent, RelayEvent, UpdateEvent};
use crate::{validate_view_id, ViewRelay, EVENT_BUFFER};

pub struct MemoryRelay {
    views: RwLock<HashMap<String, Value>>,
    events: broadcast::Sender<RelayEvent>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            views: RwLock::new(HashMap::new()),
            events,
        }
    }

    fn emit(&self, event: RelayEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ViewRelay for MemoryRelay {
    async fn publish_update(&self, view_id: &str, payload: Value) -> Result<UpdateEvent> {
        let view_id = validate_view_id(view_id)?;
        self.views
            .write()
            .await
            .insert(view_id.to_string(), payload.clone());

        let event = UpdateEvent {
            view_id: view_id.to_string(),
            payload,
        };
        self.emit(RelayEvent::Update(event.clone()));
        Ok(event)
    }

    async fn cached_view(&self, view_id: &str) -> Result<Option<Value>> {
        let view_id = validate_view_id(view_id)?;
        Ok(self.views.read().await.get(view_id).cloned())
    }

    async fn broadcast_notification(&self, event: NotificationEvent) -> Result<()> {
        self.emit(RelayEvent::Notification(event));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RelayError;
    use serde_json::json;

    #[tokio::test]
    async fn test_last_write_wins() {
        let relay = MemoryRelay::new();
        relay.publish_update("ops", json!({"v": 1})).await.unwrap();
        relay.publish_update("ops", json!({"v": 2})).await.unwrap();

        assert_eq!(relay.cached_view("ops").await.unwrap(), Some(json!({"v": 2})));
        assert_eq!(relay.cached_view("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_blank_view_id_rejected() {
        let relay = MemoryRelay::new();
        let err = relay.publish_update("  ", json!({})).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidViewId(_)));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let relay = MemoryRelay::new();
        let event = relay.publish_update("ops", json!([1, 2])).await.unwrap();
        assert_eq!(event.view_id, "ops");
        assert!(relay.health().await.is_ok());
        assert_eq!(relay.backend(), "memory");
    }
}
