//! Redis-backed relay
//!
//! Commands go through a [`ConnectionManager`], which reconnects on its own.
//! Pub/sub needs a dedicated connection, so a background task owns one and
//! re-subscribes with exponential backoff whenever it drops. Events reach
//! local subscribers only through that listener, including events this
//! process published itself, so each event is delivered once per process.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::event::{
    view_key, NotificationEvent, RelayEvent, UpdateEvent, NOTIFICATIONS_CHANNEL, UPDATES_CHANNEL,
};
use crate::{validate_view_id, ViewRelay, EVENT_BUFFER};

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

pub struct RedisRelay {
    conn: ConnectionManager,
    events: broadcast::Sender<RelayEvent>,
    listener: JoinHandle<()>,
}

impl RedisRelay {
    /// Connect to `redis_url` and start the pub/sub listener
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let listener = tokio::spawn(run_listener(client, events.clone()));

        tracing::info!("Connected to Redis relay");

        Ok(Self {
            conn,
            events,
            listener,
        })
    }
}

impl Drop for RedisRelay {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn run_listener(client: Client, events: broadcast::Sender<RelayEvent>) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match listen(&client, &events, &mut backoff).await {
            Ok(()) => tracing::warn!("Redis pub/sub stream ended, resubscribing"),
            Err(e) => tracing::error!(error = %e, "Redis pub/sub listener failed"),
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn listen(
    client: &Client,
    events: &broadcast::Sender<RelayEvent>,
    backoff: &mut Duration,
) -> Result<()> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(UPDATES_CHANNEL).await?;
    pubsub.subscribe(NOTIFICATIONS_CHANNEL).await?;
    *backoff = INITIAL_BACKOFF;

    tracing::debug!(
        channels = ?[UPDATES_CHANNEL, NOTIFICATIONS_CHANNEL],
        "Subscribed to relay channels"
    );

    let mut messages = pubsub.on_message();
    while let Some(msg) = messages.next().await {
        let channel = msg.get_channel_name().to_string();
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Skipping undecodable message");
                continue;
            }
        };

        match RelayEvent::decode(&channel, &payload) {
            Ok(event) => {
                let _ = events.send(event);
            }
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Skipping malformed message");
            }
        }
    }
    Ok(())
}

#[async_trait]
impl ViewRelay for RedisRelay {
    async fn publish_update(&self, view_id: &str, payload: Value) -> Result<UpdateEvent> {
        let view_id = validate_view_id(view_id)?;
        let mut conn = self.conn.clone();

        let _: () = conn
            .set(view_key(view_id), serde_json::to_string(&payload)?)
            .await?;

        let event = UpdateEvent {
            view_id: view_id.to_string(),
            payload,
        };
        let _: i64 = conn
            .publish(UPDATES_CHANNEL, serde_json::to_string(&event)?)
            .await?;

        Ok(event)
    }

    async fn cached_view(&self, view_id: &str) -> Result<Option<Value>> {
        let view_id = validate_view_id(view_id)?;
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn.get(view_key(view_id)).await?;
        Ok(match raw {
            // Values written by other tools may not be JSON
            Some(raw) => Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw))),
            None => None,
        })
    }

    async fn broadcast_notification(&self, event: NotificationEvent) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .publish(NOTIFICATIONS_CHANNEL, serde_json::to_string(&event)?)
            .await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    async fn health(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
