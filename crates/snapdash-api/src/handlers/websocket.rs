//! Realtime push of relay events over a WebSocket

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde_json::{json, Value};
use snapdash_relay::RelayEvent;
use tokio::sync::broadcast::error::RecvError;

use crate::AppState;

/// Upgrade to a WebSocket that receives every relay event
#[utoipa::path(
    get,
    path = "/realtimedata",
    responses((status = 101, description = "Switching to WebSocket")),
    tag = "relay"
)]
pub async fn realtime_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_realtime_stream(socket, state))
}

/// Client frames for one relay event.
///
/// A view update is sent twice: once on its own `update:<view_id>`
/// channel with the bare payload, and once on `dashboard_global` with
/// the full `{view_id, payload}` event.
pub fn event_frames(event: &RelayEvent) -> Vec<Value> {
    match event {
        RelayEvent::Update(update) => vec![
            json!({
                "event": format!("update:{}", update.view_id),
                "data": update.payload,
            }),
            json!({
                "event": "dashboard_global",
                "data": update,
            }),
        ],
        RelayEvent::Notification(notification) => vec![json!({
            "event": "new_notification",
            "data": notification,
        })],
    }
}

async fn handle_realtime_stream(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.relay.subscribe();

    tracing::debug!("Realtime client connected");

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Realtime client lagging, events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let mut disconnected = false;
                for frame in event_frames(&event) {
                    if sender.send(Message::Text(frame.to_string())).await.is_err() {
                        disconnected = true;
                        break;
                    }
                }
                if disconnected {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Realtime client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapdash_relay::UpdateEvent;

    #[test]
    fn test_update_frames() {
        let event = RelayEvent::Update(UpdateEvent {
            view_id: "ops".into(),
            payload: json!({"orders": 3}),
        });
        let frames = event_frames(&event);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["event"], "update:ops");
        assert_eq!(frames[0]["data"], json!({"orders": 3}));
        assert_eq!(frames[1]["event"], "dashboard_global");
        assert_eq!(frames[1]["data"]["view_id"], "ops");
    }
}
