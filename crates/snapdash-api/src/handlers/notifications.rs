//! Notification list and creation

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use snapdash_relay::now_ms;
use snapdash_store::NewNotification;
use utoipa::IntoParams;

use crate::error::{ApiError, Result};
use crate::models::{
    notification_event, CreateNotificationRequest, CreateNotificationResponse, NotificationList,
    NotificationView,
};
use crate::AppState;

pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Default 20, at most 100
    pub limit: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/notifications/list",
    params(ListQuery),
    responses(
        (status = 200, description = "Newest notifications first", body = NotificationList),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<NotificationList>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let (notifications, unread_count) = tokio::try_join!(
        state.notifications.recent_notifications(limit),
        state.notifications.unread_notification_count(),
    )?;

    let now = now_ms();
    Ok(Json(NotificationList {
        unread_count,
        notifications: notifications
            .into_iter()
            .map(|n| NotificationView::new(n, now))
            .collect(),
    }))
}

/// Persist a notification, then announce it to live clients.
///
/// A failed announcement does not undo the insert.
#[utoipa::path(
    post,
    path = "/notify",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification stored", body = CreateNotificationResponse),
        (status = 400, description = "Missing title or message"),
        (status = 500, description = "Storage fault")
    ),
    tag = "notifications"
)]
pub async fn create_notification(
    State(state): State<AppState>,
    Json(request): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<CreateNotificationResponse>)> {
    let required = |field: Option<String>, name: &str| {
        field
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("{} is required", name)))
    };
    let title = required(request.title, "title")?;
    let message = required(request.message, "message")?;

    let notification = state
        .notifications
        .create_notification(NewNotification {
            title,
            message,
            notification_type: request.notification_type,
            icon: request.icon,
            priority: request.priority,
            related_order_id: request.related_order_id,
        })
        .await?;

    let event = notification_event(&notification, now_ms());
    let broadcast = match state.relay.broadcast_notification(event).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(id = notification.id, error = %e, "Notification stored but not broadcast");
            false
        }
    };

    let message = if broadcast {
        "Notification created and broadcasted"
    } else {
        "Notification created; broadcast failed"
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateNotificationResponse {
            status: "success".to_string(),
            message: message.to_string(),
            id: notification.id,
            broadcast,
        }),
    ))
}
