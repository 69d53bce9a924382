//! Cached view payloads and relay health

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use snapdash_relay::DEFAULT_VIEW_ID;

use crate::error::Result;
use crate::models::{HealthResponse, UpdateRequest, UpdateResponse};
use crate::AppState;

/// Store a view payload and announce it.
///
/// The cache write happens first; if the announcement then fails the
/// request errors but the cached payload stays.
#[utoipa::path(
    post,
    path = "/api/update",
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Payload cached and published", body = UpdateResponse),
        (status = 400, description = "Blank view id"),
        (status = 500, description = "Relay unavailable")
    ),
    tag = "relay"
)]
pub async fn publish_update(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>> {
    let view_id = request.view_id.unwrap_or_else(|| DEFAULT_VIEW_ID.to_string());
    let payload = request.payload.unwrap_or_else(|| json!({}));

    let event = state.relay.publish_update(&view_id, payload).await?;

    Ok(Json(UpdateResponse {
        message: format!("Updated {}", event.view_id),
        data: serde_json::to_value(&event).unwrap_or(Value::Null),
    }))
}

#[utoipa::path(
    get,
    path = "/api/data/{view_id}",
    params(("view_id" = String, Path, description = "View identifier")),
    responses(
        (status = 200, description = "Latest cached payload", body = Object),
        (status = 404, description = "Nothing cached for this view", body = Object)
    ),
    tag = "relay"
)]
pub async fn cached_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Response> {
    match state.relay.cached_view(&view_id).await? {
        Some(payload) => Ok(Json(payload).into_response()),
        None => Ok((StatusCode::NOT_FOUND, Json(json!({}))).into_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Relay reachable", body = HealthResponse),
        (status = 500, description = "Relay unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.relay.backend();

    match state.relay.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                redis: backend == "redis",
                relay: backend.to_string(),
                message: None,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, relay = backend, "Relay health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: "error".to_string(),
                    redis: false,
                    relay: backend.to_string(),
                    message: Some(e.to_string()),
                }),
            )
        }
    }
}
