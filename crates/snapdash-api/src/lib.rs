//! Snapdash API Server
//!
//! JSON/WebSocket surface of the reporting dashboard: report pages and
//! table fragments over the latest snapshot, the branch drill-down,
//! filter pickers, notifications and the cached-view relay.

use axum::{
    routing::{get, post},
    Json, Router,
};
use snapdash_relay::ViewRelay;
use snapdash_store::{NotificationStore, ReportStore};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub mod config;
pub mod error;
pub mod format;
pub mod handlers;
pub mod jwt;
pub mod models;
pub mod params;
pub mod shutdown;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use jwt::{JwtConfig, JwtLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<dyn ReportStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub relay: Arc<dyn ViewRelay>,
    /// Gates fragments, options and the notification list when set
    pub jwt: Option<JwtConfig>,
}

impl AppState {
    /// State over one store serving both reports and notifications
    pub fn new<S>(store: Arc<S>, relay: Arc<dyn ViewRelay>) -> Self
    where
        S: ReportStore + NotificationStore + 'static,
    {
        Self {
            reports: store.clone(),
            notifications: store,
            relay,
            jwt: None,
        }
    }

    pub fn with_jwt(mut self, config: Option<JwtConfig>) -> Self {
        self.jwt = config;
        self
    }
}

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let public: Router<AppState> = Router::new()
        // Full pages
        .route("/orderstatus", get(handlers::reports::order_status_page))
        .route(
            "/locationwiseorderstatus",
            get(handlers::reports::location_wise_order_page),
        )
        .route("/shortstatus", get(handlers::reports::short_status_page))
        .route("/provisionstatus", get(handlers::reports::provision_status_page))
        .route("/branchweight", get(handlers::branch::branch_weight_page))
        // Writes
        .route("/notify", post(handlers::notifications::create_notification))
        .route("/api/update", post(handlers::views::publish_update))
        .route("/api/data/:view_id", get(handlers::views::cached_view))
        .route("/api/health", get(handlers::views::health))
        // Realtime
        .route("/realtimedata", get(handlers::websocket::realtime_websocket))
        .route("/api-docs/openapi.json", get(openapi_json));

    let protected: Router<AppState> = Router::new()
        .route("/partial/branch", get(handlers::branch::branch_partial))
        .route(
            "/partial/:view_type",
            get(handlers::reports::order_status_partial),
        )
        .route(
            "/locationwiseorderstatus/partial",
            get(handlers::reports::location_wise_order_partial),
        )
        .route(
            "/shortstatus/partial",
            get(handlers::reports::short_status_partial),
        )
        .route(
            "/provisionstatus/partial",
            get(handlers::reports::provision_status_partial),
        )
        .route("/api/:report/options", get(handlers::reports::filter_options))
        .route(
            "/notifications/list",
            get(handlers::notifications::list_notifications),
        );

    let protected = match state.jwt.clone() {
        Some(config) => protected.layer(JwtLayer::new(config)),
        None => protected,
    };

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// OpenAPI specification
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::reports::order_status_page,
        handlers::reports::location_wise_order_page,
        handlers::reports::short_status_page,
        handlers::reports::provision_status_page,
        handlers::reports::order_status_partial,
        handlers::reports::location_wise_order_partial,
        handlers::reports::short_status_partial,
        handlers::reports::provision_status_partial,
        handlers::reports::filter_options,
        handlers::branch::branch_weight_page,
        handlers::branch::branch_partial,
        handlers::notifications::list_notifications,
        handlers::notifications::create_notification,
        handlers::views::publish_update,
        handlers::views::cached_view,
        handlers::views::health,
        handlers::websocket::realtime_websocket,
    ),
    components(schemas(
        models::StatEntry,
        models::FooterView,
        models::ReportView,
        models::BranchRowView,
        models::BranchView,
        models::NotificationView,
        models::NotificationList,
        models::CreateNotificationRequest,
        models::CreateNotificationResponse,
        models::UpdateRequest,
        models::UpdateResponse,
        models::HealthResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "reports", description = "Full report pages over the latest snapshot"),
        (name = "fragments", description = "Table fragments and filter pickers (JWT when enabled)"),
        (name = "notifications", description = "Dashboard notifications"),
        (name = "relay", description = "Cached view payloads and realtime updates"),
        (name = "health", description = "Health checks"),
    ),
    info(
        title = "Snapdash API",
        version = "0.1.0",
        description = "Logistics and inventory snapshot dashboard"
    )
)]
pub struct ApiDoc;
