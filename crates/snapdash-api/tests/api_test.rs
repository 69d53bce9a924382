//! Integration tests for the dashboard HTTP API
//!
//! Each test builds the real router over an in-memory SQLite store and an
//! in-process relay, then drives it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tower::ServiceExt;

use snapdash_api::jwt::{JwtConfig, JwtService};
use snapdash_api::{create_router, AppState, ServerConfig};
use snapdash_relay::{
    MemoryRelay, NotificationEvent, RelayError, RelayEvent, UpdateEvent, ViewRelay,
};
use snapdash_store::{
    DrillRequest, DrillResult, FilterOptions, FilterSet, FooterTotals, NewNotification,
    Notification, NotificationStore, Page, PageRequest, ReportKind, ReportRow, ReportStore,
    SnapshotRecord, SqliteDashboardStore, StatsRecord, StoreError,
};

const SECRET: &[u8] = b"integration-test-secret-32-bytes-long";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

async fn test_store() -> Arc<SqliteDashboardStore> {
    Arc::new(SqliteDashboardStore::new_in_memory().await.unwrap())
}

/// Create a test app with in-memory store and relay, JWT disabled
async fn test_app() -> (axum::Router, Arc<SqliteDashboardStore>, Arc<MemoryRelay>) {
    let store = test_store().await;
    let relay = Arc::new(MemoryRelay::new());
    let state = AppState::new(store.clone(), relay.clone());
    (create_router(state), store, relay)
}

async fn seed_orders(store: &SqliteDashboardStore) {
    let row = |division: &str, group: &str, a: i64, total: i64| {
        SnapshotRecord::new(day(5))
            .text("division", division)
            .text("group_name", group)
            .text("make_location", "Chennai")
            .int("a_completed_count", a)
            .int("a_pending_count", 1)
            .int("total_count", total)
            .float("sla_index_pct", 90.0)
    };
    store
        .ingest_snapshot(
            ReportKind::OrderStatus,
            &[
                row("Showroom Alpha", "Rings", 10, 1200),
                row("Retail", "Chains", 5, 300),
                row("Retail", "Bangles", 0, 4),
            ],
        )
        .await
        .unwrap();
}

async fn seed_stock(store: &SqliteDashboardStore) {
    let row = |zone: &str, state: &str, location: &str, pieces: i64| {
        SnapshotRecord::new(day(5))
            .text("zone", zone)
            .text("state", state)
            .text("location", location)
            .int("provision_pieces", pieces)
            .float("provision_weight", pieces as f64 * 1.5)
    };
    store
        .ingest_snapshot(
            ReportKind::LocationStock,
            &[
                row("APAC", "Kerala", "Kochi", 10),
                row("APAC", "Kerala", "Calicut", 5),
                row("APAC", "Goa", "Panaji", 3),
                row("EMEA", "Dubai", "Deira", 20),
            ],
        )
        .await
        .unwrap();
}

/// Helper to read response body as bytes
async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ---------------------------------------------------------------
// Report pages
// ---------------------------------------------------------------

#[tokio::test]
async fn test_order_status_page_without_snapshot() {
    let (app, _, _) = test_app().await;

    let resp = app.oneshot(get("/orderstatus")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["report"], "orderstatus");
    assert_eq!(json["unread_count"], 0);
    assert!(json["sync_time"].is_string());
    assert!(json["snapshot_date"].is_null());
    assert_eq!(json["rows"], json!([]));
    assert_eq!(json["pagination"]["total"], 0);
    assert_eq!(json["footer"]["display"]["total"], "0");
}

#[tokio::test]
async fn test_order_status_page_with_filters() {
    let (app, store, _) = test_app().await;
    seed_orders(&store).await;

    let resp = app
        .oneshot(get("/orderstatus?division=Retail&per_page=1&page=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["snapshot_date"], "2024-06-05");
    assert_eq!(json["pagination"]["total"], 2);
    assert_eq!(json["pagination"]["pages"], 2);
    assert_eq!(json["pagination"]["has_prev"], true);
    assert_eq!(json["rows"].as_array().unwrap().len(), 1);

    // Footer covers the whole filtered set, not just the page
    assert_eq!(json["footer"]["totals"]["a"], 7);
    assert_eq!(json["footer"]["totals"]["total"], 304);

    let total_orders = json["stats"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["key"] == "total_orders")
        .unwrap();
    assert_eq!(total_orders["value"], 304);
    assert_eq!(total_orders["display"], "304");
}

#[tokio::test]
async fn test_search_and_thousands_display() {
    let (app, store, _) = test_app().await;
    seed_orders(&store).await;

    let resp = app.oneshot(get("/orderstatus?search=ALPHA")).await.unwrap();
    let json = body_json(resp.into_body()).await;

    assert_eq!(json["pagination"]["total"], 1);
    assert_eq!(json["footer"]["display"]["total"], "1,200");
    assert_eq!(json["rows"][0]["cells"]["division"], "Showroom Alpha");
}

#[tokio::test]
async fn test_page_past_the_end_is_empty() {
    let (app, store, _) = test_app().await;
    seed_orders(&store).await;

    let resp = app
        .oneshot(get("/orderstatus?page=99&per_page=not-a-number"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["rows"], json!([]));
    assert_eq!(json["pagination"]["per_page"], 50);
    assert_eq!(json["pagination"]["total"], 3);
}

#[tokio::test]
async fn test_other_report_pages_render() {
    let (app, _, _) = test_app().await;

    for uri in ["/locationwiseorderstatus", "/shortstatus", "/provisionstatus"] {
        let resp = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
        let json = body_json(resp.into_body()).await;
        assert!(json["stats"].is_array(), "{}", uri);
    }
}

// ---------------------------------------------------------------
// Fragments
// ---------------------------------------------------------------

#[tokio::test]
async fn test_order_status_partial_views() {
    let (app, store, _) = test_app().await;
    seed_orders(&store).await;

    let resp = app.clone().oneshot(get("/partial/make")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["view"], "make");
    assert!(json.get("unread_count").is_none());
    assert_eq!(json["pagination"]["total"], 3);

    let resp = app.oneshot(get("/partial/division")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["code"], 400);
}

#[tokio::test]
async fn test_report_partials() {
    let (app, _, _) = test_app().await;

    for uri in [
        "/locationwiseorderstatus/partial",
        "/shortstatus/partial",
        "/provisionstatus/partial",
    ] {
        let resp = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
    }
}

// ---------------------------------------------------------------
// Branch drill-down
// ---------------------------------------------------------------

#[tokio::test]
async fn test_branch_weight_root_page() {
    let (app, store, _) = test_app().await;
    seed_stock(&store).await;

    let resp = app.oneshot(get("/branchweight")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["level"], "zone");
    let zones: Vec<&str> = json["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["zone"].as_str().unwrap())
        .collect();
    assert_eq!(zones, vec!["APAC", "EMEA"]);
    assert!(json["stats"].is_array());
    assert!(json["footer"].is_array());
    assert_eq!(json["pagination"]["total"], 2);
    assert!(json["unread_count"].is_number());
}

#[tokio::test]
async fn test_branch_partial_child_rows() {
    let (app, store, _) = test_app().await;
    seed_stock(&store).await;

    let resp = app
        .clone()
        .oneshot(get("/partial/branch?parent_level=zone&parent_value=APAC"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["level"], "state");
    assert!(json.get("stats").is_none());
    assert!(json.get("pagination").is_none());
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["zone"] == "APAC"));

    let resp = app
        .oneshot(get(
            "/partial/branch?parent_level=state&parent_value=Kerala&grandparent_value=APAC",
        ))
        .await
        .unwrap();
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["level"], "location");
    let locations: Vec<&str> = json["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["location"].as_str().unwrap())
        .collect();
    assert_eq!(locations, vec!["Calicut", "Kochi"]);
}

#[tokio::test]
async fn test_branch_partial_rejects_unknown_level() {
    let (app, _, _) = test_app().await;

    let resp = app
        .oneshot(get("/partial/branch?parent_level=country&parent_value=IN"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------
// Filter options
// ---------------------------------------------------------------

#[tokio::test]
async fn test_filter_options() {
    let (app, store, _) = test_app().await;
    seed_orders(&store).await;
    seed_stock(&store).await;

    let resp = app
        .clone()
        .oneshot(get("/api/orderstatus/options"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["divisions"], json!(["Retail", "Showroom Alpha"]));

    let resp = app
        .clone()
        .oneshot(get("/api/branchweight/options?zone=APAC"))
        .await
        .unwrap();
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["zones"], json!(["APAC", "EMEA"]));
    assert_eq!(json["states"], json!(["Goa", "Kerala"]));

    let resp = app.oneshot(get("/api/inventory/options")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------

#[tokio::test]
async fn test_create_notification_requires_title_and_message() {
    let (app, _, _) = test_app().await;

    let resp = app
        .clone()
        .oneshot(post_json("/notify", json!({"message": "no title"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(post_json("/notify", json!({"title": "  ", "message": "blank"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_and_list_notifications() {
    let (app, _, relay) = test_app().await;
    let mut events = relay.subscribe();

    let resp = app
        .clone()
        .oneshot(post_json(
            "/notify",
            json!({"title": "Order delayed", "message": "SO-12 is late", "priority": "high"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["broadcast"], true);

    match events.recv().await.unwrap() {
        RelayEvent::Notification(event) => {
            assert_eq!(event.title, "Order delayed");
            assert_eq!(event.notification_type, "info");
            assert_eq!(event.icon, "notifications");
            assert_eq!(event.priority, "high");
            assert_eq!(event.time, "just now");
        }
        other => panic!("unexpected event {:?}", other),
    }

    let resp = app.clone().oneshot(get("/notifications/list")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["unread_count"], 1);
    assert_eq!(json["notifications"][0]["title"], "Order delayed");
    assert_eq!(json["notifications"][0]["type"], "info");
    assert_eq!(json["notifications"][0]["time"], "just now");

    let resp = app.oneshot(get("/orderstatus")).await.unwrap();
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["unread_count"], 1);
}

/// Relay whose every publish fails
struct DownRelay {
    events: broadcast::Sender<RelayEvent>,
}

fn relay_down() -> RelayError {
    serde_json::from_str::<Value>("relay down").unwrap_err().into()
}

#[async_trait]
impl ViewRelay for DownRelay {
    async fn publish_update(
        &self,
        _view_id: &str,
        _payload: Value,
    ) -> snapdash_relay::Result<UpdateEvent> {
        Err(relay_down())
    }

    async fn cached_view(&self, _view_id: &str) -> snapdash_relay::Result<Option<Value>> {
        Err(relay_down())
    }

    async fn broadcast_notification(
        &self,
        _event: NotificationEvent,
    ) -> snapdash_relay::Result<()> {
        Err(relay_down())
    }

    fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    async fn health(&self) -> snapdash_relay::Result<()> {
        Err(relay_down())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[tokio::test]
async fn test_notification_persists_when_broadcast_fails() {
    let store = test_store().await;
    let relay = Arc::new(DownRelay {
        events: broadcast::channel(4).0,
    });
    let app = create_router(AppState::new(store.clone(), relay));

    let resp = app
        .clone()
        .oneshot(post_json("/notify", json!({"title": "Stock low", "message": "Kochi"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["broadcast"], false);

    let resp = app.clone().oneshot(get("/notifications/list")).await.unwrap();
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["notifications"].as_array().unwrap().len(), 1);

    let resp = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["status"], "error");
}

// ---------------------------------------------------------------
// Cached views
// ---------------------------------------------------------------

#[tokio::test]
async fn test_update_then_read_view() {
    let (app, _, relay) = test_app().await;
    let mut events = relay.subscribe();

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/update",
            json!({"view_id": "ops", "payload": {"orders": 12}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["message"], "Updated ops");
    assert_eq!(json["data"]["payload"]["orders"], 12);

    assert!(matches!(
        events.recv().await.unwrap(),
        RelayEvent::Update(e) if e.view_id == "ops"
    ));

    let resp = app.clone().oneshot(get("/api/data/ops")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp.into_body()).await, json!({"orders": 12}));

    let resp = app.oneshot(get("/api/data/missing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp.into_body()).await, json!({}));
}

#[tokio::test]
async fn test_update_defaults_and_blank_view_id() {
    let (app, _, _) = test_app().await;

    let resp = app
        .clone()
        .oneshot(post_json("/api/update", json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.clone().oneshot(get("/api/data/default")).await.unwrap();
    assert_eq!(body_json(resp.into_body()).await, json!({}));

    let resp = app
        .oneshot(post_json("/api/update", json!({"view_id": "   ", "payload": 1})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_with_memory_relay() {
    let (app, _, _) = test_app().await;

    let resp = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["relay"], "memory");
    assert_eq!(json["redis"], false);
}

// ---------------------------------------------------------------
// JWT gating
// ---------------------------------------------------------------

async fn jwt_app() -> axum::Router {
    let store = test_store().await;
    seed_stock(&store).await;
    let state = AppState::new(store, Arc::new(MemoryRelay::new()))
        .with_jwt(Some(JwtConfig::from_secret(SECRET).unwrap()));
    create_router(state)
}

#[tokio::test]
async fn test_fragments_require_token() {
    let app = jwt_app().await;

    for uri in [
        "/partial/branch",
        "/partial/make",
        "/shortstatus/partial",
        "/api/branchweight/options",
        "/notifications/list",
    ] {
        let resp = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["code"], 401);
    }
}

#[tokio::test]
async fn test_valid_token_is_accepted() {
    let app = jwt_app().await;
    let token = JwtService::new(JwtConfig::from_secret(SECRET).unwrap())
        .generate_token("analyst-7", None)
        .unwrap();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/partial/branch")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/partial/branch")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_default_config_gates_fragments() {
    let secret = String::from_utf8(SECRET.to_vec()).unwrap();
    let config = ServerConfig::from_lookup(|var| (var == "JWT_SECRET").then(|| secret.clone()))
        .unwrap();
    assert!(config.jwt.is_some());

    let state = AppState::new(test_store().await, Arc::new(MemoryRelay::new()));
    let app = create_router(state.with_jwt(config.jwt));

    let resp = app.clone().oneshot(get("/shortstatus/partial")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = app.oneshot(get("/shortstatus")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_public_routes_ignore_jwt() {
    let app = jwt_app().await;

    for uri in ["/branchweight", "/orderstatus", "/api/health"] {
        let resp = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
    }
}

// ---------------------------------------------------------------
// Storage faults
// ---------------------------------------------------------------

/// Every call fails the way a stalled database does
struct StalledStore;

fn stalled<T>() -> snapdash_store::Result<T> {
    Err(StoreError::Timeout(Duration::from_secs(30)))
}

#[async_trait]
impl ReportStore for StalledStore {
    async fn latest_snapshot_date(&self, _: ReportKind) -> snapdash_store::Result<Option<NaiveDate>> {
        stalled()
    }

    async fn ingest_snapshot(&self, _: ReportKind, _: &[SnapshotRecord]) -> snapdash_store::Result<u64> {
        stalled()
    }

    async fn compute_stats(
        &self,
        _: ReportKind,
        _: Option<NaiveDate>,
        _: &FilterSet,
    ) -> snapdash_store::Result<StatsRecord> {
        stalled()
    }

    async fn compute_footer_totals(
        &self,
        _: ReportKind,
        _: Option<NaiveDate>,
        _: &FilterSet,
    ) -> snapdash_store::Result<FooterTotals> {
        stalled()
    }

    async fn list_rows(
        &self,
        _: ReportKind,
        _: Option<NaiveDate>,
        _: &FilterSet,
        _: PageRequest,
    ) -> snapdash_store::Result<Page<ReportRow>> {
        stalled()
    }

    async fn drill_down(&self, _: &DrillRequest) -> snapdash_store::Result<DrillResult> {
        stalled()
    }

    async fn filter_options(&self, _: ReportKind, _: &FilterSet) -> snapdash_store::Result<FilterOptions> {
        stalled()
    }
}

#[async_trait]
impl NotificationStore for StalledStore {
    async fn create_notification(&self, _: NewNotification) -> snapdash_store::Result<Notification> {
        stalled()
    }

    async fn recent_notifications(&self, _: u32) -> snapdash_store::Result<Vec<Notification>> {
        stalled()
    }

    async fn unread_notification_count(&self) -> snapdash_store::Result<i64> {
        stalled()
    }
}

#[tokio::test]
async fn test_store_failure_is_json_500() {
    let state = AppState::new(Arc::new(StalledStore), Arc::new(MemoryRelay::new()));
    let app = create_router(state);

    for uri in [
        "/orderstatus",
        "/shortstatus/partial",
        "/partial/branch",
        "/api/orderstatus/options",
        "/notifications/list",
    ] {
        let resp = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["code"], 500, "{}", uri);
        assert!(
            json["error"].as_str().unwrap().contains("timed out"),
            "{}: {}",
            uri,
            json
        );
    }

    let resp = app
        .oneshot(post_json("/notify", json!({"title": "Delay", "message": "Order 7"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ---------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document() {
    let (app, _, _) = test_app().await;

    let resp = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp.into_body()).await;
    assert_eq!(json["info"]["title"], "Snapdash API");
    assert!(json["paths"]["/orderstatus"].is_object());
    assert!(json["paths"]["/partial/branch"].is_object());
}
