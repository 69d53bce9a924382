//! Order, short and provision status reports

use axum::{
    extract::{Path, State},
    Json,
};
use snapdash_store::{FilterOptions, ReportKind};

use crate::error::{ApiError, Result};
use crate::handlers::page_header;
use crate::models::{stat_entries, ReportView};
use crate::params::{ReportParams, ReportQuery};
use crate::AppState;

/// Fragment flavours of the order status table
pub const ORDER_STATUS_VIEWS: [&str; 3] = ["make", "collection", "party"];

/// Stats, footer and one page of rows for the latest snapshot.
///
/// The three reads are independent and run concurrently; they are not
/// wrapped in a transaction.
pub(crate) async fn render_report(
    state: &AppState,
    kind: ReportKind,
    params: &ReportParams,
) -> Result<ReportView> {
    let store = &state.reports;
    let date = store.latest_snapshot_date(kind).await?;

    let (stats, footer, rows) = tokio::try_join!(
        store.compute_stats(kind, date, &params.filters),
        store.compute_footer_totals(kind, date, &params.filters),
        store.list_rows(kind, date, &params.filters, params.page),
    )?;

    tracing::debug!(
        report = %kind,
        snapshot_date = ?date,
        rows = rows.items.len(),
        total = rows.meta.total,
        "Rendered report"
    );

    Ok(ReportView {
        report: kind.slug().to_string(),
        view: None,
        unread_count: None,
        sync_time: None,
        snapshot_date: date,
        stats: stat_entries(&stats),
        footer: footer.into(),
        rows: rows.items,
        pagination: rows.meta,
    })
}

async fn full_page(state: &AppState, kind: ReportKind, params: &ReportParams) -> Result<Json<ReportView>> {
    let (unread, sync_time) = page_header(state).await?;
    let mut view = render_report(state, kind, params).await?;
    view.unread_count = Some(unread);
    view.sync_time = Some(sync_time);
    Ok(Json(view))
}

// ============================================================
// FULL PAGES
// ============================================================

#[utoipa::path(
    get,
    path = "/orderstatus",
    params(ReportQuery),
    responses(
        (status = 200, description = "Order status page", body = ReportView),
        (status = 500, description = "Storage fault")
    ),
    tag = "reports"
)]
pub async fn order_status_page(
    State(state): State<AppState>,
    params: ReportParams,
) -> Result<Json<ReportView>> {
    full_page(&state, ReportKind::OrderStatus, &params).await
}

#[utoipa::path(
    get,
    path = "/locationwiseorderstatus",
    params(ReportQuery),
    responses(
        (status = 200, description = "Location-wise order status page", body = ReportView),
        (status = 500, description = "Storage fault")
    ),
    tag = "reports"
)]
pub async fn location_wise_order_page(
    State(state): State<AppState>,
    params: ReportParams,
) -> Result<Json<ReportView>> {
    full_page(&state, ReportKind::LocationWiseOrder, &params).await
}

#[utoipa::path(
    get,
    path = "/shortstatus",
    params(ReportQuery),
    responses(
        (status = 200, description = "Short status page", body = ReportView),
        (status = 500, description = "Storage fault")
    ),
    tag = "reports"
)]
pub async fn short_status_page(
    State(state): State<AppState>,
    params: ReportParams,
) -> Result<Json<ReportView>> {
    full_page(&state, ReportKind::ShortStatus, &params).await
}

#[utoipa::path(
    get,
    path = "/provisionstatus",
    params(ReportQuery),
    responses(
        (status = 200, description = "Provision status page", body = ReportView),
        (status = 500, description = "Storage fault")
    ),
    tag = "reports"
)]
pub async fn provision_status_page(
    State(state): State<AppState>,
    params: ReportParams,
) -> Result<Json<ReportView>> {
    full_page(&state, ReportKind::ProvisionStatus, &params).await
}

// ============================================================
// FRAGMENTS
// ============================================================

#[utoipa::path(
    get,
    path = "/partial/{view_type}",
    params(
        ("view_type" = String, Path, description = "make, collection or party"),
        ReportQuery
    ),
    responses(
        (status = 200, description = "Order status table fragment", body = ReportView),
        (status = 400, description = "Unsupported view type"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "fragments"
)]
pub async fn order_status_partial(
    State(state): State<AppState>,
    Path(view_type): Path<String>,
    params: ReportParams,
) -> Result<Json<ReportView>> {
    if !ORDER_STATUS_VIEWS.contains(&view_type.as_str()) {
        return Err(ApiError::BadRequest(format!("Invalid view type: {}", view_type)));
    }

    let mut view = render_report(&state, ReportKind::OrderStatus, &params).await?;
    view.view = Some(view_type);
    Ok(Json(view))
}

#[utoipa::path(
    get,
    path = "/locationwiseorderstatus/partial",
    params(ReportQuery),
    responses(
        (status = 200, description = "Location-wise order table fragment", body = ReportView),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "fragments"
)]
pub async fn location_wise_order_partial(
    State(state): State<AppState>,
    params: ReportParams,
) -> Result<Json<ReportView>> {
    Ok(Json(render_report(&state, ReportKind::LocationWiseOrder, &params).await?))
}

#[utoipa::path(
    get,
    path = "/shortstatus/partial",
    params(ReportQuery),
    responses(
        (status = 200, description = "Short status table fragment", body = ReportView),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "fragments"
)]
pub async fn short_status_partial(
    State(state): State<AppState>,
    params: ReportParams,
) -> Result<Json<ReportView>> {
    Ok(Json(render_report(&state, ReportKind::ShortStatus, &params).await?))
}

#[utoipa::path(
    get,
    path = "/provisionstatus/partial",
    params(ReportQuery),
    responses(
        (status = 200, description = "Provision status table fragment", body = ReportView),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "fragments"
)]
pub async fn provision_status_partial(
    State(state): State<AppState>,
    params: ReportParams,
) -> Result<Json<ReportView>> {
    Ok(Json(render_report(&state, ReportKind::ProvisionStatus, &params).await?))
}

// ============================================================
// FILTER OPTIONS
// ============================================================

#[utoipa::path(
    get,
    path = "/api/{report}/options",
    params(
        ("report" = String, Path, description = "orderstatus, locationwiseorderstatus, shortstatus, provisionstatus or branchweight"),
        ("zone" = Option<String>, Query, description = "Narrows branchweight states and locations"),
        ("state" = Option<String>, Query, description = "Narrows branchweight locations")
    ),
    responses(
        (status = 200, description = "Distinct values per filter", body = Object),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Unknown report")
    ),
    security(("bearer" = [])),
    tag = "fragments"
)]
pub async fn filter_options(
    State(state): State<AppState>,
    Path(report): Path<String>,
    params: ReportParams,
) -> Result<Json<FilterOptions>> {
    let kind = ReportKind::from_slug(&report)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown report: {}", report)))?;

    let options = state.reports.filter_options(kind, &params.filters).await?;
    Ok(Json(options))
}
