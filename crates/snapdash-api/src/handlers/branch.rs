//! Branch weight allocation: the zone → state → location drill-down

use axum::{extract::State, Json};
use snapdash_store::DrillRequest;

use crate::error::Result;
use crate::handlers::page_header;
use crate::models::BranchView;
use crate::params::{DrillQuery, ReportParams, ReportQuery};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/branchweight",
    params(
        ReportQuery,
        ("zone" = Option<String>, Query, description = "Legacy flat filter; groups by state"),
        ("state" = Option<String>, Query, description = "Legacy flat filter; with zone, groups by location")
    ),
    responses(
        (status = 200, description = "Drill-down root page", body = BranchView),
        (status = 500, description = "Storage fault")
    ),
    tag = "reports"
)]
pub async fn branch_weight_page(
    State(state): State<AppState>,
    params: ReportParams,
) -> Result<Json<BranchView>> {
    let (unread, sync_time) = page_header(&state).await?;

    let request = DrillRequest::root(params.filters, params.page);
    let result = state.reports.drill_down(&request).await?;

    let mut view = BranchView::from(result);
    view.unread_count = Some(unread);
    view.sync_time = Some(sync_time);
    Ok(Json(view))
}

#[utoipa::path(
    get,
    path = "/partial/branch",
    params(ReportQuery, DrillQuery),
    responses(
        (status = 200, description = "Drill-down fragment or child rows", body = BranchView),
        (status = 400, description = "Unsupported parent level"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "fragments"
)]
pub async fn branch_partial(
    State(state): State<AppState>,
    params: ReportParams,
) -> Result<Json<BranchView>> {
    let request = params.drill_request()?;
    let result = state.reports.drill_down(&request).await?;
    Ok(Json(BranchView::from(result)))
}
