//! Query-string extraction shared by the report endpoints

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use snapdash_store::{DrillRequest, FilterSet, PageRequest};
use utoipa::IntoParams;

use crate::error::{ApiError, Result};

/// Filters, paging and drill position from a report query string.
///
/// Every parameter is optional. Unknown names become filters the engine
/// ignores; `page` / `per_page` never fail to parse.
#[derive(Debug, Clone, Default)]
pub struct ReportParams {
    pub filters: FilterSet,
    pub page: PageRequest,
    pub parent_level: Option<String>,
    pub parent_value: Option<String>,
    pub grandparent_value: Option<String>,
}

impl ReportParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let first = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        Self {
            filters: FilterSet::from_params(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            page: PageRequest::from_raw(first("page").as_deref(), first("per_page").as_deref()),
            parent_level: first("parent_level"),
            parent_value: first("parent_value"),
            grandparent_value: first("grandparent_value"),
        }
    }

    pub fn drill_request(&self) -> Result<DrillRequest> {
        Ok(DrillRequest::from_parts(
            self.parent_level.as_deref(),
            self.parent_value.as_deref(),
            self.grandparent_value.as_deref(),
            self.filters.clone(),
            self.page,
        )?)
    }
}

/// Documented subset of [`ReportParams`]; each report also accepts its
/// dimension names as equality filters.
#[derive(Debug, IntoParams)]
#[into_params(parameter_in = Query)]
#[allow(dead_code)]
pub struct ReportQuery {
    /// Case-insensitive substring over the report's search columns
    search: Option<String>,
    /// 1-based, default 1
    page: Option<i64>,
    /// Default 50, at most 1000
    per_page: Option<i64>,
}

/// Drill position for `/partial/branch`
#[derive(Debug, IntoParams)]
#[into_params(parameter_in = Query)]
#[allow(dead_code)]
pub struct DrillQuery {
    /// `zone` or `state`
    parent_level: Option<String>,
    parent_value: Option<String>,
    /// Zone of the expanded state
    grandparent_value: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ReportParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Self::from_pairs(&pairs))
    }
}
