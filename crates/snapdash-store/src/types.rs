//! Store Types
//!
//! Request and result types shared by the report engine and its callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, StoreError};
use crate::sql::SqlValue;

/// Default page size for report listings
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Upper bound on page size
pub const MAX_PER_PAGE: u32 = 1000;

/// Query parameters that are never treated as filters
const RESERVED_PARAMS: &[&str] = &["page", "per_page", "parent_level", "parent_value", "grandparent_value"];

// ============================================================
// FILTERS
// ============================================================

/// Optional dimension filters plus a free-text search term.
///
/// Blank values are dropped on insertion so an empty query parameter
/// behaves exactly like an absent one. Keys the report does not know
/// are carried but ignored by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    search: Option<String>,
    values: BTreeMap<String, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw query parameters. A repeated key keeps its first value.
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filters = Self::new();
        let mut seen = BTreeSet::new();
        for (key, value) in params {
            let key = key.as_ref();
            if !seen.insert(key.to_string()) {
                continue;
            }
            if key == "search" {
                filters.set_search(value.as_ref());
            } else if !RESERVED_PARAMS.contains(&key) {
                filters.set(key, value.as_ref());
            }
        }
        filters
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_search(mut self, term: &str) -> Self {
        self.set_search(term);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.values.remove(key);
        } else {
            self.values.insert(key.to_string(), value.to_string());
        }
    }

    pub fn set_search(&mut self, term: &str) {
        let term = term.trim();
        self.search = (!term.is_empty()).then(|| term.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.values.is_empty()
    }
}

// ============================================================
// PAGINATION
// ============================================================

/// A validated page request (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    /// Coerce caller-supplied values; never fails
    pub fn new(page: i64, per_page: i64) -> Self {
        let page = if page < 1 { 1 } else { page.min(u32::MAX as i64) as u32 };
        let per_page = if per_page < 1 {
            DEFAULT_PER_PAGE
        } else {
            per_page.min(MAX_PER_PAGE as i64) as u32
        };
        Self { page, per_page }
    }

    /// Coerce raw query-string values; unparsable input falls back to defaults
    pub fn from_raw(page: Option<&str>, per_page: Option<&str>) -> Self {
        let page = page.and_then(|p| p.trim().parse::<i64>().ok()).unwrap_or(1);
        let per_page = per_page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_PER_PAGE as i64);
        Self::new(page, per_page)
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageMeta {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let pages = total.div_ceil(request.per_page as u64) as u32;
        Self {
            page: request.page,
            per_page: request.per_page,
            total,
            pages,
            has_prev: request.page > 1,
            has_next: request.page < pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            meta: PageMeta::new(request, 0),
        }
    }
}

// ============================================================
// AGGREGATES
// ============================================================

/// Display unit attached to a statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatUnit {
    Plain,
    Percent,
    OutOfFive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Count(i64),
    Amount(f64),
}

impl StatValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            StatValue::Count(v) => *v as f64,
            StatValue::Amount(v) => *v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stat {
    pub key: &'static str,
    pub value: StatValue,
    pub unit: StatUnit,
}

/// One row of global aggregates, in catalog order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatsRecord {
    pub stats: Vec<Stat>,
}

impl StatsRecord {
    pub fn get(&self, key: &str) -> Option<StatValue> {
        self.stats.iter().find(|s| s.key == key).map(|s| s.value)
    }
}

/// Stage footer totals: completed + pending per stage, plus `total_count`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FooterTotals {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
    pub e: i64,
    pub f: i64,
    pub g: i64,
    pub total: i64,
}

impl FooterTotals {
    pub fn from_stages(stages: [i64; 7], total: i64) -> Self {
        let [a, b, c, d, e, f, g] = stages;
        Self { a, b, c, d, e, f, g, total }
    }

    pub fn entries(&self) -> [(&'static str, i64); 8] {
        [
            ("a", self.a),
            ("b", self.b),
            ("c", self.c),
            ("d", self.d),
            ("e", self.e),
            ("f", self.f),
            ("g", self.g),
            ("total", self.total),
        ]
    }
}

// ============================================================
// ROWS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StagePair {
    pub stage: char,
    pub completed: i64,
    pub pending: i64,
}

impl StagePair {
    pub fn total(&self) -> i64 {
        self.completed + self.pending
    }
}

/// One snapshot row as listed in a report table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub cells: BTreeMap<String, SqlValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StagePair>,
}

impl ReportRow {
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.cells.get(column)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.cells.get(column).and_then(SqlValue::as_text)
    }
}

/// A snapshot row handed to `ingest_snapshot`
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub snapshot_date: NaiveDate,
    pub values: BTreeMap<String, SqlValue>,
}

impl SnapshotRecord {
    pub fn new(snapshot_date: NaiveDate) -> Self {
        Self {
            snapshot_date,
            values: BTreeMap::new(),
        }
    }

    pub fn text(mut self, column: &str, value: &str) -> Self {
        self.values
            .insert(column.to_string(), SqlValue::Text(value.to_string()));
        self
    }

    pub fn int(mut self, column: &str, value: i64) -> Self {
        self.values.insert(column.to_string(), SqlValue::Int(value));
        self
    }

    pub fn float(mut self, column: &str, value: f64) -> Self {
        self.values.insert(column.to_string(), SqlValue::Float(value));
        self
    }

    pub fn null(mut self, column: &str) -> Self {
        self.values.insert(column.to_string(), SqlValue::Null);
        self
    }
}

// ============================================================
// DRILL-DOWN
// ============================================================

/// Granularity of a drill-down result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillLevel {
    Zone,
    State,
    Location,
}

impl DrillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrillLevel::Zone => "zone",
            DrillLevel::State => "state",
            DrillLevel::Location => "location",
        }
    }

    /// How many of the report's drill columns are grouped at this level
    pub fn depth(&self) -> usize {
        match self {
            DrillLevel::Zone => 1,
            DrillLevel::State => 2,
            DrillLevel::Location => 3,
        }
    }
}

/// The node being expanded. A `None` value selects rows whose column is NULL,
/// which is how an "Unknown" group is expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrillParent {
    Zone {
        zone: Option<String>,
    },
    State {
        state: Option<String>,
        zone: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrillRequest {
    pub parent: Option<DrillParent>,
    pub filters: FilterSet,
    pub page: PageRequest,
}

impl DrillRequest {
    pub fn root(filters: FilterSet, page: PageRequest) -> Self {
        Self {
            parent: None,
            filters,
            page,
        }
    }

    /// Build from the raw `parent_level` / `parent_value` / `grandparent_value` triple
    pub fn from_parts(
        parent_level: Option<&str>,
        parent_value: Option<&str>,
        grandparent_value: Option<&str>,
        filters: FilterSet,
        page: PageRequest,
    ) -> Result<Self> {
        let non_blank = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let parent = match parent_level.map(str::trim).filter(|l| !l.is_empty()) {
            None => None,
            Some("zone") => Some(DrillParent::Zone {
                zone: non_blank(parent_value),
            }),
            Some("state") => Some(DrillParent::State {
                state: non_blank(parent_value),
                zone: non_blank(grandparent_value),
            }),
            Some(other) => return Err(StoreError::InvalidDrillLevel(other.to_string())),
        };

        Ok(Self {
            parent,
            filters,
            page,
        })
    }

    /// Level the result rows are grouped at
    pub fn level(&self) -> DrillLevel {
        match &self.parent {
            Some(DrillParent::Zone { .. }) => DrillLevel::State,
            Some(DrillParent::State { .. }) => DrillLevel::Location,
            None if self.filters.get("zone").is_none() => DrillLevel::Zone,
            None if self.filters.get("state").is_none() => DrillLevel::State,
            None => DrillLevel::Location,
        }
    }
}

/// One aggregated group in a drill-down
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillRow {
    pub zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub level: DrillLevel,
    pub totals: StatsRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillResult {
    pub level: DrillLevel,
    pub snapshot_date: Option<NaiveDate>,
    pub rows: Page<DrillRow>,
    /// Only present for root (non-expansion) calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsRecord>,
}

// ============================================================
// FILTER OPTIONS
// ============================================================

/// Distinct values per filterable dimension, keyed by the picker name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterOptions {
    pub values: BTreeMap<String, Vec<String>>,
}

impl FilterOptions {
    pub fn get(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ============================================================
// NOTIFICATIONS
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub icon: String,
    pub is_read: bool,
    pub priority: String,
    pub related_order_id: Option<String>,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    #[serde(default, rename = "type")]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub related_order_id: Option<String>,
}

impl NewNotification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn notification_type(&self) -> &str {
        self.notification_type.as_deref().unwrap_or("info")
    }

    pub fn icon(&self) -> &str {
        self.icon.as_deref().unwrap_or("notifications")
    }

    pub fn priority(&self) -> &str {
        self.priority.as_deref().unwrap_or("low")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_coercion() {
        assert_eq!(PageRequest::new(0, 0), PageRequest::new(1, 50));
        assert_eq!(PageRequest::new(-3, 20).page, 1);
        assert_eq!(PageRequest::new(2, 5000).per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::from_raw(Some("abc"), Some("x")), PageRequest::default());
        assert_eq!(PageRequest::from_raw(Some(" 3 "), None).page, 3);
        assert_eq!(PageRequest::new(3, 50).offset(), 100);
    }

    #[test]
    fn test_page_meta() {
        let meta = PageMeta::new(PageRequest::new(4, 50), 200);
        assert_eq!(meta.pages, 4);
        assert!(meta.has_prev);
        assert!(!meta.has_next);

        let meta = PageMeta::new(PageRequest::new(1, 50), 0);
        assert_eq!(meta.pages, 0);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_filter_set_drops_blanks() {
        let filters = FilterSet::from_params([
            ("division", "Retail"),
            ("group", "  "),
            ("search", ""),
            ("page", "2"),
        ]);
        assert_eq!(filters.get("division"), Some("Retail"));
        assert_eq!(filters.get("group"), None);
        assert_eq!(filters.get("page"), None);
        assert!(filters.search().is_none());
    }

    #[test]
    fn test_filter_set_first_value_wins() {
        let filters = FilterSet::from_params([
            ("division", "A"),
            ("division", "B"),
            ("search", "ring"),
            ("search", "chain"),
            ("zone", ""),
            ("zone", "North"),
        ]);
        assert_eq!(filters.get("division"), Some("A"));
        assert_eq!(filters.search(), Some("ring"));
        // A blank first value still claims the key
        assert_eq!(filters.get("zone"), None);
    }

    #[test]
    fn test_drill_level_depth() {
        assert_eq!(DrillLevel::Zone.depth(), 1);
        assert_eq!(DrillLevel::State.depth(), 2);
        assert_eq!(DrillLevel::Location.depth(), 3);
    }

    #[test]
    fn test_drill_request_levels() {
        let page = PageRequest::default();
        let root = DrillRequest::root(FilterSet::new(), page);
        assert_eq!(root.level(), DrillLevel::Zone);

        let legacy = DrillRequest::root(FilterSet::new().with("zone", "APAC"), page);
        assert_eq!(legacy.level(), DrillLevel::State);

        let legacy = DrillRequest::root(
            FilterSet::new().with("zone", "APAC").with("state", "Kerala"),
            page,
        );
        assert_eq!(legacy.level(), DrillLevel::Location);

        let child =
            DrillRequest::from_parts(Some("zone"), Some("APAC"), None, FilterSet::new(), page)
                .unwrap();
        assert_eq!(child.level(), DrillLevel::State);
        assert_eq!(
            child.parent,
            Some(DrillParent::Zone {
                zone: Some("APAC".into())
            })
        );
    }

    #[test]
    fn test_drill_request_rejects_unknown_level() {
        let err = DrillRequest::from_parts(
            Some("country"),
            Some("IN"),
            None,
            FilterSet::new(),
            PageRequest::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDrillLevel(l) if l == "country"));
    }

    #[test]
    fn test_new_notification_defaults() {
        let n = NewNotification::new("Delay", "Order 42 delayed");
        assert_eq!(n.notification_type(), "info");
        assert_eq!(n.icon(), "notifications");
        assert_eq!(n.priority(), "low");
    }
}
