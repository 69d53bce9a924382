//! Snapdash Store
//!
//! Read-side access to the report snapshot tables plus the small amount of
//! write-side state the dashboard owns (notifications).
//!
//! ## Architecture
//!
//! ```text
//! HTTP handler
//!     │
//!     ▼
//! ReportStore / NotificationStore      (traits, object-safe)
//!     │
//!     ▼
//! DashboardStore<E: SqlExecutor>       (one generic engine, driven by ReportSpec)
//!     │
//!     ├── SqliteExecutor               (default, embedded)
//!     └── PostgresExecutor             (feature = "postgres")
//! ```
//!
//! ## Reports
//!
//! | Kind | Table |
//! |------|-------|
//! | OrderStatus | order_status_report_snapshot |
//! | LocationWiseOrder | location_wise_order_snapshot |
//! | ShortStatus | short_status_report_snapshot |
//! | ProvisionStatus | order_provision_summary_report_snapshot |
//! | LocationStock | location_wise_stock_snapshot |
//!
//! Snapshot tables are filled by external batch jobs through
//! [`ReportStore::ingest_snapshot`]; every read only sees the latest
//! `snapshot_date` of its table.
//!
//! ## Example
//!
//! ```ignore
//! use snapdash_store::{FilterSet, PageRequest, ReportKind, ReportStore, SqliteDashboardStore};
//!
//! let store = SqliteDashboardStore::new_in_memory().await?;
//! let date = store.latest_snapshot_date(ReportKind::OrderStatus).await?;
//! let filters = FilterSet::new().with("division", "Retail");
//! let page = store
//!     .list_rows(ReportKind::OrderStatus, date, &filters, PageRequest::default())
//!     .await?;
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

pub mod engine;
pub mod error;
pub mod executor;
pub mod report;
pub mod sql;
pub mod types;

pub use engine::{DashboardStore, SqliteDashboardStore, UNKNOWN_GROUP};
pub use error::{Result, StoreError};
pub use executor::{SqlExecutor, SqliteExecutor};
pub use report::{ReportKind, ReportSpec};
pub use types::*;

#[cfg(feature = "postgres")]
pub use engine::PostgresDashboardStore;
#[cfg(feature = "postgres")]
pub use executor::PostgresExecutor;

/// Report queries over snapshot tables
#[async_trait]
pub trait ReportStore: Send + Sync {
    // ============================================================
    // SNAPSHOTS
    // ============================================================

    /// Most recent `snapshot_date` in the report's table, `None` if empty
    async fn latest_snapshot_date(&self, kind: ReportKind) -> Result<Option<NaiveDate>>;

    /// Bulk-insert one batch of snapshot rows in a single transaction
    async fn ingest_snapshot(&self, kind: ReportKind, records: &[SnapshotRecord]) -> Result<u64>;

    // ============================================================
    // AGGREGATES
    // ============================================================

    /// Global statistics over the filtered rows of `date`
    async fn compute_stats(
        &self,
        kind: ReportKind,
        date: Option<NaiveDate>,
        filters: &FilterSet,
    ) -> Result<StatsRecord>;

    /// Stage A-G (completed + pending) sums and the total count
    async fn compute_footer_totals(
        &self,
        kind: ReportKind,
        date: Option<NaiveDate>,
        filters: &FilterSet,
    ) -> Result<FooterTotals>;

    // ============================================================
    // LISTINGS
    // ============================================================

    /// One page of filtered rows in a deterministic order
    async fn list_rows(
        &self,
        kind: ReportKind,
        date: Option<NaiveDate>,
        filters: &FilterSet,
        page: PageRequest,
    ) -> Result<Page<ReportRow>>;

    /// Zone → state → location re-aggregation of the location stock report
    async fn drill_down(&self, request: &DrillRequest) -> Result<DrillResult>;

    /// Distinct non-empty values of every filterable dimension
    async fn filter_options(&self, kind: ReportKind, scope: &FilterSet) -> Result<FilterOptions>;
}

/// Persisted dashboard notifications
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(&self, notification: NewNotification) -> Result<Notification>;

    /// Newest first
    async fn recent_notifications(&self, limit: u32) -> Result<Vec<Notification>>;

    async fn unread_notification_count(&self) -> Result<i64>;
}
