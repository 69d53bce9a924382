//! Filter & Aggregation Engine
//!
//! `DashboardStore` answers every report query through one generic code path:
//! the [`ReportSpec`] of the requested report decides the table, the filter
//! columns, the aggregates and the ordering. Reads are independent of each
//! other; a page render issues stats, footer and rows as separate queries
//! and accepts that they may observe different states of a table that is
//! being written to.
//!
//! ## Snapshot visibility
//!
//! Only rows belonging to the latest `snapshot_date` of a report are ever
//! read. A report with no snapshot at all yields zeroed stats and empty
//! pages, never an error.
//!
//! ## Timeouts
//!
//! `with_query_timeout` bounds every storage round-trip. A timed-out call
//! surfaces as [`StoreError::Timeout`]; nothing is retried.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_query::{
    Alias, Asterisk, Condition, ConditionalStatement, Expr, Func, NullOrdering, Order,
    OrderedStatement, Query, SelectStatement, SimpleExpr,
};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::executor::{SqlExecutor, SqliteExecutor};
use crate::report::{stage_columns, Aggregate, ReportKind, ReportSpec, Rounding, STAGES};
use crate::sql::{col, eq_or_null, ColumnKind, Dialect, SqlValue, Statement};
use crate::types::*;
use crate::{NotificationStore, ReportStore};

/// Placeholder rendered for NULL drill-down group keys
pub const UNKNOWN_GROUP: &str = "Unknown";

const NOTIFICATIONS: &str = "notifications";

/// Report and notification store over any [`SqlExecutor`]
#[derive(Clone)]
pub struct DashboardStore<E> {
    executor: E,
    query_timeout: Option<Duration>,
}

pub type SqliteDashboardStore = DashboardStore<SqliteExecutor>;

#[cfg(feature = "postgres")]
pub type PostgresDashboardStore = DashboardStore<crate::executor::PostgresExecutor>;

impl SqliteDashboardStore {
    /// Open a SQLite database file
    pub async fn new<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Ok(Self::with_executor(SqliteExecutor::new(path).await?))
    }

    /// Connect from a `sqlite:` URL such as `sqlite://snapdash.db`
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::with_executor(SqliteExecutor::connect(url).await?))
    }

    /// Create in-memory database (for testing)
    pub async fn new_in_memory() -> Result<Self> {
        Ok(Self::with_executor(SqliteExecutor::new_in_memory().await?))
    }
}

#[cfg(feature = "postgres")]
impl PostgresDashboardStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        Ok(Self::with_executor(
            crate::executor::PostgresExecutor::new(database_url).await?,
        ))
    }
}

impl<E: SqlExecutor> DashboardStore<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor,
            query_timeout: None,
        }
    }

    /// Bound every storage call by `timeout`
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    fn dialect(&self) -> Dialect {
        self.executor.dialect()
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| StoreError::Timeout(limit))?,
            None => fut.await,
        }
    }

    async fn fetch<S>(&self, statement: S, columns: &[ColumnKind]) -> Result<Vec<Vec<SqlValue>>>
    where
        S: Into<Statement>,
    {
        let statement = statement.into();
        self.timed(self.executor.fetch_all(&statement, columns)).await
    }

    async fn fetch_one<S>(&self, statement: S, columns: &[ColumnKind]) -> Result<Vec<SqlValue>>
    where
        S: Into<Statement>,
    {
        self.fetch(statement, columns)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("aggregate query returned no row".to_string()))
    }

    async fn count(&self, statement: SelectStatement) -> Result<u64> {
        let row = self.fetch_one(statement, &[ColumnKind::Int]).await?;
        Ok(row[0].as_i64().max(0) as u64)
    }

    // ============================================================
    // QUERY FRAGMENTS
    // ============================================================

    fn count_all(&self) -> SimpleExpr {
        self.dialect().cast(Func::count(Expr::col(Asterisk)), ColumnKind::Int)
    }

    /// `snapshot_date = ? AND <dimension filters> AND <search>`
    fn filter_condition(&self, spec: &ReportSpec, date: NaiveDate, filters: &FilterSet) -> Condition {
        let mut cond = Condition::all().add(col("snapshot_date").eq(date));

        for dim in spec.dimensions {
            if let Some(value) = filters.get(dim.param) {
                cond = cond.add(col(dim.column).eq(value));
            }
        }

        if let Some(term) = filters.search() {
            if !spec.search_columns.is_empty() {
                cond = cond.add(self.dialect().search(spec.search_columns, term));
            }
        }

        cond
    }

    fn order_nulls_last(stmt: &mut SelectStatement, columns: &[&str]) {
        for column in columns {
            stmt.order_by_with_nulls(Alias::new(*column), Order::Asc, NullOrdering::Last);
        }
    }

    fn stat_exprs(&self, spec: &ReportSpec) -> (Vec<SimpleExpr>, Vec<ColumnKind>) {
        let dialect = self.dialect();
        spec.stats
            .iter()
            .map(|stat| match stat.aggregate {
                Aggregate::Sum(column) => {
                    let kind = spec.measure_kind(column).unwrap_or(ColumnKind::Float);
                    (dialect.aggregate(Func::sum(col(column)), kind), kind)
                }
                Aggregate::Avg(column) => (
                    dialect.aggregate(Func::avg(col(column)), ColumnKind::Float),
                    ColumnKind::Float,
                ),
                Aggregate::CountDistinct(column) => (
                    dialect.cast(Func::count_distinct(col(column)), ColumnKind::Int),
                    ColumnKind::Int,
                ),
            })
            .unzip()
    }

    fn build_stats(spec: &ReportSpec, values: &[SqlValue]) -> StatsRecord {
        let stats = spec
            .stats
            .iter()
            .enumerate()
            .map(|(i, stat)| {
                let raw = values.get(i).cloned().unwrap_or(SqlValue::Null);
                let value = match (stat.rounding, raw) {
                    (Rounding::Whole, SqlValue::Float(v)) => StatValue::Count(v.round() as i64),
                    (Rounding::Whole, v) => StatValue::Count(v.as_i64()),
                    (Rounding::Truncate, v) => StatValue::Count(v.as_f64().trunc() as i64),
                    (Rounding::Decimals(places), v) => {
                        StatValue::Amount(round_to(v.as_f64(), places))
                    }
                };
                Stat {
                    key: stat.key,
                    value,
                    unit: stat.unit,
                }
            })
            .collect();
        StatsRecord { stats }
    }

    /// All-zero stats for a report with no snapshot
    fn empty_stats(spec: &ReportSpec) -> StatsRecord {
        Self::build_stats(spec, &[])
    }

    // ============================================================
    // DRILL-DOWN
    // ============================================================

    async fn drill_rows(
        &self,
        spec: &ReportSpec,
        date: NaiveDate,
        request: &DrillRequest,
        level: DrillLevel,
    ) -> Result<Page<DrillRow>> {
        let dialect = self.dialect();
        let group_columns = spec
            .drill_columns
            .get(..level.depth())
            .ok_or_else(|| StoreError::InvalidDrillLevel(level.as_str().to_string()))?;
        let (agg_exprs, agg_kinds) = self.stat_exprs(spec);

        // The parent's columns are the leading drill columns of this level
        let mut scope = self.filter_condition(spec, date, &request.filters);
        match &request.parent {
            Some(DrillParent::Zone { zone }) => {
                scope = scope.add(eq_or_null(group_columns[0], zone.as_deref()));
            }
            Some(DrillParent::State { state, zone }) => {
                scope = scope.add(eq_or_null(group_columns[1], state.as_deref()));
                if let Some(zone) = zone {
                    scope = scope.add(col(group_columns[0]).eq(zone.as_str()));
                }
            }
            None => {}
        }
        let group_by = || group_columns.iter().map(|c| Alias::new(*c));

        let grouped = Query::select()
            .columns(group_by())
            .from(Alias::new(spec.table))
            .cond_where(scope.clone())
            .group_by_columns(group_by())
            .to_owned();
        let count = Query::select()
            .expr(self.count_all())
            .from_subquery(grouped, Alias::new("grouped"))
            .to_owned();
        let total = self.count(count).await?;

        let page = request.page;
        if total == 0 || page.offset() >= total {
            return Ok(Page {
                items: Vec::new(),
                meta: PageMeta::new(page, total),
            });
        }

        let mut stmt = Query::select();
        for column in group_columns {
            stmt.expr(dialect.cast(col(column), ColumnKind::Text));
        }
        stmt.exprs(agg_exprs)
            .from(Alias::new(spec.table))
            .cond_where(scope)
            .group_by_columns(group_by());
        Self::order_nulls_last(&mut stmt, group_columns);
        stmt.limit(page.per_page as u64).offset(page.offset());

        let mut kinds = vec![ColumnKind::Text; group_columns.len()];
        kinds.extend(agg_kinds);

        let rows = self.fetch(stmt, &kinds).await?;
        let width = group_columns.len();

        let items = rows
            .into_iter()
            .map(|mut row| {
                let aggregates = row.split_off(width);
                let mut keys = row
                    .into_iter()
                    .map(|v| v.into_text().unwrap_or_else(|| UNKNOWN_GROUP.to_string()));
                DrillRow {
                    zone: keys.next().unwrap_or_else(|| UNKNOWN_GROUP.to_string()),
                    state: keys.next(),
                    location: keys.next(),
                    level,
                    totals: Self::build_stats(spec, &aggregates),
                }
            })
            .collect();

        Ok(Page {
            items,
            meta: PageMeta::new(page, total),
        })
    }

    // ============================================================
    // NOTIFICATIONS
    // ============================================================

    fn notification_from_row(row: Vec<SqlValue>) -> Notification {
        let mut cells = row.into_iter();
        let mut next = || cells.next().unwrap_or(SqlValue::Null);
        Notification {
            id: next().as_i64(),
            title: next().into_text().unwrap_or_default(),
            message: next().into_text().unwrap_or_default(),
            notification_type: next().into_text().unwrap_or_default(),
            icon: next().into_text().unwrap_or_default(),
            is_read: next().as_i64() != 0,
            priority: next().into_text().unwrap_or_default(),
            related_order_id: next().into_text(),
            created_at: next().as_i64(),
        }
    }

    const NOTIFICATION_COLUMNS: [ColumnKind; 9] = [
        ColumnKind::Int,
        ColumnKind::Text,
        ColumnKind::Text,
        ColumnKind::Text,
        ColumnKind::Text,
        ColumnKind::Int,
        ColumnKind::Text,
        ColumnKind::Text,
        ColumnKind::Int,
    ];

    fn notification_select(&self) -> SelectStatement {
        let dialect = self.dialect();
        // BOOLEAN on Postgres, 0/1 on SQLite
        let is_read = Expr::case(col("is_read").eq(true), 1).finally(0);

        Query::select()
            .expr(dialect.cast(col("id"), ColumnKind::Int))
            .exprs([
                col("title"),
                col("message"),
                col("notification_type"),
                col("icon"),
            ])
            .expr(dialect.cast(is_read, ColumnKind::Int))
            .exprs([col("priority"), col("related_order_id")])
            .expr(dialect.cast(col("created_at_ms"), ColumnKind::Int))
            .from(Alias::new(NOTIFICATIONS))
            .to_owned()
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

fn parse_date(value: SqlValue) -> Result<Option<NaiveDate>> {
    match value.into_text() {
        // Postgres may render timestamps; only the date part matters
        Some(text) => Ok(Some(NaiveDate::parse_from_str(
            text.get(..10).unwrap_or(&text),
            "%Y-%m-%d",
        )?)),
        None => Ok(None),
    }
}

#[async_trait]
impl<E: SqlExecutor> ReportStore for DashboardStore<E> {
    async fn latest_snapshot_date(&self, kind: ReportKind) -> Result<Option<NaiveDate>> {
        let spec = kind.spec();
        let stmt = Query::select()
            .expr(self.dialect().cast(Func::max(col("snapshot_date")), ColumnKind::Text))
            .from(Alias::new(spec.table))
            .to_owned();

        let row = self.fetch_one(stmt, &[ColumnKind::Text]).await?;
        parse_date(row.into_iter().next().unwrap_or(SqlValue::Null))
    }

    async fn compute_stats(
        &self,
        kind: ReportKind,
        date: Option<NaiveDate>,
        filters: &FilterSet,
    ) -> Result<StatsRecord> {
        let spec = kind.spec();
        let Some(date) = date else {
            return Ok(Self::empty_stats(spec));
        };

        let (exprs, kinds) = self.stat_exprs(spec);
        let stmt = Query::select()
            .exprs(exprs)
            .from(Alias::new(spec.table))
            .cond_where(self.filter_condition(spec, date, filters))
            .to_owned();

        let row = self.fetch_one(stmt, &kinds).await?;
        Ok(Self::build_stats(spec, &row))
    }

    async fn compute_footer_totals(
        &self,
        kind: ReportKind,
        date: Option<NaiveDate>,
        filters: &FilterSet,
    ) -> Result<FooterTotals> {
        let spec = kind.spec();
        let Some(date) = date else {
            return Ok(FooterTotals::default());
        };
        if !spec.has_stages && spec.footer_total.is_none() {
            return Ok(FooterTotals::default());
        }

        let dialect = self.dialect();
        let mut exprs = Vec::with_capacity(8);
        if spec.has_stages {
            for stage in STAGES {
                let (completed, pending) = stage_columns(stage);
                let both = col(&completed).add(col(&pending));
                exprs.push(dialect.aggregate(Func::sum(both), ColumnKind::Int));
            }
        }
        if let Some(total) = spec.footer_total {
            exprs.push(dialect.aggregate(Func::sum(col(total)), ColumnKind::Int));
        }

        let kinds = vec![ColumnKind::Int; exprs.len()];
        let stmt = Query::select()
            .exprs(exprs)
            .from(Alias::new(spec.table))
            .cond_where(self.filter_condition(spec, date, filters))
            .to_owned();

        let row = self.fetch_one(stmt, &kinds).await?;
        let mut values = row.iter().map(SqlValue::as_i64);

        let mut stages = [0i64; 7];
        if spec.has_stages {
            for slot in stages.iter_mut() {
                *slot = values.next().unwrap_or(0);
            }
        }
        let total = values.next().unwrap_or(0);

        Ok(FooterTotals::from_stages(stages, total))
    }

    async fn list_rows(
        &self,
        kind: ReportKind,
        date: Option<NaiveDate>,
        filters: &FilterSet,
        page: PageRequest,
    ) -> Result<Page<ReportRow>> {
        let spec = kind.spec();
        let Some(date) = date else {
            return Ok(Page::empty(page));
        };
        let dialect = self.dialect();
        let filter = self.filter_condition(spec, date, filters);

        let count = Query::select()
            .expr(self.count_all())
            .from(Alias::new(spec.table))
            .cond_where(filter.clone())
            .to_owned();
        let total = self.count(count).await?;

        // Past the last page: empty, not an error
        if page.offset() >= total {
            return Ok(Page {
                items: Vec::new(),
                meta: PageMeta::new(page, total),
            });
        }

        let columns = spec.row_columns();
        let kinds = columns.iter().map(|(_, kind)| *kind).collect::<Vec<_>>();

        let mut order = spec.order_by.to_vec();
        if !order.contains(&spec.id_column) {
            order.push(spec.id_column);
        }

        let mut stmt = Query::select();
        stmt.exprs(
            columns
                .iter()
                .map(|(column, kind)| dialect.cast(col(column), *kind)),
        )
        .from(Alias::new(spec.table))
        .cond_where(filter);
        Self::order_nulls_last(&mut stmt, &order);
        stmt.limit(page.per_page as u64).offset(page.offset());

        let rows = self.fetch(stmt, &kinds).await?;

        let items = rows
            .into_iter()
            .map(|row| {
                let cells: BTreeMap<String, SqlValue> = columns
                    .iter()
                    .map(|(name, _)| name.clone())
                    .zip(row)
                    .collect();
                let stages = if spec.has_stages {
                    STAGES
                        .iter()
                        .map(|&stage| {
                            let (completed, pending) = stage_columns(stage);
                            StagePair {
                                stage,
                                completed: cells.get(&completed).map_or(0, SqlValue::as_i64),
                                pending: cells.get(&pending).map_or(0, SqlValue::as_i64),
                            }
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                ReportRow { cells, stages }
            })
            .collect();

        Ok(Page {
            items,
            meta: PageMeta::new(page, total),
        })
    }

    async fn drill_down(&self, request: &DrillRequest) -> Result<DrillResult> {
        let spec = ReportKind::LocationStock.spec();
        let level = request.level();
        let date = self.latest_snapshot_date(spec.kind).await?;
        let is_root = request.parent.is_none();

        let Some(date) = date else {
            return Ok(DrillResult {
                level,
                snapshot_date: None,
                rows: Page::empty(request.page),
                stats: is_root.then(|| Self::empty_stats(spec)),
            });
        };

        let rows = self.drill_rows(spec, date, request, level).await?;
        let stats = if is_root {
            Some(self.compute_stats(spec.kind, Some(date), &request.filters).await?)
        } else {
            None
        };

        tracing::debug!(
            level = level.as_str(),
            groups = rows.meta.total,
            "drill-down evaluated"
        );

        Ok(DrillResult {
            level,
            snapshot_date: Some(date),
            rows,
            stats,
        })
    }

    async fn filter_options(&self, kind: ReportKind, scope: &FilterSet) -> Result<FilterOptions> {
        let spec = kind.spec();
        let dialect = self.dialect();
        let mut values = BTreeMap::new();

        for dim in spec.dimensions {
            let mut stmt = Query::select();
            stmt.distinct()
                .expr_as(dialect.cast(col(dim.column), ColumnKind::Text), Alias::new("value"))
                .from(Alias::new(spec.table))
                .and_where(col(dim.column).is_not_null())
                .and_where(col(dim.column).ne(""));

            // Cascading pickers: states follow the zone, locations follow the state (or zone)
            if kind == ReportKind::LocationStock {
                let parent = match dim.column {
                    "state" => scope.get("zone").map(|z| ("zone", z)),
                    "location" => scope
                        .get("state")
                        .map(|s| ("state", s))
                        .or_else(|| scope.get("zone").map(|z| ("zone", z))),
                    _ => None,
                };
                if let Some((column, value)) = parent {
                    stmt.and_where(col(column).eq(value));
                }
            }

            stmt.order_by(Alias::new("value"), Order::Asc);

            let rows = self.fetch(stmt, &[ColumnKind::Text]).await?;
            let distinct = rows
                .into_iter()
                .filter_map(|row| row.into_iter().next().and_then(SqlValue::into_text))
                .collect::<Vec<_>>();
            values.insert(dim.option_key.to_string(), distinct);
        }

        Ok(FilterOptions { values })
    }

    async fn ingest_snapshot(&self, kind: ReportKind, records: &[SnapshotRecord]) -> Result<u64> {
        let spec = kind.spec();

        let mut statements = Vec::with_capacity(records.len());
        for record in records {
            if let Some(column) = record.values.keys().find(|c| !spec.is_writable(c)) {
                return Err(StoreError::UnknownColumn {
                    report: spec.slug,
                    column: column.clone(),
                });
            }

            let columns = std::iter::once("snapshot_date")
                .chain(record.values.keys().map(String::as_str))
                .map(Alias::new);
            let values = std::iter::once(SimpleExpr::from(record.snapshot_date))
                .chain(record.values.values().cloned().map(SqlValue::into_expr));

            statements.push(
                Query::insert()
                    .into_table(Alias::new(spec.table))
                    .columns(columns)
                    .values(values)?
                    .to_owned(),
            );
        }

        let inserted = self.timed(self.executor.execute_batch(&statements)).await?;
        tracing::info!(report = spec.slug, rows = inserted, "snapshot ingested");
        Ok(inserted)
    }
}

#[async_trait]
impl<E: SqlExecutor> NotificationStore for DashboardStore<E> {
    async fn create_notification(&self, notification: NewNotification) -> Result<Notification> {
        let now = Self::now_ms();
        let related = notification
            .related_order_id
            .clone()
            .map_or(SqlValue::Null, SqlValue::Text);

        let columns = [
            "title",
            "message",
            "notification_type",
            "icon",
            "is_read",
            "priority",
            "related_order_id",
            "created_at_ms",
        ];
        let values: [SimpleExpr; 8] = [
            notification.title.clone().into(),
            notification.message.clone().into(),
            notification.notification_type().into(),
            notification.icon().into(),
            false.into(),
            notification.priority().into(),
            related.into_expr(),
            now.into(),
        ];

        let stmt = Query::insert()
            .into_table(Alias::new(NOTIFICATIONS))
            .columns(columns.map(Alias::new))
            .values(values)?
            .returning_col(Alias::new("id"))
            .to_owned();

        let row = self.fetch_one(stmt, &[ColumnKind::Int]).await?;

        Ok(Notification {
            id: row[0].as_i64(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            notification_type: notification.notification_type().to_string(),
            icon: notification.icon().to_string(),
            is_read: false,
            priority: notification.priority().to_string(),
            related_order_id: notification.related_order_id.clone(),
            created_at: now,
        })
    }

    async fn recent_notifications(&self, limit: u32) -> Result<Vec<Notification>> {
        let stmt = self
            .notification_select()
            .order_by(Alias::new("created_at_ms"), Order::Desc)
            .order_by(Alias::new("id"), Order::Desc)
            .limit(limit as u64)
            .to_owned();

        let rows = self.fetch(stmt, &Self::NOTIFICATION_COLUMNS).await?;
        Ok(rows.into_iter().map(Self::notification_from_row).collect())
    }

    async fn unread_notification_count(&self) -> Result<i64> {
        let stmt = Query::select()
            .expr(self.count_all())
            .from(Alias::new(NOTIFICATIONS))
            .and_where(col("is_read").eq(false))
            .to_owned();
        Ok(self.count(stmt).await? as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.3456, 3), 12.346);
        assert_eq!(round_to(87.25, 1), 87.3);
        assert_eq!(round_to(0.0, 1), 0.0);
    }

    #[test]
    fn test_build_stats_rounding() {
        let spec = ReportKind::OrderStatus.spec();
        let values = vec![
            SqlValue::Int(100),
            SqlValue::Int(40),
            SqlValue::Int(50),
            SqlValue::Int(10),
            SqlValue::Int(7),
            SqlValue::Float(91.26),
            SqlValue::Float(4.44),
            SqlValue::Float(88.9),
        ];
        let stats = SqliteDashboardStore::build_stats(spec, &values);
        assert_eq!(stats.get("total_orders"), Some(StatValue::Count(100)));
        assert_eq!(stats.get("sla_index"), Some(StatValue::Amount(91.3)));
        assert_eq!(stats.get("quality_score"), Some(StatValue::Amount(4.4)));
        assert_eq!(stats.get("fulfillment"), Some(StatValue::Count(88)));
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let stats = SqliteDashboardStore::empty_stats(ReportKind::ShortStatus.spec());
        assert_eq!(stats.stats.len(), 4);
        assert!(stats.stats.iter().all(|s| s.value.as_f64() == 0.0));
    }

    #[tokio::test]
    async fn test_drill_groups_follow_report_drill_columns() {
        let store = SqliteDashboardStore::new_in_memory().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let request = DrillRequest::root(FilterSet::new(), PageRequest::default());

        // Order status has no drill hierarchy
        let err = store
            .drill_rows(ReportKind::OrderStatus.spec(), date, &request, DrillLevel::Zone)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDrillLevel(_)));

        let page = store
            .drill_rows(ReportKind::LocationStock.spec(), date, &request, DrillLevel::Location)
            .await
            .unwrap();
        assert_eq!(page.meta.total, 0);
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date(SqlValue::Text("2024-05-01".into())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(parse_date(SqlValue::Null).unwrap(), None);
        assert!(parse_date(SqlValue::Text("garbage".into())).is_err());
    }
}
