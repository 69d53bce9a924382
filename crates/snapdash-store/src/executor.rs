//! Storage Executors
//!
//! `SqlExecutor` is the seam between the report engine and a concrete
//! database. The engine hands an executor a sea-query [`Statement`] plus the
//! expected column kinds; each executor renders it with its own query
//! builder, binds the values through `sea-query-binder` and decodes cells.

use async_trait::async_trait;
use sea_query::{InsertStatement, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;
use crate::sql::{ColumnKind, Dialect, SqlValue, Statement};

#[async_trait]
pub trait SqlExecutor: Send + Sync + 'static {
    fn dialect(&self) -> Dialect;

    /// Run a statement and decode every returned row according to `columns`
    async fn fetch_all(&self, statement: &Statement, columns: &[ColumnKind]) -> Result<Vec<Vec<SqlValue>>>;

    /// Run inserts in one transaction, returning the number of affected rows
    async fn execute_batch(&self, statements: &[InsertStatement]) -> Result<u64>;
}

// ============================================================
// SQLITE
// ============================================================

/// SQLite executor (default backend)
#[derive(Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Open (or create) a database file and apply migrations
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::connect(&format!("sqlite://{}", path.as_ref().display())).await
    }

    /// Connect from a `sqlite:` URL
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .with_regexp();

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create in-memory database (for testing)
    ///
    /// Every pooled connection to `sqlite::memory:` would get its own empty
    /// database, so the pool is pinned to one connection that never expires.
    pub async fn new_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.with_regexp();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decode_sqlite(row: &SqliteRow, columns: &[ColumnKind]) -> Result<Vec<SqlValue>> {
    let mut values = Vec::with_capacity(columns.len());
    for (idx, kind) in columns.iter().enumerate() {
        let value = match kind {
            ColumnKind::Int => row.try_get::<Option<i64>, _>(idx)?.map(SqlValue::Int),
            ColumnKind::Float => row.try_get::<Option<f64>, _>(idx)?.map(SqlValue::Float),
            ColumnKind::Text => row.try_get::<Option<String>, _>(idx)?.map(SqlValue::Text),
        };
        values.push(value.unwrap_or(SqlValue::Null));
    }
    Ok(values)
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_all(&self, statement: &Statement, columns: &[ColumnKind]) -> Result<Vec<Vec<SqlValue>>> {
        let (sql, values) = statement.build(SqliteQueryBuilder);
        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;

        rows.iter().map(|row| decode_sqlite(row, columns)).collect()
    }

    async fn execute_batch(&self, statements: &[InsertStatement]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;

        for statement in statements {
            let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
            let result = sqlx::query_with(&sql, values).execute(&mut *tx).await?;
            affected += result.rows_affected();
        }

        tx.commit().await?;
        Ok(affected)
    }
}

// ============================================================
// POSTGRES
// ============================================================

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresExecutor;

#[cfg(feature = "postgres")]
mod postgres {
    use super::*;
    use sea_query::PostgresQueryBuilder;
    use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};

    /// PostgreSQL executor for multi-instance deployments
    #[derive(Clone)]
    pub struct PostgresExecutor {
        pool: PgPool,
    }

    impl PostgresExecutor {
        pub async fn new(database_url: &str) -> Result<Self> {
            let pool = PgPoolOptions::new()
                .max_connections(20)
                .connect(database_url)
                .await?;

            sqlx::migrate!("./migrations-postgres").run(&pool).await?;

            Ok(Self { pool })
        }

        pub fn pool(&self) -> &PgPool {
            &self.pool
        }
    }

    fn decode_pg(row: &PgRow, columns: &[ColumnKind]) -> Result<Vec<SqlValue>> {
        let mut values = Vec::with_capacity(columns.len());
        for (idx, kind) in columns.iter().enumerate() {
            let value = match kind {
                ColumnKind::Int => row.try_get::<Option<i64>, _>(idx)?.map(SqlValue::Int),
                ColumnKind::Float => row.try_get::<Option<f64>, _>(idx)?.map(SqlValue::Float),
                ColumnKind::Text => row.try_get::<Option<String>, _>(idx)?.map(SqlValue::Text),
            };
            values.push(value.unwrap_or(SqlValue::Null));
        }
        Ok(values)
    }

    #[async_trait]
    impl SqlExecutor for PostgresExecutor {
        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        async fn fetch_all(
            &self,
            statement: &Statement,
            columns: &[ColumnKind],
        ) -> Result<Vec<Vec<SqlValue>>> {
            let (sql, values) = statement.build(PostgresQueryBuilder);
            let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;

            rows.iter().map(|row| decode_pg(row, columns)).collect()
        }

        async fn execute_batch(&self, statements: &[InsertStatement]) -> Result<u64> {
            let mut tx = self.pool.begin().await?;
            let mut affected = 0;

            for statement in statements {
                let (sql, values) = statement.build_sqlx(PostgresQueryBuilder);
                let result = sqlx::query_with(&sql, values).execute(&mut *tx).await?;
                affected += result.rows_affected();
            }

            tx.commit().await?;
            Ok(affected)
        }
    }
}
