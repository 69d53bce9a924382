//! Statement building on sea-query
//!
//! Report queries are assembled at runtime from a [`ReportSpec`](crate::ReportSpec),
//! so they cannot use the compile-time `sqlx::query!` macros. The engine
//! builds sea-query statements and each executor renders them for its own
//! backend. Only static column names from the report catalog become
//! identifiers; filter values and search terms are always bound.

use sea_query::{
    Alias, BinOper, Condition, Expr, Func, InsertStatement, Keyword, QueryBuilder,
    SelectStatement, SimpleExpr, Value,
};
use sea_query_binder::{SqlxBinder, SqlxValues};
use serde::Serialize;

/// SQL flavour of the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    fn type_name(&self, kind: ColumnKind) -> &'static str {
        match (self, kind) {
            (Dialect::Sqlite, ColumnKind::Int) => "INTEGER",
            (Dialect::Sqlite, ColumnKind::Float) => "REAL",
            (Dialect::Postgres, ColumnKind::Int) => "BIGINT",
            (Dialect::Postgres, ColumnKind::Float) => "DOUBLE PRECISION",
            (_, ColumnKind::Text) => "TEXT",
        }
    }

    /// Cast an expression to the portable type used for decoding `kind`
    pub fn cast<E: Into<SimpleExpr>>(&self, expr: E, kind: ColumnKind) -> SimpleExpr {
        Func::cast_as(expr, Alias::new(self.type_name(kind))).into()
    }

    /// Aggregate expression that never yields NULL
    pub fn aggregate<E: Into<SimpleExpr>>(&self, agg: E, kind: ColumnKind) -> SimpleExpr {
        self.cast(Func::coalesce([agg.into(), Expr::val(0).into()]), kind)
    }

    /// Regex match operator. SQLite's `REGEXP` is backed by the function the
    /// executor registers on every connection.
    fn regex_operator(&self) -> BinOper {
        match self {
            Dialect::Sqlite => BinOper::Custom("REGEXP"),
            Dialect::Postgres => BinOper::Custom("~"),
        }
    }

    /// Case-insensitive literal substring match of `term` against any of
    /// `columns`. Case folding is Unicode-aware on both backends.
    pub fn search(&self, columns: &[&str], term: &str) -> Condition {
        let pattern = search_pattern(term);
        columns.iter().fold(Condition::any(), |cond, column| {
            cond.add(col(column).binary(self.regex_operator(), pattern.clone()))
        })
    }
}

/// `(?i)` plus the escaped term; both regex engines accept this form
pub fn search_pattern(term: &str) -> String {
    format!("(?i){}", regex::escape(term))
}

/// Column reference by catalog name
pub fn col(name: &str) -> Expr {
    Expr::col(Alias::new(name))
}

/// `column = value`, or `column IS NULL` when there is no value
pub fn eq_or_null(column: &str, value: Option<&str>) -> SimpleExpr {
    match value {
        Some(v) => col(column).eq(v),
        None => col(column).is_null(),
    }
}

/// How a selected column is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
}

/// A decoded cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl SqlValue {
    pub fn as_i64(&self) -> i64 {
        match self {
            SqlValue::Int(v) => *v,
            SqlValue::Float(v) => *v as i64,
            _ => 0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            SqlValue::Int(v) => *v as f64,
            SqlValue::Float(v) => *v,
            _ => 0.0,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Insert value. `Null` becomes the `NULL` keyword rather than a typed
    /// parameter so it adopts the target column's type.
    pub fn into_expr(self) -> SimpleExpr {
        match self {
            SqlValue::Int(v) => Value::from(v).into(),
            SqlValue::Float(v) => Value::from(v).into(),
            SqlValue::Text(s) => Value::from(s).into(),
            SqlValue::Null => SimpleExpr::Keyword(Keyword::Null),
        }
    }
}

/// A statement an executor can run and read rows back from
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
}

impl Statement {
    /// Render SQL and its bound values for one backend
    pub fn build<B: QueryBuilder>(&self, builder: B) -> (String, SqlxValues) {
        match self {
            Statement::Select(stmt) => stmt.build_sqlx(builder),
            Statement::Insert(stmt) => stmt.build_sqlx(builder),
        }
    }
}

impl From<SelectStatement> for Statement {
    fn from(stmt: SelectStatement) -> Self {
        Statement::Select(stmt)
    }
}

impl From<InsertStatement> for Statement {
    fn from(stmt: InsertStatement) -> Self {
        Statement::Insert(stmt)
    }
}
