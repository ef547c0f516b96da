//! Local relational adapter backed by SQLite.
//!
//! Implements [`RelationalStore`] over a `sqlx` pool for development and the
//! integration test suite. Filters are translated to SQL with
//! `QueryBuilder`; result rows come back as JSON objects keyed by column
//! name, so the adapter stays schema-agnostic apart from the bootstrap DDL.

use super::{Clause, Filter, RelationalStore, StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{
    Column, QueryBuilder, Row, SqlitePool, TypeInfo,
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};
use std::{str::FromStr, sync::Arc, time::Duration};
use tracing::debug;

/// Embedded bootstrap schema, executed statement by statement.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS car (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    brand TEXT NOT NULL,
    model TEXT NOT NULL,
    year INTEGER,
    price REAL,
    mileage REAL,
    fuel TEXT,
    transmission TEXT,
    color TEXT,
    vin TEXT,
    location TEXT,
    description TEXT,
    status TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_car_user ON car (user_id);

CREATE TABLE IF NOT EXISTS favorites (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    car_id TEXT NOT NULL,
    UNIQUE (user_id, car_id)
);

CREATE INDEX IF NOT EXISTS idx_favorites_user ON favorites (user_id)
"#;

const MAX_IDENTIFIER_LEN: usize = 64;

/// SQLite-backed [`RelationalStore`].
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<SqlitePool>,
}

impl SqliteStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Connect to `database_url`, creating the database file if missing.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self::new(Arc::new(db)))
    }

    /// In-memory store for tests. A single pooled connection that never
    /// retires, since each SQLite memory connection is its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self::new(Arc::new(db)))
    }

    /// Run the embedded bootstrap DDL. Idempotent.
    pub async fn init_schema(&self) -> StoreResult<()> {
        let statements = SCHEMA_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        debug!("running {} schema statements", statements.len());
        for stmt in statements {
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RelationalStore for SqliteStore {
    async fn select(&self, table: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        ensure_identifier(table)?;

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM ");
        builder.push(table);
        push_filter(&mut builder, filter)?;

        let rows = builder.build().fetch_all(&*self.db).await?;
        rows.iter().map(row_to_json).collect()
    }

    async fn insert(&self, table: &str, row: Value) -> StoreResult<Vec<Value>> {
        ensure_identifier(table)?;

        let Value::Object(mut fields) = row else {
            return Err(StoreError::Backend(
                "insert row must be a JSON object".into(),
            ));
        };

        // The store assigns opaque ids.
        if !fields.contains_key("id") {
            fields.insert("id".into(), Value::from(uuid::Uuid::new_v4().to_string()));
        }

        for column in fields.keys() {
            ensure_identifier(column)?;
        }

        let mut builder = QueryBuilder::<Sqlite>::new("INSERT INTO ");
        builder.push(table).push(" (");
        {
            let mut separated = builder.separated(", ");
            for column in fields.keys() {
                separated.push(column.as_str());
            }
        }
        builder.push(") VALUES (");
        for (i, value) in fields.values().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            push_scalar(&mut builder, value)?;
        }
        builder.push(") RETURNING *");

        let rows = builder
            .build()
            .fetch_all(&*self.db)
            .await
            .map_err(map_constraint)?;
        debug!(table, "inserted {} row(s)", rows.len());
        rows.iter().map(row_to_json).collect()
    }

    async fn delete(&self, table: &str, filter: &Filter) -> StoreResult<u64> {
        ensure_identifier(table)?;

        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM ");
        builder.push(table);
        push_filter(&mut builder, filter)?;

        let result = builder.build().execute(&*self.db).await?;
        Ok(result.rows_affected())
    }
}

/// Reject anything that is not a bare SQL identifier. Table and column names
/// are interpolated, not bound, so they must be locked down.
fn ensure_identifier(name: &str) -> StoreResult<()> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some('a'..='z' | 'A'..='Z' | '_'));
    let tail_ok = chars.all(|c| matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_'));
    if !head_ok || !tail_ok || name.len() > MAX_IDENTIFIER_LEN {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) -> StoreResult<()> {
    if !filter.clauses.is_empty() {
        builder.push(" WHERE ");
        for (i, clause) in filter.clauses.iter().enumerate() {
            if i > 0 {
                builder.push(" AND ");
            }
            match clause {
                Clause::Eq(column, value) => {
                    ensure_identifier(column)?;
                    builder.push(column).push(" = ");
                    push_scalar(builder, value)?;
                }
                Clause::InSet(column, values) => {
                    ensure_identifier(column)?;
                    if values.is_empty() {
                        // IN () is not valid SQL; an empty set matches nothing.
                        builder.push("1 = 0");
                        continue;
                    }
                    builder.push(column).push(" IN (");
                    for (j, value) in values.iter().enumerate() {
                        if j > 0 {
                            builder.push(", ");
                        }
                        push_scalar(builder, value)?;
                    }
                    builder.push(")");
                }
            }
        }
    }

    match (filter.limit, filter.offset) {
        (Some(limit), offset) => {
            builder.push(" LIMIT ").push_bind(limit as i64);
            if let Some(offset) = offset {
                builder.push(" OFFSET ").push_bind(offset as i64);
            }
        }
        (None, Some(offset)) => {
            // SQLite requires a LIMIT clause before OFFSET; -1 means unbounded.
            builder.push(" LIMIT -1 OFFSET ").push_bind(offset as i64);
        }
        (None, None) => {}
    }

    Ok(())
}

fn push_scalar(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) -> StoreResult<()> {
    match value {
        Value::Null => {
            builder.push_bind(Option::<String>::None);
        }
        Value::Bool(b) => {
            builder.push_bind(*b);
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                builder.push_bind(i);
            } else if let Some(f) = n.as_f64() {
                builder.push_bind(f);
            } else {
                return Err(StoreError::Backend(format!(
                    "unsupported numeric value {n}"
                )));
            }
        }
        Value::String(s) => {
            builder.push_bind(s.clone());
        }
        other => {
            return Err(StoreError::Backend(format!(
                "unsupported scalar in row or filter: {other}"
            )));
        }
    }
    Ok(())
}

/// Convert one SQLite row into a JSON object using the declared column types.
fn row_to_json(row: &SqliteRow) -> StoreResult<Value> {
    let mut object = Map::new();
    for column in row.columns() {
        let ordinal = column.ordinal();
        let value = match column.type_info().name() {
            "INTEGER" => row
                .try_get::<Option<i64>, _>(ordinal)?
                .map_or(Value::Null, Value::from),
            "REAL" => row
                .try_get::<Option<f64>, _>(ordinal)?
                .map_or(Value::Null, Value::from),
            "BOOLEAN" => row
                .try_get::<Option<bool>, _>(ordinal)?
                .map_or(Value::Null, Value::from),
            _ => row
                .try_get::<Option<String>, _>(ordinal)?
                .map_or(Value::Null, Value::from),
        };
        object.insert(column.name().to_string(), value);
    }
    Ok(Value::Object(object))
}

/// Map unique-constraint failures to their own variant so callers can tell
/// conflicts from transport faults.
fn map_constraint(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err)
            if db_err.message().to_ascii_lowercase().contains("unique") =>
        {
            StoreError::UniqueViolation(db_err.message().to_string())
        }
        _ => StoreError::Sqlx(err),
    }
}
