//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient` trait
//! for SQLite databases using sqlx.

use crate::db::classify::{classify_statement_shape, StatementShape};
use crate::db::{DatabaseBackend, DatabaseClient, QueryResult, Row, Value};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use sqlparser::dialect::SQLiteDialect;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// Maximum pooled connections for file-backed databases.
const MAX_CONNECTIONS: u32 = 5;

/// SQLite database client.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens a SQLite database from a connection URL.
    ///
    /// Accepts `sqlite::memory:`, `sqlite://path` and the triple-slash form
    /// `sqlite:///./relative.db` / `sqlite:////abs/path.db`.
    pub async fn connect(url: &str) -> Result<Self> {
        match sqlite_file_path(url)? {
            Some(path) => Self::open_file(&path).await,
            None => Self::open_in_memory().await,
        }
    }

    /// Opens (creating if needed) a database file.
    pub async fn open_file(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                ChatError::connection(format!(
                    "Cannot open SQLite database {}: {e}",
                    path.display()
                ))
            })?;

        debug!(path = %path.display(), "Opened SQLite database");
        Ok(Self { pool })
    }

    /// Opens a private in-memory database.
    ///
    /// Every pooled connection would get its own memory database, so the pool
    /// is pinned to a single connection that never expires.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| ChatError::connection(format!("Cannot open in-memory SQLite: {e}")))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        let shape = classify_statement_shape(sql, &SQLiteDialect {});

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ChatError::query(format!("Failed to begin transaction: {e}")))?;

        let fetch = match shape {
            StatementShape::Unparsed => describes_rows(&mut tx, sql).await,
            known => known.fetches_rows(),
        };

        let result = if fetch {
            let rows = sqlx::query(sql)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| ChatError::query(format_query_error(e)))?;
            QueryResult::Rows(rows.iter().map(convert_row).collect())
        } else {
            let done = sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| ChatError::query(format_query_error(e)))?;
            QueryResult::Affected {
                rows_affected: done.rows_affected(),
            }
        };

        tx.commit()
            .await
            .map_err(|e| ChatError::query(format!("Failed to commit transaction: {e}")))?;

        debug!(
            ?shape,
            rows = result.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "SQLite statement executed"
        );

        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Resolves the on-disk path of a SQLite URL, or `None` for an in-memory database.
pub fn sqlite_file_path(url: &str) -> Result<Option<PathBuf>> {
    let rest = url
        .strip_prefix("sqlite:")
        .ok_or_else(|| ChatError::config(format!("Not a SQLite URL: {url}")))?;

    let rest = rest.split('?').next().unwrap_or_default();

    if rest.contains(":memory:") {
        return Ok(None);
    }

    // `sqlite:///x` is relative and `sqlite:////x` absolute, as in SQLAlchemy URLs.
    let path = match rest.strip_prefix("//") {
        Some(after) => after.strip_prefix('/').unwrap_or(after),
        None => rest,
    };

    if path.is_empty() {
        return Err(ChatError::config(format!(
            "SQLite URL has no database path: {url}"
        )));
    }

    Ok(Some(PathBuf::from(path)))
}

/// Asks SQLite whether `sql` returns columns, for text the parser cannot read.
///
/// A statement that fails to prepare is fetched so the execution error is the
/// one reported.
async fn describes_rows(conn: &mut SqliteConnection, sql: &str) -> bool {
    match (&mut *conn).describe(sql).await {
        Ok(description) => !description.columns().is_empty(),
        Err(_) => true,
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    let mut out = Row::with_capacity(row.len());
    for (i, col) in row.columns().iter().enumerate() {
        out.push(col.name(), convert_value(row, i));
    }
    out
}

/// Converts a single column value, dispatching on the stored value's type.
///
/// SQLite is dynamically typed, so expression columns such as `COUNT(*)` have
/// no declared type; the runtime storage class decides the decoding.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match type_name.as_str() {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INTEGER" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "NUMERIC" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}

/// Formats a SQLite error, preferring the database's own message.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
