//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::db::classify::{classify_statement_shape, StatementShape};
use crate::db::{DatabaseBackend, DatabaseClient, QueryResult, Row, Value};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use sqlparser::dialect::PostgreSqlDialect;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, Uuid};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL database client.
#[derive(Debug, Clone)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Connects to PostgreSQL, retrying transient failures with backoff.
    pub async fn connect(url: &str) -> Result<Self> {
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;

        loop {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Successfully connected to database");
                    return Ok(Self { pool });
                }
                Err(e) if attempt < MAX_RETRY_ATTEMPTS && is_transient_error(&e) => {
                    warn!(
                        "Connection attempt {} failed (transient error), retrying in {:?}",
                        attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(ChatError::connection(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        let shape = classify_statement_shape(sql, &PostgreSqlDialect {});

        // Described outside the transaction: a failed prepare would abort it.
        let fetch = match shape {
            StatementShape::Unparsed => describes_rows(&self.pool, sql).await,
            known => known.fetches_rows(),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ChatError::query(format!("Failed to begin transaction: {e}")))?;

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
            "PostgreSQL statement executed"
        );

        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Asks PostgreSQL whether `sql` returns columns, for text the parser cannot read.
///
/// A statement that fails to prepare is fetched so the execution error is the
/// one reported.
async fn describes_rows(pool: &PgPool, sql: &str) -> bool {
    match pool.describe(sql).await {
        Ok(description) => !description.columns().is_empty(),
        Err(_) => true,
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    let mut out = Row::with_capacity(row.len());
    for (i, col) in row.columns().iter().enumerate() {
        out.push(col.name(), convert_value(row, i, col.type_info().name()));
    }
    out
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // Exact decimals become floats, matching what a JSON client would see.
        "NUMERIC" | "DECIMAL" => row
            .try_get::<Option<Decimal>, _>(index)
            .ok()
            .flatten()
            .and_then(|v| v.to_string().parse::<f64>().ok())
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "DATE" => decode_text::<NaiveDate>(row, index, |v| v.to_string()),
        "TIME" => decode_text::<NaiveTime>(row, index, |v| v.to_string()),
        "TIMESTAMP" => decode_text::<NaiveDateTime>(row, index, |v| {
            v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
        }),
        "TIMESTAMPTZ" => decode_text::<DateTime<Utc>>(row, index, |v| v.to_rfc3339()),
        "UUID" => decode_text::<Uuid>(row, index, |v| v.to_string()),
        "JSON" | "JSONB" => decode_text::<serde_json::Value>(row, index, |v| v.to_string()),

        other => match row.try_get::<Option<String>, _>(index) {
            Ok(v) => v.map(Value::Text).unwrap_or(Value::Null),
            Err(e) => {
                warn!(column_type = other, error = %e, "Unsupported column type, returning null");
                Value::Null
            }
        },
    }
}

/// Decodes a column as `T` and renders it as text.
fn decode_text<'r, T>(row: &'r PgRow, index: usize, render: impl FnOnce(T) -> String) -> Value
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .flatten()
        .map(|v| Value::Text(render(v)))
        .unwrap_or(Value::Null)
}

/// Determines if a connection error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Formats a query error with detail and hint when PostgreSQL supplies them.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = format!("ERROR: {}", db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
