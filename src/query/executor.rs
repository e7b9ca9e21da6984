//! Query execution stage of the chat pipeline.
//!
//! Runs generated SQL directly against the store. There is no validation or
//! rewriting here: the SQL comes from a single trusted generation step, and
//! anything the database rejects surfaces as a query error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::{ChatError, Result};

/// Executes SQL strings against a shared database client.
#[derive(Clone)]
pub struct QueryExecutor {
    db: Arc<dyn DatabaseClient>,
}

impl QueryExecutor {
    /// Creates a new query executor.
    pub fn new(db: Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }

    /// Executes `sql` in its own transaction.
    ///
    /// Any failure is reported as [`ChatError::Query`].
    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.execute_timed(sql).await.map(|outcome| outcome.result)
    }

    /// Executes `sql` and reports how long the store took.
    pub async fn execute_timed(&self, sql: &str) -> Result<QueryOutcome> {
        let start = Instant::now();
        let result = self.db.execute_query(sql).await;
        let execution_time = start.elapsed();

        match result {
            Ok(result) => {
                tracing::debug!(
                    backend = self.db.backend().as_str(),
                    rows = result.len(),
                    execution_ms = execution_time.as_millis() as u64,
                    "Query executed"
                );
                Ok(QueryOutcome {
                    result,
                    execution_time,
                })
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.db.backend().as_str(),
                    execution_ms = execution_time.as_millis() as u64,
                    error = %e,
                    "Query failed"
                );
                Err(match e {
                    ChatError::Query(_) => e,
                    other => ChatError::query(other.message().to_string()),
                })
            }
        }
    }
}

/// Successful query execution outcome.
#[derive(Debug)]
pub struct QueryOutcome {
    /// The query result.
    pub result: QueryResult,
    /// How long the query took to execute.
    pub execution_time: Duration,
}
