//! Mock database clients for testing.
//!
//! Lets pipeline tests control what the store returns without a real database.

use super::{DatabaseBackend, DatabaseClient, QueryResult};
use crate::error::{ChatError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// A mock database client that returns a fixed result and records every
/// statement it receives.
#[derive(Debug)]
pub struct MockDatabaseClient {
    result: QueryResult,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a mock that answers every statement with an empty row set.
    pub fn new() -> Self {
        Self::with_result(QueryResult::Rows(Vec::new()))
    }

    /// Creates a mock that answers every statement with `result`.
    pub fn with_result(result: QueryResult) -> Self {
        Self {
            result,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        Ok(self.result.clone())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A database client whose every statement fails with the given message.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client that fails every statement with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(ChatError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
