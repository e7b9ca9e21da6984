//! Database abstraction layer for inventory-chat.
//!
//! Provides a trait-based interface for database operations, allowing
//! different database backends to be used interchangeably.

mod classify;
mod mock;
mod postgres;
mod sqlite;
mod types;

pub use classify::{classify_statement_shape, StatementShape};
pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use postgres::PostgresClient;
pub use sqlite::{sqlite_file_path, SqliteClient};
pub use types::{QueryResult, Row, Value};

use crate::error::{ChatError, Result};
use async_trait::async_trait;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Sqlite,
    Postgres,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    /// Determines the backend from a connection URL's scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or_default().to_lowercase();
        match scheme.as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(ChatError::config(format!(
                "Unsupported database URL scheme '{scheme}'. Expected 'sqlite' or 'postgres'"
            ))),
        }
    }
}

/// Creates a database client for the given connection URL.
///
/// This is the central factory function for database connections.
pub async fn connect(url: &str) -> Result<Box<dyn DatabaseClient>> {
    match DatabaseBackend::from_url(url)? {
        DatabaseBackend::Sqlite => {
            let client = SqliteClient::connect(url).await?;
            Ok(Box::new(client))
        }
        DatabaseBackend::Postgres => {
            let client = PostgresClient::connect(url).await?;
            Ok(Box::new(client))
        }
    }
}

/// Trait defining the interface for database clients.
///
/// Every `execute_query` call runs in its own transaction on a pooled
/// connection, so concurrent requests never share a transaction.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// The backend this client talks to.
    fn backend(&self) -> DatabaseBackend;

    /// Executes a SQL statement and returns its rows or affected-row count.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection pool.
    async fn close(&self) -> Result<()>;
}
