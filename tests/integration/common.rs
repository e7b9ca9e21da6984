//! Shared fixtures.

use inventory_chat::db::SqliteClient;
use inventory_chat::setup::{init_db_at, InitOutcome};
use tempfile::TempDir;

/// The DDL shipped with the crate.
pub const SCHEMA_DDL: &str = include_str!("../../schema.sql");

/// Creates a seeded demo database in a fresh temp directory.
///
/// The directory must outlive the client.
pub async fn seeded_db() -> (SqliteClient, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.db");

    let outcome = init_db_at(&path, SCHEMA_DDL).await.unwrap();
    assert!(matches!(outcome, InitOutcome::Created { failed: 0, .. }));

    let client = SqliteClient::open_file(&path).await.unwrap();
    (client, dir)
}
