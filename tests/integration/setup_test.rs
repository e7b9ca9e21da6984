//! Database setup tests driven through `Config`.

use inventory_chat::config::Config;
use inventory_chat::db::{connect, DatabaseClient, Value};
use inventory_chat::error::ChatError;
use inventory_chat::setup::{init_db, InitOutcome};

fn config_for(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.database.url = format!("sqlite:///{}", dir.join("inventory.db").display());
    config.schema_path = std::path::PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/schema.sql"));
    config
}

#[tokio::test]
async fn test_init_db_then_query_through_url() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());

    let first = init_db(&config).await.unwrap();
    assert!(matches!(first, InitOutcome::Created { failed: 0, .. }));

    let second = init_db(&config).await.unwrap();
    assert!(matches!(second, InitOutcome::Skipped { .. }));

    let db = connect(&config.database.url).await.unwrap();
    let result = db
        .execute_query("SELECT SiteName FROM Sites WHERE City = 'Tokyo'")
        .await
        .unwrap();
    assert_eq!(
        result.to_rows()[0].get("SiteName"),
        Some(&Value::Text("Tokyo Branch".to_string()))
    );

    let recent = db
        .execute_query("SELECT COUNT(*) AS n FROM SalesOrders WHERE SODate >= date('now', '-3 month')")
        .await
        .unwrap();
    assert_eq!(recent.to_rows()[0].get("n"), Some(&Value::Int(3)));
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_init_db_missing_schema_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path());
    config.schema_path = dir.path().join("missing.sql");

    let err = init_db(&config).await.unwrap_err();

    assert!(matches!(err, ChatError::Config(_)));
    assert!(!dir.path().join("inventory.db").exists());
}

#[tokio::test]
async fn test_init_db_rejects_in_memory_url() {
    let mut config = Config::default();
    config.database.url = "sqlite::memory:".to_string();

    let err = init_db(&config).await.unwrap_err();
    assert!(matches!(err, ChatError::Config(_)));
}
