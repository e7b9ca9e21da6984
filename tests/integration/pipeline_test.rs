//! End-to-end pipeline tests over the seeded demo database.

use std::sync::Arc;

use inventory_chat::db::{DatabaseClient, Value};
use inventory_chat::llm::{MockLlmClient, Provider, Role, TokenUsage};
use inventory_chat::pipeline::{ChatRequest, Pipeline, ResponseStatus, ANSWER_TEMPERATURE, SQL_TEMPERATURE};
use pretty_assertions::assert_eq;

use super::common::{seeded_db, SCHEMA_DDL};

const NEW_YORK_SQL: &str = "SELECT COUNT(*) FROM Assets a \
     JOIN Sites s ON a.SiteId = s.SiteId \
     WHERE s.City = 'New York' AND a.Status = 'Active';";

#[tokio::test]
async fn test_active_assets_in_new_york() {
    let (db, _dir) = seeded_db().await;
    let llm = Arc::new(
        MockLlmClient::new()
            .with_reply(
                format!("```sql\n{NEW_YORK_SQL}\n```"),
                TokenUsage::new(1200, 40, 1240),
            )
            .with_reply(
                "There are 2 active assets at the New York site.",
                TokenUsage::new(180, 12, 192),
            ),
    );
    let pipeline = Pipeline::new(
        llm.clone(),
        Arc::new(db),
        SCHEMA_DDL,
        Provider::OpenAi,
        "llama-3.3-70b-versatile",
    );

    let response = pipeline
        .run(&ChatRequest::new("session-1", "how many active assets are in New York?"))
        .await;

    assert_eq!(response.status, ResponseStatus::Ok);
    assert_eq!(response.sql_query, NEW_YORK_SQL);
    assert!(response.sql_query.contains("COUNT(*)"));
    assert!(response.sql_query.contains("Assets") && response.sql_query.contains("Sites"));
    assert_eq!(
        response.natural_language_answer,
        "There are 2 active assets at the New York site."
    );
    assert_eq!(response.token_usage, TokenUsage::new(1380, 52, 1432));

    let calls = llm.calls();
    assert_eq!(calls.len(), 2);

    // Generation sees the full schema at temperature 0.
    assert_eq!(calls[0].temperature, SQL_TEMPERATURE);
    assert!(calls[0].messages[0].content.contains(SCHEMA_DDL));

    // Synthesis sees the single-row count, not the whole table.
    assert_eq!(calls[1].temperature, ANSWER_TEMPERATURE);
    assert_eq!(calls[1].messages[1].role, Role::User);
    let user_prompt = &calls[1].messages[1].content;
    assert!(user_prompt.contains("how many active assets are in New York?"));
    assert!(user_prompt.contains(NEW_YORK_SQL));
    assert!(user_prompt.contains("\"COUNT(*)\": 2"));
    assert!(!user_prompt.contains("more rows"));
}

#[tokio::test]
async fn test_unknown_table_reports_database_error() {
    let (db, _dir) = seeded_db().await;
    let llm = MockLlmClient::new().with_reply("SELECT * FROM Warehouses", TokenUsage::new(900, 7, 907));
    let pipeline = Pipeline::new(Arc::new(llm), Arc::new(db), SCHEMA_DDL, Provider::OpenAi, "m");

    let response = pipeline
        .run(&ChatRequest::new("s", "list all warehouses"))
        .await;

    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(response.sql_query, "SELECT * FROM Warehouses");
    assert_eq!(response.token_usage, TokenUsage::new(900, 7, 907));
    assert!(response
        .natural_language_answer
        .starts_with("Error executing database query: "));
    assert!(response.natural_language_answer.contains("no such table"));
}

#[tokio::test]
async fn test_mutation_reports_rows_affected_and_persists() {
    let (db, _dir) = seeded_db().await;
    let db = Arc::new(db);
    let llm = Arc::new(
        MockLlmClient::new()
            .with_reply(
                "UPDATE Assets SET Status = 'Retired' WHERE Status = 'Disposed'",
                TokenUsage::new(10, 5, 15),
            )
            .with_reply("One asset was marked as retired.", TokenUsage::new(10, 5, 15)),
    );
    let pipeline = Pipeline::new(llm.clone(), db.clone(), SCHEMA_DDL, Provider::OpenAi, "m");

    let response = pipeline
        .run(&ChatRequest::new("s", "retire the disposed assets"))
        .await;
    assert_eq!(response.status, ResponseStatus::Ok);

    let synth_prompt = &llm.calls()[1].messages[1].content;
    assert!(synth_prompt.contains("\"rows_affected\": 1"));

    let check = db
        .execute_query("SELECT COUNT(*) AS n FROM Assets WHERE Status = 'Retired'")
        .await
        .unwrap();
    assert_eq!(check.to_rows()[0].get("n"), Some(&Value::Int(1)));
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let (db, _dir) = seeded_db().await;
    let llm = MockLlmClient::new()
        .with_response("SQL Query Used", "We work with 3 vendors.")
        .with_response("vendors", "SELECT COUNT(*) FROM Vendors")
        .with_default_usage(TokenUsage::new(10, 2, 12));
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(llm),
        Arc::new(db),
        SCHEMA_DDL,
        Provider::Azure,
        "gpt-4o",
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .run(&ChatRequest::new(format!("s-{i}"), "How many vendors?"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.sql_query, "SELECT COUNT(*) FROM Vendors");
        assert_eq!(response.natural_language_answer, "We work with 3 vendors.");
        assert_eq!(response.token_usage, TokenUsage::new(20, 4, 24));
        assert_eq!(response.provider, Provider::Azure);
    }
}
