//! HTTP API tests driving the router directly and over a real socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use inventory_chat::api::{create_router, serve_on, AppState};
use inventory_chat::llm::{MockLlmClient, Provider, TokenUsage};
use inventory_chat::pipeline::{ChatResponse, Pipeline, ResponseStatus};
use tokio::net::TcpListener;
use tower::ServiceExt;

use super::common::{seeded_db, SCHEMA_DDL};

async fn app_state(llm: MockLlmClient) -> (AppState, tempfile::TempDir) {
    let (db, dir) = seeded_db().await;
    let pipeline = Pipeline::new(
        Arc::new(llm),
        Arc::new(db),
        SCHEMA_DDL,
        Provider::OpenAi,
        "llama-3.3-70b-versatile",
    );
    (AppState::new(pipeline), dir)
}

async fn read_response(response: axum::response::Response) -> ChatResponse {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_chat_over_seeded_database() {
    let llm = MockLlmClient::new()
        .with_reply(
            "SELECT VendorName FROM Vendors ORDER BY VendorName",
            TokenUsage::new(50, 10, 60),
        )
        .with_reply(
            "Your vendors are:\n- Enterprise Software Ltd\n- Office Furniture Co\n- Tech Supplies Inc",
            TokenUsage::new(70, 20, 90),
        );
    let (state, _dir) = app_state(llm).await;

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"session_id":"abc","message":"Who are our vendors?","context":{"ui":"web"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_response(response).await;
    assert_eq!(body.status, ResponseStatus::Ok);
    assert!(body.natural_language_answer.contains("Tech Supplies Inc"));
    assert_eq!(body.token_usage, TokenUsage::new(120, 30, 150));
    assert_eq!(body.model, "llama-3.3-70b-versatile");
}

#[tokio::test]
async fn test_bad_sql_is_http_200_with_error_status() {
    let llm = MockLlmClient::new().with_reply("SELEKT * FROM Vendors", TokenUsage::new(5, 5, 10));
    let (state, _dir) = app_state(llm).await;

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"session_id":"abc","message":"vendors?"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_response(response).await;
    assert_eq!(body.status, ResponseStatus::Error);
    assert_eq!(body.sql_query, "SELEKT * FROM Vendors");
    assert_eq!(body.token_usage, TokenUsage::new(5, 5, 10));
    assert!(body
        .natural_language_answer
        .starts_with("Error executing database query: "));
}

#[tokio::test]
async fn test_serve_on_real_socket_with_graceful_shutdown() {
    let llm = MockLlmClient::new()
        .with_reply("SELECT COUNT(*) FROM Sites", TokenUsage::new(1, 1, 2))
        .with_reply("There are 3 sites.", TokenUsage::new(1, 1, 2));
    let (state, _dir) = app_state(llm).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve_on(listener, state, async move {
        let _ = stop_rx.await;
    }));

    let client = reqwest::Client::new();
    let health: serde_json::Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let chat: ChatResponse = client
        .post(format!("http://{addr}/api/chat"))
        .json(&serde_json::json!({"session_id": "s", "message": "How many sites?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(chat.natural_language_answer, "There are 3 sites.");

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
