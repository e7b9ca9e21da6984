//! OpenAI-compatible client tests against a local fake completions server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use inventory_chat::error::ChatError;
use inventory_chat::llm::{LlmClient, Message, OpenAiClient, OpenAiConfig, TokenUsage};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Status codes to answer with before succeeding.
#[derive(Clone, Default)]
struct FakeServer {
    failures: Arc<Mutex<Vec<StatusCode>>>,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<(Option<String>, Value)>>>,
}

async fn completions(
    State(server): State<FakeServer>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    server.hits.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *server.last_request.lock().unwrap() = Some((auth, body));

    let next_failure = {
        let mut failures = server.failures.lock().unwrap();
        if failures.is_empty() {
            None
        } else {
            Some(failures.remove(0))
        }
    };

    match next_failure {
        Some(status) => (
            status,
            Json(json!({"error": {"message": "upstream unavailable"}})),
        )
            .into_response(),
        None => Json(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "SELECT COUNT(*) FROM Sites;"}}],
            "usage": {"prompt_tokens": 321, "completion_tokens": 9, "total_tokens": 330}
        }))
        .into_response(),
    }
}

async fn start(server: FakeServer) -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(server);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1")
}

fn messages() -> Vec<Message> {
    vec![Message::system("schema"), Message::user("How many sites?")]
}

#[tokio::test]
async fn test_completion_parses_content_and_usage() {
    let server = FakeServer::default();
    let base_url = start(server.clone()).await;
    let client = OpenAiClient::new(
        OpenAiConfig::new("gsk-secret", "llama-3.3-70b-versatile").with_base_url(base_url),
    )
    .unwrap();

    let completion = client.complete(&messages(), 0.0).await.unwrap();

    assert_eq!(completion.content, "SELECT COUNT(*) FROM Sites;");
    assert_eq!(completion.usage, TokenUsage::new(321, 9, 330));

    let (auth, body) = server.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer gsk-secret"));
    assert_eq!(body["model"], "llama-3.3-70b-versatile");
    assert_eq!(body["temperature"], 0.0);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "How many sites?");
}

#[tokio::test]
async fn test_empty_api_key_sends_no_authorization() {
    let server = FakeServer::default();
    let base_url = start(server.clone()).await;
    let client = OpenAiClient::new(OpenAiConfig::new("", "local-model").with_base_url(base_url)).unwrap();

    client.complete(&messages(), 0.2).await.unwrap();

    let (auth, _) = server.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(auth, None);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = FakeServer::default();
    server
        .failures
        .lock()
        .unwrap()
        .extend([StatusCode::SERVICE_UNAVAILABLE, StatusCode::TOO_MANY_REQUESTS]);
    let base_url = start(server.clone()).await;
    let client = OpenAiClient::new(
        OpenAiConfig::new("k", "m")
            .with_base_url(base_url)
            .with_max_attempts(3),
    )
    .unwrap();

    let completion = client.complete(&messages(), 0.0).await.unwrap();

    assert_eq!(completion.usage.total_tokens, 330);
    assert_eq!(server.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = FakeServer::default();
    server.failures.lock().unwrap().push(StatusCode::UNAUTHORIZED);
    let base_url = start(server.clone()).await;
    let client = OpenAiClient::new(OpenAiConfig::new("bad", "m").with_base_url(base_url)).unwrap();

    let err = client.complete(&messages(), 0.0).await.unwrap_err();

    assert!(matches!(err, ChatError::Generation(_)));
    assert!(err.to_string().contains("Authentication failed"));
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let server = FakeServer::default();
    server
        .failures
        .lock()
        .unwrap()
        .extend([StatusCode::BAD_GATEWAY, StatusCode::BAD_GATEWAY]);
    let base_url = start(server.clone()).await;
    let client = OpenAiClient::new(
        OpenAiConfig::new("k", "m")
            .with_base_url(base_url)
            .with_max_attempts(2),
    )
    .unwrap();

    let err = client.complete(&messages(), 0.0).await.unwrap_err();

    assert!(err.message().contains("upstream unavailable"));
    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
}
