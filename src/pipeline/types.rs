//! Request and response types for one chat turn.

use serde::{Deserialize, Serialize};

use crate::llm::{Provider, TokenUsage};

/// A user question.
///
/// `session_id` and `context` are accepted and carried along but not used by
/// the pipeline yet. Unknown fields in the JSON body are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ChatRequest {
    /// Creates a request without context.
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            context: None,
        }
    }
}

/// Outcome of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// The single response produced for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Synthesized answer, or a description of the failed stage and its cause.
    pub natural_language_answer: String,
    /// Generated SQL; empty when generation failed.
    pub sql_query: String,
    pub token_usage: TokenUsage,
    pub latency_ms: u64,
    pub provider: Provider,
    pub model: String,
    pub status: ResponseStatus,
}

impl ChatResponse {
    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}
