//! Mock LLM client for testing.
//!
//! Replies come from a FIFO script first, then from pattern rules, then from
//! a fixed fallback. Every call is recorded for later inspection.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{ChatError, Result};
use crate::llm::types::{Completion, Message, Role, TokenUsage};
use crate::llm::LlmClient;

/// One scripted reply.
#[derive(Debug, Clone)]
enum ScriptedReply {
    Text { content: String, usage: TokenUsage },
    Failure(String),
}

/// A call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Messages exactly as sent.
    pub messages: Vec<Message>,
    /// Sampling temperature requested.
    pub temperature: f32,
}

/// Mock LLM client that returns canned responses.
///
/// Used for unit testing without making real API calls.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<ScriptedReply>>,
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Usage reported for pattern and fallback replies.
    default_usage: TokenUsage,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockLlmClient {
    /// Creates a new mock client with no script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a text reply with the given usage.
    pub fn with_reply(self, content: impl Into<String>, usage: TokenUsage) -> Self {
        self.push(ScriptedReply::Text {
            content: content.into(),
            usage,
        });
        self
    }

    /// Queues a failing call.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(ScriptedReply::Failure(message.into()));
        self
    }

    /// Adds a custom response mapping used once the script is exhausted.
    ///
    /// When the last user message contains `pattern`, the mock returns `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Sets the usage reported for pattern and fallback replies.
    pub fn with_default_usage(mut self, usage: TokenUsage) -> Self {
        self.default_usage = usage;
        self
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    fn push(&self, reply: ScriptedReply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    fn next_scripted(&self) -> Option<ScriptedReply> {
        self.script.lock().ok().and_then(|mut script| script.pop_front())
    }

    /// Generates a pattern-based response for the given input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message], temperature: f32) -> Result<Completion> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                messages: messages.to_vec(),
                temperature,
            });
        }

        match self.next_scripted() {
            Some(ScriptedReply::Text { content, usage }) => Ok(Completion::new(content, usage)),
            Some(ScriptedReply::Failure(message)) => Err(ChatError::generation(message)),
            None => {
                let input = Self::extract_user_input(messages);
                Ok(Completion::new(
                    self.mock_response(&input),
                    self.default_usage,
                ))
            }
        }
    }
}
