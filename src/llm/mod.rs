//! LLM integration for inventory-chat.
//!
//! Provides the chat-completion trait, an OpenAI-compatible implementation,
//! a scripted mock, and the prompt/response helpers used by the pipeline.

pub mod mock;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod types;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::clean_sql;
pub use prompt::{build_answer_messages, build_sql_messages, format_results_for_llm};
pub use types::{Completion, Message, Role, TokenUsage};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::LlmConfig;
use crate::error::Result;

/// Trait for LLM clients that can generate chat completions.
///
/// Implementations must be thread-safe (Send + Sync) so one client can serve
/// concurrent requests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends `messages` at the given sampling temperature and returns the
    /// first choice's text together with the call's token usage.
    async fn complete(&self, messages: &[Message], temperature: f32) -> Result<Completion>;
}

/// Provider label reported in every chat response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI or any OpenAI-compatible endpoint (Groq, local gateways).
    #[default]
    OpenAi,
    /// Azure OpenAI.
    Azure,
}

impl Provider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Azure => "azure",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "azure" => Ok(Self::Azure),
            _ => Err(format!("Unknown provider: {}. Expected: openai or azure", s)),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Creates the LLM client described by the configuration.
///
/// Both provider labels speak the OpenAI chat-completions protocol; the
/// label only changes what responses report.
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    let client_config = OpenAiConfig::new(config.api_key.clone(), config.model.clone())
        .with_base_url(config.base_url.clone())
        .with_timeout(config.timeout_secs)
        .with_max_attempts(config.max_attempts);
    Ok(Box::new(OpenAiClient::new(client_config)?))
}
