//! Answer synthesis stage.

use std::sync::Arc;
use std::time::Instant;

use super::generator::into_generation_error;
use crate::db::QueryResult;
use crate::error::Result;
use crate::llm::{build_answer_messages, LlmClient, TokenUsage};

/// Sampling temperature for answers: some stylistic variation, stable facts.
pub const ANSWER_TEMPERATURE: f32 = 0.2;

/// Natural-language answer with usage accumulated across the request so far.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAnswer {
    pub answer: String,
    pub usage: TokenUsage,
}

/// Turns query results into a prose answer.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
}

impl AnswerSynthesizer {
    /// Creates a synthesizer over the given client.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Asks the model to answer `question` from `results`.
    ///
    /// The returned usage is `usage_so_far` plus this call's counts.
    pub async fn synthesize(
        &self,
        question: &str,
        sql: &str,
        results: &QueryResult,
        usage_so_far: TokenUsage,
    ) -> Result<SynthesizedAnswer> {
        let messages = build_answer_messages(question, sql, results);

        let start = Instant::now();
        let completion = self
            .llm
            .complete(&messages, ANSWER_TEMPERATURE)
            .await
            .map_err(into_generation_error)?;

        tracing::debug!(
            llm_duration_ms = start.elapsed().as_millis() as u64,
            result_rows = results.len(),
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "Synthesized answer"
        );

        Ok(SynthesizedAnswer {
            answer: completion.content.trim().to_string(),
            usage: usage_so_far.accumulate(completion.usage),
        })
    }
}
