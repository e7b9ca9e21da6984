//! Question-to-answer pipeline.
//!
//! One request moves through three stages: SQL generation, execution and
//! answer synthesis. The first failing stage ends the request with an error
//! response that keeps whatever the earlier stages produced.

pub mod generator;
pub mod synthesizer;
pub mod types;

pub use generator::{GeneratedSql, SqlGenerator, SQL_TEMPERATURE};
pub use synthesizer::{AnswerSynthesizer, SynthesizedAnswer, ANSWER_TEMPERATURE};
pub use types::{ChatRequest, ChatResponse, ResponseStatus};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use crate::db::DatabaseClient;
use crate::llm::{LlmClient, Provider, TokenUsage};
use crate::query::QueryExecutor;

/// Where a request stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    SqlGenerated,
    Executed,
    Answered,
    Panicked,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::SqlGenerated => "sql_generated",
            Self::Executed => "executed",
            Self::Answered => "answered",
            Self::Panicked => "panicked",
        }
    }
}

/// Orchestrates generator, executor and synthesizer for each request.
///
/// Holds only read-only state, so one instance serves concurrent requests.
#[derive(Clone)]
pub struct Pipeline {
    generator: SqlGenerator,
    executor: QueryExecutor,
    synthesizer: AnswerSynthesizer,
    provider: Provider,
    model: String,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        db: Arc<dyn DatabaseClient>,
        schema_ddl: impl Into<Arc<str>>,
        provider: Provider,
        model: impl Into<String>,
    ) -> Self {
        Self {
            generator: SqlGenerator::new(llm.clone(), schema_ddl.into()),
            executor: QueryExecutor::new(db),
            synthesizer: AnswerSynthesizer::new(llm),
            provider,
            model: model.into(),
        }
    }

    /// Answers one request. Always returns a response; failures are reported
    /// through `status` and the answer text.
    ///
    /// A panic in any stage is caught and reported as an error response.
    #[tracing::instrument(skip_all, fields(session_id = %request.session_id))]
    pub async fn run(&self, request: &ChatRequest) -> ChatResponse {
        let start = Instant::now();

        match AssertUnwindSafe(self.run_stages(request, start))
            .catch_unwind()
            .await
        {
            Ok(response) => response,
            Err(payload) => {
                let cause = panic_message(&*payload);
                tracing::error!(cause = %cause, "Pipeline panicked");
                self.finish(
                    start,
                    Stage::Panicked,
                    format!("Pipeline failed unexpectedly: {cause}"),
                    String::new(),
                    TokenUsage::zero(),
                    ResponseStatus::Error,
                )
            }
        }
    }

    async fn run_stages(&self, request: &ChatRequest, start: Instant) -> ChatResponse {
        let question = request.message.as_str();

        let generated = match self.generator.generate(question).await {
            Ok(generated) => generated,
            Err(e) => {
                return self.finish(
                    start,
                    Stage::Start,
                    format!("Failed to generate SQL: {}", e.message()),
                    String::new(),
                    TokenUsage::zero(),
                    ResponseStatus::Error,
                );
            }
        };
        let GeneratedSql { sql, usage } = generated;

        let results = match self.executor.execute(&sql).await {
            Ok(results) => results,
            Err(e) => {
                return self.finish(
                    start,
                    Stage::SqlGenerated,
                    format!("Error executing database query: {}", e.message()),
                    sql,
                    usage,
                    ResponseStatus::Error,
                );
            }
        };

        match self
            .synthesizer
            .synthesize(question, &sql, &results, usage)
            .await
        {
            Ok(SynthesizedAnswer {
                answer,
                usage: total,
            }) => self.finish(start, Stage::Answered, answer, sql, total, ResponseStatus::Ok),
            Err(e) => self.finish(
                start,
                Stage::Executed,
                format!("Failed to generate answer: {}", e.message()),
                sql,
                usage,
                ResponseStatus::Error,
            ),
        }
    }

    fn finish(
        &self,
        start: Instant,
        stage: Stage,
        answer: String,
        sql: String,
        usage: TokenUsage,
        status: ResponseStatus,
    ) -> ChatResponse {
        let latency_ms = start.elapsed().as_millis() as u64;

        match status {
            ResponseStatus::Ok => tracing::info!(
                latency_ms,
                total_tokens = usage.total_tokens,
                "Chat request answered"
            ),
            ResponseStatus::Error => tracing::warn!(
                stage = stage.as_str(),
                latency_ms,
                total_tokens = usage.total_tokens,
                error = %answer,
                "Chat request failed"
            ),
        }

        ChatResponse {
            natural_language_answer: answer,
            sql_query: sql,
            token_usage: usage,
            latency_ms,
            provider: self.provider,
            model: self.model.clone(),
            status,
        }
    }
}

/// Extracts the text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
