//! SQL generation stage.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{ChatError, Result};
use crate::llm::{build_sql_messages, clean_sql, LlmClient, TokenUsage};

/// Sampling temperature for SQL generation (deterministic decoding).
pub const SQL_TEMPERATURE: f32 = 0.0;

/// SQL produced for a question, with the generation call's token usage.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSql {
    pub sql: String,
    pub usage: TokenUsage,
}

/// Turns questions into SQL using the schema DDL as prompt context.
#[derive(Clone)]
pub struct SqlGenerator {
    llm: Arc<dyn LlmClient>,
    schema_ddl: Arc<str>,
}

impl SqlGenerator {
    /// Creates a generator over the given client and schema text.
    pub fn new(llm: Arc<dyn LlmClient>, schema_ddl: Arc<str>) -> Self {
        Self { llm, schema_ddl }
    }

    /// Asks the model for SQL answering `question`.
    ///
    /// The returned SQL is fence-stripped and trimmed but otherwise unchecked;
    /// a bad statement surfaces later as a query error. Only a failed model
    /// call is an error here, and it is always [`ChatError::Generation`].
    pub async fn generate(&self, question: &str) -> Result<GeneratedSql> {
        let messages = build_sql_messages(&self.schema_ddl, question);

        let start = Instant::now();
        let completion = self
            .llm
            .complete(&messages, SQL_TEMPERATURE)
            .await
            .map_err(into_generation_error)?;

        let sql = clean_sql(&completion.content);

        tracing::debug!(
            llm_duration_ms = start.elapsed().as_millis() as u64,
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            sql_len = sql.len(),
            "Generated SQL"
        );

        Ok(GeneratedSql {
            sql,
            usage: completion.usage,
        })
    }
}

pub(crate) fn into_generation_error(error: ChatError) -> ChatError {
    match error {
        ChatError::Generation(_) => error,
        other => ChatError::generation(other.message().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, Role};

    const DDL: &str = "CREATE TABLE Vendors (VendorId INT IDENTITY PRIMARY KEY, VendorName NVARCHAR(200));";

    fn generator(mock: Arc<MockLlmClient>) -> SqlGenerator {
        SqlGenerator::new(mock, Arc::from(DDL))
    }

    #[tokio::test]
    async fn test_generate_strips_fences_and_reports_usage() {
        let mock = Arc::new(
            MockLlmClient::new().with_reply("```sql\nSELECT 1;\n```", TokenUsage::new(120, 5, 125)),
        );

        let generated = generator(mock.clone()).generate("ping").await.unwrap();

        assert_eq!(generated.sql, "SELECT 1;");
        assert_eq!(generated.usage, TokenUsage::new(120, 5, 125));
    }

    #[tokio::test]
    async fn test_generate_sends_single_turn_at_zero_temperature() {
        let mock = Arc::new(
            MockLlmClient::new().with_reply("SELECT COUNT(*) FROM Vendors;", TokenUsage::default()),
        );

        generator(mock.clone())
            .generate("How many vendors do we have?")
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].temperature, SQL_TEMPERATURE);
        assert_eq!(calls[0].messages.len(), 2);
        assert_eq!(calls[0].messages[0].role, Role::System);
        assert!(calls[0].messages[0].content.contains(DDL));
        assert_eq!(calls[0].messages[1].content, "How many vendors do we have?");
    }

    #[tokio::test]
    async fn test_generate_does_not_validate_sql() {
        let mock = Arc::new(
            MockLlmClient::new().with_reply("SELEKT nonsense", TokenUsage::new(1, 1, 2)),
        );
        let generated = generator(mock).generate("?").await.unwrap();
        assert_eq!(generated.sql, "SELEKT nonsense");
    }

    #[tokio::test]
    async fn test_model_failure_is_generation_error() {
        let mock = Arc::new(MockLlmClient::new().with_failure("Authentication failed."));
        let err = generator(mock).generate("How many sites?").await.unwrap_err();
        assert!(matches!(err, ChatError::Generation(_)));
        assert_eq!(err.message(), "Authentication failed.");
    }

    #[test]
    fn test_into_generation_error_rewraps_other_kinds() {
        let err = into_generation_error(ChatError::internal("client poisoned"));
        assert!(matches!(err, ChatError::Generation(ref m) if m == "client poisoned"));
    }
}
