//! Prompt construction for LLM requests.
//!
//! Two single-turn exchanges per question: one grounded in the schema DDL to
//! produce SQL, one grounded in the query results to produce the answer.

use crate::db::QueryResult;
use crate::llm::types::Message;

/// Maximum result rows shown to the model when writing the answer.
pub const MAX_RESULT_ROWS: usize = 50;

/// System prompt template for SQL generation.
const SQL_SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a Text-to-SQL expert for an inventory management system.
Your job is to translate a user's natural language question into a valid SQL query.

Here is the exact DDL schema for the database:
{schema}

Key Instructions:
1. ONLY return the raw, valid SQL query text. Do not wrap it in markdown code blocks like ```sql ... ```.
2. Write standard ANSI SQL (JOINs, WHERE clauses, aggregations) that also runs on SQLite; avoid vendor-specific syntax such as TOP or square-bracket identifiers.
3. Assets are linked to Sites and Locations. Follow the foreign key relationships declared in the DDL when joining tables.
4. If the user asks "how many", use COUNT(*).
5. Always use table and column names exactly as they appear in the schema."#;

/// System prompt for answer synthesis.
const ANSWER_SYSTEM_PROMPT: &str = r#"You are an intelligent inventory assistant.
Your job is to read the results of a database query and answer the user's original question in a polite, concise, natural language format.
Do NOT reveal the raw JSON data to the user. Do format your response cleanly (use bullet points if listing multiple items)."#;

/// Builds the SQL generation system prompt with the schema DDL embedded verbatim.
pub fn build_sql_system_prompt(schema_ddl: &str) -> String {
    SQL_SYSTEM_PROMPT_TEMPLATE.replace("{schema}", schema_ddl)
}

/// Builds the message pair for SQL generation. No prior history is included.
pub fn build_sql_messages(schema_ddl: &str, question: &str) -> Vec<Message> {
    vec![
        Message::system(build_sql_system_prompt(schema_ddl)),
        Message::user(question),
    ]
}

/// Serializes at most [`MAX_RESULT_ROWS`] rows as pretty JSON.
///
/// When rows are left out, a note with the omitted count is appended.
pub fn format_results_for_llm(results: &QueryResult) -> String {
    let (sample, omitted) = results.sample(MAX_RESULT_ROWS);

    let mut text = serde_json::to_string_pretty(&sample).unwrap_or_else(|_| "[]".to_string());
    if omitted > 0 {
        text.push_str(&format!("\n...and {omitted} more rows."));
    }
    text
}

/// Builds the user message for answer synthesis.
pub fn build_answer_user_prompt(question: &str, sql: &str, results: &QueryResult) -> String {
    format!(
        "User Question: {question}\n\n\
         SQL Query Used:\n{sql}\n\n\
         Query Results (JSON):\n{results}\n\n\
         Please provide the final natural language answer.",
        results = format_results_for_llm(results),
    )
}

/// Builds the message pair for answer synthesis.
pub fn build_answer_messages(question: &str, sql: &str, results: &QueryResult) -> Vec<Message> {
    vec![
        Message::system(ANSWER_SYSTEM_PROMPT),
        Message::user(build_answer_user_prompt(question, sql, results)),
    ]
}
