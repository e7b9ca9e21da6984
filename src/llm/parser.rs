//! Response cleanup for LLM outputs.
//!
//! The SQL prompt asks for bare SQL, but models still wrap it in markdown
//! fences now and then. Only a leading and a trailing fence are removed; the
//! text in between is returned as-is.

/// Strips an optional leading ```` ```sql ```` / ```` ``` ```` fence and an
/// optional trailing ```` ``` ```` fence, trimming whitespace around the result.
pub fn clean_sql(response: &str) -> String {
    let mut sql = response.trim();

    if let Some(rest) = strip_prefix_ignore_case(sql, "```sql") {
        sql = rest;
    } else if let Some(rest) = sql.strip_prefix("```") {
        sql = rest;
    }

    if let Some(rest) = sql.strip_suffix("```") {
        sql = rest;
    }

    sql.trim().to_string()
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}
