//! Prompt assembly for the natural-language operation.

/// Builds the single-shot generation prompt from the catalog table list and
/// the user's question.
#[must_use]
pub fn nl_query_prompt(tables: &[String], question: &str) -> String {
    let context = format!("Available tables: {}. ", tables.join(", "));
    format!("{context}\nUser query: {question}\nGenerate and execute an appropriate SQL query.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_tables_and_question() {
        let tables = vec!["orders".to_string(), "users".to_string()];
        let prompt = nl_query_prompt(&tables, "How many users signed up?");
        assert!(prompt.starts_with("Available tables: orders, users. "));
        assert!(prompt.contains("User query: How many users signed up?"));
        assert!(prompt.ends_with("Generate and execute an appropriate SQL query."));
    }
}
