//! Session-lifetime query history. Never persisted.

use chrono::{DateTime, Local};
use serde_json::Value;

/// One answered question and the full result it produced.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub asked_at: DateTime<Local>,
    pub question: String,
    pub response: Value,
}

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, question: &str, response: Value) {
        self.entries.push(HistoryEntry {
            asked_at: Local::now(),
            question: question.to_string(),
            response,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entries_keep_insertion_order() {
        let mut history = History::new();
        history.record("first", json!({"query": "SELECT 1"}));
        history.record("second", json!({"query": "SELECT 2"}));

        let entries = history.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].question, "first");
        assert_eq!(entries[1].question, "second");
        assert!(entries[0].asked_at <= entries[1].asked_at);
    }
}
