//! Result shapes returned by the four tool operations.
//!
//! There is no shared envelope; callers probe for the `error` key, so each
//! operation serializes to exactly the loose map shape its consumers
//! already expect.

use serde::Serialize;

use crate::warehouse::{Row, SchemaField, TableSchema};

/// Result of `execute_nl_query`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NlQueryOutcome {
    Success {
        query: String,
        result: Vec<Row>,
        explanation: String,
    },
    /// Extraction came up empty or the gate refused the candidate;
    /// `explanation` carries the raw model text or the fixed rejection
    /// notice.
    Rejected { error: String, explanation: String },
    /// The extracted query reached the warehouse and failed there.
    ExecutionFailed {
        error: String,
        query: String,
        explanation: String,
    },
    /// A collaborator failed before any query candidate existed.
    Failed { error: String },
}

/// Result of `execute_sql_query`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlQueryOutcome {
    Success {
        query: String,
        result: Vec<Row>,
        success: bool,
    },
    Rejected { error: String, explanation: String },
    ExecutionFailed {
        error: String,
        query: String,
        success: bool,
    },
}

/// Result of `list_tables`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListTablesOutcome {
    Success {
        tables: Vec<String>,
        project_id: String,
        dataset_id: String,
        count: usize,
    },
    Failed { error: String },
}

/// Result of `get_table_schema`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TableSchemaOutcome {
    Success {
        table_name: String,
        schema: Vec<SchemaField>,
        num_rows: u64,
        size_bytes: u64,
    },
    Failed { error: String },
}

impl From<TableSchema> for TableSchemaOutcome {
    fn from(schema: TableSchema) -> Self {
        Self::Success {
            table_name: schema.table_name,
            schema: schema.schema,
            num_rows: schema.num_rows,
            size_bytes: schema.size_bytes,
        }
    }
}
