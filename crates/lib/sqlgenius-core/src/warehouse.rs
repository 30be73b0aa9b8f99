//! Warehouse collaborator interface and catalog types.

use std::{error::Error, fmt};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single result row keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// One column in a table schema, as reported by the warehouse catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Schema snapshot for a single table, queried live and never cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub table_name: String,
    pub schema: Vec<SchemaField>,
    pub num_rows: u64,
    pub size_bytes: u64,
}

#[derive(Debug)]
pub enum WarehouseError {
    /// The request never produced a usable HTTP response.
    Transport(String),
    /// The warehouse answered with an error of its own.
    Api(String),
    /// The response arrived but could not be decoded.
    Decode(String),
}

impl fmt::Display for WarehouseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Api(message) => write!(f, "{message}"),
            Self::Decode(message) => write!(f, "unexpected response: {message}"),
        }
    }
}

impl Error for WarehouseError {}

pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Read-only query access to the analytical warehouse.
///
/// One long-lived handle is opened at process start and injected into each
/// operation; implementations hold no per-call state.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Runs a SQL statement and returns the result rows.
    ///
    /// # Errors
    /// Returns `WarehouseError` if the statement fails to execute or the
    /// response cannot be decoded.
    async fn run_query(&self, sql: &str) -> WarehouseResult<Vec<Row>>;

    /// Lists table identifiers in the configured dataset.
    ///
    /// # Errors
    /// Returns `WarehouseError` if the catalog listing fails.
    async fn list_tables(&self) -> WarehouseResult<Vec<String>>;

    /// Fetches one table's field list, row count, and byte size.
    ///
    /// # Errors
    /// Returns `WarehouseError` if the catalog lookup fails.
    async fn table_schema(&self, table_name: &str) -> WarehouseResult<TableSchema>;
}
