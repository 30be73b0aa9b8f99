//! MCP tool handlers for the four query operations.
//!
//! Domain failures never become protocol errors: each operation serializes
//! its outcome — success- or error-shaped — as the tool result payload.

use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use sqlgenius_core::model::TextModel;
use sqlgenius_core::warehouse::QueryRunner;

use crate::SqlGeniusMcp;

/// Parameters for the natural-language query operation.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteNlQueryParams {
    /// The natural language question to answer from the dataset.
    pub query: String,
}

/// Parameters for the raw SQL operation.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteSqlQueryParams {
    /// The SQL statement to execute.
    pub query: String,
}

/// Parameters for the table schema lookup.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetTableSchemaParams {
    /// The table to describe.
    pub table_name: String,
}

#[tool_router(router = tool_router_query, vis = "pub")]
impl<W: QueryRunner + 'static, M: TextModel + 'static> SqlGeniusMcp<W, M> {
    #[tool(description = "Execute a natural language query on the SQL database.")]
    async fn execute_nl_query(
        &self,
        Parameters(params): Parameters<ExecuteNlQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outcome = self.assistant().execute_nl_query(&params.query).await;
        Ok(CallToolResult::success(vec![Content::json(outcome)?]))
    }

    #[tool(description = "Execute a SQL query directly on the database.")]
    async fn execute_sql_query(
        &self,
        Parameters(params): Parameters<ExecuteSqlQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outcome = self.assistant().execute_sql_query(&params.query).await;
        Ok(CallToolResult::success(vec![Content::json(outcome)?]))
    }

    #[tool(description = "List all available tables in the dataset.")]
    async fn list_tables(&self) -> Result<CallToolResult, ErrorData> {
        let outcome = self.assistant().list_tables().await;
        Ok(CallToolResult::success(vec![Content::json(outcome)?]))
    }

    #[tool(description = "Get the schema for a specific table.")]
    async fn get_table_schema(
        &self,
        Parameters(params): Parameters<GetTableSchemaParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outcome = self.assistant().get_table_schema(&params.table_name).await;
        Ok(CallToolResult::success(vec![Content::json(outcome)?]))
    }
}
