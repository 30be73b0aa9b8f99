//! MCP server implementation for sqlgenius.
//!
//! Wires the assistant control plane into rmcp tool handlers and exposes
//! the MCP-facing API surface for natural-language and raw SQL queries.

mod tools;
pub mod server;

use std::sync::Arc;

use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use sqlgenius_core::SqlAssistant;
use sqlgenius_core::model::TextModel;
use sqlgenius_core::warehouse::QueryRunner;

const SERVER_INSTRUCTIONS: &str = r"sqlgenius provides MCP tools for exploring an analytical dataset conversationally.

Workflow:
1. Call `list_tables` to see what the configured dataset contains.
2. Call `get_table_schema` with a `table_name` to inspect its columns, row
   count, and size before querying it.
3. Ask questions in plain language with `execute_nl_query`; the server
   generates a SQL statement, runs it, and returns the query, the rows, and
   the model's explanation.
4. Run SQL you wrote yourself with `execute_sql_query`.

Notes:
- Only SELECT statements are executed. Statements containing write/DDL
  keywords are refused, including false positives such as columns named
  `created_at`.
- Failures are reported inside the result payload under an `error` key;
  check for it before reading the other fields.
- `health` returns `ok`.";

/// MCP server wrapper around the assistant control plane and tool routers.
pub struct SqlGeniusMcp<W: QueryRunner + 'static, M: TextModel + 'static> {
    tool_router: ToolRouter<Self>,
    assistant: Arc<SqlAssistant<W, M>>,
}

impl<W: QueryRunner + 'static, M: TextModel + 'static> Clone for SqlGeniusMcp<W, M> {
    fn clone(&self) -> Self {
        Self {
            tool_router: self.tool_router.clone(),
            assistant: self.assistant.clone(),
        }
    }
}

impl<W: QueryRunner + 'static, M: TextModel + 'static> SqlGeniusMcp<W, M> {
    /// Creates a new server using an assistant by value.
    #[must_use]
    pub fn new(assistant: SqlAssistant<W, M>) -> Self {
        Self::with_assistant(Arc::new(assistant))
    }

    /// Creates a new server using a shared assistant handle.
    #[must_use]
    pub fn with_assistant(assistant: Arc<SqlAssistant<W, M>>) -> Self {
        let tool_router = Self::tool_router_core() + Self::tool_router_query();
        Self {
            tool_router,
            assistant,
        }
    }

    pub(crate) fn assistant(&self) -> &SqlAssistant<W, M> {
        &self.assistant
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl<W: QueryRunner + 'static, M: TextModel + 'static> SqlGeniusMcp<W, M> {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl<W: QueryRunner + 'static, M: TextModel + 'static> ServerHandler for SqlGeniusMcp<W, M> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
