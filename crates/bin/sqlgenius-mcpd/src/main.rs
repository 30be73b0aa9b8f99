//! Daemon entry point for the sqlgenius MCP server.
//!
//! Loads configuration from the environment, constructs the warehouse and
//! model clients once, and serves the MCP protocol over stdio and/or
//! streamable HTTP. Stdout belongs to the MCP transport, so logs go to
//! stderr.

mod config;

use std::sync::Arc;

use sqlgenius_bigquery::BigQueryClient;
use sqlgenius_core::{DatasetRef, SqlAssistant};
use sqlgenius_mcp::server::{self, McpHttpServerConfig};
use sqlgenius_vertex::VertexClient;
use tracing_subscriber::EnvFilter;

use crate::config::GeniusConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = GeniusConfig::from_args()?;

    let http = reqwest::Client::builder().build()?;
    let warehouse = BigQueryClient::new(
        http.clone(),
        config.project_id.clone(),
        config.dataset_id.clone(),
        config.access_token.clone(),
    );
    let model = VertexClient::new(
        http,
        config.project_id.clone(),
        config.location.clone(),
        config.model.clone(),
        config.access_token.clone(),
    );

    let dataset = DatasetRef::new(config.project_id.clone(), config.dataset_id.clone());
    let assistant = Arc::new(SqlAssistant::new(dataset, warehouse, model));
    tracing::info!(
        project_id = %config.project_id,
        dataset_id = %config.dataset_id,
        model = %config.model,
        "assistant initialized"
    );

    if config.http_serve {
        let http_config = McpHttpServerConfig {
            addr: config.mcp_http_addr,
            ..McpHttpServerConfig::default()
        };
        if config.enable_stdio {
            let http_assistant = assistant.clone();
            tokio::spawn(async move {
                if let Err(err) = server::serve_streamable_http(http_assistant, http_config).await {
                    tracing::error!(error = %err, "streamable HTTP server exited");
                }
            });
        } else {
            server::serve_streamable_http(assistant, http_config).await?;
            return Ok(());
        }
    }

    server::serve_stdio(assistant).await?;
    Ok(())
}
