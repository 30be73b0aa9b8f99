//! JSON-RPC stdio session with a spawned tool server.
//!
//! The client talks to its own child process over newline-delimited
//! JSON-RPC 2.0. One request is in flight at a time; responses are matched
//! by id and everything else on the stream (notifications, server-initiated
//! requests) is skipped. The first successful initialize handshake is the
//! readiness signal; there is no fixed post-spawn sleep, and regular tool
//! calls carry no timeout at all.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};

use crate::supervisor::ServerIdentity;

const PROTOCOL_VERSION: &str = "2024-11-05";
const READINESS_ATTEMPTS: u32 = 5;
const READINESS_TIMEOUT: Duration = Duration::from_secs(2);
const READINESS_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcNotification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    id: Option<Value>,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A named tool advertised by the server.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// One live stdio session with a server child process.
pub struct ToolSession {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl ToolSession {
    /// Spawns the server and completes the initialization handshake,
    /// retrying a bounded number of times while it comes up.
    pub async fn connect(identity: &ServerIdentity) -> Result<Self> {
        let mut last_error = None;
        for attempt in 1..=READINESS_ATTEMPTS {
            match Self::try_connect(identity).await {
                Ok(session) => {
                    tracing::debug!(pid = ?session.child.id(), "server session ready");
                    return Ok(session);
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "server handshake failed");
                    last_error = Some(err);
                    tokio::time::sleep(READINESS_BACKOFF).await;
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("server never became ready")))
    }

    async fn try_connect(identity: &ServerIdentity) -> Result<Self> {
        let mut command = identity.command();
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn {}", identity.program.display()))?;

        let stdin = child.stdin.take().context("server stdin not available")?;
        let stdout = child.stdout.take().context("server stdout not available")?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(line = %line, "server stderr");
                }
            });
        }

        let mut session = Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            next_id: 1,
        };
        tokio::time::timeout(READINESS_TIMEOUT, session.initialize())
            .await
            .map_err(|_| anyhow!("initialize timed out"))??;
        Ok(session)
    }

    async fn initialize(&mut self) -> Result<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "sqlgenius",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let _ = self.request("initialize", Some(params)).await?;
        self.notify("notifications/initialized").await
    }

    /// Lists the tools the server advertises.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>> {
        let result = self.request("tools/list", None).await?;
        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .context("tools/list result missing tools")?;
        Ok(tools
            .iter()
            .map(|tool| ToolInfo {
                name: tool
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                description: tool
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect())
    }

    /// Calls a tool and returns its payload.
    ///
    /// Tool results carry their payload as JSON text in the first content
    /// item; text that fails to parse is passed through under `raw`.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value> {
        let params = json!({"name": name, "arguments": arguments});
        let result = self.request("tools/call", Some(params)).await?;
        let text = result
            .get("content")
            .and_then(Value::as_array)
            .and_then(|content| content.first())
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str)
            .with_context(|| format!("tool {name} returned no text content"))?;
        Ok(serde_json::from_str(text).unwrap_or_else(|_| json!({"raw": text})))
    }

    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        self.send_line(&serde_json::to_string(&request)?).await?;

        loop {
            let Some(line) = self.lines.next_line().await? else {
                bail!("server closed the connection");
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Ok(response) = serde_json::from_str::<JsonRpcResponse>(trimmed) else {
                tracing::debug!(line = %trimmed, "skipping unparsable message");
                continue;
            };
            let matches_id = response
                .id
                .as_ref()
                .and_then(Value::as_u64)
                .is_some_and(|got| got == id);
            if !matches_id {
                continue;
            }
            if let Some(error) = response.error {
                bail!("{} (code {})", error.message, error.code);
            }
            return response
                .result
                .with_context(|| format!("{method} response missing result"));
        }
    }

    async fn notify(&mut self, method: &str) -> Result<()> {
        let notification = JsonRpcNotification {
            jsonrpc: "2.0",
            method,
        };
        self.send_line(&serde_json::to_string(&notification)?).await
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_frame_as_json_rpc() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "tools/call",
            params: Some(json!({"name": "list_tables", "arguments": {}})),
        };
        let framed = serde_json::to_value(&request).expect("request serializes");
        assert_eq!(framed["jsonrpc"], "2.0");
        assert_eq!(framed["id"], 7);
        assert_eq!(framed["method"], "tools/call");
        assert_eq!(framed["params"]["name"], "list_tables");
    }

    #[test]
    fn params_are_omitted_when_absent() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "tools/list",
            params: None,
        };
        let framed = serde_json::to_value(&request).expect("request serializes");
        assert!(framed.get("params").is_none());
    }

    #[test]
    fn notifications_parse_as_idless_responses() {
        let parsed: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/progress"}"#)
                .expect("notification parses");
        assert!(parsed.id.is_none());
        assert!(parsed.result.is_none());
        assert!(parsed.error.is_none());
    }

    #[test]
    fn error_responses_carry_code_and_message() {
        let parsed: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"unknown method"}}"#,
        )
        .expect("error parses");
        let error = parsed.error.expect("error present");
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "unknown method");
    }
}
