//! Interactive client for the sqlgenius MCP server.
//!
//! Spawns the tool server as a child process, drives its tools over stdio,
//! and renders the structured results. Subcommands cover one-shot use; with
//! no subcommand the client drops into a REPL with an in-memory query
//! history.

mod history;
mod rpc;
mod supervisor;

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::history::History;
use crate::rpc::{ToolInfo, ToolSession};
use crate::supervisor::{CommandLineScan, ServerIdentity, ServerSupervisor};

#[derive(Parser)]
#[command(
    name = "sqlgenius",
    version,
    about = "Conversational assistant for an analytical dataset."
)]
struct Cli {
    /// Server executable to spawn for the tool session.
    #[arg(long, env = "SQLGENIUS_SERVER_CMD")]
    server_cmd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Ask a question about the dataset in plain language.
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Run a SQL statement verbatim.
    Sql {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// List tables in the configured dataset.
    Tables,
    /// Show a table's schema.
    Schema {
        table_name: String,
        /// Also fetch a ten-row sample from the table.
        #[arg(long)]
        preview: bool,
    },
    /// List the tools the server exposes.
    Tools,
    /// Report whether a server instance is alive.
    Status {
        /// Start a detached instance if none is running.
        #[arg(long)]
        start: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let identity = ServerIdentity::resolve(cli.server_cmd);

    match cli.command {
        Some(CliCommand::Status { start }) => run_status(identity, start),
        Some(command) => {
            let mut session = connect(&identity).await?;
            match command {
                CliCommand::Ask { question } => {
                    let question = question.join(" ");
                    let response = ask(&mut session, &question).await?;
                    render_nl_response(&response);
                }
                CliCommand::Sql { query } => {
                    let query = query.join(" ");
                    let response = run_sql(&mut session, &query).await?;
                    render_sql_response(&response);
                }
                CliCommand::Tables => {
                    let response = session.call_tool("list_tables", json!({})).await?;
                    render_tables(&response);
                }
                CliCommand::Schema {
                    table_name,
                    preview,
                } => run_schema(&mut session, &table_name, preview).await?,
                CliCommand::Tools => render_tools(&session.list_tools().await?),
                CliCommand::Status { .. } => unreachable!("handled above"),
            }
            Ok(())
        }
        None => repl(identity).await,
    }
}

/// Connects with the client-side warning the sidebar used to show.
async fn connect(identity: &ServerIdentity) -> Result<ToolSession> {
    match ToolSession::connect(identity).await {
        Ok(session) => Ok(session),
        Err(err) => {
            eprintln!("warning: could not reach the tool server ({err})");
            eprintln!("hint: check `sqlgenius status`, or `sqlgenius status --start`");
            Err(err)
        }
    }
}

async fn ask(session: &mut ToolSession, question: &str) -> Result<Value> {
    session
        .call_tool("execute_nl_query", json!({"query": question}))
        .await
}

async fn run_sql(session: &mut ToolSession, query: &str) -> Result<Value> {
    session
        .call_tool("execute_sql_query", json!({"query": query}))
        .await
}

async fn run_schema(session: &mut ToolSession, table_name: &str, preview: bool) -> Result<()> {
    let response = session
        .call_tool("get_table_schema", json!({"table_name": table_name}))
        .await?;
    render_schema(&response);
    if preview && response.get("error").is_none() {
        let sample = format!("SELECT * FROM `{table_name}` LIMIT 10");
        let rows = run_sql(session, &sample).await?;
        println!();
        render_sql_response(&rows);
    }
    Ok(())
}

fn run_status(identity: ServerIdentity, start: bool) -> Result<()> {
    let mut supervisor = CommandLineScan::new(identity);
    if supervisor.is_alive() {
        println!("server: running");
        return Ok(());
    }
    println!("server: not running");
    if start {
        let pid = supervisor.start()?;
        println!("started detached instance (pid {pid})");
    }
    Ok(())
}

async fn repl(identity: ServerIdentity) -> Result<()> {
    let mut supervisor = CommandLineScan::new(identity.clone());
    let mut session = connect(&identity).await?;
    let mut history = History::new();

    println!("sqlgenius: ask about your data in plain English.");
    if let Ok(tools) = session.list_tools().await {
        let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
        println!("tools: {}", names.join(", "));
    }
    println!(
        "commands: ask <question> | sql <query> | tables | schema <table> | tools | history | status | restart | quit"
    );

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("sqlgenius> ");
        std::io::stdout().flush()?;
        let Some(line) = input.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line
            .split_once(' ')
            .map_or((line, ""), |(command, rest)| (command, rest.trim()));

        match command {
            "quit" | "exit" => break,
            "tables" => match session.call_tool("list_tables", json!({})).await {
                Ok(response) => render_tables(&response),
                Err(err) => warn_transport(&err),
            },
            "schema" => {
                if rest.is_empty() {
                    eprintln!("usage: schema <table>");
                    continue;
                }
                if let Err(err) = run_schema(&mut session, rest, false).await {
                    warn_transport(&err);
                }
            }
            "sql" => {
                if rest.is_empty() {
                    eprintln!("enter a SQL query first");
                    continue;
                }
                match run_sql(&mut session, rest).await {
                    Ok(response) => render_sql_response(&response),
                    Err(err) => warn_transport(&err),
                }
            }
            "tools" => match session.list_tools().await {
                Ok(tools) => render_tools(&tools),
                Err(err) => warn_transport(&err),
            },
            "history" => render_history(&history),
            "status" => {
                let state = if supervisor.is_alive() {
                    "running"
                } else {
                    "not running"
                };
                println!("server: {state}");
            }
            "restart" => match ToolSession::connect(&identity).await {
                Ok(fresh) => {
                    session = fresh;
                    println!("reconnected");
                }
                Err(err) => eprintln!("warning: restart failed: {err}"),
            },
            _ => {
                let question = if command == "ask" { rest } else { line };
                if question.is_empty() {
                    eprintln!("enter a question first");
                    continue;
                }
                match ask(&mut session, question).await {
                    Ok(response) => {
                        render_nl_response(&response);
                        history.record(question, response);
                    }
                    Err(err) => warn_transport(&err),
                }
            }
        }
    }
    Ok(())
}

/// Prints the `error`/`explanation` pair if present; true when it was.
fn render_error(response: &Value) -> bool {
    let Some(error) = response.get("error").and_then(Value::as_str) else {
        return false;
    };
    eprintln!("error: {error}");
    if let Some(explanation) = response.get("explanation").and_then(Value::as_str) {
        eprintln!("{explanation}");
    }
    true
}

fn render_nl_response(response: &Value) {
    if render_error(response) {
        return;
    }
    if let Some(query) = response.get("query").and_then(Value::as_str) {
        println!("SQL:\n{query}\n");
    }
    if let Some(explanation) = response.get("explanation").and_then(Value::as_str) {
        println!("Explanation:\n{explanation}\n");
    }
    render_rows(response.get("result"));
}

fn render_sql_response(response: &Value) {
    if render_error(response) {
        return;
    }
    render_rows(response.get("result"));
}

fn render_rows(rows: Option<&Value>) {
    match rows {
        Some(Value::Array(rows)) if rows.is_empty() => println!("(no rows)"),
        Some(Value::Array(rows)) => {
            println!("Results:");
            for row in rows {
                println!("  {row}");
            }
        }
        Some(other) => println!("Results:\n{other}"),
        None => {}
    }
}

fn render_tables(response: &Value) {
    if render_error(response) {
        return;
    }
    let project = response
        .get("project_id")
        .and_then(Value::as_str)
        .unwrap_or("?");
    let dataset = response
        .get("dataset_id")
        .and_then(Value::as_str)
        .unwrap_or("?");
    let count = response.get("count").and_then(Value::as_u64).unwrap_or(0);
    println!("Tables in {project}.{dataset} ({count}):");
    if let Some(tables) = response.get("tables").and_then(Value::as_array) {
        for table in tables {
            if let Some(name) = table.as_str() {
                println!("  {name}");
            }
        }
    }
}

fn render_schema(response: &Value) {
    if render_error(response) {
        return;
    }
    let name = response
        .get("table_name")
        .and_then(Value::as_str)
        .unwrap_or("?");
    let num_rows = response.get("num_rows").and_then(Value::as_u64).unwrap_or(0);
    let size_bytes = response
        .get("size_bytes")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    println!("{name}: {num_rows} rows, {size_bytes} bytes");
    if let Some(fields) = response.get("schema").and_then(Value::as_array) {
        for field in fields {
            let field_name = field.get("name").and_then(Value::as_str).unwrap_or("?");
            let field_type = field.get("type").and_then(Value::as_str).unwrap_or("?");
            match field.get("description").and_then(Value::as_str) {
                Some(description) => println!("  {field_name}: {field_type} ({description})"),
                None => println!("  {field_name}: {field_type}"),
            }
        }
    }
}

fn render_tools(tools: &[ToolInfo]) {
    for tool in tools {
        println!("{}: {}", tool.name, tool.description);
    }
}

fn render_history(history: &History) {
    if history.is_empty() {
        println!("(no queries yet)");
        return;
    }
    for (index, entry) in history.entries().iter().enumerate() {
        let query = entry
            .response
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or("(no SQL)");
        println!(
            "{:>3}. [{}] {}",
            index + 1,
            entry.asked_at.format("%H:%M:%S"),
            entry.question
        );
        println!("     {query}");
    }
}

fn warn_transport(err: &anyhow::Error) {
    eprintln!("warning: tool call failed: {err}");
    eprintln!("hint: `restart` starts a fresh server session");
}
