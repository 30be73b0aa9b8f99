use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use sqlgenius_core::model::{ModelError, ModelResult, TextModel};
use sqlgenius_core::outcome::{
    ListTablesOutcome,
    NlQueryOutcome,
    SqlQueryOutcome,
    TableSchemaOutcome,
};
use sqlgenius_core::warehouse::{
    QueryRunner,
    Row,
    SchemaField,
    TableSchema,
    WarehouseError,
    WarehouseResult,
};
use sqlgenius_core::{DatasetRef, SqlAssistant};

struct MockWarehouse {
    tables: Vec<String>,
    rows: Vec<Row>,
    fail_query: Option<String>,
    fail_catalog: Option<String>,
    query_calls: Arc<AtomicUsize>,
}

impl MockWarehouse {
    fn new() -> Self {
        Self {
            tables: vec!["orders".to_string(), "users".to_string()],
            rows: vec![sample_row()],
            fail_query: None,
            fail_catalog: None,
            query_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing_query(message: &str) -> Self {
        Self {
            fail_query: Some(message.to_string()),
            ..Self::new()
        }
    }

    fn failing_catalog(message: &str) -> Self {
        Self {
            fail_catalog: Some(message.to_string()),
            ..Self::new()
        }
    }
}

#[async_trait]
impl QueryRunner for MockWarehouse {
    async fn run_query(&self, _sql: &str) -> WarehouseResult<Vec<Row>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_query {
            Some(message) => Err(WarehouseError::Api(message.clone())),
            None => Ok(self.rows.clone()),
        }
    }

    async fn list_tables(&self) -> WarehouseResult<Vec<String>> {
        match &self.fail_catalog {
            Some(message) => Err(WarehouseError::Api(message.clone())),
            None => Ok(self.tables.clone()),
        }
    }

    async fn table_schema(&self, table_name: &str) -> WarehouseResult<TableSchema> {
        match &self.fail_catalog {
            Some(message) => Err(WarehouseError::Api(message.clone())),
            None => Ok(TableSchema {
                table_name: table_name.to_string(),
                schema: vec![SchemaField {
                    name: "id".to_string(),
                    field_type: "INTEGER".to_string(),
                    description: None,
                }],
                num_rows: 42,
                size_bytes: 1024,
            }),
        }
    }
}

struct MockModel {
    response: String,
    calls: Arc<AtomicUsize>,
}

impl MockModel {
    fn replying(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl TextModel for MockModel {
    async fn generate(&self, _prompt: &str) -> ModelResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.response.is_empty() {
            return Err(ModelError::Api("no candidates in response".to_string()));
        }
        Ok(self.response.clone())
    }
}

fn sample_row() -> Row {
    let mut row = Row::new();
    row.insert("total".to_string(), json!(7));
    row
}

fn dataset() -> DatasetRef {
    DatasetRef::new("acme-analytics".to_string(), "sales".to_string())
}

fn assistant(
    warehouse: MockWarehouse,
    model: MockModel,
) -> SqlAssistant<MockWarehouse, MockModel> {
    SqlAssistant::new(dataset(), warehouse, model)
}

#[tokio::test]
async fn rejected_sql_never_reaches_the_warehouse() {
    let warehouse = MockWarehouse::new();
    let query_calls = warehouse.query_calls.clone();
    let assistant = assistant(warehouse, MockModel::replying("unused"));

    let outcome = assistant.execute_sql_query("DROP TABLE events").await;

    assert_eq!(query_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        outcome,
        SqlQueryOutcome::Rejected {
            error: "Only SELECT queries are allowed".to_string(),
            explanation: "For security reasons, only SELECT queries are permitted.".to_string(),
        }
    );
}

#[tokio::test]
async fn allowed_sql_runs_verbatim() {
    let assistant = assistant(MockWarehouse::new(), MockModel::replying("unused"));

    let outcome = assistant.execute_sql_query("SELECT * FROM sales LIMIT 10").await;

    match outcome {
        SqlQueryOutcome::Success {
            query,
            result,
            success,
        } => {
            assert_eq!(query, "SELECT * FROM sales LIMIT 10");
            assert_eq!(result, vec![sample_row()]);
            assert!(success);
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn sql_execution_failure_carries_query_and_message() {
    let assistant = assistant(
        MockWarehouse::failing_query("Syntax error: Unexpected keyword FORM"),
        MockModel::replying("unused"),
    );

    let outcome = assistant.execute_sql_query("SELECT * FORM sales").await;

    assert_eq!(
        outcome,
        SqlQueryOutcome::ExecutionFailed {
            error: "Error executing query: Syntax error: Unexpected keyword FORM".to_string(),
            query: "SELECT * FORM sales".to_string(),
            success: false,
        }
    );
}

#[tokio::test]
async fn prose_without_sql_surfaces_extraction_failure() {
    let warehouse = MockWarehouse::new();
    let query_calls = warehouse.query_calls.clone();
    let model = MockModel::replying("I cannot answer that from this dataset.");
    let model_calls = model.calls.clone();
    let assistant = assistant(warehouse, model);

    let outcome = assistant.execute_nl_query("what is the answer").await;

    assert_eq!(model_calls.load(Ordering::SeqCst), 1);
    assert_eq!(query_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        outcome,
        NlQueryOutcome::Rejected {
            error: "Could not generate valid SQL query".to_string(),
            explanation: "I cannot answer that from this dataset.".to_string(),
        }
    );
}

#[tokio::test]
async fn fenced_model_output_is_extracted_and_executed() {
    let raw = "Here you go:\n```sql\nSELECT region, SUM(amount) FROM orders GROUP BY region\n```\nThis sums revenue per region.";
    let assistant = assistant(MockWarehouse::new(), MockModel::replying(raw));

    let outcome = assistant.execute_nl_query("revenue per region").await;

    match outcome {
        NlQueryOutcome::Success {
            query,
            result,
            explanation,
        } => {
            assert_eq!(query, "SELECT region, SUM(amount) FROM orders GROUP BY region");
            assert_eq!(result, vec![sample_row()]);
            assert_eq!(explanation, raw);
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn generated_write_statement_is_gated() {
    let warehouse = MockWarehouse::new();
    let query_calls = warehouse.query_calls.clone();
    let model = MockModel::replying("```sql\nDROP TABLE orders\n```");
    let assistant = assistant(warehouse, model);

    let outcome = assistant.execute_nl_query("drop the orders table").await;

    assert_eq!(query_calls.load(Ordering::SeqCst), 0);
    assert!(matches!(outcome, NlQueryOutcome::Rejected { .. }));
}

#[tokio::test]
async fn nl_execution_failure_keeps_explanation() {
    let raw = "```sql\nSELECT nope FROM orders\n```";
    let assistant = assistant(
        MockWarehouse::failing_query("Unrecognized name: nope"),
        MockModel::replying(raw),
    );

    let outcome = assistant.execute_nl_query("broken question").await;

    assert_eq!(
        outcome,
        NlQueryOutcome::ExecutionFailed {
            error: "Error executing query: Unrecognized name: nope".to_string(),
            query: "SELECT nope FROM orders".to_string(),
            explanation: raw.to_string(),
        }
    );
}

#[tokio::test]
async fn model_failure_is_contained() {
    let assistant = assistant(MockWarehouse::new(), MockModel::replying(""));

    let outcome = assistant.execute_nl_query("anything").await;

    assert_eq!(
        outcome,
        NlQueryOutcome::Failed {
            error: "no candidates in response".to_string(),
        }
    );
}

#[tokio::test]
async fn list_tables_reports_dataset_identity() {
    let assistant = assistant(MockWarehouse::new(), MockModel::replying("unused"));

    let outcome = assistant.list_tables().await;

    assert_eq!(
        outcome,
        ListTablesOutcome::Success {
            tables: vec!["orders".to_string(), "users".to_string()],
            project_id: "acme-analytics".to_string(),
            dataset_id: "sales".to_string(),
            count: 2,
        }
    );
}

#[tokio::test]
async fn list_tables_failure_carries_catalog_message_unchanged() {
    let assistant = assistant(
        MockWarehouse::failing_catalog("catalog unavailable"),
        MockModel::replying("unused"),
    );

    let outcome = assistant.list_tables().await;

    assert_eq!(
        outcome,
        ListTablesOutcome::Failed {
            error: "Error listing tables: catalog unavailable".to_string(),
        }
    );
}

#[tokio::test]
async fn table_schema_round_trips_catalog_fields() {
    let assistant = assistant(MockWarehouse::new(), MockModel::replying("unused"));

    let outcome = assistant.get_table_schema("orders").await;

    match outcome {
        TableSchemaOutcome::Success {
            table_name,
            schema,
            num_rows,
            size_bytes,
        } => {
            assert_eq!(table_name, "orders");
            assert_eq!(schema.len(), 1);
            assert_eq!(schema[0].name, "id");
            assert_eq!(num_rows, 42);
            assert_eq!(size_bytes, 1024);
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn table_schema_failure_names_the_table() {
    let assistant = assistant(
        MockWarehouse::failing_catalog("Not found: Table orders"),
        MockModel::replying("unused"),
    );

    let outcome = assistant.get_table_schema("orders").await;

    assert_eq!(
        outcome,
        TableSchemaOutcome::Failed {
            error: "Error getting schema for table orders: Not found: Table orders".to_string(),
        }
    );
}
