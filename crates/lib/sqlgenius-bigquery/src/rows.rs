//! Wire shapes for the BigQuery v2 REST API and row decoding.
//!
//! Query results arrive as `f`/`v` cell lists that only make sense zipped
//! against the response schema; scalar values are strings on the wire.

use serde::Deserialize;
use serde_json::Value;
use sqlgenius_core::warehouse::Row;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub job_complete: bool,
    pub job_reference: Option<JobReference>,
    pub schema: Option<ResponseSchema>,
    #[serde(default)]
    pub rows: Vec<WireRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobReference {
    pub job_id: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseSchema {
    #[serde(default)]
    pub fields: Vec<ResponseField>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRow {
    #[serde(default)]
    pub f: Vec<WireCell>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCell {
    #[serde(default)]
    pub v: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableList {
    #[serde(default)]
    pub tables: Vec<TableListEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableListEntry {
    pub table_reference: TableReference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableReference {
    pub table_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableResource {
    pub schema: Option<TableFieldList>,
    pub num_rows: Option<String>,
    pub num_bytes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TableFieldList {
    #[serde(default)]
    pub fields: Vec<TableField>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TableField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

/// Zips wire rows against the response schema into name-keyed rows.
pub(crate) fn decode_rows(schema: &ResponseSchema, rows: &[WireRow]) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            schema
                .fields
                .iter()
                .zip(row.f.iter())
                .map(|(field, cell)| (field.name.clone(), coerce(&field.field_type, &cell.v)))
                .collect()
        })
        .collect()
}

/// Coerces string-encoded scalars into native JSON values; anything else
/// (timestamps, records, repeated fields) passes through as returned.
fn coerce(field_type: &str, value: &Value) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    match field_type {
        "INTEGER" | "INT64" => text
            .parse::<i64>()
            .map_or_else(|_| value.clone(), Value::from),
        "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => text
            .parse::<f64>()
            .map_or_else(|_| value.clone(), Value::from),
        "BOOLEAN" | "BOOL" => match text.as_str() {
            "true" => Value::from(true),
            "false" => Value::from(false),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}
