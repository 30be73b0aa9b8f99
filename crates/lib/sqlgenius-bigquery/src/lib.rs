//! BigQuery REST implementation of the warehouse collaborator.
//!
//! Speaks the v2 API directly over HTTP: `jobs.query` (with
//! `getQueryResults` polling for long-running statements), `tables.list`,
//! and `tables.get`. Authentication is a caller-supplied OAuth access
//! token; acquiring and refreshing it is outside this crate.

mod rows;

use async_trait::async_trait;
use serde_json::json;
use sqlgenius_core::warehouse::{
    QueryRunner,
    Row,
    SchemaField,
    TableSchema,
    WarehouseError,
    WarehouseResult,
};
use uuid::Uuid;

use crate::rows::{ErrorResponse, QueryResponse, TableList, TableResource, decode_rows};

const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Warehouse client bound to one project and dataset for its lifetime.
pub struct BigQueryClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    project_id: String,
    dataset_id: String,
}

impl BigQueryClient {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        project_id: String,
        dataset_id: String,
        access_token: String,
    ) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token,
            project_id,
            dataset_id,
        }
    }

    /// Points the client at a different API endpoint (emulators, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> WarehouseResult<T> {
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| WarehouseError::Transport(err.to_string()))?;
        Self::decode_response(response).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> WarehouseResult<T> {
        let response = self
            .http
            .post(url)
            .json(body)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| WarehouseError::Transport(err.to_string()))?;
        Self::decode_response(response).await
    }

    async fn decode_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> WarehouseResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<ErrorResponse>().await {
                Ok(body) => WarehouseError::Api(body.error.message),
                Err(_) => WarehouseError::Api(format!("HTTP {status}")),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|err| WarehouseError::Decode(err.to_string()))
    }

    /// Polls `getQueryResults` until the job reports completion.
    async fn wait_for_completion(&self, first: QueryResponse) -> WarehouseResult<QueryResponse> {
        let mut current = first;
        while !current.job_complete {
            let job = current.job_reference.take().ok_or_else(|| {
                WarehouseError::Decode("incomplete job without a job reference".to_string())
            })?;
            tracing::debug!(job_id = %job.job_id, "query still running, polling");
            let url = format!(
                "{}/projects/{}/queries/{}",
                self.base_url, self.project_id, job.job_id
            );
            let location = job.location.clone();
            let mut params: Vec<(&str, &str)> = vec![("timeoutMs", "10000")];
            if let Some(location) = location.as_deref() {
                params.push(("location", location));
            }
            let mut next: QueryResponse = self.get_json(&url, &params).await?;
            // Later pages of the same job may omit the reference.
            if next.job_reference.is_none() {
                next.job_reference = Some(job);
            }
            current = next;
        }
        Ok(current)
    }
}

#[async_trait]
impl QueryRunner for BigQueryClient {
    async fn run_query(&self, sql: &str) -> WarehouseResult<Vec<Row>> {
        let url = format!("{}/projects/{}/queries", self.base_url, self.project_id);
        let body = json!({
            "query": sql,
            "useLegacySql": false,
            "requestId": format!("sqlgenius-{}", Uuid::new_v4()),
        });
        let first: QueryResponse = self.post_json(&url, &body).await?;
        let complete = self.wait_for_completion(first).await?;

        let Some(schema) = complete.schema.as_ref() else {
            // Statements without a result set (rare for gated queries).
            return Ok(Vec::new());
        };
        Ok(decode_rows(schema, &complete.rows))
    }

    async fn list_tables(&self) -> WarehouseResult<Vec<String>> {
        let url = format!(
            "{}/projects/{}/datasets/{}/tables",
            self.base_url, self.project_id, self.dataset_id
        );
        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params: Vec<(&str, &str)> = vec![("maxResults", "1000")];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }
            let page: TableList = self.get_json(&url, &params).await?;
            tables.extend(
                page.tables
                    .into_iter()
                    .map(|entry| entry.table_reference.table_id),
            );
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(tables)
    }

    async fn table_schema(&self, table_name: &str) -> WarehouseResult<TableSchema> {
        let url = format!(
            "{}/projects/{}/datasets/{}/tables/{}",
            self.base_url, self.project_id, self.dataset_id, table_name
        );
        let resource: TableResource = self.get_json(&url, &[]).await?;

        let schema = resource
            .schema
            .map(|list| {
                list.fields
                    .into_iter()
                    .map(|field| SchemaField {
                        name: field.name,
                        field_type: field.field_type,
                        description: field.description,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(TableSchema {
            table_name: table_name.to_string(),
            schema,
            num_rows: parse_count(resource.num_rows.as_deref(), "numRows")?,
            size_bytes: parse_count(resource.num_bytes.as_deref(), "numBytes")?,
        })
    }
}

/// Int64 counters come back as decimal strings on the wire.
fn parse_count(raw: Option<&str>, field: &str) -> WarehouseResult<u64> {
    raw.map_or(Ok(0), |text| {
        text.parse()
            .map_err(|_| WarehouseError::Decode(format!("non-numeric {field}: {text}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_parse_from_wire_strings() {
        assert_eq!(parse_count(Some("1024"), "numBytes").unwrap(), 1024);
        assert_eq!(parse_count(None, "numRows").unwrap(), 0);
        assert!(parse_count(Some("lots"), "numRows").is_err());
    }

    #[test]
    fn base_url_override_is_applied() {
        let client = BigQueryClient::new(
            reqwest::Client::new(),
            "p".to_string(),
            "d".to_string(),
            "token".to_string(),
        )
        .with_base_url("http://127.0.0.1:9050/bigquery/v2");
        assert_eq!(client.base_url, "http://127.0.0.1:9050/bigquery/v2");
    }
}
