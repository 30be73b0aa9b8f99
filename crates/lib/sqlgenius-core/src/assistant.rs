//! Operation orchestration for the four assistant tools.
//!
//! Each operation is a stateless function of its arguments plus the two
//! injected collaborators. Collaborator failures never escape an operation;
//! they are converted into error-shaped outcomes at the boundary.

use crate::extract::extract_sql;
use crate::model::TextModel;
use crate::outcome::{ListTablesOutcome, NlQueryOutcome, SqlQueryOutcome, TableSchemaOutcome};
use crate::prompt::nl_query_prompt;
use crate::safety::is_query_allowed;
use crate::warehouse::QueryRunner;

const REJECTED_ERROR: &str = "Only SELECT queries are allowed";
const REJECTED_EXPLANATION: &str = "For security reasons, only SELECT queries are permitted.";
const NO_QUERY_ERROR: &str = "Could not generate valid SQL query";

/// Identifies the dataset the assistant serves.
#[derive(Debug, Clone)]
pub struct DatasetRef {
    pub project_id: String,
    pub dataset_id: String,
}

impl DatasetRef {
    #[must_use]
    pub const fn new(project_id: String, dataset_id: String) -> Self {
        Self {
            project_id,
            dataset_id,
        }
    }
}

/// Orchestrates the warehouse and model collaborators behind the tool
/// surface.
pub struct SqlAssistant<W, M> {
    dataset: DatasetRef,
    warehouse: W,
    model: M,
}

impl<W: QueryRunner, M: TextModel> SqlAssistant<W, M> {
    #[must_use]
    pub const fn new(dataset: DatasetRef, warehouse: W, model: M) -> Self {
        Self {
            dataset,
            warehouse,
            model,
        }
    }

    #[must_use]
    pub const fn dataset(&self) -> &DatasetRef {
        &self.dataset
    }

    /// Answers a free-text question: prompt the model once, extract a SQL
    /// candidate from the raw output, gate it, and only then execute it.
    pub async fn execute_nl_query(&self, question: &str) -> NlQueryOutcome {
        let tables = match self.warehouse.list_tables().await {
            Ok(tables) => tables,
            Err(err) => {
                return NlQueryOutcome::Failed {
                    error: err.to_string(),
                };
            }
        };

        let prompt = nl_query_prompt(&tables, question);
        let explanation = match self.model.generate(&prompt).await {
            Ok(text) => text,
            Err(err) => {
                return NlQueryOutcome::Failed {
                    error: err.to_string(),
                };
            }
        };

        let Some(query) = extract_sql(&explanation) else {
            tracing::debug!("no SQL candidate in model output");
            return NlQueryOutcome::Rejected {
                error: NO_QUERY_ERROR.to_string(),
                explanation,
            };
        };

        if !is_query_allowed(&query) {
            tracing::debug!(%query, "generated query rejected by safety gate");
            return NlQueryOutcome::Rejected {
                error: REJECTED_ERROR.to_string(),
                explanation: REJECTED_EXPLANATION.to_string(),
            };
        }

        tracing::info!(%query, "executing generated query");
        match self.warehouse.run_query(&query).await {
            Ok(result) => NlQueryOutcome::Success {
                query,
                result,
                explanation,
            },
            Err(err) => NlQueryOutcome::ExecutionFailed {
                error: format!("Error executing query: {err}"),
                query,
                explanation,
            },
        }
    }

    /// Runs a caller-supplied SQL statement verbatim, once it passes the
    /// gate.
    pub async fn execute_sql_query(&self, query: &str) -> SqlQueryOutcome {
        if !is_query_allowed(query) {
            tracing::debug!(%query, "query rejected by safety gate");
            return SqlQueryOutcome::Rejected {
                error: REJECTED_ERROR.to_string(),
                explanation: REJECTED_EXPLANATION.to_string(),
            };
        }

        match self.warehouse.run_query(query).await {
            Ok(result) => SqlQueryOutcome::Success {
                query: query.to_string(),
                result,
                success: true,
            },
            Err(err) => SqlQueryOutcome::ExecutionFailed {
                error: format!("Error executing query: {err}"),
                query: query.to_string(),
                success: false,
            },
        }
    }

    /// Lists catalog table identifiers for the configured dataset.
    pub async fn list_tables(&self) -> ListTablesOutcome {
        match self.warehouse.list_tables().await {
            Ok(tables) => ListTablesOutcome::Success {
                count: tables.len(),
                project_id: self.dataset.project_id.clone(),
                dataset_id: self.dataset.dataset_id.clone(),
                tables,
            },
            Err(err) => ListTablesOutcome::Failed {
                error: format!("Error listing tables: {err}"),
            },
        }
    }

    /// Fetches one table's schema from the catalog.
    pub async fn get_table_schema(&self, table_name: &str) -> TableSchemaOutcome {
        match self.warehouse.table_schema(table_name).await {
            Ok(schema) => schema.into(),
            Err(err) => TableSchemaOutcome::Failed {
                error: format!("Error getting schema for table {table_name}: {err}"),
            },
        }
    }
}
