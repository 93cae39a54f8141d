//! Query and execution models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for read-only query endpoints.
///
/// Fields default instead of hard-failing deserialization so a missing
/// field surfaces as a 400 from the handler, not a 422 from the extractor.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Id of the saved connection to query through.
    #[serde(default)]
    pub connection_id: u64,
    /// SQL text to run.
    #[serde(default)]
    pub sql: String,
}

/// Request body for listing the tables of a connection.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTablesRequest {
    /// Id of the saved connection.
    #[serde(default)]
    pub connection_id: u64,
}

/// Request body for describing a table.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableStructureRequest {
    /// Id of the saved connection.
    #[serde(default)]
    pub connection_id: u64,
    /// Table to describe.
    #[serde(default)]
    pub table_name: String,
}

/// Result-set column metadata.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldInfo {
    /// Column name.
    pub name: String,
    /// Driver-reported column type.
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Backend-neutral outcome of one executed statement.
///
/// Row-returning statements fill `rows`/`fields`; write statements fill
/// `affected_rows` and, where the backend reports one, `last_insert_id`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueryOutput {
    /// Result rows as JSON objects keyed by column name.
    pub rows: Vec<serde_json::Value>,
    /// Result-set column metadata.
    pub fields: Vec<FieldInfo>,
    /// Number of rows returned or affected.
    pub row_count: usize,
    /// Rows affected by a write statement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    /// Auto-increment id generated by an insert, when the backend has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<u64>,
}

/// One column of a table description.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared column type.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Key kind (`PRI`, `UNI`, `MUL`) where the backend reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Column default expression.
    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Extra attributes such as `auto_increment`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

/// Payload of a successful preview query.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewData {
    /// Result-set columns.
    pub columns: Vec<FieldInfo>,
    /// Result rows.
    pub rows: Vec<serde_json::Value>,
    /// The SQL that was executed, echoed back.
    pub sql: String,
    /// Id of the connection the query ran on.
    pub connection_id: u64,
    /// Number of rows returned.
    pub row_count: usize,
}

/// Payload of a table listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableListData {
    /// Table names visible in the connection's database.
    pub tables: Vec<String>,
    /// Id of the connection the listing came from.
    pub connection_id: u64,
}

/// Payload of a table description.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableStructureData {
    /// The described table.
    pub table_name: String,
    /// Column descriptions in ordinal order.
    pub columns: Vec<ColumnInfo>,
}

/// Request body for the write/batch execution endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// Id of the saved connection to execute through.
    #[serde(default)]
    pub connection_id: u64,
    /// A single statement to execute.
    #[serde(default)]
    pub sql: Option<String>,
    /// A batch of statements, as an array or a `;`-separated script.
    #[serde(default)]
    pub batch: Option<BatchInput>,
}

/// Batch input accepted in two shapes.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum BatchInput {
    /// An explicit list of statements.
    Statements(Vec<String>),
    /// A script split on `;`.
    Script(String),
}

impl BatchInput {
    /// Normalizes the batch into trimmed, non-empty statements.
    pub fn statements(&self) -> Vec<String> {
        match self {
            BatchInput::Statements(items) => items
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            BatchInput::Script(script) => script
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// Outcome of one statement in an execution batch.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatementResult {
    /// The executed statement.
    pub sql: String,
    /// Whether the statement succeeded.
    pub success: bool,
    /// Rows affected, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    /// Generated insert id, when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<u64>,
    /// Driver error message, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch execution summary counters.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecuteSummary {
    /// Total statements attempted.
    pub total: usize,
    /// Statements that succeeded.
    pub success: usize,
}

/// Payload of the execution endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecuteData {
    /// Per-statement outcomes in input order.
    pub results: Vec<StatementResult>,
    /// Aggregate counters.
    pub summary: ExecuteSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_array_trims_and_drops_blanks() {
        let batch = BatchInput::Statements(vec![
            "  INSERT INTO t VALUES (1) ".into(),
            "".into(),
            "   ".into(),
            "INSERT INTO t VALUES (2)".into(),
        ]);
        assert_eq!(
            batch.statements(),
            vec!["INSERT INTO t VALUES (1)", "INSERT INTO t VALUES (2)"]
        );
    }

    #[test]
    fn test_batch_script_splits_on_semicolons() {
        let batch = BatchInput::Script(
            "CREATE TABLE t (id INT); INSERT INTO t VALUES (1);\n".into(),
        );
        assert_eq!(
            batch.statements(),
            vec!["CREATE TABLE t (id INT)", "INSERT INTO t VALUES (1)"]
        );
    }

    #[test]
    fn test_batch_deserializes_both_shapes() {
        let req: ExecuteRequest = serde_json::from_str(
            r#"{"connectionId": 3, "batch": ["SELECT 1", "SELECT 2"]}"#,
        )
        .unwrap();
        assert_eq!(req.connection_id, 3);
        assert_eq!(req.batch.unwrap().statements().len(), 2);

        let req: ExecuteRequest =
            serde_json::from_str(r#"{"connectionId": 3, "batch": "SELECT 1; SELECT 2"}"#).unwrap();
        assert_eq!(req.batch.unwrap().statements().len(), 2);
    }

    #[test]
    fn test_missing_fields_default_instead_of_failing() {
        let req: QueryRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.connection_id, 0);
        assert!(req.sql.is_empty());
    }
}
