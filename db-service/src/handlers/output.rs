//! Write and batch execution handlers.

use axum::extract::State;
use axum::Json;
use tracing::warn;

use common::errors::{AppError, AppResult};
use common::models::query::{ExecuteData, ExecuteRequest, ExecuteSummary, StatementResult};
use common::response::ApiResponse;

use crate::adapter::DatabaseAdapter;
use crate::state::AppState;

/// Executes one statement or a batch on a saved connection.
///
/// Statements run sequentially. A duplicate-key or missing-table failure
/// aborts the batch with its mapped status; other failures are recorded
/// per statement and execution continues.
#[utoipa::path(
    post,
    path = "/api/output/execute",
    tag = "output",
    request_body = ExecuteRequest,
    responses(
        (status = 200, description = "Per-statement results", body = ApiResponse<ExecuteData>),
        (status = 400, description = "Missing parameters"),
        (status = 404, description = "A statement hit a missing table"),
        (status = 409, description = "A statement hit a duplicate key")
    )
)]
pub async fn execute_statements(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> AppResult<Json<ApiResponse<ExecuteData>>> {
    if req.connection_id == 0 {
        return Err(AppError::Validation(
            "Missing required parameter: connectionId".to_string(),
        ));
    }

    let statements = match (&req.batch, &req.sql) {
        (Some(batch), _) => batch.statements(),
        (None, Some(sql)) if !sql.trim().is_empty() => vec![sql.trim().to_string()],
        _ => {
            return Err(AppError::Validation(
                "Either sql or batch must be provided".to_string(),
            ))
        }
    };

    // A batch of only blank statements yields an empty result set, same
    // as running nothing.
    let adapter = state
        .registry
        .get_dynamic_connection(req.connection_id)
        .await?;

    let data = run_statements(adapter.as_ref(), &statements).await?;
    Ok(Json(ApiResponse::ok(data)))
}

/// Runs the statements in order, collecting a per-statement outcome.
///
/// Duplicate-key and missing-table failures abort immediately with their
/// mapped error; any other failure is recorded and the batch goes on.
async fn run_statements(
    adapter: &dyn DatabaseAdapter,
    statements: &[String],
) -> AppResult<ExecuteData> {
    let mut results = Vec::with_capacity(statements.len());
    let mut success = 0usize;

    for sql in statements {
        match adapter.query(sql, &[]).await {
            Ok(output) => {
                success += 1;
                results.push(StatementResult {
                    sql: sql.clone(),
                    success: true,
                    affected_rows: Some(output.affected_rows.unwrap_or(0)),
                    insert_id: output.last_insert_id,
                    error: None,
                });
            }
            Err(e) => {
                let message = e.to_string();
                let classified = AppError::from_statement_error(&message);
                match classified {
                    AppError::Conflict(_) | AppError::NotFound(_) => return Err(classified),
                    _ => {
                        warn!(sql = %sql, error = %message, "statement failed");
                        results.push(StatementResult {
                            sql: sql.clone(),
                            success: false,
                            affected_rows: None,
                            insert_id: None,
                            error: Some(message),
                        });
                    }
                }
            }
        }
    }

    let total = results.len();
    Ok(ExecuteData {
        results,
        summary: ExecuteSummary { total, success },
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::adapter::testing::ScriptedAdapter;

    fn batch(statements: &[&str]) -> Vec<String> {
        statements.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_duplicate_key_aborts_the_batch() {
        let adapter = ScriptedAdapter::live();
        adapter.fail_on("second", "Duplicate entry '1' for key 't.PRIMARY'");
        let statements = batch(&[
            "INSERT INTO t VALUES ('first')",
            "INSERT INTO t VALUES ('second')",
            "INSERT INTO t VALUES ('third')",
        ]);

        let err = run_statements(&adapter, &statements).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // The third statement never runs.
        assert_eq!(adapter.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_table_aborts_the_batch() {
        let adapter = ScriptedAdapter::live();
        adapter.fail_on("nope", "Table 'db.nope' doesn't exist");
        let statements = batch(&["INSERT INTO nope VALUES (1)"]);

        let err = run_statements(&adapter, &statements).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_plain_failure_is_recorded_and_batch_continues() {
        let adapter = ScriptedAdapter::live();
        adapter.fail_on("FORM", "syntax error near 'FORM'");
        let statements = batch(&[
            "INSERT INTO t VALUES (1)",
            "INSERT INTO t SELECT * FORM u",
            "INSERT INTO t VALUES (2)",
        ]);

        let data = run_statements(&adapter, &statements).await.unwrap();
        assert_eq!(data.summary.total, 3);
        assert_eq!(data.summary.success, 2);
        assert!(!data.results[1].success);
        assert!(data.results[1].error.as_deref().unwrap().contains("FORM"));
        assert_eq!(adapter.queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_batch_yields_empty_summary() {
        let adapter = ScriptedAdapter::live();
        let data = run_statements(&adapter, &[]).await.unwrap();
        assert!(data.results.is_empty());
        assert_eq!(data.summary.total, 0);
        assert_eq!(data.summary.success, 0);
    }
}
