//! Read-only query handlers.

use axum::extract::State;
use axum::Json;

use common::errors::{AppError, AppResult};
use common::models::query::{
    ListTablesRequest, PreviewData, QueryRequest, TableListData, TableStructureData,
    TableStructureRequest,
};
use common::response::ApiResponse;
use common::utils::sql_validator::SqlValidator;

use crate::state::AppState;

/// Runs a SELECT on a saved connection and returns the result set.
///
/// The adapter is resolved before the SQL gate, so an unknown
/// connection id reports as a missing config rather than bad SQL.
#[utoipa::path(
    post,
    path = "/api/query/preview",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Query result", body = ApiResponse<PreviewData>),
        (status = 400, description = "Missing parameters"),
        (status = 403, description = "Statement rejected by the SQL gate")
    )
)]
pub async fn preview(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> AppResult<Json<ApiResponse<PreviewData>>> {
    if req.connection_id == 0 || req.sql.trim().is_empty() {
        return Err(AppError::Validation(
            "Missing required parameters: connectionId and sql".to_string(),
        ));
    }

    let adapter = state
        .registry
        .get_dynamic_connection(req.connection_id)
        .await?;
    SqlValidator::validate_preview(&req.sql)?;

    let output = adapter.query(&req.sql, &[]).await?;
    Ok(Json(ApiResponse::ok(PreviewData {
        columns: output.fields,
        rows: output.rows,
        sql: req.sql,
        connection_id: req.connection_id,
        row_count: output.row_count,
    })))
}

/// Lists the tables of a saved connection's database.
#[utoipa::path(
    post,
    path = "/api/query/list-tables",
    tag = "query",
    request_body = ListTablesRequest,
    responses(
        (status = 200, description = "Table names", body = ApiResponse<TableListData>),
        (status = 500, description = "Unknown connection or query failure")
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Json(req): Json<ListTablesRequest>,
) -> AppResult<Json<ApiResponse<TableListData>>> {
    // A missing id falls through to the registry lookup and reports as
    // an unknown config.
    let adapter = state
        .registry
        .get_dynamic_connection(req.connection_id)
        .await?;
    let tables = adapter.list_tables().await?;

    Ok(Json(ApiResponse::ok(TableListData {
        tables,
        connection_id: req.connection_id,
    })))
}

/// Describes the columns of one table.
#[utoipa::path(
    post,
    path = "/api/query/table-structure",
    tag = "query",
    request_body = TableStructureRequest,
    responses(
        (status = 200, description = "Column descriptions", body = ApiResponse<TableStructureData>),
        (status = 500, description = "Unknown connection or query failure")
    )
)]
pub async fn table_structure(
    State(state): State<AppState>,
    Json(req): Json<TableStructureRequest>,
) -> AppResult<Json<ApiResponse<TableStructureData>>> {
    let adapter = state
        .registry
        .get_dynamic_connection(req.connection_id)
        .await?;
    let columns = adapter.table_structure(&req.table_name).await?;

    Ok(Json(ApiResponse::ok(TableStructureData {
        table_name: req.table_name,
        columns,
    })))
}
