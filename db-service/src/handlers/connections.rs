//! Connection management handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::{AppError, AppResult};
use common::models::connection::{ConnectionItem, ConnectionParams, SaveConnectionRequest};
use common::response::ApiResponse;
use common::utils::validation::validate_connection_config;

use crate::adapter::factory;
use crate::state::AppState;

/// A freshly saved connection, echoed back with its generated id.
#[derive(Serialize, ToSchema)]
pub struct SavedConnection {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub db_type: String,
    pub config: ConnectionParams,
}

/// Tests connectivity of submitted parameters without saving them.
#[utoipa::path(
    post,
    path = "/api/test",
    tag = "connections",
    request_body = SaveConnectionRequest,
    responses(
        (status = 200, description = "Connection works", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid parameters or connection failed")
    )
)]
pub async fn test_connection(
    Json(req): Json<SaveConnectionRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let params = validate_connection_config(&req)?.clone();
    let db_type = factory::resolve(&req.db_type)?;
    let adapter = factory::create(db_type, params.clone())?;

    if !adapter.test_connection().await {
        return Err(AppError::Validation("Connection test failed".to_string()));
    }

    Ok(Json(ApiResponse::ok_with_message(
        json!({
            "database": params.database,
            "port": params.port.or(db_type.default_port()),
        }),
        format!("{} connection successful", db_type),
    )))
}

/// Registers a new connection after verifying it actually works.
#[utoipa::path(
    post,
    path = "/api/connect",
    tag = "connections",
    request_body = SaveConnectionRequest,
    responses(
        (status = 200, description = "Connection saved", body = ApiResponse<SavedConnection>),
        (status = 400, description = "Invalid parameters, duplicate name or unreachable database")
    )
)]
pub async fn create_connection(
    State(state): State<AppState>,
    Json(req): Json<SaveConnectionRequest>,
) -> AppResult<Json<ApiResponse<SavedConnection>>> {
    let params = validate_connection_config(&req)?.clone();
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let db_type = factory::resolve(&req.db_type)?;
    let adapter = factory::create(db_type, params.clone())?;

    if !adapter.test_connection().await {
        return Err(AppError::Validation("Connection test failed".to_string()));
    }

    if state.registry.find_by_name(&req.name, None).await? {
        return Err(AppError::Validation(
            "Connection name already exists".to_string(),
        ));
    }

    let id = state
        .registry
        .insert_config(&req.name, &db_type.to_string(), &params)
        .await?;
    info!(connection_id = id, name = %req.name, "connection saved");

    Ok(Json(ApiResponse::ok_with_message(
        SavedConnection {
            id,
            name: req.name,
            db_type: db_type.to_string(),
            config: params,
        },
        "Connection saved",
    )))
}

/// Lists all saved connections.
#[utoipa::path(
    get,
    path = "/api/connect",
    tag = "connections",
    responses(
        (status = 200, description = "Saved connections", body = ApiResponse<Vec<ConnectionItem>>)
    )
)]
pub async fn list_connections(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<ConnectionItem>>>> {
    let items = state.registry.list_configs().await?;
    Ok(Json(ApiResponse::ok(items)))
}

/// Updates a saved connection after re-verifying the new parameters.
///
/// A cached live adapter for the id keeps serving with the old
/// parameters until it dies or is released.
#[utoipa::path(
    put,
    path = "/api/connect/{id}",
    tag = "connections",
    params(
        ("id" = u64, Path, description = "Connection id")
    ),
    request_body = SaveConnectionRequest,
    responses(
        (status = 200, description = "Connection updated", body = ApiResponse<SavedConnection>),
        (status = 400, description = "Invalid parameters, duplicate name or unreachable database")
    )
)]
pub async fn update_connection(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<SaveConnectionRequest>,
) -> AppResult<Json<ApiResponse<SavedConnection>>> {
    let params = validate_connection_config(&req)?.clone();
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let db_type = factory::resolve(&req.db_type)?;
    let adapter = factory::create(db_type, params.clone())?;

    if !adapter.test_connection().await {
        return Err(AppError::Validation("Connection test failed".to_string()));
    }

    if state.registry.find_by_name(&req.name, Some(id)).await? {
        return Err(AppError::Validation(
            "Connection name already exists".to_string(),
        ));
    }

    state
        .registry
        .update_config(id, &req.name, &db_type.to_string(), &params)
        .await?;
    info!(connection_id = id, name = %req.name, "connection updated");

    Ok(Json(ApiResponse::ok(SavedConnection {
        id,
        name: req.name,
        db_type: db_type.to_string(),
        config: params,
    })))
}

/// Deletes a saved connection and closes its live adapter if cached.
#[utoipa::path(
    delete,
    path = "/api/connect/{id}",
    tag = "connections",
    params(
        ("id" = u64, Path, description = "Connection id")
    ),
    responses(
        (status = 200, description = "Connection deleted"),
        (status = 404, description = "No such connection")
    )
)]
pub async fn delete_connection(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<ApiResponse<()>>> {
    if !state.registry.config_exists(id).await? {
        return Err(AppError::NotFound("Connection not found".to_string()));
    }

    state.registry.delete_config(id).await?;
    state.registry.release_connection(id).await;
    info!(connection_id = id, "connection deleted");

    Ok(Json(ApiResponse::success("Connection deleted")))
}
