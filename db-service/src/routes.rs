//! Route definitions.

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/test", post(handlers::test_connection))
        .route(
            "/api/connect",
            get(handlers::list_connections).post(handlers::create_connection),
        )
        .route(
            "/api/connect/{id}",
            put(handlers::update_connection).delete(handlers::delete_connection),
        )
        .route("/api/query/preview", post(handlers::preview))
        .route("/api/query/list-tables", post(handlers::list_tables))
        .route("/api/query/table-structure", post(handlers::table_structure))
        .route("/api/output/execute", post(handlers::execute_statements))
        .route("/api/health", get(handlers::health_check))
}
