//! Database connection manager service.
//!
//! Registers, tests and persists connections to external MySQL and
//! PostgreSQL databases, and runs queries, schema introspection and
//! write batches through them.

mod adapter;
mod handlers;
mod registry;
mod routes;
mod state;

use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "db-service";
const DEFAULT_PORT: u16 = 3000;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Database Connection Manager API",
        version = "0.1.0",
        description = "Registers external database connections and executes queries through them"
    ),
    paths(
        handlers::connections::test_connection,
        handlers::connections::create_connection,
        handlers::connections::list_connections,
        handlers::connections::update_connection,
        handlers::connections::delete_connection,
        handlers::query::preview,
        handlers::query::list_tables,
        handlers::query::table_structure,
        handlers::output::execute_statements,
        handlers::health_check,
    ),
    components(schemas(
        common::models::connection::DbType,
        common::models::connection::ConnectionParams,
        common::models::connection::SaveConnectionRequest,
        common::models::connection::ConnectionItem,
        common::models::query::QueryRequest,
        common::models::query::ListTablesRequest,
        common::models::query::TableStructureRequest,
        common::models::query::PreviewData,
        common::models::query::TableListData,
        common::models::query::TableStructureData,
        common::models::query::ExecuteRequest,
        common::models::query::ExecuteData,
        common::models::query::StatementResult,
        handlers::connections::SavedConnection,
        handlers::HealthResponse,
    )),
    tags(
        (name = "connections", description = "Connection registration and testing"),
        (name = "query", description = "Read-only queries and schema introspection"),
        (name = "output", description = "Write and batch execution"),
        (name = "health", description = "Health check")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything else
    load_dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config = AppConfig::load_with_service(SERVICE_NAME);
    config.port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let state = AppState::new(config.clone())
        .await
        .expect("Failed to initialize application state (check DATABASE_URL)");
    let registry = state.registry.clone();

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, "starting service");

    let listener = TcpListener::bind(&addr).await.expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .expect("server error");

    registry.shutdown().await;
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    if env_path.exists() {
        if let Ok(content) = std::fs::read_to_string(env_path) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim();
                    // Only set if not already set by the environment
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
        }
    }
}
