//! Service configuration loaded from the environment.

use std::env;

/// Runtime configuration shared by the services.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name used in logs and response metadata.
    pub service_name: String,
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Connection URL of the primary configuration-store database.
    pub database_url: String,
    /// Maximum size of the primary connection pool.
    pub pool_limit: u32,
    /// Connect/acquire timeout in seconds. Exhaustion fails fast, nothing queues.
    pub connect_timeout_secs: u64,
}

impl AppConfig {
    /// Loads the configuration from the environment for the given service.
    ///
    /// `DATABASE_URL` wins when set; otherwise the URL is assembled from the
    /// individual `DB_*` variables with local-development defaults.
    pub fn load_with_service(service_name: &str) -> Self {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            let host = env_or("DB_HOST", "localhost");
            let port = env_or("DB_PORT", "3306");
            let user = env_or("DB_USER", "root");
            let password = env::var("DB_PASSWORD").unwrap_or_default();
            let database = env_or("DB_NAME", "connection_manager");
            format!("mysql://{}:{}@{}:{}/{}", user, password, host, port, database)
        });

        Self {
            service_name: service_name.to_string(),
            host: env_or("SERVER_HOST", "0.0.0.0"),
            port: env::var("SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url,
            pool_limit: parse_env("DB_POOL_LIMIT", 10),
            connect_timeout_secs: parse_env("DB_CONNECT_TIMEOUT_SECS", 5),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
