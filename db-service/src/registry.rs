//! Connection registry.
//!
//! Owns the configuration store (a MySQL pool over the `connections`
//! table) and the cache of live adapters keyed by configuration id.
//! Adapters are created lazily on first use and verified with a probe
//! on every cache hit, so a dead cached connection is evicted and
//! rebuilt transparently.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::mysql::MySqlPoolOptions;
use sqlx::{FromRow, MySqlPool};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{info, warn};

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::connection::{ConnectionItem, ConnectionParams, DbType};

use crate::adapter::{factory, DatabaseAdapter};

/// DDL for the configuration store, applied at startup.
const ENSURE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS `connections` (
    `id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT,
    `name` VARCHAR(100) NOT NULL,
    `type` VARCHAR(32) NOT NULL,
    `config` TEXT NOT NULL,
    `created_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    `updated_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
    PRIMARY KEY (`id`),
    UNIQUE KEY `uk_connections_name` (`name`)
)
"#;

/// A row of the `connections` table.
#[derive(Debug, FromRow)]
struct ConnectionRow {
    id: u64,
    name: String,
    db_type: String,
    config: String,
    created_at: String,
    updated_at: String,
}

impl ConnectionRow {
    fn into_item(self) -> AppResult<ConnectionItem> {
        let config: ConnectionParams = serde_json::from_str(&self.config)
            .map_err(|e| AppError::InvalidConfig(e.to_string()))?;
        Ok(ConnectionItem {
            id: self.id,
            name: self.name,
            db_type: self.db_type,
            config,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, name, `type` AS db_type, config, \
     CAST(created_at AS CHAR) AS created_at, CAST(updated_at AS CHAR) AS updated_at \
     FROM connections";

/// Cache of live adapters keyed by configuration id.
///
/// Adapter construction is injected per lookup, so the probe, evict and
/// rebuild cycle stands on its own without a real driver behind it.
struct AdapterCache {
    adapters: RwLock<HashMap<u64, Arc<dyn DatabaseAdapter>>>,
}

impl AdapterCache {
    fn new() -> Self {
        Self {
            adapters: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached adapter for the id if it probes alive,
    /// otherwise evicts it and builds a fresh one. Two requests racing
    /// on a cold id may each build an adapter, the later insert wins
    /// and the loser is dropped when its caller finishes.
    async fn get_or_rebuild<F, Fut>(&self, id: u64, build: F) -> AppResult<Arc<dyn DatabaseAdapter>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Arc<dyn DatabaseAdapter>>>,
    {
        let cached = self.adapters.read().await.get(&id).cloned();
        if let Some(adapter) = cached {
            if adapter.test_connection().await {
                return Ok(adapter);
            }
            warn!(connection_id = id, "cached connection is dead, rebuilding");
            self.adapters.write().await.remove(&id);
            if let Err(e) = adapter.end().await {
                warn!(connection_id = id, error = %e, "failed to close dead connection");
            }
        }

        let adapter = build().await?;
        self.adapters.write().await.insert(id, adapter.clone());
        Ok(adapter)
    }

    async fn remove(&self, id: u64) -> Option<Arc<dyn DatabaseAdapter>> {
        self.adapters.write().await.remove(&id)
    }

    async fn drain(&self) -> Vec<(u64, Arc<dyn DatabaseAdapter>)> {
        self.adapters.write().await.drain().collect()
    }

    async fn len(&self) -> usize {
        self.adapters.read().await.len()
    }
}

/// Parses the `type` column of a persisted row.
///
/// Unlike a type string arriving in a request body, an unknown stored
/// type means the row itself is bad, so it reports as a 500-class
/// configuration error rather than a client mistake.
fn parse_stored_type(raw: &str) -> AppResult<DbType> {
    raw.parse().map_err(|_| {
        AppError::InvalidConfig(format!("unsupported stored database type: {}", raw))
    })
}

/// Builds a live adapter from a persisted row.
///
/// Any defect in the stored row, an unknown type string or a known type
/// with no registered backend, reports as a configuration error rather
/// than a client mistake.
async fn adapter_from_item(item: ConnectionItem) -> AppResult<Arc<dyn DatabaseAdapter>> {
    let db_type = parse_stored_type(&item.db_type)?;
    factory::create_connected(db_type, item.config)
        .await
        .map_err(|e| match e {
            AppError::UnsupportedDatabaseType(t) => {
                AppError::InvalidConfig(format!("no adapter registered for stored type: {}", t))
            }
            other => other,
        })
}

/// Registry of saved connection configurations and live adapters.
pub struct ConnectionRegistry {
    meta_pool: MySqlPool,
    cache: AdapterCache,
}

impl ConnectionRegistry {
    /// Connects to the configuration store and ensures its schema.
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let meta_pool = MySqlPoolOptions::new()
            .max_connections(config.pool_limit)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

        sqlx::raw_sql(ENSURE_TABLE_SQL)
            .execute(&meta_pool)
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

        info!("connection registry ready");
        Ok(Self {
            meta_pool,
            cache: AdapterCache::new(),
        })
    }

    /// Returns a live adapter for the saved connection id.
    ///
    /// A cached adapter is probed first; a dead one is evicted and the
    /// connection is rebuilt from the stored configuration.
    pub async fn get_dynamic_connection(&self, id: u64) -> AppResult<Arc<dyn DatabaseAdapter>> {
        self.cache
            .get_or_rebuild(id, || async move {
                let item = self
                    .get_config(id)
                    .await?
                    .ok_or(AppError::ConfigNotFound(id))?;
                let db_type = item.db_type.clone();
                let adapter = adapter_from_item(item).await?;
                info!(connection_id = id, db_type = %db_type, "dynamic connection established");
                Ok(adapter)
            })
            .await
    }

    /// Drops the cached adapter for an id and closes it.
    pub async fn release_connection(&self, id: u64) {
        if let Some(adapter) = self.cache.remove(id).await {
            if let Err(e) = adapter.end().await {
                warn!(connection_id = id, error = %e, "failed to close connection");
            } else {
                info!(connection_id = id, "connection released");
            }
        }
    }

    /// Closes all cached adapters and the configuration store pool.
    pub async fn shutdown(&self) {
        let mut tasks = JoinSet::new();
        for (id, adapter) in self.cache.drain().await {
            tasks.spawn(async move {
                if let Err(e) = adapter.end().await {
                    warn!(connection_id = id, error = %e, "failed to close connection");
                }
            });
        }
        while tasks.join_next().await.is_some() {}
        self.meta_pool.close().await;
        info!("connection registry shut down");
    }

    /// Number of live cached adapters.
    pub async fn connection_count(&self) -> usize {
        self.cache.len().await
    }

    /// Inserts a configuration and returns its generated id.
    pub async fn insert_config(
        &self,
        name: &str,
        db_type: &str,
        params: &ConnectionParams,
    ) -> AppResult<u64> {
        let config = serde_json::to_string(params)
            .map_err(|e| AppError::InvalidConfig(e.to_string()))?;
        let result = sqlx::query("INSERT INTO connections (name, `type`, config) VALUES (?, ?, ?)")
            .bind(name)
            .bind(db_type)
            .bind(config)
            .execute(&self.meta_pool)
            .await
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        Ok(result.last_insert_id())
    }

    /// Overwrites the name, type and parameters of a saved configuration.
    pub async fn update_config(
        &self,
        id: u64,
        name: &str,
        db_type: &str,
        params: &ConnectionParams,
    ) -> AppResult<()> {
        let config = serde_json::to_string(params)
            .map_err(|e| AppError::InvalidConfig(e.to_string()))?;
        sqlx::query(
            "UPDATE connections SET name = ?, `type` = ?, config = ?, updated_at = NOW() \
             WHERE id = ?",
        )
        .bind(name)
        .bind(db_type)
        .bind(config)
        .bind(id)
        .execute(&self.meta_pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        Ok(())
    }

    /// Deletes a saved configuration. Returns whether a row was removed.
    pub async fn delete_config(&self, id: u64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM connections WHERE id = ?")
            .bind(id)
            .execute(&self.meta_pool)
            .await
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Loads one configuration by id.
    pub async fn get_config(&self, id: u64) -> AppResult<Option<ConnectionItem>> {
        let row: Option<ConnectionRow> =
            sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.meta_pool)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        row.map(ConnectionRow::into_item).transpose()
    }

    /// Loads all configurations, newest first.
    pub async fn list_configs(&self) -> AppResult<Vec<ConnectionItem>> {
        let rows: Vec<ConnectionRow> =
            sqlx::query_as(&format!("{} ORDER BY id DESC", SELECT_COLUMNS))
                .fetch_all(&self.meta_pool)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        rows.into_iter().map(ConnectionRow::into_item).collect()
    }

    /// Checks whether a name is already taken, optionally excluding one id.
    pub async fn find_by_name(&self, name: &str, exclude: Option<u64>) -> AppResult<bool> {
        let count: (i64,) = match exclude {
            Some(id) => {
                sqlx::query_as("SELECT COUNT(*) FROM connections WHERE name = ? AND id != ?")
                    .bind(name)
                    .bind(id)
                    .fetch_one(&self.meta_pool)
                    .await
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM connections WHERE name = ?")
                    .bind(name)
                    .fetch_one(&self.meta_pool)
                    .await
            }
        }
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        Ok(count.0 > 0)
    }

    /// Checks whether a configuration id exists.
    pub async fn config_exists(&self, id: u64) -> AppResult<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM connections WHERE id = ?")
            .bind(id)
            .fetch_one(&self.meta_pool)
            .await
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        Ok(count.0 > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::adapter::testing::ScriptedAdapter;

    fn live_adapter() -> Arc<ScriptedAdapter> {
        Arc::new(ScriptedAdapter::live())
    }

    #[tokio::test]
    async fn test_live_adapter_is_reused_without_rebuilding() {
        let cache = AdapterCache::new();
        let first = live_adapter();

        let stored = cache
            .get_or_rebuild(1, || {
                let a = first.clone();
                async move { Ok(a as Arc<dyn DatabaseAdapter>) }
            })
            .await
            .unwrap();

        // The second lookup must hit the cache, a builder invocation
        // would fail the call.
        let again = cache
            .get_or_rebuild(1, || async { Err(AppError::ConfigNotFound(1)) })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&stored, &again));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_dead_adapter_is_evicted_closed_and_rebuilt() {
        let cache = AdapterCache::new();
        let dead = live_adapter();
        cache
            .get_or_rebuild(2, || {
                let a = dead.clone();
                async move { Ok(a as Arc<dyn DatabaseAdapter>) }
            })
            .await
            .unwrap();

        dead.alive.store(false, Ordering::SeqCst);

        let replacement = live_adapter();
        let rebuilt = cache
            .get_or_rebuild(2, || {
                let a = replacement.clone();
                async move { Ok(a as Arc<dyn DatabaseAdapter>) }
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(
            &rebuilt,
            &(replacement.clone() as Arc<dyn DatabaseAdapter>)
        ));
        assert_eq!(dead.ends.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_removed_adapter_reconnects_on_next_lookup() {
        let cache = AdapterCache::new();
        let first = live_adapter();
        cache
            .get_or_rebuild(3, || {
                let a = first.clone();
                async move { Ok(a as Arc<dyn DatabaseAdapter>) }
            })
            .await
            .unwrap();

        let removed = cache.remove(3).await.expect("adapter was cached");
        removed.end().await.unwrap();
        assert_eq!(cache.len().await, 0);

        let second = live_adapter();
        let rebuilt = cache
            .get_or_rebuild(3, || {
                let a = second.clone();
                async move { Ok(a as Arc<dyn DatabaseAdapter>) }
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(
            &rebuilt,
            &(second.clone() as Arc<dyn DatabaseAdapter>)
        ));
        assert_eq!(first.ends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drain_empties_the_cache() {
        let cache = AdapterCache::new();
        for id in 1..=3u64 {
            let adapter = live_adapter();
            cache
                .get_or_rebuild(id, || async move { Ok(adapter as Arc<dyn DatabaseAdapter>) })
                .await
                .unwrap();
        }
        assert_eq!(cache.drain().await.len(), 3);
        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn test_stored_type_parses_known_types() {
        assert_eq!(parse_stored_type("mysql").unwrap(), DbType::MySql);
        assert_eq!(parse_stored_type("postgresql").unwrap(), DbType::PostgreSql);
    }

    #[test]
    fn test_unknown_stored_type_is_a_config_error() {
        let err = parse_stored_type("oracle").unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
        assert_eq!(
            err.status_code(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_stored_row_with_unregistered_backend_is_a_config_error() {
        let item = ConnectionItem {
            id: 9,
            name: "legacy".to_string(),
            db_type: "access".to_string(),
            config: ConnectionParams::default(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        let err = adapter_from_item(item).await.err().unwrap();
        assert!(matches!(err, AppError::InvalidConfig(_)));
        assert_eq!(
            err.status_code(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
