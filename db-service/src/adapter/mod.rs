//! Database adapters.
//!
//! One adapter per backend behind a common object-safe trait. Each
//! adapter wraps a single driver connection guarded by a mutex, matching
//! the one-session-per-saved-connection model of the service.

pub mod factory;
pub mod mysql;
pub mod postgres;

use async_trait::async_trait;

use common::errors::AppResult;
use common::models::query::{ColumnInfo, QueryOutput};

/// Backend-neutral operations over one live database connection.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Opens the underlying driver connection.
    async fn connect(&self) -> AppResult<()>;

    /// Runs one statement with optional positional parameters.
    async fn query(&self, sql: &str, params: &[serde_json::Value]) -> AppResult<QueryOutput>;

    /// Probes liveness with a fresh short-lived connection. Never errors.
    async fn test_connection(&self) -> bool;

    /// Lists the tables of the connection's database.
    async fn list_tables(&self) -> AppResult<Vec<String>>;

    /// Describes the columns of a table.
    async fn table_structure(&self, table: &str) -> AppResult<Vec<ColumnInfo>>;

    /// Closes the underlying connection. Safe to call more than once.
    async fn end(&self) -> AppResult<()>;
}

/// Whether a statement produces a result set rather than an affected-row
/// count. Decides fetch vs execute in the adapters.
pub(crate) fn returns_rows(sql: &str) -> bool {
    let upper = sql.trim_start().to_uppercase();
    ["SELECT", "SHOW", "DESCRIBE", "EXPLAIN", "WITH"]
        .iter()
        .any(|prefix| upper.starts_with(prefix))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use common::errors::{AppError, AppResult};
    use common::models::query::{ColumnInfo, QueryOutput};

    use super::DatabaseAdapter;

    /// In-memory adapter for exercising cache and batch logic.
    pub(crate) struct ScriptedAdapter {
        pub alive: AtomicBool,
        pub ends: AtomicUsize,
        pub queries: AtomicUsize,
        failures: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedAdapter {
        pub fn live() -> Self {
            Self {
                alive: AtomicBool::new(true),
                ends: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
                failures: Mutex::new(Vec::new()),
            }
        }

        /// Makes any statement containing `needle` fail with `message`.
        pub fn fail_on(&self, needle: &str, message: &str) {
            self.failures
                .lock()
                .unwrap()
                .push((needle.to_string(), message.to_string()));
        }
    }

    #[async_trait]
    impl DatabaseAdapter for ScriptedAdapter {
        async fn connect(&self) -> AppResult<()> {
            Ok(())
        }

        async fn query(&self, sql: &str, _params: &[serde_json::Value]) -> AppResult<QueryOutput> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            for (needle, message) in self.failures.lock().unwrap().iter() {
                if sql.contains(needle) {
                    return Err(AppError::DatabaseQuery(message.clone()));
                }
            }
            Ok(QueryOutput {
                rows: Vec::new(),
                fields: Vec::new(),
                row_count: 1,
                affected_rows: Some(1),
                last_insert_id: None,
            })
        }

        async fn test_connection(&self) -> bool {
            self.alive.load(Ordering::SeqCst)
        }

        async fn list_tables(&self) -> AppResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn table_structure(&self, _table: &str) -> AppResult<Vec<ColumnInfo>> {
            Ok(Vec::new())
        }

        async fn end(&self) -> AppResult<()> {
            self.ends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_rows_classification() {
        assert!(returns_rows("SELECT 1"));
        assert!(returns_rows("  show tables"));
        assert!(returns_rows("WITH t AS (SELECT 1) SELECT * FROM t"));
        assert!(!returns_rows("INSERT INTO t VALUES (1)"));
        assert!(!returns_rows("CREATE TABLE t (id INT)"));
    }
}
