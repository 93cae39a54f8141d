//! Adapter factory.
//!
//! Maps a database type to its adapter. `access` is a known type with no
//! registered adapter, asking for it is an error rather than a panic.

use std::sync::Arc;

use common::errors::{AppError, AppResult};
use common::models::connection::{ConnectionParams, DbType};

use super::mysql::MySqlAdapter;
use super::postgres::PostgresAdapter;
use super::DatabaseAdapter;

/// Parses a type string into a known database type.
pub fn resolve(type_str: &str) -> AppResult<DbType> {
    type_str.parse()
}

/// Builds an adapter for the type without opening a connection.
pub fn create(db_type: DbType, params: ConnectionParams) -> AppResult<Arc<dyn DatabaseAdapter>> {
    match db_type {
        DbType::MySql => Ok(Arc::new(MySqlAdapter::new(params))),
        DbType::PostgreSql => Ok(Arc::new(PostgresAdapter::new(params))),
        DbType::Access => Err(AppError::UnsupportedDatabaseType(db_type.to_string())),
    }
}

/// Builds an adapter and opens its connection.
pub async fn create_connected(
    db_type: DbType,
    params: ConnectionParams,
) -> AppResult<Arc<dyn DatabaseAdapter>> {
    let adapter = create(db_type, params)?;
    adapter.connect().await?;
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(resolve("MySQL").unwrap(), DbType::MySql);
        assert_eq!(resolve("postgres").unwrap(), DbType::PostgreSql);
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        assert!(matches!(
            resolve("sqlite"),
            Err(AppError::UnsupportedDatabaseType(_))
        ));
    }

    #[test]
    fn test_access_has_no_adapter() {
        assert!(matches!(
            create(DbType::Access, ConnectionParams::default()),
            Err(AppError::UnsupportedDatabaseType(_))
        ));
    }

    #[test]
    fn test_supported_types_build_adapters() {
        assert!(create(DbType::MySql, ConnectionParams::default()).is_ok());
        assert!(create(DbType::PostgreSql, ConnectionParams::default()).is_ok());
    }
}
