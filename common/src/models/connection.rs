//! Connection configuration models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::AppError;

/// Database type enumeration.
///
/// `Access` parses and serializes like the others but has no registered
/// backend; the factory rejects it and the configuration validator never
/// lets it through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// MySQL database.
    MySql,
    /// PostgreSQL database.
    PostgreSql,
    /// Microsoft Access file database.
    Access,
}

impl DbType {
    /// Returns the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DbType::MySql => Some(3306),
            DbType::PostgreSql => Some(5432),
            DbType::Access => None,
        }
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::MySql => write!(f, "mysql"),
            DbType::PostgreSql => write!(f, "postgresql"),
            DbType::Access => write!(f, "access"),
        }
    }
}

impl std::str::FromStr for DbType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(DbType::MySql),
            "postgresql" | "postgres" => Ok(DbType::PostgreSql),
            "access" => Ok(DbType::Access),
            other => Err(AppError::UnsupportedDatabaseType(other.to_string())),
        }
    }
}

/// Driver-level connection parameters, persisted as the JSON `config`
/// column of a saved connection.
///
/// Absent keys stay absent on the wire so a stored config deserializes
/// back to exactly what the client registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConnectionParams {
    /// Database host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Database port (backend default applies when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Login username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Login password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Database name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// File path for file-backed databases (Access).
    #[serde(rename = "filePath", skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Request body for registering, updating, or testing a connection.
///
/// `db_type` stays a raw string here: the allow-list check in
/// `utils::validation` runs before any parse so unknown types produce a
/// 400 with the supported list, not a deserialization failure.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SaveConnectionRequest {
    /// Connection display name, unique across all saved connections.
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    /// Database type string (`mysql`, `postgresql`).
    #[serde(rename = "type", default)]
    pub db_type: String,
    /// Driver connection parameters.
    #[serde(default)]
    pub config: Option<ConnectionParams>,
}

/// A saved connection configuration as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectionItem {
    /// Row id of the saved configuration.
    pub id: u64,
    /// Connection display name.
    pub name: String,
    /// Database type string.
    #[serde(rename = "type")]
    pub db_type: String,
    /// Driver connection parameters.
    pub config: ConnectionParams,
    /// Creation timestamp.
    pub created_at: String,
    /// Last-update timestamp.
    pub updated_at: String,
}
