//! Connection configuration validation.

use crate::errors::{AppError, AppResult};
use crate::models::connection::{ConnectionParams, SaveConnectionRequest};

/// Database types that can actually be registered. `access` parses as a
/// type string but is not on this list, so it never reaches the factory.
pub const SUPPORTED_TYPES: [&str; 2] = ["mysql", "postgresql"];

/// Validates a save/test request and returns its connection parameters.
///
/// Checks run in order and the first violation wins: required fields,
/// then the type allow-list, then the per-driver parameter shape.
pub fn validate_connection_config(
    request: &SaveConnectionRequest,
) -> AppResult<&ConnectionParams> {
    let config = match &request.config {
        Some(config) if !request.name.trim().is_empty() && !request.db_type.trim().is_empty() => {
            config
        }
        _ => {
            return Err(AppError::Validation(
                "Missing required fields: name, type or config".to_string(),
            ))
        }
    };

    let db_type = request.db_type.trim().to_lowercase();
    if !SUPPORTED_TYPES.contains(&db_type.as_str()) {
        return Err(AppError::Validation(format!(
            "Unsupported database type, supported: {}",
            SUPPORTED_TYPES.join(", ")
        )));
    }

    let blank = |value: &Option<String>| value.as_deref().map_or(true, |v| v.trim().is_empty());
    if blank(&config.host) || blank(&config.database) {
        return Err(AppError::Validation(
            "Config must include host and database".to_string(),
        ));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, db_type: &str, config: Option<ConnectionParams>) -> SaveConnectionRequest {
        SaveConnectionRequest {
            name: name.to_string(),
            db_type: db_type.to_string(),
            config,
        }
    }

    fn mysql_params() -> ConnectionParams {
        ConnectionParams {
            host: Some("localhost".into()),
            port: Some(3306),
            username: Some("root".into()),
            password: Some("pw".into()),
            database: Some("app".into()),
            file_path: None,
        }
    }

    #[test]
    fn test_valid_mysql_config_passes() {
        let req = request("prod", "mysql", Some(mysql_params()));
        assert!(validate_connection_config(&req).is_ok());
    }

    #[test]
    fn test_missing_fields_reported_first() {
        let req = request("", "nosuchdb", Some(mysql_params()));
        let err = validate_connection_config(&req).unwrap_err();
        assert!(err.to_string().contains("Missing required fields"));

        let req = request("prod", "mysql", None);
        let err = validate_connection_config(&req).unwrap_err();
        assert!(err.to_string().contains("Missing required fields"));
    }

    #[test]
    fn test_type_allow_list_is_case_insensitive() {
        let req = request("prod", "PostgreSQL", Some(mysql_params()));
        assert!(validate_connection_config(&req).is_ok());
    }

    #[test]
    fn test_access_is_not_supported() {
        let req = request("legacy", "access", Some(mysql_params()));
        let err = validate_connection_config(&req).unwrap_err();
        assert!(err.to_string().contains("Unsupported database type"));
    }

    #[test]
    fn test_host_and_database_are_required() {
        let mut params = mysql_params();
        params.host = None;
        let req = request("prod", "mysql", Some(params));
        let err = validate_connection_config(&req).unwrap_err();
        assert!(err.to_string().contains("host and database"));

        let mut params = mysql_params();
        params.database = Some("  ".into());
        let req = request("prod", "mysql", Some(params));
        assert!(validate_connection_config(&req).is_err());
    }
}
