//! Application error types.
//!
//! `AppError` is the single error currency across the workspace. Route
//! handlers return it directly; the `IntoResponse` impl is the only place
//! internal errors are translated into HTTP statuses and the response
//! envelope. Server-side logs keep the full detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used throughout the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client sent an invalid or incomplete request (400).
    #[error("{0}")]
    Validation(String),

    /// SQL statement rejected by the preview gate (403).
    #[error("{0}")]
    ForbiddenSql(String),

    /// Requested resource does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// Write conflicts with existing data, e.g. a duplicate key (409).
    #[error("{0}")]
    Conflict(String),

    /// The database type string has no registered backend (400).
    #[error("Unsupported database type: {0}")]
    UnsupportedDatabaseType(String),

    /// No persisted configuration exists for the connection id (500).
    #[error("Connection config not found for ID: {0}")]
    ConfigNotFound(u64),

    /// The stored configuration JSON failed to parse (500).
    #[error("Invalid connection configuration: {0}")]
    InvalidConfig(String),

    /// Opening a connection to a database failed (500).
    #[error("Database connection failed: {0}")]
    DatabaseConnection(String),

    /// Executing a statement against a database failed (500).
    #[error("Query execution failed: {0}")]
    DatabaseQuery(String),

    /// Anything else (500).
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps the error to its HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::UnsupportedDatabaseType(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::ForbiddenSql(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ConfigNotFound(_)
            | AppError::InvalidConfig(_)
            | AppError::DatabaseConnection(_)
            | AppError::DatabaseQuery(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classifies a driver error message from a single executed statement.
    ///
    /// Duplicate-key violations become [`AppError::Conflict`] and unknown
    /// tables become [`AppError::NotFound`]; anything else stays a plain
    /// execution failure. The table match covers only table-level errors,
    /// a missing column mentioning its relation must not map to 404. The
    /// match is textual because the message is all the drivers give us in
    /// a backend-neutral way.
    pub fn from_statement_error(message: &str) -> AppError {
        if message.contains("Duplicate entry") || message.contains("duplicate key value") {
            let summary = message
                .split(" for key")
                .next()
                .unwrap_or(message)
                .trim()
                .to_string();
            AppError::Conflict(format!("Data already exists: {}", summary))
        } else if message.contains("ER_NO_SUCH_TABLE")
            || (message.contains("Table") && message.contains("doesn't exist"))
            || (message.contains("relation")
                && message.contains("does not exist")
                && !message.contains("column"))
        {
            AppError::NotFound("Table does not exist, check the table name".to_string())
        } else {
            AppError::DatabaseQuery(message.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ApiResponse::err(status.as_u16(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ForbiddenSql("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ConfigNotFound(7).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_duplicate_entry_is_conflict() {
        let err = AppError::from_statement_error(
            "Duplicate entry '1' for key 't.PRIMARY'",
        );
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(err.to_string().contains("Duplicate entry '1'"));
    }

    #[test]
    fn test_postgres_duplicate_is_conflict() {
        let err = AppError::from_statement_error(
            "duplicate key value violates unique constraint \"t_pkey\"",
        );
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_missing_table_is_not_found() {
        let err = AppError::from_statement_error("Table 'db.nope' doesn't exist");
        assert!(matches!(err, AppError::NotFound(_)));
        let err = AppError::from_statement_error("relation \"nope\" does not exist");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_missing_column_stays_execution_failure() {
        let err = AppError::from_statement_error(
            "column \"nope\" of relation \"t\" does not exist",
        );
        assert!(matches!(err, AppError::DatabaseQuery(_)));
        let err = AppError::from_statement_error("Unknown column 'nope' in 'field list'");
        assert!(matches!(err, AppError::DatabaseQuery(_)));
    }

    #[test]
    fn test_other_errors_stay_execution_failures() {
        let err = AppError::from_statement_error("syntax error near 'FORM'");
        assert!(matches!(err, AppError::DatabaseQuery(_)));
    }
}
