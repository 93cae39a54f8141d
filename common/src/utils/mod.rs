//! Validation utilities.

pub mod sql_validator;
pub mod validation;

pub use sql_validator::SqlValidator;
pub use validation::validate_connection_config;
