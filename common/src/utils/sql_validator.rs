//! SQL gate for the read-only preview endpoint.

use crate::errors::{AppError, AppResult};

/// Keywords that disqualify a statement from preview, checked as plain
/// substrings of the uppercased SQL. The match is deliberately coarse and
/// will also trip on identifiers that contain a keyword.
const FORBIDDEN_KEYWORDS: [&str; 5] = ["DROP", "DELETE", "UPDATE", "TRUNCATE", "INSERT"];

/// Validates SQL before it may run through the preview endpoint.
pub struct SqlValidator;

impl SqlValidator {
    /// Accepts only statements that start with `SELECT` and contain none
    /// of the forbidden keywords.
    ///
    /// An empty statement is a validation error (400); a non-SELECT or a
    /// keyword hit is forbidden (403).
    pub fn validate_preview(sql: &str) -> AppResult<()> {
        let upper = sql.trim().to_uppercase();

        if upper.is_empty() {
            return Err(AppError::Validation("SQL statement must not be empty".to_string()));
        }

        if !upper.starts_with("SELECT") {
            return Err(AppError::ForbiddenSql(
                "Only SELECT statements are allowed for preview".to_string(),
            ));
        }

        for keyword in FORBIDDEN_KEYWORDS {
            if upper.contains(keyword) {
                return Err(AppError::ForbiddenSql(format!(
                    "Statement contains forbidden keyword: {}",
                    keyword
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_passes() {
        assert!(SqlValidator::validate_preview("SELECT * FROM users").is_ok());
        assert!(SqlValidator::validate_preview("  select id from t  ").is_ok());
    }

    #[test]
    fn test_empty_is_validation_error() {
        assert!(matches!(
            SqlValidator::validate_preview(""),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            SqlValidator::validate_preview("   \n\t "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_non_select_is_forbidden() {
        assert!(matches!(
            SqlValidator::validate_preview("SHOW TABLES"),
            Err(AppError::ForbiddenSql(_))
        ));
        assert!(matches!(
            SqlValidator::validate_preview("UPDATE t SET x = 1"),
            Err(AppError::ForbiddenSql(_))
        ));
    }

    #[test]
    fn test_forbidden_keyword_inside_select_is_rejected() {
        assert!(matches!(
            SqlValidator::validate_preview("SELECT * FROM t; DROP TABLE t"),
            Err(AppError::ForbiddenSql(_))
        ));
    }

    #[test]
    fn test_keyword_match_is_substring_based() {
        // Identifiers containing a keyword trip the gate too.
        assert!(SqlValidator::validate_preview("SELECT * FROM updates").is_err());
        assert!(SqlValidator::validate_preview("SELECT dropped FROM t").is_err());
    }
}
