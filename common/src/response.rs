//! API response wrapper types.
//!
//! All endpoints answer with the same envelope: `{code, message?, data?}`.
//! `code` mirrors the HTTP status so clients reading only the body still
//! see the outcome.

use serde::Serialize;
use utoipa::ToSchema;

/// Standard API response envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    /// Status code, mirroring the HTTP status of the response.
    pub code: u16,

    /// Human-readable message (present on errors and some successes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Response payload (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response with data.
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: None,
            data: Some(data),
        }
    }

    /// Creates a successful response with data and a message.
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            code: 200,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Creates a successful response carrying only a message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            code: 200,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Creates an error response.
    pub fn err(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_omits_message() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2, 3])).unwrap();
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"], serde_json::json!([1, 2, 3]));
        assert!(body.get("message").is_none());
    }

    #[test]
    fn test_err_omits_data() {
        let body = serde_json::to_value(ApiResponse::err(400, "bad request")).unwrap();
        assert_eq!(body["code"], 400);
        assert_eq!(body["message"], "bad request");
        assert!(body.get("data").is_none());
    }
}
