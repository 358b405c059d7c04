//! Error types

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// The outward error of every crate in the workspace:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details for debugging
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    // ==================== Convenience constructors ====================

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a remote-unavailable error
    pub fn remote_unavailable(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::RemoteUnavailable, msg)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}

/// Result type using [`AppError`]
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_message() {
        let err = AppError::new(ErrorCode::RemoteUnavailable);
        assert_eq!(err.code, ErrorCode::RemoteUnavailable);
        assert_eq!(err.message, "Data store unavailable, data may be stale");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_with_detail() {
        let err = AppError::with_message(ErrorCode::CustomerNotFound, "Customer 42 not found")
            .with_detail("id", 42)
            .with_detail("route_day", "Mon");
        assert_eq!(err.code, ErrorCode::CustomerNotFound);
        assert_eq!(err.to_string(), "Customer 42 not found");
        let details = err.details.unwrap();
        assert_eq!(details["id"], 42);
        assert_eq!(details["route_day"], "Mon");
    }

    #[test]
    fn test_serialize_skips_empty_details() {
        let err = AppError::with_message(ErrorCode::CustomerNameRequired, "name is empty");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], 4002);
        assert_eq!(json["message"], "name is empty");
        assert!(json.get("details").is_none());
    }
}
