//! Client-facing error model.
//!
//! # Responsibility
//! - Describe failures in a shape that is safe to serialize to callers.
//! - Carry the HTTP status the response layer should use.
//!
//! # Invariants
//! - `status` values below 1 mean "unset" and resolve to 500.
//! - Equality is structural; two errors with the same fields are equal.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const DEFAULT_STATUS: u16 = 500;

/// Error information returned to the caller. Never stored in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<Error>,
    #[serde(default, skip_serializing_if = "is_unset_status")]
    pub status: i32,
}

impl Error {
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: i32) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status,
            ..Self::default()
        }
    }

    /// Attaches the offending input field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Attaches nested reasons, e.g. one per invalid field.
    pub fn with_reasons(mut self, reasons: Vec<Error>) -> Self {
        self.reasons = reasons;
        self
    }

    /// HTTP status to respond with. Falls back to 500 when unset.
    pub fn status_code(&self) -> u16 {
        if self.status < 1 {
            return DEFAULT_STATUS;
        }

        u16::try_from(self.status).unwrap_or(DEFAULT_STATUS)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}: {}", self.code, self.message)
        } else {
            write!(f, "{}: {}: {}", self.code, self.field, self.message)
        }
    }
}

impl std::error::Error for Error {}

/// Serialization helper that nests an [`Error`] under an `error` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorWrapper {
    pub error: Error,
}

impl From<Error> for ErrorWrapper {
    fn from(error: Error) -> Self {
        Self { error }
    }
}

fn is_unset_status(status: &i32) -> bool {
    *status < 1
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorWrapper};
    use serde_json::json;

    #[test]
    fn status_code_defaults_to_internal_server_error() {
        assert_eq!(Error::default().status_code(), 500);
        assert_eq!(Error::new("x", "y", -3).status_code(), 500);
        assert_eq!(Error::new("x", "y", 404).status_code(), 404);
    }

    #[test]
    fn display_includes_field_only_when_set() {
        let plain = Error::new("invalid_request", "must not be empty", 400);
        assert_eq!(plain.to_string(), "invalid_request: must not be empty");

        let with_field = plain.with_field("username");
        assert_eq!(
            with_field.to_string(),
            "invalid_request: username: must not be empty"
        );
    }

    #[test]
    fn wrapper_serializes_under_error_key_and_omits_empty_fields() {
        let body = ErrorWrapper::from(Error::new("not_found", "user not found", 404));
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(
            value,
            json!({"error": {"code": "not_found", "message": "user not found", "status": 404}})
        );
    }

    #[test]
    fn nested_reasons_are_serialized() {
        let body = Error::new("invalid_request", "request is invalid", 400)
            .with_reasons(vec![Error::new("required", "is required", 0).with_field("email")]);
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["reasons"][0]["field"], "email");
        assert!(value["reasons"][0].get("status").is_none());
    }

    #[test]
    fn errors_compare_by_value() {
        let a = Error::new("eof", "unexpected end of file", 400);
        let b = Error::new("eof", "unexpected end of file", 400);
        assert_eq!(a, b);
    }
}
