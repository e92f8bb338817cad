//! Error types for the hub service client.
//!
//! # Design
//! Network failures are split by what the retry loop needs to know: a
//! non-2xx status (`Http`, carrying the status), an attempt that ran out of
//! time (`Timeout`), and anything the transport itself reported
//! (`Transport`). Only `Http` with a 4xx status is non-retriable. Apart from
//! `Deserialization`, the remaining variants come from domain services and
//! configuration, never from the retry loop.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by `Service` and the domain services built on it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    /// No response arrived before the attempt's timeout elapsed.
    #[error("request timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },

    /// Connection, TLS, or body-read failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    pub fn http(status: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        ApiError::Http { status, reason }
    }

    pub fn validation(field: &str, message: &str) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// HTTP status attached to the error, when one is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Non-2xx status, timeout, or transport failure.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ApiError::Http { .. } | ApiError::Timeout { .. } | ApiError::Transport(_)
        )
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the executor may try the call again after this error.
    pub fn is_retriable(&self) -> bool {
        !self.is_client_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_not_retriable() {
        for status in [400, 401, 404, 422, 499] {
            let err = ApiError::http(status);
            assert!(err.is_client_error(), "{status}");
            assert!(!err.is_retriable(), "{status}");
        }
    }

    #[test]
    fn server_errors_timeouts_and_transport_failures_are_retriable() {
        assert!(ApiError::http(500).is_retriable());
        assert!(ApiError::http(503).is_retriable());
        assert!(ApiError::Timeout { after: Duration::from_millis(5) }.is_retriable());
        assert!(ApiError::Transport("connection refused".into()).is_retriable());
    }

    #[test]
    fn http_error_carries_canonical_reason() {
        let err = ApiError::http(503);
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
        assert_eq!(err.status(), Some(503));
        assert!(err.is_network());
    }

    #[test]
    fn timeout_message_reports_millis() {
        let err = ApiError::Timeout { after: Duration::from_millis(100) };
        assert_eq!(err.to_string(), "request timed out after 100ms");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn domain_errors_are_not_network_errors() {
        assert!(!ApiError::validation("email", "Email is required").is_network());
        assert!(!ApiError::Authentication("Invalid credentials".into()).is_network());
    }
}
