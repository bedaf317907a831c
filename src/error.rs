//! Error types for coverage exports

use thiserror::Error;
use crate::validation::Violation;

/// Code used when the service could not be reached at all
pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";

/// Code used when an error body carries no usable code
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN";

#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Malformed response: {0}")]
    MalformedResponse(#[from] MalformedResponseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

impl CoverageError {
    /// The message shown to a user for this failure.
    ///
    /// Transport failures keep their normalized `[status/code] message` form
    /// without the category prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

/// A request that failed local validation. Never sent to the service.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} violation(s): {}", .violations.len(), join_messages(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Human-readable messages in rule order
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }
}

fn join_messages(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Network failure or non-2xx answer, normalized to `{status, code, message}`.
///
/// `status` is `0` when no HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{status}/{code}] {message}")]
pub struct TransportError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl TransportError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// A failure before any HTTP status was available
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(0, NETWORK_ERROR_CODE, message)
    }

    pub fn is_network(&self) -> bool {
        self.status == 0
    }
}

/// A success status whose body could not be used as an export result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("status {status} returned an unusable body: {reason}")]
pub struct MalformedResponseError {
    pub status: u16,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("No API base URL configured (set {primary} or {fallback})")]
    MissingBaseUrl { primary: String, fallback: String },

    #[error("Invalid API base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("HTTP client construction failed: {reason}")]
    HttpClient { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    #[error("Serialization failed: {reason}")]
    SerializationFailed { reason: String },
}

impl From<serde_json::Error> for SerializationError {
    fn from(value: serde_json::Error) -> Self {
        Self::SerializationFailed {
            reason: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ViolationCode;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::new(400, "BAD_REQUEST", "m");
        assert_eq!(err.to_string(), "[400/BAD_REQUEST] m");
        assert!(!err.is_network());
    }

    #[test]
    fn test_network_error_has_no_status() {
        let err = TransportError::network("connection refused");
        assert!(err.is_network());
        assert_eq!(err.to_string(), "[0/NETWORK_ERROR] connection refused");
    }

    #[test]
    fn test_validation_error_lists_all_messages() {
        let err = ValidationError::new(vec![
            Violation::new(ViolationCode::CrsMissing, "crs is required"),
            Violation::new(ViolationCode::SeedNotInteger, "seed must be an integer"),
        ]);
        assert_eq!(
            err.to_string(),
            "2 violation(s): crs is required; seed must be an integer"
        );
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn test_user_message_drops_category_for_transport() {
        let err: CoverageError = TransportError::new(500, "UNKNOWN", "boom").into();
        assert_eq!(err.user_message(), "[500/UNKNOWN] boom");
        assert!(err.to_string().starts_with("Transport error:"));
    }
}
