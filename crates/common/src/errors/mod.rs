//! Error types for TrustGraph
//!
//! Provides the error handling system for the engine:
//! - Distinct error types for invalid graphs and invalid parameters
//! - Machine-readable error codes
//! - The structured failure envelope returned to callers
//!
//! Empty graphs and non-convergence are not errors. Engines return an empty
//! result set or a `converged: false` result for those.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using TrustError
pub type Result<T> = std::result::Result<T, TrustError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors (1xxx)
    InvalidGraph,
    NegativeWeight,
    NonFiniteWeight,
    InvalidParameters,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Input (1xxx)
            ErrorCode::InvalidGraph => 1001,
            ErrorCode::NegativeWeight => 1002,
            ErrorCode::NonFiniteWeight => 1003,
            ErrorCode::InvalidParameters => 1004,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Engine error types
#[derive(Error, Debug)]
pub enum TrustError {
    // Input errors
    #[error("Invalid graph: {message}")]
    InvalidGraph { message: String },

    #[error("Invalid graph: negative weight {weight} on allocation {giver} -> {receiver}")]
    NegativeWeight {
        giver: String,
        receiver: String,
        weight: f64,
    },

    #[error("Invalid graph: non-finite weight on allocation {giver} -> {receiver}")]
    NonFiniteWeight { giver: String, receiver: String },

    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TrustError {
    /// Shorthand for an `InvalidGraph` error
    pub fn invalid_graph(message: impl Into<String>) -> Self {
        TrustError::InvalidGraph {
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            TrustError::InvalidGraph { .. } => ErrorCode::InvalidGraph,
            TrustError::NegativeWeight { .. } => ErrorCode::NegativeWeight,
            TrustError::NonFiniteWeight { .. } => ErrorCode::NonFiniteWeight,
            TrustError::InvalidParameters { .. } => ErrorCode::InvalidParameters,
            TrustError::Configuration { .. } => ErrorCode::ConfigurationError,
            TrustError::Serialization(_) => ErrorCode::SerializationError,
            TrustError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Check if this error was caused by the caller's input
    pub fn is_input_error(&self) -> bool {
        self.code().as_code() < 2000
    }

    /// Check if this error belongs to the `InvalidGraph` family
    pub fn is_invalid_graph(&self) -> bool {
        matches!(
            self,
            TrustError::InvalidGraph { .. }
                | TrustError::NegativeWeight { .. }
                | TrustError::NonFiniteWeight { .. }
        )
    }
}

impl From<validator::ValidationErrors> for TrustError {
    fn from(err: validator::ValidationErrors) -> Self {
        TrustError::InvalidParameters {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for TrustError {
    fn from(err: config::ConfigError) -> Self {
        TrustError::Configuration {
            message: err.to_string(),
        }
    }
}

/// Failure envelope handed back to the calling service layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: ErrorCode,
}

impl From<&TrustError> for ErrorResponse {
    fn from(err: &TrustError) -> Self {
        let code = err.code();

        // Log based on severity
        if err.is_input_error() {
            tracing::warn!(error = %err, code = ?code, "Rejected engine input");
        } else {
            tracing::error!(error = %err, code = ?code, "Engine failure");
        }

        Self {
            success: false,
            error: err.to_string(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = TrustError::NegativeWeight {
            giver: "a".into(),
            receiver: "b".into(),
            weight: -0.5,
        };
        assert_eq!(err.code(), ErrorCode::NegativeWeight);
        assert_eq!(err.code().as_code(), 1002);
        assert!(err.is_invalid_graph());
    }

    #[test]
    fn test_input_error() {
        let err = TrustError::InvalidParameters {
            message: "decay factor out of range".into(),
        };
        assert!(err.is_input_error());
        assert!(!err.is_invalid_graph());
    }

    #[test]
    fn test_internal_error() {
        let err = TrustError::Internal {
            message: "job panicked".into(),
        };
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_error_response_envelope() {
        let err = TrustError::invalid_graph("expected a JSON object");
        let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INVALID_GRAPH");
        assert_eq!(body["error"], "Invalid graph: expected a JSON object");
    }
}
