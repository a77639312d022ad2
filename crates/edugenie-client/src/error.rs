//! Error types for the EduGenie client.
//!
//! Two families live here. [`ClientError`] covers failures outside a single
//! request: loading configuration, building the HTTP client, touching the
//! session file and invalid auth-state transitions. [`ErrorKind`] classifies
//! the failure carried by a `NormalizedResult`, which is how every request
//! outcome is reported.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A specialized `Result` type for EduGenie client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur outside of a single API request.
///
/// Variants include actionable suggestions where possible.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your edugenie.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Transport Setup Errors
    // ========================================================================
    /// The base URL could not be parsed.
    #[error("Invalid base URL '{url}': {message}\n\nSuggestion: Use a full URL such as http://localhost:3000")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Description of the parse failure.
        message: String,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    // ========================================================================
    // Session Persistence Errors
    // ========================================================================
    /// The session file could not be written.
    #[error("Failed to write session file '{path}': {message}\n\nSuggestion: Check write permissions for the session directory")]
    SessionWriteError {
        /// Path to the session file.
        path: PathBuf,
        /// Description of the write failure.
        message: String,
    },

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// Invalid auth state transition attempted.
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },
}

impl ClientError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `InvalidBaseUrl` error.
    #[must_use]
    pub fn invalid_base_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidBaseUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new `SessionWriteError`.
    #[must_use]
    pub fn session_write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SessionWriteError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns `true` if this error stems from user-supplied configuration.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::InvalidBaseUrl { .. }
        )
    }
}

/// Classification of a failed request outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The connection could not be established.
    NetworkUnreachable,
    /// The call exceeded the configured duration.
    Timeout,
    /// A transport failure that is neither a refused connection nor a timeout.
    Network,
    /// HTTP 401; the session has been cleared.
    AuthRejected,
    /// Any other non-2xx status, or an unexpected failure inside the client.
    ServerRejected,
    /// The body could not be parsed into the expected shape.
    MalformedResponse,
    /// The request was rejected before being sent.
    InvalidInput,
    /// The session could not be persisted after a successful sign-in.
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkUnreachable => write!(f, "network_unreachable"),
            Self::Timeout => write!(f, "timeout"),
            Self::Network => write!(f, "network"),
            Self::AuthRejected => write!(f, "auth_rejected"),
            Self::ServerRejected => write!(f, "server_rejected"),
            Self::MalformedResponse => write!(f, "malformed_response"),
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

impl ErrorKind {
    /// Returns `true` if the failure happened before any HTTP status was seen,
    /// so a fresh attempt by the caller may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkUnreachable | Self::Timeout | Self::Network)
    }
}
