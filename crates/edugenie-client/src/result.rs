//! The uniform outcome type returned by every API client method.
//!
//! A [`NormalizedResult`] is either a payload or an [`ApiFailure`], never
//! both and never neither. Callers branch on it instead of catching errors.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::ErrorKind;

/// User-facing messages attached to failures produced by the client itself.
pub mod messages {
    /// The connection could not be established. Followed by the base URL.
    pub const CANNOT_CONNECT: &str = "Cannot connect to server. Make sure the backend is running on";
    /// The request exceeded the configured timeout.
    pub const TIMEOUT: &str = "Request timeout. Server might be slow.";
    /// Any other transport failure.
    pub const NETWORK: &str = "Network error. Please check your connection.";
    /// HTTP 401 without a message in the body.
    pub const AUTH_FAILED: &str = "Authentication failed";
    /// A panic was caught inside the request operation.
    pub const UNEXPECTED: &str = "An unexpected error occurred";
}

/// Why a request did not produce a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiFailure {
    /// Classification of the failure.
    pub kind: ErrorKind,
    /// Human-readable message, suitable for display.
    pub message: String,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
}

impl ApiFailure {
    /// Creates a failure of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Attaches the HTTP status the failure was derived from.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Connection refused, DNS failure or similar.
    #[must_use]
    pub fn network_unreachable(base_url: &str) -> Self {
        Self::new(
            ErrorKind::NetworkUnreachable,
            format!("{} {base_url}", messages::CANNOT_CONNECT),
        )
    }

    /// The request exceeded the client-side timeout.
    #[must_use]
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, messages::TIMEOUT)
    }

    /// Unclassified transport failure.
    #[must_use]
    pub fn network() -> Self {
        Self::new(ErrorKind::Network, messages::NETWORK)
    }

    /// A body that does not match what the endpoint promises.
    #[must_use]
    pub fn malformed(detail: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::MalformedResponse,
            format!("Malformed response from server: {detail}"),
        )
    }

    /// The request was rejected before it was sent.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// A panic inside the client, reported like a server rejection.
    #[must_use]
    pub fn unexpected() -> Self {
        Self::new(ErrorKind::ServerRejected, messages::UNEXPECTED)
    }
}

/// The outcome of an API client call.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult<T> {
    /// The call succeeded with this payload.
    Success(T),
    /// The call failed.
    Failure(ApiFailure),
}

impl<T> NormalizedResult<T> {
    /// Creates a failed result.
    #[must_use]
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure(ApiFailure::new(kind, message))
    }

    /// Returns `true` for a successful call.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The payload, when the call succeeded.
    #[must_use]
    pub const fn payload(&self) -> Option<&T> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }

    /// The failure, when the call failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&ApiFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// The error message, when the call failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.failure().map(|failure| failure.message.as_str())
    }

    /// The failure classification, when the call failed.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.failure().map(|failure| failure.kind)
    }

    /// Returns `true` if the server rejected the session (HTTP 401).
    #[must_use]
    pub fn is_auth_rejected(&self) -> bool {
        self.error_kind() == Some(ErrorKind::AuthRejected)
    }

    /// Converts into the payload, dropping any failure.
    pub fn into_payload(self) -> Option<T> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, ApiFailure> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::Failure(failure) => Err(failure),
        }
    }

    /// Reshapes a successful payload.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> NormalizedResult<U> {
        match self {
            Self::Success(payload) => NormalizedResult::Success(f(payload)),
            Self::Failure(failure) => NormalizedResult::Failure(failure),
        }
    }

    /// Reshapes a successful payload with a step that may itself fail.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> NormalizedResult<U>) -> NormalizedResult<U> {
        match self {
            Self::Success(payload) => f(payload),
            Self::Failure(failure) => NormalizedResult::Failure(failure),
        }
    }

    /// Replaces an empty failure message with `fallback`.
    #[must_use]
    pub fn with_fallback_message(self, fallback: &str) -> Self {
        match self {
            Self::Failure(mut failure) if failure.message.trim().is_empty() => {
                failure.message = fallback.to_string();
                Self::Failure(failure)
            }
            other => other,
        }
    }
}

impl<T> From<Result<T, ApiFailure>> for NormalizedResult<T> {
    fn from(result: Result<T, ApiFailure>) -> Self {
        match result {
            Ok(payload) => Self::Success(payload),
            Err(failure) => Self::Failure(failure),
        }
    }
}

/// Serialized as `{"success":true,"data":…}` or
/// `{"success":false,"error":"…","errorKind":"…"}`.
impl<T: Serialize> Serialize for NormalizedResult<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Success(payload) => {
                let mut state = serializer.serialize_struct("NormalizedResult", 2)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("data", payload)?;
                state.end()
            }
            Self::Failure(failure) => {
                let mut state = serializer.serialize_struct("NormalizedResult", 3)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", &failure.message)?;
                state.serialize_field("errorKind", &failure.kind)?;
                state.end()
            }
        }
    }
}
