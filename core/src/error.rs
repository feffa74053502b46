//! Error types for the portal connection.
//!
//! # Design
//! Every HTTP outcome that is not a decoded payload maps to exactly one
//! `ApiError` variant, so callers can branch on the kind of failure without
//! looking at status codes themselves. 401 gets its own variant because
//! callers usually react to bad credentials differently from other 4xx
//! responses. Server errors keep only the status line: their bodies are not
//! trusted.
//!
//! Errors are `Clone + PartialEq` so the test double can replay a scripted
//! failure and tests can compare it with what came back.

use serde_json::Value;
use thiserror::Error;

/// Failures below the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection was closed and can no longer send requests.
    #[error("connection is closed")]
    Closed,

    /// Could not reach the remote service (DNS, TCP, connect timeout).
    #[error("connection failed: {0}")]
    Connection(String),

    /// The exchange failed after the connection was established.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Whether the failure happened before anything reached the server, so
    /// sending the same request again is harmless.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Connection(_))
    }
}

/// Errors returned by every `Connection` operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The remote service returned 401.
    #[error("{message}")]
    Authentication {
        message: String,
        request_id: String,
        error_data: Value,
    },

    /// The remote service returned a 4xx status other than 401.
    #[error("{message}")]
    Client {
        message: String,
        request_id: String,
        status: u16,
        error_data: Value,
    },

    /// The remote service returned a 5xx status.
    #[error("{http_status_code} {reason}")]
    Server { reason: String, http_status_code: u16 },

    /// Status code or content type the connection does not handle.
    #[error("{0}")]
    UnsupportedResponse(String),

    /// Body claimed to be JSON but could not be decoded, or an error body
    /// did not have the expected shape.
    #[error("{0}")]
    CorruptedResponse(String),

    /// The request body could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Base URL and path did not form a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A configuration value could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ApiError {
    /// Request id reported by the remote service for 4xx responses.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ApiError::Authentication { request_id, .. } | ApiError::Client { request_id, .. } => {
                Some(request_id)
            }
            _ => None,
        }
    }

    /// HTTP status code behind the error, when one is known.
    pub fn http_status_code(&self) -> Option<u16> {
        match self {
            ApiError::Authentication { .. } => Some(401),
            ApiError::Client { status, .. } => Some(*status),
            ApiError::Server { http_status_code, .. } => Some(*http_status_code),
            _ => None,
        }
    }

    /// True for 4xx outcomes, including authentication failures.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::Authentication { .. } | ApiError::Client { .. })
    }
}
