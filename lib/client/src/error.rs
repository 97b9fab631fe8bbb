//! Error types for server requests.

use std::fmt;

/// Errors from a request to the workflow server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request outlived its timeout.
    Timeout { endpoint: String },
    /// The server could not be reached.
    ConnectionFailed { endpoint: String, reason: String },
    /// The server answered with a non-success status.
    Status { endpoint: String, status: u16 },
    /// The response body did not have the expected shape.
    InvalidResponse { endpoint: String, reason: String },
    /// The request could not be built or sent.
    RequestFailed { endpoint: String, reason: String },
}

impl ApiError {
    /// Returns whether the request timed out.
    ///
    /// A timed out long-poll is routine, every other failure is not.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the endpoint the failed request was sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Timeout { endpoint }
            | Self::ConnectionFailed { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::InvalidResponse { endpoint, .. }
            | Self::RequestFailed { endpoint, .. } => endpoint,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { endpoint } => write!(f, "request to '{endpoint}' timed out"),
            Self::ConnectionFailed { endpoint, reason } => {
                write!(f, "failed to connect to '{endpoint}': {reason}")
            }
            Self::Status { endpoint, status } => {
                write!(f, "'{endpoint}' answered with HTTP {status}")
            }
            Self::InvalidResponse { endpoint, reason } => {
                write!(f, "invalid response from '{endpoint}': {reason}")
            }
            Self::RequestFailed { endpoint, reason } => {
                write!(f, "request to '{endpoint}' failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ApiError {}
