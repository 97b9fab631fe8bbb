//! Error types for the command line client.

use std::fmt;

/// Errors that end a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The server could not be reached or rejected a request.
    Request { details: String },
    /// The requested workflow does not exist.
    NotFound { id: String },
    /// The workflow did not pass validation.
    Invalid { details: String },
    /// The command line did not make sense.
    Usage { details: String },
    /// Output could not be produced.
    Output { details: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {details}"),
            Self::Request { details } => write!(f, "request failed: {details}"),
            Self::NotFound { id } => write!(f, "workflow {id} not found"),
            Self::Invalid { details } => write!(f, "workflow is invalid: {details}"),
            Self::Usage { details } => write!(f, "{details}"),
            Self::Output { details } => write!(f, "failed to write output: {details}"),
        }
    }
}

impl std::error::Error for CliError {}
