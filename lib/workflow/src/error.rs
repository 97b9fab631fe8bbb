//! Error types for the workflow crate.
//!
//! Most workflow failures are logged and absorbed where they happen (poll
//! errors, command errors, template fetch errors). `WorkflowError` covers the
//! operations whose caller has to know: path-addressed mutation, saving and
//! refreshing. Remote operations wrap it in a `rootcause::Report`.

use scanstation_client::ApiError;
use scanstation_template::{ConfigError, PathError, ValidationErrors};
use std::fmt;

/// Errors from workflow operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The attribute path is not `name` or `config.<plugin>.<option>`.
    Path(PathError),
    /// The value does not have the type the attribute requires.
    TypeMismatch { path: String, expected: &'static str },
    /// The configuration rejected the update.
    Config(ConfigError),
    /// The workflow did not pass validation.
    Invalid { errors: ValidationErrors },
    /// The workflow has not been created on the server yet.
    NotSaved,
    /// The workflow was destroyed.
    Destroyed,
    /// The server request failed.
    Api(ApiError),
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(e) => write!(f, "{e}"),
            Self::TypeMismatch { path, expected } => {
                write!(f, "'{path}' must be a {expected}")
            }
            Self::Config(e) => write!(f, "{e}"),
            Self::Invalid { errors } => write!(f, "workflow is invalid: {errors}"),
            Self::NotSaved => write!(f, "workflow has not been saved"),
            Self::Destroyed => write!(f, "workflow was destroyed"),
            Self::Api(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WorkflowError {}

impl From<PathError> for WorkflowError {
    fn from(e: PathError) -> Self {
        Self::Path(e)
    }
}

impl From<ConfigError> for WorkflowError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ApiError> for WorkflowError {
    fn from(e: ApiError) -> Self {
        Self::Api(e)
    }
}
