//! Error types for the template crate.
//!
//! These are low-level errors carrying only what this layer knows. Callers
//! that need workflow context wrap them.

use std::fmt;

/// Errors from parsing an attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path is neither `name` nor `config.<plugin>.<option>`.
    Malformed { path: String, reason: &'static str },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { path, reason } => {
                write!(f, "malformed attribute path '{path}': {reason}")
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Errors from mutating a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The plugin entry exists but holds a plain value, not a section of options.
    NotASection { plugin: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotASection { plugin } => {
                write!(f, "configuration entry '{plugin}' is not a plugin section")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
