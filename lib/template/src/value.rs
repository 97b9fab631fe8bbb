//! Option values as the server declares them.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};
use std::fmt;

/// A single option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A boolean flag.
    Bool(bool),
    /// An integer or floating point number.
    Number(Number),
    /// Free text.
    String(String),
}

/// The type of a [`Scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Number,
    String,
}

impl Scalar {
    /// Returns the type of this value.
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::Number(_) => ScalarKind::Number,
            Self::String(_) => ScalarKind::String,
        }
    }

    /// Converts the value into its JSON form.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => JsonValue::Number(n.clone()),
            Self::String(s) => JsonValue::String(s.clone()),
        }
    }

    /// Returns whether `value` is this exact scalar.
    #[must_use]
    pub fn matches(&self, value: &JsonValue) -> bool {
        match (self, value) {
            (Self::Bool(a), JsonValue::Bool(b)) => a == b,
            (Self::Number(a), JsonValue::Number(b)) => a == b,
            (Self::String(a), JsonValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// The `value` field of an option descriptor.
///
/// Selectable options carry the list of allowed values; multi-valued options
/// carry a list as their default; everything else carries one scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// An ordered list of values.
    List(Vec<Scalar>),
    /// A single value.
    Single(Scalar),
}

impl OptionValue {
    /// Returns the single scalar, if this is not a list.
    #[must_use]
    pub fn as_single(&self) -> Option<&Scalar> {
        match self {
            Self::Single(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Returns the list, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Scalar]> {
        match self {
            Self::List(values) => Some(values),
            Self::Single(_) => None,
        }
    }

    /// Converts the value into its JSON form.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Single(s) => s.to_json(),
            Self::List(values) => JsonValue::Array(values.iter().map(Scalar::to_json).collect()),
        }
    }
}

impl From<Scalar> for OptionValue {
    fn from(value: Scalar) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<Scalar>> for OptionValue {
    fn from(values: Vec<Scalar>) -> Self {
        Self::List(values)
    }
}
