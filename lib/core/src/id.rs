//! Strongly-typed identifiers handed out by the scan server.
//!
//! The server assigns plain integers. They are wrapped so a workflow id can
//! never be passed where a queue position is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed wrapper around a server-assigned integer.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw server value.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw server value.
            #[must_use]
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a workflow, assigned by the server on creation.
    WorkflowId
);

define_id!(
    /// Position of a workflow in the server's processing queue.
    QueuePosition
);
