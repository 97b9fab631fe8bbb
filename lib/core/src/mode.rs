//! The role the scan station plays.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which half of the scanning pipeline this client talks to.
///
/// A scanner drives a capture device, a processor only postprocesses, and a
/// full station does both. Device options are only offered when a capture
/// device is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    /// Capture and postprocessing on the same station.
    #[default]
    Full,
    /// Capture only; processing happens on a remote server.
    Scanner,
    /// Postprocessing only; no capture device.
    Processor,
}

impl ClientMode {
    /// Returns the lowercase name used in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Scanner => "scanner",
            Self::Processor => "processor",
        }
    }

    /// Returns whether a capture device is attached in this mode.
    #[must_use]
    pub const fn has_device(&self) -> bool {
        !matches!(self, Self::Processor)
    }
}

impl fmt::Display for ClientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown client mode '{}', expected full, scanner or processor",
            self.input
        )
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for ClientMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "scanner" => Ok(Self::Scanner),
            "processor" => Ok(Self::Processor),
            _ => Err(ParseModeError {
                input: s.to_string(),
            }),
        }
    }
}
