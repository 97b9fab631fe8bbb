//! Client configuration.
//!
//! This module provides strongly-typed configuration for talking to a
//! workflow server, loaded via the `config` crate from environment variables
//! prefixed with `SCANSTATION__`, e.g. `SCANSTATION__BASE_URL` or
//! `SCANSTATION__POLL__BACKOFF_SECONDS`.

use scanstation_core::ClientMode;
use serde::Deserialize;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Root URL of the workflow server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for every request except the long-poll, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Which half of the pipeline the server runs.
    #[serde(default)]
    pub mode: ClientMode,

    /// Long-poll configuration.
    #[serde(default)]
    pub poll: PollSettings,
}

/// Long-poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PollSettings {
    /// How long the server may hold a poll request open, in seconds.
    #[serde(default = "default_poll_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Pause after a failed poll before the next one, in seconds.
    #[serde(default = "default_poll_backoff_seconds")]
    pub backoff_seconds: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000/".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_poll_timeout_seconds() -> u64 {
    120
}

fn default_poll_backoff_seconds() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
            mode: ClientMode::default(),
            poll: PollSettings::default(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_poll_timeout_seconds(),
            backoff_seconds: default_poll_backoff_seconds(),
        }
    }
}

impl PollSettings {
    /// Returns the long-poll request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Returns the pause after a failed poll.
    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_seconds)
    }
}

impl ClientConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("SCANSTATION")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the timeout for ordinary requests.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Returns the User-Agent header sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> String {
        format!("scanstation/{}", env!("CARGO_PKG_VERSION"))
    }
}
