//! Workflow configuration values.
//!
//! The configuration is a JSON object whose plugin entries are sections of
//! option values. The server also keeps plain entries next to the sections
//! (for example the `plugins` list naming the active plugins); those are
//! preserved untouched.

use crate::error::ConfigError;
use crate::path::ConfigPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Key of the entry listing the plugins enabled for a workflow.
const ACTIVE_PLUGINS_KEY: &str = "plugins";

/// Nested `config[plugin][option] = value` mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(Map<String, JsonValue>);

impl Configuration {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the configuration has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value at `path`.
    #[must_use]
    pub fn get(&self, path: &ConfigPath) -> Option<&JsonValue> {
        self.section(path.plugin())?.get(path.option())
    }

    /// Returns the options of `plugin`, if it is a section.
    #[must_use]
    pub fn section(&self, plugin: &str) -> Option<&Map<String, JsonValue>> {
        self.0.get(plugin)?.as_object()
    }

    /// Sets the value at `path`, creating the plugin section if needed.
    ///
    /// Returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotASection`] if the plugin entry exists and is
    /// not an object.
    pub fn set(
        &mut self,
        path: &ConfigPath,
        value: JsonValue,
    ) -> Result<Option<JsonValue>, ConfigError> {
        let section = self
            .0
            .entry(path.plugin().to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        match section {
            JsonValue::Object(options) => Ok(options.insert(path.option().to_string(), value)),
            _ => Err(ConfigError::NotASection {
                plugin: path.plugin().to_string(),
            }),
        }
    }

    /// Returns the plugins enabled for the workflow, in server order.
    #[must_use]
    pub fn active_plugins(&self) -> Vec<&str> {
        self.0
            .get(ACTIVE_PLUGINS_KEY)
            .and_then(JsonValue::as_array)
            .map(|plugins| plugins.iter().filter_map(JsonValue::as_str).collect())
            .unwrap_or_default()
    }

    /// Merges `patch` into this configuration; see [`deep_merge`].
    pub fn merge(&mut self, patch: Map<String, JsonValue>) {
        merge_maps(&mut self.0, patch);
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Converts the configuration into a JSON value.
    #[must_use]
    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.0)
    }
}

impl From<Map<String, JsonValue>> for Configuration {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

/// Merges `patch` into `target`, last write wins.
///
/// Objects merge key by key, recursively. Every other value, arrays
/// included, replaces what was there.
pub fn deep_merge(target: &mut JsonValue, patch: JsonValue) {
    match (target, patch) {
        (JsonValue::Object(existing), JsonValue::Object(incoming)) => {
            merge_maps(existing, incoming);
        }
        (slot, patch) => *slot = patch,
    }
}

fn merge_maps(target: &mut Map<String, JsonValue>, patch: Map<String, JsonValue>) {
    for (key, value) in patch {
        match target.get_mut(&key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}
