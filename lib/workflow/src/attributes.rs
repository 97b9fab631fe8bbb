//! The attributes of a workflow as exchanged with the server.

use scanstation_client::JsonObject;
use scanstation_core::{QueuePosition, WorkflowId};
use scanstation_template::{Configuration, deep_merge};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Client-only key some representations carry; never stored or sent.
pub const TEMPLATE_KEY: &str = "configuration_template";

/// A workflow's server-visible state.
///
/// Fields the client does not interpret (`step`, `step_done`,
/// `capture_start`, `out_files`, ...) are kept in `extra` and sent back as
/// they were received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WorkflowId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub config: Configuration,

    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<QueuePosition>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

impl WorkflowAttributes {
    /// Reads attributes from a server representation.
    ///
    /// # Errors
    ///
    /// Returns an error if a known field has the wrong type.
    pub fn from_object(mut object: JsonObject) -> Result<Self, serde_json::Error> {
        object.remove(TEMPLATE_KEY);
        serde_json::from_value(JsonValue::Object(object))
    }

    /// Returns the outbound representation.
    #[must_use]
    pub fn to_payload(&self) -> JsonObject {
        let mut payload = match serde_json::to_value(self) {
            Ok(JsonValue::Object(map)) => map,
            _ => JsonObject::new(),
        };
        payload.remove(TEMPLATE_KEY);
        payload
    }

    /// Merges a partial server representation into these attributes.
    ///
    /// Objects merge key by key and every other value replaces the local one,
    /// so the last update applied wins. On error the attributes are left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged result has a known field of the wrong
    /// type.
    pub fn merge(&mut self, mut update: JsonObject) -> Result<(), serde_json::Error> {
        update.remove(TEMPLATE_KEY);
        let mut merged = JsonValue::Object(self.to_payload());
        deep_merge(&mut merged, JsonValue::Object(update));
        *self = serde_json::from_value(merged)?;
        Ok(())
    }
}
