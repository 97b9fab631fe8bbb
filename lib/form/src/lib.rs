//! Configuration forms for scanstation workflows.
//!
//! Projects a workflow's template and configuration into editable fields,
//! each with its label, input kind, current value and validation error.
//! Rendering is left to the caller.

pub mod field;
pub mod form;

pub use field::{FieldKind, FieldView, capitalize};
pub use form::{ConfigForm, DEVICE_PLUGIN, FormState, PluginForm, available_plugins};
