//! Plugin configuration templates for scanstation.
//!
//! This crate provides:
//!
//! - **Template**: the per-plugin option descriptors a server declares
//! - **Configuration**: a workflow's nested option values
//! - **Paths**: typed `name` / `config.<plugin>.<option>` attribute paths
//! - **Defaults**: the initial configuration of a new workflow
//! - **Rules**: validation rules compiled from a template, and their evaluation
//!
//! # Example
//!
//! ```
//! use scanstation_template::{compile, defaults_for, ConfigPath, Template};
//! use serde_json::json;
//!
//! let template: Template = serde_json::from_value(json!({
//!     "binarize": {
//!         "threshold": {"value": 128},
//!         "method": {"value": ["otsu", "sauvola"], "selectable": true}
//!     }
//! })).unwrap();
//!
//! let mut config = defaults_for(&template);
//! let rules = compile(&template);
//! assert!(rules.validate(Some("scan-01"), &config).is_empty());
//!
//! config.set(&ConfigPath::new("binarize", "method"), json!("invalid")).unwrap();
//! let errors = rules.validate(Some("scan-01"), &config);
//! assert!(errors.get("config.binarize.method").is_some());
//! ```

pub mod config;
pub mod defaults;
pub mod error;
pub mod path;
pub mod rules;
pub mod template;
pub mod value;

pub use config::{Configuration, deep_merge};
pub use defaults::defaults_for;
pub use error::{ConfigError, PathError};
pub use path::{AttributePath, ConfigPath};
pub use rules::{
    NAME_MESSAGE, NUMBER_MESSAGE, PatternKind, Rule, RuleSet, ValidationErrors, compile,
};
pub use template::{OptionDescriptor, PluginTemplate, Template};
pub use value::{OptionValue, Scalar, ScalarKind};
