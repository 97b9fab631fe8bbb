//! The configuration template a server declares for its plugins.
//!
//! A template maps every plugin to its option descriptors. It is fetched once
//! per workflow and never changes afterwards. It is client-only data: it
//! deliberately has no `Serialize` implementation so it cannot end up in a
//! payload sent back to the server.

use crate::path::ConfigPath;
use crate::value::{OptionValue, Scalar, ScalarKind};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Description of a single configurable option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    /// The default value, or the allowed values for a selectable option.
    pub value: OptionValue,
    /// Whether the value must be one of the listed values.
    #[serde(default)]
    pub selectable: bool,
    /// Whether the option is hidden from the default form view.
    #[serde(default)]
    pub advanced: bool,
    /// Human-readable description used as the form label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

impl OptionDescriptor {
    /// Creates a plain option with a default value.
    #[must_use]
    pub fn new(value: impl Into<Scalar>) -> Self {
        Self {
            value: OptionValue::Single(value.into()),
            selectable: false,
            advanced: false,
            docstring: None,
        }
    }

    /// Creates a selectable option restricted to `values`.
    #[must_use]
    pub fn selectable(values: Vec<Scalar>) -> Self {
        Self {
            value: OptionValue::List(values),
            selectable: true,
            advanced: false,
            docstring: None,
        }
    }

    /// Marks the option as advanced.
    #[must_use]
    pub fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }

    /// Adds a docstring.
    #[must_use]
    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    /// Returns the allowed values of a selectable option.
    ///
    /// A selectable option declared with a single value allows exactly that
    /// value.
    #[must_use]
    pub fn choices(&self) -> Option<&[Scalar]> {
        if !self.selectable {
            return None;
        }
        match &self.value {
            OptionValue::List(values) => Some(values),
            OptionValue::Single(value) => Some(std::slice::from_ref(value)),
        }
    }

    /// Returns whether the option holds a single number.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.value.as_single().map(Scalar::kind),
            Some(ScalarKind::Number)
        )
    }

    /// Returns the value a new workflow starts with.
    ///
    /// `None` for a selectable option without any allowed value.
    #[must_use]
    pub fn default_value(&self) -> Option<JsonValue> {
        match self.choices() {
            Some(choices) => choices.first().map(Scalar::to_json),
            None => Some(self.value.to_json()),
        }
    }
}

/// Options of one plugin, keyed by option name.
pub type PluginTemplate = BTreeMap<String, OptionDescriptor>;

/// Options of every plugin, keyed by plugin name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    plugins: BTreeMap<String, PluginTemplate>,
}

impl Template {
    /// Creates a template, dropping plugins that declare no options.
    #[must_use]
    pub fn new(plugins: BTreeMap<String, PluginTemplate>) -> Self {
        let plugins = plugins
            .into_iter()
            .filter(|(name, options)| {
                if options.is_empty() {
                    tracing::trace!(plugin = %name, "dropping plugin without options");
                }
                !options.is_empty()
            })
            .collect();
        Self { plugins }
    }

    /// Creates an empty template.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds a plugin, replacing any previous one of that name.
    ///
    /// A plugin without options is ignored.
    #[must_use]
    pub fn with_plugin(mut self, name: impl Into<String>, options: PluginTemplate) -> Self {
        if !options.is_empty() {
            self.plugins.insert(name.into(), options);
        }
        self
    }

    /// Returns whether no plugin declares any option.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Returns the number of plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns the options of a plugin.
    #[must_use]
    pub fn plugin(&self, name: &str) -> Option<&PluginTemplate> {
        self.plugins.get(name)
    }

    /// Returns whether the template declares options for `name`.
    #[must_use]
    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Iterates over plugins in name order.
    pub fn plugins(&self) -> impl Iterator<Item = (&str, &PluginTemplate)> {
        self.plugins.iter().map(|(name, options)| (name.as_str(), options))
    }

    /// Iterates over every option of every plugin with its configuration path.
    pub fn options(&self) -> impl Iterator<Item = (ConfigPath, &OptionDescriptor)> {
        self.plugins.iter().flat_map(|(plugin, options)| {
            options
                .iter()
                .map(move |(name, option)| (ConfigPath::new(plugin, name), option))
        })
    }

    /// Returns the descriptor at `path`.
    #[must_use]
    pub fn option(&self, path: &ConfigPath) -> Option<&OptionDescriptor> {
        self.plugins.get(path.plugin())?.get(path.option())
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<String, PluginTemplate>::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_plugins_are_dropped_on_load() {
        let template: Template = serde_json::from_value(json!({
            "autorotate": {},
            "tesseract": {
                "language": {"value": ["eng", "deu"], "selectable": true}
            }
        }))
        .expect("deserialize");

        assert_eq!(template.len(), 1);
        assert!(!template.has_plugin("autorotate"));
        assert!(template.has_plugin("tesseract"));
    }

    #[test]
    fn descriptor_flags_default_to_false() {
        let option: OptionDescriptor =
            serde_json::from_value(json!({"value": 300})).expect("deserialize");
        assert!(!option.selectable);
        assert!(!option.advanced);
        assert!(option.docstring.is_none());
        assert!(option.is_numeric());
    }

    #[test]
    fn choices_only_for_selectable_options() {
        let plain = OptionDescriptor {
            value: OptionValue::List(vec![Scalar::from("a")]),
            selectable: false,
            advanced: false,
            docstring: None,
        };
        assert!(plain.choices().is_none());

        let single = OptionDescriptor {
            value: OptionValue::Single(Scalar::from("only")),
            selectable: true,
            advanced: false,
            docstring: None,
        };
        assert_eq!(single.choices(), Some(&[Scalar::from("only")][..]));
    }

    #[test]
    fn default_value_of_selectable_is_first_choice() {
        let option = OptionDescriptor::selectable(vec!["otsu".into(), "sauvola".into()]);
        assert_eq!(option.default_value(), Some(json!("otsu")));

        let empty = OptionDescriptor::selectable(Vec::new());
        assert_eq!(empty.default_value(), None);
    }

    #[test]
    fn options_yield_config_paths() {
        let template = Template::empty().with_plugin(
            "binarize",
            [("threshold".to_string(), OptionDescriptor::new(128i64))]
                .into_iter()
                .collect(),
        );
        let paths: Vec<String> = template.options().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["config.binarize.threshold"]);
        assert!(template.option(&ConfigPath::new("binarize", "threshold")).is_some());
    }
}
