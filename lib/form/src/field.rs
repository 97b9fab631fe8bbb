//! Editable fields derived from option descriptors.

use scanstation_template::{ConfigPath, OptionDescriptor, OptionValue, Scalar, ScalarKind};
use serde::Serialize;
use serde_json::{Number, Value as JsonValue};

/// How an option is edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldKind {
    /// One of a fixed list of values.
    Select { choices: Vec<Scalar> },
    /// A boolean flag.
    Checkbox,
    /// Free text.
    Text,
    /// A number.
    Number,
    /// A list of values, which cannot be edited.
    Unsupported,
}

impl FieldKind {
    /// Picks the input for an option: a select for selectable options,
    /// otherwise by the type of its value.
    #[must_use]
    pub fn of(option: &OptionDescriptor) -> Self {
        if let Some(choices) = option.choices() {
            return Self::Select {
                choices: choices.to_vec(),
            };
        }
        match &option.value {
            OptionValue::List(_) => Self::Unsupported,
            OptionValue::Single(value) => match value.kind() {
                ScalarKind::Bool => Self::Checkbox,
                ScalarKind::Number => Self::Number,
                ScalarKind::String => Self::Text,
            },
        }
    }

    /// Whether the label goes after the input instead of before it.
    #[must_use]
    pub fn label_follows_input(&self) -> bool {
        matches!(self, Self::Checkbox)
    }

    /// Converts text typed into this field into the value to store.
    ///
    /// Input that does not fit the field is kept as a string, so validation
    /// can report it.
    #[must_use]
    pub fn parse_input(&self, raw: &str) -> JsonValue {
        let trimmed = raw.trim();
        match self {
            Self::Select { choices } => choices
                .iter()
                .find(|choice| choice.to_string() == trimmed)
                .map_or_else(|| JsonValue::from(raw), Scalar::to_json),
            Self::Checkbox => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => JsonValue::Bool(true),
                "false" | "no" | "off" | "0" => JsonValue::Bool(false),
                _ => JsonValue::from(raw),
            },
            Self::Number => trimmed
                .parse::<i64>()
                .map(JsonValue::from)
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .and_then(Number::from_f64)
                        .map(JsonValue::Number)
                })
                .unwrap_or_else(|| JsonValue::from(raw)),
            Self::Unsupported => {
                serde_json::from_str(trimmed).unwrap_or_else(|_| JsonValue::from(raw))
            }
            Self::Text => JsonValue::from(raw),
        }
    }
}

/// One option as a form shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    #[serde(serialize_with = "serialize_path")]
    pub path: ConfigPath,
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub value: Option<JsonValue>,
    pub error: Option<String>,
    pub advanced: bool,
}

fn serialize_path<S: serde::Serializer>(path: &ConfigPath, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(path)
}

impl FieldView {
    /// Builds the view of the option at `path`.
    #[must_use]
    pub fn new(
        path: ConfigPath,
        option: &OptionDescriptor,
        value: Option<JsonValue>,
        error: Option<String>,
    ) -> Self {
        let name = path.option().to_string();
        let label = option
            .docstring
            .clone()
            .unwrap_or_else(|| capitalize(&name));
        Self {
            path,
            name,
            label,
            kind: FieldKind::of(option),
            value,
            error,
            advanced: option.advanced,
        }
    }
}

/// Upper-cases the first character.
#[must_use]
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
