//! Validation rules derived from a template.
//!
//! [`compile`] turns a template into a [`RuleSet`]; [`RuleSet::validate`]
//! evaluates every rule against a workflow's current name and configuration.
//!
//! Only selectable and numeric options get a rule. String and boolean options
//! are accepted as they are: tightening that would reject configurations the
//! server has always taken.

use crate::config::Configuration;
use crate::path::{AttributePath, ConfigPath};
use crate::template::Template;
use crate::value::Scalar;
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// Message reported for an invalid workflow name.
pub const NAME_MESSAGE: &str = "Non-ASCII characters and \"/\" are not permitted.";

/// Message reported for a non-numeric value of a numeric option.
pub const NUMBER_MESSAGE: &str = "Must be a number.";

/// All printable ASCII characters, except '/'.
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x20-\x2E\x30-\x7E]*$").expect("valid name pattern"));

/// Plain or comma-grouped decimal numbers.
static NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:\d+|\d{1,3}(?:,\d{3})+)(?:\.\d+)?$").expect("valid number pattern")
});

/// The shape a patterned value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// A plain or comma-grouped decimal. JSON numbers are checked by their
    /// printed form, so exponent spellings such as `1e21` are rejected.
    Number,
    /// Printable ASCII without `/`, safe for use as a directory name.
    PrintableAscii,
}

impl PatternKind {
    fn accepts(self, value: &JsonValue) -> bool {
        match (self, value) {
            (Self::Number, JsonValue::Number(n)) => NUMBER_PATTERN.is_match(&n.to_string()),
            (Self::Number, JsonValue::String(s)) => NUMBER_PATTERN.is_match(s),
            (Self::PrintableAscii, JsonValue::String(s)) => NAME_PATTERN.is_match(s),
            _ => false,
        }
    }
}

/// A check applied to one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// The value must be one of `allowed`.
    OneOf { allowed: Vec<Scalar> },
    /// The value must have the shape of `kind`.
    Pattern {
        kind: PatternKind,
        message: String,
        required: bool,
    },
}

impl Rule {
    /// The rule every workflow name is checked against.
    #[must_use]
    pub fn name() -> Self {
        Self::Pattern {
            kind: PatternKind::PrintableAscii,
            message: NAME_MESSAGE.to_string(),
            required: true,
        }
    }

    /// Checks `value`, returning the error message on failure.
    ///
    /// Blank values (absent, null or whitespace-only strings) only fail a
    /// required rule; optional rules skip them.
    #[must_use]
    pub fn check(&self, value: Option<&JsonValue>) -> Option<String> {
        let value = match value {
            Some(v) if !is_blank(v) => v,
            _ => {
                return match self {
                    Self::Pattern {
                        required: true,
                        message,
                        ..
                    } => Some(message.clone()),
                    _ => None,
                };
            }
        };
        match self {
            Self::OneOf { allowed } => {
                if allowed.iter().any(|choice| choice.matches(value)) {
                    None
                } else {
                    Some(one_of_message(allowed))
                }
            }
            Self::Pattern { kind, message, .. } => {
                (!kind.accepts(value)).then(|| message.clone())
            }
        }
    }
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn one_of_message(allowed: &[Scalar]) -> String {
    let choices: Vec<String> = allowed.iter().map(Scalar::to_string).collect();
    format!("Must be one of: {}.", choices.join(", "))
}

/// Rules keyed by the attribute they check.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    rules: BTreeMap<AttributePath, Rule>,
}

impl Default for RuleSet {
    /// A rule set with only the name rule, as compiled from an empty template.
    fn default() -> Self {
        compile(&Template::empty())
    }
}

impl RuleSet {
    /// Returns the number of rules, the name rule included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always false: the name rule is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the rule for `path`.
    #[must_use]
    pub fn get(&self, path: &AttributePath) -> Option<&Rule> {
        self.rules.get(path)
    }

    /// Iterates over rules in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&AttributePath, &Rule)> {
        self.rules.iter()
    }

    /// Evaluates every rule against `name` and `config`.
    #[must_use]
    pub fn validate(&self, name: Option<&str>, config: &Configuration) -> ValidationErrors {
        let name = name.map(|n| JsonValue::String(n.to_string()));
        let mut errors = ValidationErrors::default();
        for (path, rule) in &self.rules {
            let value = match path {
                AttributePath::Name => name.as_ref(),
                AttributePath::Config(config_path) => config.get(config_path),
            };
            if let Some(message) = rule.check(value) {
                errors.insert(path.to_string(), message);
            }
        }
        errors
    }
}

/// Derives the validation rules for `template`.
///
/// Selectable options get a one-of rule, numeric options a number pattern,
/// other options nothing. The name rule is always included.
#[must_use]
pub fn compile(template: &Template) -> RuleSet {
    let mut rules = BTreeMap::new();
    rules.insert(AttributePath::Name, Rule::name());
    for (path, option) in template.options() {
        let rule = if let Some(choices) = option.choices() {
            Rule::OneOf {
                allowed: choices.to_vec(),
            }
        } else if option.is_numeric() {
            Rule::Pattern {
                kind: PatternKind::Number,
                message: NUMBER_MESSAGE.to_string(),
                required: false,
            }
        } else {
            continue;
        };
        rules.insert(AttributePath::Config(path), rule);
    }
    RuleSet { rules }
}

/// Failed checks, keyed by attribute path string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// Returns whether every check passed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of failing attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the message for `path`, e.g. `config.binarize.method`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    /// Returns the message for a plugin option.
    #[must_use]
    pub fn for_option(&self, path: &ConfigPath) -> Option<&str> {
        self.get(&path.to_string())
    }

    /// Iterates over `(path, message)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, m)| (p.as_str(), m.as_str()))
    }

    fn insert(&mut self, path: String, message: String) {
        self.0.insert(path, message);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{path}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::defaults_for;
    use crate::template::OptionDescriptor;
    use serde_json::json;

    fn binarize_template() -> Template {
        serde_json::from_value(json!({
            "binarize": {
                "threshold": {"value": 128, "selectable": false},
                "method": {"value": ["otsu", "sauvola"], "selectable": true}
            }
        }))
        .expect("template")
    }

    fn path(s: &str) -> AttributePath {
        s.parse().expect("path")
    }

    #[test]
    fn binarize_rules() {
        let rules = compile(&binarize_template());
        assert_eq!(rules.len(), 3);
        assert_eq!(
            rules.get(&path("config.binarize.threshold")),
            Some(&Rule::Pattern {
                kind: PatternKind::Number,
                message: NUMBER_MESSAGE.to_string(),
                required: false,
            })
        );
        assert_eq!(
            rules.get(&path("config.binarize.method")),
            Some(&Rule::OneOf {
                allowed: vec!["otsu".into(), "sauvola".into()]
            })
        );
        assert_eq!(rules.get(&AttributePath::Name), Some(&Rule::name()));
    }

    #[test]
    fn string_and_boolean_options_stay_unvalidated() {
        let template = Template::empty().with_plugin(
            "tesseract",
            [
                ("hocr".to_string(), OptionDescriptor::new(true)),
                ("extra_args".to_string(), OptionDescriptor::new("--psm 3")),
                ("dpi".to_string(), OptionDescriptor::new(300i64)),
            ]
            .into_iter()
            .collect(),
        );
        let rules = compile(&template);
        assert_eq!(rules.len(), 2);
        assert!(rules.get(&path("config.tesseract.hocr")).is_none());
        assert!(rules.get(&path("config.tesseract.extra_args")).is_none());

        let mut config = defaults_for(&template);
        config
            .set(&ConfigPath::new("tesseract", "hocr"), json!("not a bool"))
            .expect("set");
        assert!(rules.validate(Some("book"), &config).is_empty());
    }

    #[test]
    fn empty_template_compiles_only_the_name_rule() {
        let rules = RuleSet::default();
        assert_eq!(rules.len(), 1);
        assert!(!rules.is_empty());
    }

    #[test]
    fn compliant_configuration_has_no_errors() {
        let template = binarize_template();
        let rules = compile(&template);
        let errors = rules.validate(Some("scan-01"), &defaults_for(&template));
        assert!(errors.is_empty(), "{errors}");
    }

    #[test]
    fn invalid_choice_is_reported_at_its_path() {
        let template = binarize_template();
        let rules = compile(&template);
        let mut config = defaults_for(&template);
        let method = ConfigPath::new("binarize", "method");

        config.set(&method, json!("invalid")).expect("set");
        let errors = rules.validate(Some("scan-01"), &config);
        assert_eq!(
            errors.get("config.binarize.method"),
            Some("Must be one of: otsu, sauvola.")
        );
        assert_eq!(errors.len(), 1);

        config.set(&method, json!("sauvola")).expect("set");
        let errors = rules.validate(Some("scan-01"), &config);
        assert!(errors.for_option(&method).is_none());
    }

    #[test]
    fn numeric_pattern_accepts_numbers_and_numeric_strings() {
        let rule = Rule::Pattern {
            kind: PatternKind::Number,
            message: NUMBER_MESSAGE.to_string(),
            required: false,
        };
        for ok in [json!(128), json!(-0.5), json!("42"), json!("1,024.5")] {
            assert_eq!(rule.check(Some(&ok)), None, "{ok}");
        }
        for bad in [
            json!("abc"),
            json!(true),
            json!("1,2"),
            json!([1]),
            json!(1e21),
            json!("1e21"),
        ] {
            assert_eq!(rule.check(Some(&bad)), Some(NUMBER_MESSAGE.to_string()), "{bad}");
        }
        assert_eq!(rule.check(None), None);
        assert_eq!(rule.check(Some(&json!(""))), None);
    }

    #[test]
    fn name_rule() {
        let rules = RuleSet::default();
        let config = Configuration::new();
        for bad in [Some("café"), Some("a/b"), Some(""), Some("   "), None] {
            assert_eq!(
                rules.validate(bad, &config).get("name"),
                Some(NAME_MESSAGE),
                "{bad:?}"
            );
        }
        for good in ["scan-01", "My Book (1902)", "~tilde"] {
            assert!(rules.validate(Some(good), &config).is_empty(), "{good}");
        }
    }

    #[test]
    fn every_failing_field_is_reported() {
        let template = binarize_template();
        let rules = compile(&template);
        let mut config = defaults_for(&template);
        config
            .set(&ConfigPath::new("binarize", "threshold"), json!("high"))
            .expect("set");
        config
            .set(&ConfigPath::new("binarize", "method"), json!("niblack"))
            .expect("set");
        let errors = rules.validate(Some("café"), &config);
        let paths: Vec<&str> = errors.iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec!["config.binarize.method", "config.binarize.threshold", "name"]
        );
    }
}
