//! Typed attribute paths.
//!
//! Form bindings and validation results address attributes with dotted
//! strings such as `config.binarize.threshold`. Those strings are parsed once
//! at the boundary into [`AttributePath`].

use crate::error::PathError;
use std::fmt;
use std::str::FromStr;

const CONFIG_PREFIX: &str = "config";
const NAME: &str = "name";

/// Location of one plugin option inside a configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigPath {
    plugin: String,
    option: String,
}

impl ConfigPath {
    /// Creates a path to `option` of `plugin`.
    #[must_use]
    pub fn new(plugin: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            option: option.into(),
        }
    }

    /// Returns the plugin name.
    #[must_use]
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Returns the option name.
    #[must_use]
    pub fn option(&self) -> &str {
        &self.option
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONFIG_PREFIX}.{}.{}", self.plugin, self.option)
    }
}

impl FromStr for ConfigPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<AttributePath>()? {
            AttributePath::Config(path) => Ok(path),
            AttributePath::Name => Err(PathError::Malformed {
                path: s.to_string(),
                reason: "expected config.<plugin>.<option>",
            }),
        }
    }
}

/// A writable, validated attribute of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributePath {
    /// The workflow name.
    Name,
    /// One plugin option.
    Config(ConfigPath),
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str(NAME),
            Self::Config(path) => path.fmt(f),
        }
    }
}

impl From<ConfigPath> for AttributePath {
    fn from(path: ConfigPath) -> Self {
        Self::Config(path)
    }
}

impl FromStr for AttributePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == NAME {
            return Ok(Self::Name);
        }
        let malformed = |reason| PathError::Malformed {
            path: s.to_string(),
            reason,
        };
        let mut segments = s.split('.');
        if segments.next() != Some(CONFIG_PREFIX) {
            return Err(malformed("expected 'name' or config.<plugin>.<option>"));
        }
        match (segments.next(), segments.next(), segments.next()) {
            (Some(plugin), Some(option), None) if !plugin.is_empty() && !option.is_empty() => {
                Ok(Self::Config(ConfigPath::new(plugin, option)))
            }
            (_, _, Some(_)) => Err(malformed("options cannot be nested below a plugin")),
            _ => Err(malformed("expected config.<plugin>.<option>")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_config_paths() {
        assert_eq!("name".parse::<AttributePath>(), Ok(AttributePath::Name));
        assert_eq!(
            "config.binarize.method".parse::<AttributePath>(),
            Ok(AttributePath::Config(ConfigPath::new("binarize", "method")))
        );
    }

    #[test]
    fn display_round_trips() {
        let path = ConfigPath::new("tesseract", "language");
        assert_eq!(path.to_string(), "config.tesseract.language");
        assert_eq!(path.to_string().parse::<ConfigPath>(), Ok(path));
    }

    #[test]
    fn rejects_malformed_paths() {
        for input in [
            "",
            "images",
            "config",
            "config.binarize",
            "config..method",
            "config.binarize.",
            "config.binarize.method.extra",
            "cfg.binarize.method",
        ] {
            assert!(
                matches!(
                    input.parse::<AttributePath>(),
                    Err(PathError::Malformed { .. })
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn config_path_rejects_name() {
        assert!("name".parse::<ConfigPath>().is_err());
    }
}
