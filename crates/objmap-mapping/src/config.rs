//! Mapper configuration
//!
//! Loaded from YAML the same way mapping definitions are; every field has a
//! default so partial files are fine.

use crate::naming::{KeyCase, NamingConventions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How instants are written back out by `unmap`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOutput {
    #[default]
    Rfc3339,
    EpochSeconds,
    EpochMillis,
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Well-known keys and foreign class names
    pub naming: NamingConventions,

    /// Default strategy deriving source keys from field names
    pub key_case: KeyCase,

    /// Fall back to case- and underscore-insensitive key matching
    pub lenient_keys: bool,

    /// chrono formats tried, in order, after RFC 3339 when parsing date strings
    pub date_formats: Vec<String>,

    pub date_output: DateOutput,

    /// Write the discriminator key when unmapping objects
    pub emit_class_name: bool,

    /// Deepest nesting the engine will follow
    pub max_depth: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            naming: NamingConventions::default(),
            key_case: KeyCase::Identity,
            lenient_keys: true,
            date_formats: vec![
                "%Y-%m-%dT%H:%M:%S%.f".to_string(),
                "%Y-%m-%d %H:%M:%S%.f".to_string(),
                "%a %b %d %H:%M:%S UTC %Y".to_string(),
                "%Y-%m-%d".to_string(),
                "%d/%m/%Y".to_string(),
            ],
            date_output: DateOutput::Rfc3339,
            emit_class_name: false,
            max_depth: 64,
        }
    }
}

impl MapperConfig {
    /// Parse a configuration from YAML
    ///
    /// # Errors
    ///
    /// Returns an error when YAML parsing or validation fails.
    pub fn from_yaml_str(yaml: &str) -> crate::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| {
            let location = e
                .location()
                .map(|l| format!(" at line {}, column {}", l.line(), l.column()))
                .unwrap_or_default();
            crate::Error::Config(format!("Failed to parse configuration: {e}{location}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error when reading, parsing, or validation fails.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Check the configuration for unusable values
    ///
    /// # Errors
    ///
    /// Returns an error for empty naming constants or a zero depth limit.
    pub fn validate(&self) -> crate::Result<()> {
        self.naming.validate()?;
        if self.max_depth == 0 {
            return Err(crate::Error::Config(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder: change the key casing strategy
    #[must_use]
    pub fn with_key_case(mut self, key_case: KeyCase) -> Self {
        self.key_case = key_case;
        self
    }

    /// Builder: change the discriminator key
    #[must_use]
    pub fn with_class_name_key(mut self, key: impl Into<String>) -> Self {
        self.naming.class_name_key = key.into();
        self
    }

    /// Builder: replace the discriminator affixes
    #[must_use]
    pub fn with_class_affixes(mut self, prefixes: &[&str], suffixes: &[&str]) -> Self {
        self.naming.class_prefixes = prefixes.iter().map(ToString::to_string).collect();
        self.naming.class_suffixes = suffixes.iter().map(ToString::to_string).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MapperConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.naming.class_name_key, "javaClass");
        assert!(config.lenient_keys);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = MapperConfig::from_yaml_str(
            r"
key_case: snake_case
naming:
  class_name_key: type
  class_suffixes: [Impl, Dto]
date_output: epoch_millis
",
        )
        .unwrap();

        assert_eq!(config.key_case, KeyCase::SnakeCase);
        assert_eq!(config.naming.class_name_key, "type");
        assert_eq!(config.naming.class_suffixes, vec!["Impl", "Dto"]);
        assert_eq!(config.naming.array_class, "java.util.ArrayList");
        assert_eq!(config.naming.payload.list, "list");
        assert_eq!(config.date_output, DateOutput::EpochMillis);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_yaml_rejects_empty_constant() {
        let err = MapperConfig::from_yaml_str("naming:\n  date_class: ''\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
        assert!(err.to_string().contains("date_class"));
    }

    #[test]
    fn test_yaml_syntax_error_reports_location() {
        let err = MapperConfig::from_yaml_str("key_case: [unterminated").unwrap_err();
        assert!(err.to_string().contains("line"));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let config = MapperConfig {
            max_depth: 0,
            ..MapperConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builders() {
        let config = MapperConfig::default()
            .with_class_name_key("type")
            .with_class_affixes(&[""], &["Impl"])
            .with_key_case(KeyCase::CamelCase);

        assert_eq!(config.naming.class_name_key, "type");
        assert_eq!(config.naming.class_prefixes, vec![""]);
        assert_eq!(config.key_case, KeyCase::CamelCase);
    }
}
