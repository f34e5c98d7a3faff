//! Naming conventions
//!
//! Two concerns live here: the table of well-known keys and class names
//! that foreign (Java) backends embed in payloads, and the strategies that
//! derive a source key from a model field name.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static WORD_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-z0-9])([A-Z])|([A-Z])([A-Z][a-z])").expect("valid boundary pattern")
});

/// Well-known keys and class names recognized during resolution
///
/// Every entry is matched exactly and case-sensitively against map keys or
/// discriminator values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConventions {
    /// Key holding the type discriminator
    pub class_name_key: String,

    /// Prefixes stripped from discriminator values; the empty prefix strips nothing
    pub class_prefixes: Vec<String>,

    /// Suffixes stripped from discriminator values
    pub class_suffixes: Vec<String>,

    /// Drop a package qualifier (`com.acme.Person` -> `Person`) after affix stripping
    pub strip_package: bool,

    pub long_class: String,
    pub big_integer_class: String,
    pub array_class: String,
    pub hash_set_class: String,
    pub hash_map_class: String,
    pub tree_map_class: String,
    pub date_class: String,
    pub math_timestamp_class: String,
    pub sql_timestamp_class: String,

    /// Alternative payload key carrying a configuration map
    pub configuration_map_key: String,

    /// Enum domain name to the key that carries its cases, in lookup order
    pub enum_keys: Vec<EnumKey>,

    /// Payload keys inside class-tagged wrappers
    pub payload: PayloadKeys,
}

/// Binding of an enum domain to the key that identifies it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumKey {
    pub domain: String,
    pub key: String,
}

/// Keys inside class-tagged wrappers that hold the actual payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadKeys {
    pub list: String,
    pub set: String,
    pub map: String,
    pub time: String,
    pub nanos: String,
    pub value: String,
}

impl Default for PayloadKeys {
    fn default() -> Self {
        Self {
            list: "list".to_string(),
            set: "set".to_string(),
            map: "map".to_string(),
            time: "time".to_string(),
            nanos: "nanos".to_string(),
            value: "value".to_string(),
        }
    }
}

impl Default for NamingConventions {
    fn default() -> Self {
        Self {
            class_name_key: "javaClass".to_string(),
            class_prefixes: vec![String::new()],
            class_suffixes: vec!["Impl".to_string()],
            strip_package: true,
            long_class: "java.lang.Long".to_string(),
            big_integer_class: "java.math.BigInteger".to_string(),
            array_class: "java.util.ArrayList".to_string(),
            hash_set_class: "java.util.HashSet".to_string(),
            hash_map_class: "java.util.HashMap".to_string(),
            tree_map_class: "java.util.TreeMap".to_string(),
            date_class: "java.util.Date".to_string(),
            math_timestamp_class: "java.math.Timestamp".to_string(),
            sql_timestamp_class: "java.sql.Timestamp".to_string(),
            configuration_map_key: "configurationMap".to_string(),
            enum_keys: vec![
                EnumKey::new("Permission", "permission"),
                EnumKey::new("StationOperation", "stationOperation"),
                EnumKey::new("StationErrorCode", "stationErrorCode"),
            ],
            payload: PayloadKeys::default(),
        }
    }
}

impl EnumKey {
    pub fn new(domain: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            key: key.into(),
        }
    }
}

/// Foreign class families the engine knows how to unwrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignClass {
    LargeInteger,
    Array,
    HashSet,
    HashMap,
    TreeMap,
    Date,
    Timestamp,
}

impl NamingConventions {
    /// Check that every constant is usable
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first empty constant.
    pub fn validate(&self) -> crate::Result<()> {
        let constants = [
            ("class_name_key", &self.class_name_key),
            ("long_class", &self.long_class),
            ("big_integer_class", &self.big_integer_class),
            ("array_class", &self.array_class),
            ("hash_set_class", &self.hash_set_class),
            ("hash_map_class", &self.hash_map_class),
            ("tree_map_class", &self.tree_map_class),
            ("date_class", &self.date_class),
            ("math_timestamp_class", &self.math_timestamp_class),
            ("sql_timestamp_class", &self.sql_timestamp_class),
            ("configuration_map_key", &self.configuration_map_key),
            ("payload.list", &self.payload.list),
            ("payload.set", &self.payload.set),
            ("payload.map", &self.payload.map),
            ("payload.time", &self.payload.time),
            ("payload.nanos", &self.payload.nanos),
            ("payload.value", &self.payload.value),
        ];
        if let Some((name, _)) = constants.iter().find(|(_, value)| value.is_empty()) {
            return Err(crate::Error::Config(format!(
                "naming constant '{name}' must not be empty"
            )));
        }
        if self.class_suffixes.iter().any(String::is_empty) {
            return Err(crate::Error::Config(
                "class suffixes must not be empty strings".to_string(),
            ));
        }
        for entry in &self.enum_keys {
            if entry.domain.is_empty() || entry.key.is_empty() {
                return Err(crate::Error::Config(
                    "enum key entries need both a domain and a key".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Classify a discriminator value as one of the known foreign classes
    #[must_use]
    pub fn foreign_class(&self, class_name: &str) -> Option<ForeignClass> {
        let table = [
            (&self.long_class, ForeignClass::LargeInteger),
            (&self.big_integer_class, ForeignClass::LargeInteger),
            (&self.array_class, ForeignClass::Array),
            (&self.hash_set_class, ForeignClass::HashSet),
            (&self.hash_map_class, ForeignClass::HashMap),
            (&self.tree_map_class, ForeignClass::TreeMap),
            (&self.date_class, ForeignClass::Date),
            (&self.math_timestamp_class, ForeignClass::Timestamp),
            (&self.sql_timestamp_class, ForeignClass::Timestamp),
        ];
        table
            .iter()
            .find(|(name, _)| name.as_str() == class_name)
            .map(|(_, class)| *class)
    }

    /// Discriminator value of a map node, if it carries one as a string
    #[must_use]
    pub fn class_name_of<'a>(&self, value: &'a objmap_value::Value) -> Option<&'a str> {
        value.get(&self.class_name_key).and_then(objmap_value::Value::as_str)
    }

    /// Key carrying cases for an enum domain
    #[must_use]
    pub fn enum_key(&self, domain: &str) -> Option<&str> {
        self.enum_keys
            .iter()
            .find(|entry| entry.domain == domain)
            .map(|entry| entry.key.as_str())
    }

    /// Strip registered affixes and the package qualifier from a class name
    ///
    /// The longest matching prefix goes first, then the longest matching
    /// suffix, then everything up to the last `.` when `strip_package` is on.
    #[must_use]
    pub fn bare_class_name<'a>(&self, class_name: &'a str) -> &'a str {
        let mut bare = self
            .class_prefixes
            .iter()
            .filter(|prefix| class_name.starts_with(prefix.as_str()))
            .max_by_key(|prefix| prefix.len())
            .map_or(class_name, |prefix| &class_name[prefix.len()..]);

        if let Some(suffix) = self
            .class_suffixes
            .iter()
            .filter(|suffix| bare.len() > suffix.len() && bare.ends_with(suffix.as_str()))
            .max_by_key(|suffix| suffix.len())
        {
            bare = &bare[..bare.len() - suffix.len()];
        }

        if self.strip_package {
            if let Some(pos) = bare.rfind('.') {
                bare = &bare[pos + 1..];
            }
        }
        bare
    }

    /// Decorate a bare type name the way discriminators are written
    #[must_use]
    pub fn decorated_class_name(&self, bare: &str) -> String {
        let prefix = self.class_prefixes.first().map_or("", String::as_str);
        let suffix = self.class_suffixes.first().map_or("", String::as_str);
        format!("{prefix}{bare}{suffix}")
    }
}

/// Derives the source key for a model field
pub trait NamingStrategy: Send + Sync {
    fn source_key(&self, field_name: &str) -> String;
}

/// Built-in key casing strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCase {
    /// Key equals the field name
    #[default]
    Identity,
    /// `firstName` -> `first_name`
    SnakeCase,
    /// `first_name` -> `firstName`
    CamelCase,
    /// `first_name` -> `FirstName`
    PascalCase,
}

impl NamingStrategy for KeyCase {
    fn source_key(&self, field_name: &str) -> String {
        match self {
            KeyCase::Identity => field_name.to_string(),
            KeyCase::SnakeCase => to_snake_case(field_name),
            KeyCase::CamelCase => to_camel_case(field_name, false),
            KeyCase::PascalCase => to_camel_case(field_name, true),
        }
    }
}

/// Convert `camelCase` or `PascalCase` to `snake_case`
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let split = WORD_BOUNDARY.replace_all(name, |caps: &regex::Captures<'_>| {
        if let (Some(a), Some(b)) = (caps.get(1), caps.get(2)) {
            format!("{}_{}", a.as_str(), b.as_str())
        } else {
            format!("{}_{}", &caps[3], &caps[4])
        }
    });
    split.replace('-', "_").to_lowercase()
}

/// Convert `snake_case` to `camelCase`, or `PascalCase` when `upper_first` is set
#[must_use]
pub fn to_camel_case(name: &str, upper_first: bool) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = upper_first;
    for ch in name.chars() {
        if ch == '_' || ch == '-' {
            upper_next = !out.is_empty() || upper_first;
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else if out.is_empty() {
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Normalized form used by lenient key matching: lowercase, no `_`/`-`
#[must_use]
pub fn loose_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Guess a type name from a collection key: `comments` -> `Comment`
#[must_use]
pub fn singular_type_name(key: &str) -> String {
    let camel = to_camel_case(key, true);
    if let Some(stem) = camel.strip_suffix("ies") {
        format!("{stem}y")
    } else if camel.ends_with("ses") || camel.ends_with("xes") {
        camel[..camel.len() - 2].to_string()
    } else if ["ss", "us", "is"].iter().any(|end| camel.ends_with(end)) {
        camel
    } else if let Some(stem) = camel.strip_suffix('s') {
        stem.to_string()
    } else {
        camel
    }
}
