//! Mapping rules
//!
//! A [`MappingRule`] binds one source key to one destination field. It
//! either carries a declared type that drives the default conversion, or a
//! [`Transformer`] that fully decides the value in both directions.
//!
//! # Transformer call conventions
//!
//! The same function serves both directions:
//!
//! - forward (payload to object): `current` is the source map's value under
//!   the rule's source key (null when absent) and `parent` is the whole
//!   source map. The result is stored in the field as-is.
//! - reverse (object to payload): `current` is the field's value rendered as
//!   a generic value and `parent` is the whole object rendered as a map
//!   keyed by field names. The result is written under the source key.

use crate::types::TypeSpec;
use indexmap::IndexMap;
use objmap_value::Value;
use std::fmt;
use std::sync::Arc;

/// Per-field transform, see the module docs for its two call conventions
pub type Transformer = Arc<dyn Fn(&Value, &Value) -> crate::Result<Value> + Send + Sync>;

#[derive(Clone)]
enum Conversion {
    Declared(Option<TypeSpec>),
    Transform(Transformer),
}

/// Binding of one source key to one destination field
#[derive(Clone)]
pub struct MappingRule {
    source_key: String,
    destination_field: String,
    conversion: Conversion,
}

impl MappingRule {
    /// Rule converted by declared type
    ///
    /// With `declared_type` unset the field's introspected type is used.
    ///
    /// # Errors
    ///
    /// Returns an error if either key is empty.
    pub fn typed(
        source_key: impl Into<String>,
        destination_field: impl Into<String>,
        declared_type: Option<TypeSpec>,
    ) -> crate::Result<Self> {
        Self::build(
            source_key.into(),
            destination_field.into(),
            Conversion::Declared(declared_type),
        )
    }

    /// Rule whose value is produced by a transform function
    ///
    /// # Errors
    ///
    /// Returns an error if either key is empty.
    pub fn transformed(
        source_key: impl Into<String>,
        destination_field: impl Into<String>,
        transform: impl Fn(&Value, &Value) -> crate::Result<Value> + Send + Sync + 'static,
    ) -> crate::Result<Self> {
        Self::build(
            source_key.into(),
            destination_field.into(),
            Conversion::Transform(Arc::new(transform)),
        )
    }

    /// Rule using an already shared transformer, such as the built-ins in
    /// [`crate::transforms`]
    ///
    /// # Errors
    ///
    /// Returns an error if either key is empty.
    pub fn with_transformer(
        source_key: impl Into<String>,
        destination_field: impl Into<String>,
        transform: Transformer,
    ) -> crate::Result<Self> {
        Self::build(
            source_key.into(),
            destination_field.into(),
            Conversion::Transform(transform),
        )
    }

    fn build(
        source_key: String,
        destination_field: String,
        conversion: Conversion,
    ) -> crate::Result<Self> {
        if source_key.is_empty() {
            return Err(crate::Error::InvalidRule(format!(
                "source key for field '{destination_field}' is empty"
            )));
        }
        if destination_field.is_empty() {
            return Err(crate::Error::InvalidRule(format!(
                "destination field for key '{source_key}' is empty"
            )));
        }
        Ok(Self {
            source_key,
            destination_field,
            conversion,
        })
    }

    #[must_use]
    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    #[must_use]
    pub fn destination_field(&self) -> &str {
        &self.destination_field
    }

    /// Explicit type, if the rule declares one
    #[must_use]
    pub fn declared_type(&self) -> Option<&TypeSpec> {
        match &self.conversion {
            Conversion::Declared(spec) => spec.as_ref(),
            Conversion::Transform(_) => None,
        }
    }

    #[must_use]
    pub fn transform(&self) -> Option<&Transformer> {
        match &self.conversion {
            Conversion::Transform(transform) => Some(transform),
            Conversion::Declared(_) => None,
        }
    }
}

impl fmt::Debug for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingRule")
            .field("source_key", &self.source_key)
            .field("destination_field", &self.destination_field)
            .field("declared_type", &self.declared_type())
            .field("has_transform", &self.transform().is_some())
            .finish()
    }
}

/// A rule together with what the engine needs to apply it
#[derive(Debug, Clone)]
pub struct BoundRule {
    pub rule: MappingRule,

    /// Declared type of the rule, or the field's introspected type
    pub spec: TypeSpec,

    pub optional: bool,
}

/// All rules for one target type, keyed by destination field
#[derive(Debug, Clone)]
pub struct RuleSet {
    type_name: String,
    rules: IndexMap<String, BoundRule>,
}

impl RuleSet {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            rules: IndexMap::new(),
        }
    }

    /// Add a rule; a later rule for the same field replaces the earlier one
    pub fn insert(&mut self, rule: MappingRule, spec: TypeSpec, optional: bool) {
        self.rules.insert(
            rule.destination_field().to_string(),
            BoundRule {
                rule,
                spec,
                optional,
            },
        );
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn get(&self, destination_field: &str) -> Option<&BoundRule> {
        self.rules.get(destination_field)
    }

    /// Rules in field declaration order
    pub fn iter(&self) -> impl Iterator<Item = &BoundRule> {
        self.rules.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Source keys the rule set reads, in order
    pub fn source_keys(&self) -> impl Iterator<Item = &str> {
        self.rules.values().map(|bound| bound.rule.source_key())
    }
}
