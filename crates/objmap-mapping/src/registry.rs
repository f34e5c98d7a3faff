//! Type registry
//!
//! The registry is the host application's registration surface: model type
//! descriptions, per-field rule overrides and exclusions, the discriminator
//! table for polymorphic hierarchies, and enum domains. It also answers the
//! engine's introspection questions.

use crate::model::{EnumValue, Model};
use crate::naming::NamingStrategy;
use crate::rule::{MappingRule, RuleSet};
use crate::types::{FieldDescriptor, TypeDescriptor, TypeKind, TypeSpec};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

/// Introspection capability: what fields a type has and whether it is abstract
pub trait Introspect: Send + Sync {
    /// Fields of the type in declaration order, `None` for unknown types
    fn fields_of(&self, type_name: &str) -> Option<Vec<FieldDescriptor>>;

    /// Kind of the type, `None` for unknown types
    fn kind_of(&self, type_name: &str) -> Option<TypeKind>;
}

/// A named set of enum cases; ordinals follow declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDomain {
    name: String,
    cases: Vec<String>,
}

impl EnumDomain {
    pub fn new<I, S>(name: impl Into<String>, cases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            cases: cases.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn cases(&self) -> &[String] {
        &self.cases
    }

    /// Find a case by name: exact match first, then case-insensitive
    #[must_use]
    pub fn by_name(&self, case: &str) -> Option<EnumValue> {
        self.cases
            .iter()
            .position(|c| c == case)
            .or_else(|| self.cases.iter().position(|c| c.eq_ignore_ascii_case(case)))
            .map(|ordinal| self.value_at(ordinal))
    }

    /// Find a case by ordinal
    #[must_use]
    pub fn by_ordinal(&self, ordinal: i64) -> Option<EnumValue> {
        let ordinal = usize::try_from(ordinal).ok()?;
        (ordinal < self.cases.len()).then(|| self.value_at(ordinal))
    }

    fn value_at(&self, ordinal: usize) -> EnumValue {
        EnumValue {
            domain: self.name.clone(),
            case: self.cases[ordinal].clone(),
            ordinal,
        }
    }
}

/// Registry of model types and host-provided mapping overrides
#[derive(Default, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
    rules: HashMap<String, Vec<MappingRule>>,
    exclusions: HashMap<String, HashSet<String>>,
    subtypes: HashMap<String, String>,
    enums: HashMap<String, EnumDomain>,
    fallback: Option<Arc<dyn Introspect>>,
}

impl TypeRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask another introspector about types not registered here
    #[must_use]
    pub fn with_fallback(mut self, introspector: Arc<dyn Introspect>) -> Self {
        self.fallback = Some(introspector);
        self
    }

    /// Register (or replace) a type description
    pub fn register_type(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        trace!("Registering type: {}", descriptor.name);
        self.types.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Register the description of a [`Model`] type
    pub fn register_model<T: Model>(&mut self) -> &mut Self {
        self.register_type(T::descriptor())
    }

    /// Override the default rule for one field of a type
    ///
    /// Rules naming a field the type does not report are still applied; they
    /// bind an extra optional field.
    pub fn register_rule(&mut self, type_name: impl Into<String>, rule: MappingRule) -> &mut Self {
        self.rules.entry(type_name.into()).or_default().push(rule);
        self
    }

    /// Leave a field out of mapping in both directions
    pub fn exclude_field(
        &mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
    ) -> &mut Self {
        self.exclusions
            .entry(type_name.into())
            .or_default()
            .insert(field.into());
        self
    }

    /// Map a bare discriminator name to a concrete type
    pub fn register_subtype(
        &mut self,
        bare_name: impl Into<String>,
        concrete_type: impl Into<String>,
    ) -> &mut Self {
        self.subtypes.insert(bare_name.into(), concrete_type.into());
        self
    }

    /// Register an enum domain
    pub fn register_enum(&mut self, domain: EnumDomain) -> &mut Self {
        self.enums.insert(domain.name.clone(), domain);
        self
    }

    /// Registered description of a type
    #[must_use]
    pub fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    /// Whether introspection knows the type
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.kind_of(type_name).is_some()
    }

    /// Concrete type registered for a bare discriminator name
    #[must_use]
    pub fn subtype(&self, bare_name: &str) -> Option<&str> {
        self.subtypes.get(bare_name).map(String::as_str)
    }

    #[must_use]
    pub fn enum_domain(&self, name: &str) -> Option<&EnumDomain> {
        self.enums.get(name)
    }

    #[must_use]
    pub fn is_excluded(&self, type_name: &str, field: &str) -> bool {
        self.exclusions
            .get(type_name)
            .is_some_and(|fields| fields.contains(field))
    }

    fn override_for(&self, type_name: &str, field: &str) -> Option<&MappingRule> {
        // Last registration wins
        self.rules
            .get(type_name)?
            .iter()
            .rev()
            .find(|rule| rule.destination_field() == field)
    }

    /// Build the rule set for a type
    ///
    /// Each introspected field gets the host's override rule when one is
    /// registered, otherwise a rule whose source key comes from `strategy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown or a derived rule is invalid.
    pub fn build_rule_set(
        &self,
        type_name: &str,
        strategy: &dyn NamingStrategy,
    ) -> crate::Result<RuleSet> {
        let fields = self
            .fields_of(type_name)
            .ok_or_else(|| crate::Error::UnknownType(type_name.to_string()))?;

        let mut rule_set = RuleSet::new(type_name);
        for field in &fields {
            if self.is_excluded(type_name, &field.name) {
                trace!("Excluding {}.{}", type_name, field.name);
                continue;
            }
            match self.override_for(type_name, &field.name) {
                Some(rule) => {
                    let spec = rule.declared_type().cloned().unwrap_or_else(|| field.spec.clone());
                    rule_set.insert(rule.clone(), spec, field.optional);
                }
                None => {
                    let rule = MappingRule::typed(strategy.source_key(&field.name), &field.name, None)?;
                    rule_set.insert(rule, field.spec.clone(), field.optional);
                }
            }
        }

        // Overrides for fields introspection does not report
        if let Some(extra) = self.rules.get(type_name) {
            for rule in extra {
                let field = rule.destination_field();
                if rule_set.get(field).is_none() && !self.is_excluded(type_name, field) {
                    let spec = rule.declared_type().cloned().unwrap_or(TypeSpec::Any);
                    rule_set.insert(rule.clone(), spec, true);
                }
            }
        }

        Ok(rule_set)
    }
}

impl Introspect for TypeRegistry {
    fn fields_of(&self, type_name: &str) -> Option<Vec<FieldDescriptor>> {
        match self.types.get(type_name) {
            Some(descriptor) => Some(descriptor.fields.clone()),
            None => self.fallback.as_ref()?.fields_of(type_name),
        }
    }

    fn kind_of(&self, type_name: &str) -> Option<TypeKind> {
        match self.types.get(type_name) {
            Some(descriptor) => Some(descriptor.kind),
            None => self.fallback.as_ref()?.kind_of(type_name),
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&String> = self.types.keys().collect();
        types.sort();
        f.debug_struct("TypeRegistry")
            .field("types", &types)
            .field("subtypes", &self.subtypes.len())
            .field("enums", &self.enums.len())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}
