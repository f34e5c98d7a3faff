//! Object mapping engine
//!
//! [`ObjectMapper`] applies rule sets to generic value trees. Forward
//! mapping walks the source node with the target type's rules and produces
//! a [`ModelObject`]; inverse mapping walks an object with the same rules
//! and produces a map keyed by source keys.
//!
//! When several conventions could apply to one node the engine tries them
//! in this order: the rule's transform, unwrapping of foreign containers,
//! dates and large integers for the declared shape, the polymorphic
//! discriminator, key-name inference, and finally a structural lift.

use crate::cache::RuleSetCache;
use crate::coercion::{Coercion, CoercionError};
use crate::collection::{resolve_collection, sequence_elements};
use crate::config::{DateOutput, MapperConfig};
use crate::model::{Model, ModelObject, ModelValue};
use crate::naming::{ForeignClass, NamingStrategy, loose_key, singular_type_name};
use crate::polymorphic::{resolve_or_declared, resolve_target_type};
use crate::registry::{Introspect, TypeRegistry};
use crate::rule::{BoundRule, RuleSet};
use crate::types::{CollectionKind, ScalarType, TypeKind, TypeSpec};
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use objmap_value::{Map, Path, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Maps generic values to model objects and back
///
/// The registry is shared and read-only once handed over; rule sets are
/// built on first use per type and cached until [`ObjectMapper::reset_cache`].
pub struct ObjectMapper {
    config: MapperConfig,
    registry: Arc<TypeRegistry>,
    strategy: Arc<dyn NamingStrategy>,
    cache: RuleSetCache,
}

impl ObjectMapper {
    /// Create a mapper with the default configuration
    pub fn new(registry: impl Into<Arc<TypeRegistry>>) -> Self {
        let config = MapperConfig::default();
        Self {
            strategy: Arc::new(config.key_case),
            config,
            registry: registry.into(),
            cache: RuleSetCache::new(),
        }
    }

    /// Create a mapper with an explicit configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn with_config(
        registry: impl Into<Arc<TypeRegistry>>,
        config: MapperConfig,
    ) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self {
            strategy: Arc::new(config.key_case),
            config,
            registry: registry.into(),
            cache: RuleSetCache::new(),
        })
    }

    /// Replace the strategy deriving default source keys from field names
    #[must_use]
    pub fn with_naming_strategy(mut self, strategy: impl NamingStrategy + 'static) -> Self {
        self.strategy = Arc::new(strategy);
        self.cache.reset();
        self
    }

    #[must_use]
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Rule set for a type, built and cached on first use
    ///
    /// # Errors
    ///
    /// Returns an error if introspection does not know the type.
    pub fn rule_set(&self, type_name: &str) -> crate::Result<Arc<RuleSet>> {
        self.cache.get_or_build(type_name, || {
            self.registry.build_rule_set(type_name, self.strategy.as_ref())
        })
    }

    /// Drop every cached rule set
    pub fn reset_cache(&self) {
        self.cache.reset();
    }

    /// Number of rule set builds since creation
    #[must_use]
    pub fn cache_builds(&self) -> usize {
        self.cache.builds()
    }

    /// Map a source node to an object of `type_name`
    ///
    /// A null node maps to `None`. Abstract types resolve their concrete
    /// type from the discriminator.
    ///
    /// # Errors
    ///
    /// Returns the first error of a required field, an unknown type, or a
    /// node that is not a map.
    pub fn map(&self, type_name: &str, value: &Value) -> crate::Result<Option<ModelObject>> {
        if value.is_null() {
            return Ok(None);
        }
        self.map_object(type_name, value, &Path::root(), false).map(Some)
    }

    /// Map a source node whose concrete type is named by its discriminator
    ///
    /// Falls back to `base` when the discriminator is missing or
    /// unregistered and `base` is concrete.
    ///
    /// # Errors
    ///
    /// Returns an unresolved type error when no concrete type can be found,
    /// or any error of the resolved type's required fields.
    pub fn map_dynamic(&self, base: &str, value: &Value) -> crate::Result<Option<ModelObject>> {
        if value.is_null() {
            return Ok(None);
        }
        self.map_object(base, value, &Path::root(), true).map(Some)
    }

    /// Map a node against any declared shape
    ///
    /// # Errors
    ///
    /// Returns the first conversion error.
    pub fn map_value(&self, spec: &TypeSpec, value: &Value) -> crate::Result<ModelValue> {
        self.map_spec(spec, value, &Path::root(), None)
    }

    /// Map a node straight into a [`Model`] type
    ///
    /// The type must have been registered, e.g. with
    /// [`TypeRegistry::register_model`].
    ///
    /// # Errors
    ///
    /// Returns mapping errors and the model's own conversion errors.
    pub fn map_into<T: Model>(&self, value: &Value) -> crate::Result<Option<T>> {
        let descriptor = T::descriptor();
        self.map(&descriptor.name, value)?
            .map(|object| T::from_object(&object))
            .transpose()
    }

    /// Map a root array to objects of `type_name`
    ///
    /// Accepts a sequence or a foreign array wrapper; null elements are
    /// skipped. A single map node yields one object and null yields none.
    ///
    /// # Errors
    ///
    /// Returns the first element error, or a shape mismatch for scalars.
    pub fn map_all(&self, type_name: &str, value: &Value) -> crate::Result<Vec<ModelObject>> {
        let naming = &self.config.naming;
        let single = value.as_map().is_some()
            && naming
                .class_name_of(value)
                .and_then(|class| naming.foreign_class(class))
                .is_none();
        if value.is_null() {
            return Ok(Vec::new());
        }
        if single {
            return Ok(vec![self.map_object(type_name, value, &Path::root(), false)?]);
        }

        let root = Path::root();
        let items = sequence_elements(value, naming)
            .ok_or_else(|| crate::Error::shape_mismatch(&root, "sequence", value))?;
        let mut objects = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            if !item.is_null() {
                objects.push(self.map_object(type_name, item, &root.index(index), false)?);
            }
        }
        Ok(objects)
    }

    /// Convert an object back to a map keyed by source keys
    ///
    /// # Errors
    ///
    /// Returns an error if a rule set cannot be built or a transform fails.
    pub fn unmap(&self, object: &ModelObject) -> crate::Result<Value> {
        let rules = self.rule_set(object.type_name())?;
        self.unmap_object(object, &rules, &Path::root())
    }

    /// Convert an object back using an explicit rule set
    ///
    /// Nested objects still use their own cached rule sets.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested rule set cannot be built or a transform
    /// fails.
    pub fn unmap_with(&self, object: &ModelObject, rules: &RuleSet) -> crate::Result<Value> {
        self.unmap_object(object, rules, &Path::root())
    }

    /// Convert a [`Model`] value back to a map keyed by source keys
    ///
    /// # Errors
    ///
    /// See [`ObjectMapper::unmap`].
    pub fn unmap_model<T: Model>(&self, model: &T) -> crate::Result<Value> {
        self.unmap(&model.to_object())
    }

    fn check_depth(&self, path: &Path) -> crate::Result<()> {
        if path.depth() > self.config.max_depth {
            return Err(crate::Error::DepthExceeded {
                path: path.clone(),
                limit: self.config.max_depth,
            });
        }
        Ok(())
    }

    fn map_object(
        &self,
        declared: &str,
        value: &Value,
        path: &Path,
        dynamic: bool,
    ) -> crate::Result<ModelObject> {
        self.check_depth(path)?;
        let kind = self.registry.kind_of(declared);
        if kind.is_none() && !dynamic {
            return Err(crate::Error::UnknownType(declared.to_string()));
        }
        let Some(map) = value.as_map() else {
            return Err(crate::Error::shape_mismatch(path, "object", value));
        };

        let target = if dynamic || kind == Some(TypeKind::Abstract) {
            resolve_or_declared(value, declared, &self.registry, &self.config.naming, path)?
        } else {
            declared.to_string()
        };

        let rules = self.rule_set(&target)?;
        self.apply_rules(&rules, value, map, path)
    }

    fn apply_rules(
        &self,
        rules: &RuleSet,
        node: &Value,
        map: &Map,
        path: &Path,
    ) -> crate::Result<ModelObject> {
        let mut object = ModelObject::new(rules.type_name());
        for bound in rules.iter() {
            let field = bound.rule.destination_field();
            let field_path = path.key(field);
            trace!("Applying rule {} <- '{}'", field_path, bound.rule.source_key());

            match self.map_field(bound, self.lookup(map, bound.rule.source_key()), node, &field_path) {
                Ok(Some(value)) => object.set(field, value),
                Ok(None) => {}
                Err(err) if bound.optional && err.is_recoverable() => {
                    warn!("Leaving optional field {} unset: {}", field_path, err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(object)
    }

    fn map_field(
        &self,
        bound: &BoundRule,
        raw: Option<&Value>,
        node: &Value,
        path: &Path,
    ) -> crate::Result<Option<ModelValue>> {
        if let Some(transform) = bound.rule.transform() {
            let output = transform(raw.unwrap_or(&Value::Null), node).map_err(|e| at_path(e, path))?;
            return match output {
                Value::Null if !bound.optional => Err(crate::Error::MissingRequiredField {
                    path: path.clone(),
                }),
                Value::Null => Ok(None),
                output => Ok(Some(ModelValue::from(output))),
            };
        }

        match raw {
            None | Some(Value::Null) if bound.optional => Ok(None),
            None => Err(crate::Error::MissingRequiredField { path: path.clone() }),
            Some(Value::Null) => Ok(Some(null_default(&bound.spec))),
            Some(value) => self
                .map_spec(&bound.spec, value, path, Some(bound.rule.source_key()))
                .map(Some),
        }
    }

    /// Value under `key`: exact match first, then lenient match
    fn lookup<'v>(&self, map: &'v Map, key: &str) -> Option<&'v Value> {
        if let Some(value) = map.get(key) {
            return Some(value);
        }
        if !self.config.lenient_keys {
            return None;
        }
        let wanted = loose_key(key);
        map.iter()
            .find(|(candidate, _)| {
                *candidate != &self.config.naming.class_name_key && loose_key(candidate) == wanted
            })
            .map(|(_, value)| value)
    }

    fn map_spec(
        &self,
        spec: &TypeSpec,
        value: &Value,
        path: &Path,
        key: Option<&str>,
    ) -> crate::Result<ModelValue> {
        self.check_depth(path)?;
        if value.is_null() {
            return Ok(ModelValue::Null);
        }

        match spec {
            TypeSpec::Scalar { scalar } => self.coerce(value, scalar, path, key),
            TypeSpec::Any => Ok(ModelValue::Raw(value.clone())),
            TypeSpec::Inferred => self.map_inferred(value, path, key),
            TypeSpec::Object { type_name } => self
                .map_object(type_name, value, path, false)
                .map(ModelValue::Object),
            TypeSpec::Polymorphic { base } => self
                .map_object(base, value, path, true)
                .map(ModelValue::Object),
            TypeSpec::Collection { kind, element } => {
                resolve_collection(value, *kind, &self.config.naming, path, |item, item_path| {
                    self.map_spec(element, item, item_path, key)
                })
            }
        }
    }

    fn coerce(
        &self,
        value: &Value,
        scalar: &ScalarType,
        path: &Path,
        key: Option<&str>,
    ) -> crate::Result<ModelValue> {
        Coercion::new(&self.config, &self.registry)
            .coerce_keyed(value, scalar, key)
            .map_err(|CoercionError { expected, found }| crate::Error::Coercion {
                path: path.clone(),
                expected,
                found,
            })
    }

    /// Map a node with no declared shape
    ///
    /// Foreign wrappers are unwrapped first, then a discriminator names the
    /// type, then the enclosing key is read as a pluralized type name, and
    /// anything left is lifted structurally with its children inferred the
    /// same way.
    fn map_inferred(&self, value: &Value, path: &Path, key: Option<&str>) -> crate::Result<ModelValue> {
        self.check_depth(path)?;
        let naming = &self.config.naming;

        match value {
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.map_inferred(item, &path.index(index), key))
                .collect::<crate::Result<Vec<_>>>()
                .map(ModelValue::List),
            Value::Map(map) => {
                if let Some(class) = naming.class_name_of(value) {
                    let recurse = |item: &Value, item_path: &Path| self.map_inferred(item, item_path, key);
                    match naming.foreign_class(class) {
                        Some(ForeignClass::Array) => {
                            return resolve_collection(value, CollectionKind::List, naming, path, recurse);
                        }
                        Some(ForeignClass::HashSet) => {
                            return resolve_collection(value, CollectionKind::Set, naming, path, recurse);
                        }
                        Some(ForeignClass::HashMap) => {
                            return resolve_collection(value, CollectionKind::Map, naming, path, recurse);
                        }
                        Some(ForeignClass::TreeMap) => {
                            return resolve_collection(value, CollectionKind::SortedMap, naming, path, recurse);
                        }
                        Some(ForeignClass::Date | ForeignClass::Timestamp) => {
                            return self.coerce(value, &ScalarType::Instant, path, key);
                        }
                        Some(ForeignClass::LargeInteger) => {
                            return self.coerce(value, &ScalarType::LargeInt, path, key);
                        }
                        None => match resolve_target_type(value, &self.registry, naming, path) {
                            Ok(concrete) => {
                                let rules = self.rule_set(&concrete)?;
                                return self.apply_rules(&rules, value, map, path).map(ModelValue::Object);
                            }
                            Err(err) if err.is_recoverable() => {
                                debug!("Discriminator at {} not usable, inferring: {}", path, err);
                            }
                            Err(err) => return Err(err),
                        },
                    }
                }

                if let Some(inferred) = key.map(singular_type_name) {
                    if self.registry.kind_of(&inferred) == Some(TypeKind::Concrete) {
                        debug!("Inferred type {} from key '{}' at {}", inferred, key.unwrap_or_default(), path);
                        let rules = self.rule_set(&inferred)?;
                        return self.apply_rules(&rules, value, map, path).map(ModelValue::Object);
                    }
                }

                map.iter()
                    .map(|(child_key, child)| {
                        self.map_inferred(child, &path.key(child_key.as_str()), Some(child_key.as_str()))
                            .map(|mapped| (child_key.clone(), mapped))
                    })
                    .collect::<crate::Result<_>>()
                    .map(ModelValue::Map)
            }
            scalar => Ok(ModelValue::from(scalar.clone())),
        }
    }

    fn unmap_object(&self, object: &ModelObject, rules: &RuleSet, path: &Path) -> crate::Result<Value> {
        self.check_depth(path)?;
        let mut out = Map::new();
        if self.config.emit_class_name {
            out.insert(
                self.config.naming.class_name_key.clone(),
                Value::String(self.config.naming.decorated_class_name(object.type_name())),
            );
        }

        // Reverse transforms see the whole object keyed by field names
        let fields_by_name = if rules.iter().any(|bound| bound.rule.transform().is_some()) {
            self.lower_fields(object, path)?
        } else {
            Value::Null
        };

        for bound in rules.iter() {
            let field = bound.rule.destination_field();
            let field_path = path.key(field);
            let current = object.get(field);

            if let Some(transform) = bound.rule.transform() {
                let current = match current {
                    Some(value) => self.lower(value, &field_path)?,
                    None => Value::Null,
                };
                let output = transform(&current, &fields_by_name).map_err(|e| at_path(e, &field_path))?;
                if !output.is_null() {
                    out.insert(bound.rule.source_key().to_string(), output);
                }
                continue;
            }

            match current {
                None | Some(ModelValue::Null) => {}
                Some(value) => {
                    out.insert(bound.rule.source_key().to_string(), self.lower(value, &field_path)?);
                }
            }
        }
        Ok(Value::Map(out))
    }

    /// The object as a generic map keyed by field names
    fn lower_fields(&self, object: &ModelObject, path: &Path) -> crate::Result<Value> {
        object
            .fields()
            .map(|(field, value)| Ok::<_, crate::Error>((field.to_string(), self.lower(value, &path.key(field))?)))
            .collect::<crate::Result<Map>>()
            .map(Value::Map)
    }

    fn lower(&self, value: &ModelValue, path: &Path) -> crate::Result<Value> {
        self.check_depth(path)?;
        Ok(match value {
            ModelValue::Null => Value::Null,
            ModelValue::Bool(b) => Value::Bool(*b),
            ModelValue::Int(i) => Value::from(*i),
            ModelValue::Float(f) => Value::from(*f),
            ModelValue::LargeInt(big) => Value::String(big.as_str().to_string()),
            ModelValue::String(s) => Value::String(s.clone()),
            ModelValue::Instant(at) => self.lower_instant(at),
            ModelValue::Enum(case) => Value::String(case.case.clone()),
            ModelValue::Raw(raw) => raw.clone(),
            ModelValue::List(items) | ModelValue::Set(items) => Value::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.lower(item, &path.index(index)))
                    .collect::<crate::Result<_>>()?,
            ),
            ModelValue::SortedMap(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok::<_, crate::Error>((k.clone(), self.lower(v, &path.key(k.as_str()))?)))
                    .collect::<crate::Result<_>>()?,
            ),
            ModelValue::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok::<_, crate::Error>((k.clone(), self.lower(v, &path.key(k.as_str()))?)))
                    .collect::<crate::Result<_>>()?,
            ),
            ModelValue::Object(nested) => {
                let rules = self.rule_set(nested.type_name())?;
                self.unmap_object(nested, &rules, path)?
            }
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn lower_instant(&self, at: &DateTime<Utc>) -> Value {
        match self.config.date_output {
            DateOutput::Rfc3339 => Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            DateOutput::EpochMillis => Value::from(at.timestamp_millis()),
            DateOutput::EpochSeconds => match at.timestamp_subsec_nanos() {
                0 => Value::from(at.timestamp()),
                nanos => Value::from(at.timestamp() as f64 + f64::from(nanos) / 1_000_000_000.0),
            },
        }
    }
}

/// Value a required field takes when its key is present with null
///
/// Strings become empty and collections empty; every other shape keeps null.
fn null_default(spec: &TypeSpec) -> ModelValue {
    match spec {
        TypeSpec::Scalar {
            scalar: ScalarType::String,
        } => ModelValue::String(String::new()),
        TypeSpec::Collection { kind, .. } => match kind {
            CollectionKind::List => ModelValue::List(Vec::new()),
            CollectionKind::Set => ModelValue::Set(Vec::new()),
            CollectionKind::SortedMap => ModelValue::SortedMap(BTreeMap::new()),
            CollectionKind::Map => ModelValue::Map(IndexMap::new()),
        },
        _ => ModelValue::Null,
    }
}

/// Anchor a transformer's error to the field it was applied to
fn at_path(err: crate::Error, path: &Path) -> crate::Error {
    match err {
        crate::Error::Transform { message, .. } => crate::Error::transform(path, message),
        crate::Error::Coercion { expected, found, .. } => crate::Error::Coercion {
            path: path.clone(),
            expected,
            found,
        },
        other => other,
    }
}

impl std::fmt::Debug for ObjectMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectMapper")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("cached_types", &self.cache.len())
            .finish_non_exhaustive()
    }
}
