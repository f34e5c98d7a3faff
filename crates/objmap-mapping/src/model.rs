//! Mapped model values
//!
//! [`ModelValue`] is the typed counterpart of a generic [`Value`]: every
//! variant is the result of a deliberate conversion to a declared type.
//! [`ModelObject`] is one mapped object. Rust structs bridge to objects
//! through the [`Model`] trait together with [`FromModelValue`] and
//! [`IntoModelValue`] field conversions.

use crate::types::TypeDescriptor;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use objmap_value::{Number, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static DECIMAL_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-]?)0*([0-9]+)$").expect("valid decimal pattern"));

/// Signed integer of arbitrary length, kept as exact decimal digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LargeInteger {
    // Normalized: optional leading '-', no leading zeros, "0" is unsigned.
    repr: String,
}

/// Error returned for strings that are not plain decimal integers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a decimal integer")]
pub struct ParseLargeIntegerError(pub String);

impl LargeInteger {
    /// Decimal digits with an optional leading `-`
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.repr
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.repr.starts_with('-')
    }

    /// Value as `i64`, if it fits
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        self.repr.parse().ok()
    }

    fn magnitude(&self) -> &str {
        self.repr.trim_start_matches('-')
    }
}

impl FromStr for LargeInteger {
    type Err = ParseLargeIntegerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = DECIMAL_DIGITS
            .captures(s.trim())
            .ok_or_else(|| ParseLargeIntegerError(s.to_string()))?;
        let digits = &captures[2];
        let repr = if &captures[1] == "-" && digits != "0" {
            format!("-{digits}")
        } else {
            digits.to_string()
        };
        Ok(Self { repr })
    }
}

impl TryFrom<String> for LargeInteger {
    type Error = ParseLargeIntegerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LargeInteger> for String {
    fn from(value: LargeInteger) -> Self {
        value.repr
    }
}

impl From<i64> for LargeInteger {
    fn from(value: i64) -> Self {
        Self {
            repr: value.to_string(),
        }
    }
}

impl fmt::Display for LargeInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl Ord for LargeInteger {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (negative, _) => {
                let (a, b) = (self.magnitude(), other.magnitude());
                let by_magnitude = a.len().cmp(&b.len()).then_with(|| a.cmp(b));
                if negative {
                    by_magnitude.reverse()
                } else {
                    by_magnitude
                }
            }
        }
    }
}

impl PartialOrd for LargeInteger {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One case of a registered enum domain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    /// Domain the case belongs to
    pub domain: String,

    /// Case name
    pub case: String,

    /// Position of the case within its domain
    pub ordinal: usize,
}

/// A value produced by mapping
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValue {
    /// Explicit null inside a collection or a transform result
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    LargeInt(LargeInteger),
    String(String),
    Instant(DateTime<Utc>),
    Enum(EnumValue),
    /// Untyped payload kept verbatim
    Raw(Value),
    List(Vec<ModelValue>),
    /// Deduplicated, first-occurrence order
    Set(Vec<ModelValue>),
    SortedMap(BTreeMap<String, ModelValue>),
    Map(IndexMap<String, ModelValue>),
    Object(ModelObject),
}

impl ModelValue {
    /// Short variant name for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ModelValue::Null => "null",
            ModelValue::Bool(_) => "boolean",
            ModelValue::Int(_) => "integer",
            ModelValue::Float(_) => "number",
            ModelValue::LargeInt(_) => "large integer",
            ModelValue::String(_) => "string",
            ModelValue::Instant(_) => "timestamp",
            ModelValue::Enum(_) => "enum",
            ModelValue::Raw(_) => "raw value",
            ModelValue::List(_) => "list",
            ModelValue::Set(_) => "set",
            ModelValue::SortedMap(_) => "sorted map",
            ModelValue::Map(_) => "map",
            ModelValue::Object(_) => "object",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ModelValue::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ModelValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ModelObject> {
        match self {
            ModelValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Elements of a list or set
    #[must_use]
    pub fn as_elements(&self) -> Option<&[ModelValue]> {
        match self {
            ModelValue::List(items) | ModelValue::Set(items) => Some(items),
            _ => None,
        }
    }
}

impl From<Value> for ModelValue {
    /// Structural lift with no coercion: numbers stay numbers, strings stay
    /// strings, maps become unordered maps.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ModelValue::Null,
            Value::Bool(b) => ModelValue::Bool(b),
            Value::Number(Number::Int(i)) => ModelValue::Int(i),
            Value::Number(Number::Float(f)) => ModelValue::Float(f),
            Value::String(s) => ModelValue::String(s),
            Value::Sequence(items) => {
                ModelValue::List(items.into_iter().map(ModelValue::from).collect())
            }
            Value::Map(map) => ModelValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ModelValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// A mapped object: its concrete type and the fields that were set
#[derive(Debug, Clone, PartialEq)]
pub struct ModelObject {
    type_name: String,
    fields: IndexMap<String, ModelValue>,
}

impl ModelObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Concrete type the object was mapped to
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&ModelValue> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set a field, replacing any previous value
    pub fn set(&mut self, field: impl Into<String>, value: ModelValue) {
        self.fields.insert(field.into(), value);
    }

    /// Builder form of [`ModelObject::set`]
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl IntoModelValue) -> Self {
        self.set(field, value.into_model_value());
        self
    }

    /// Set the field only when a value is present
    #[must_use]
    pub fn with_optional<T: IntoModelValue>(
        mut self,
        field: impl Into<String>,
        value: Option<T>,
    ) -> Self {
        if let Some(value) = value {
            self.set(field, value.into_model_value());
        }
        self
    }

    /// Fields that were set, in mapping order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &ModelValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Read a field that must be set
    ///
    /// # Errors
    ///
    /// Returns an error if the field is unset, null, or of another type.
    pub fn required<T: FromModelValue>(&self, field: &str) -> crate::Result<T> {
        self.optional(field)?
            .ok_or_else(|| crate::Error::model(&self.type_name, format!("field '{field}' is not set")))
    }

    /// Read a field that may be unset
    ///
    /// # Errors
    ///
    /// Returns an error if the field is set to a value of another type.
    pub fn optional<T: FromModelValue>(&self, field: &str) -> crate::Result<Option<T>> {
        match self.fields.get(field) {
            None | Some(ModelValue::Null) => Ok(None),
            Some(value) => T::from_model_value(value).map(Some).ok_or_else(|| {
                crate::Error::model(
                    &self.type_name,
                    format!("field '{field}' holds {}", value.kind()),
                )
            }),
        }
    }

    /// Read a nested model that must be set
    ///
    /// # Errors
    ///
    /// Returns an error if the field is unset, not an object, or the nested
    /// conversion fails.
    pub fn model<T: Model>(&self, field: &str) -> crate::Result<T> {
        self.optional_model(field)?
            .ok_or_else(|| crate::Error::model(&self.type_name, format!("field '{field}' is not set")))
    }

    /// Read a nested model that may be unset
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not an object or the nested
    /// conversion fails.
    pub fn optional_model<T: Model>(&self, field: &str) -> crate::Result<Option<T>> {
        match self.fields.get(field) {
            None | Some(ModelValue::Null) => Ok(None),
            Some(ModelValue::Object(object)) => T::from_object(object).map(Some),
            Some(other) => Err(crate::Error::model(
                &self.type_name,
                format!("field '{field}' holds {}, not an object", other.kind()),
            )),
        }
    }

    /// Read a list or set of nested models; unset reads as empty
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a collection of objects.
    pub fn models<T: Model>(&self, field: &str) -> crate::Result<Vec<T>> {
        let Some(value) = self.fields.get(field) else {
            return Ok(Vec::new());
        };
        let items = value.as_elements().ok_or_else(|| {
            crate::Error::model(
                &self.type_name,
                format!("field '{field}' holds {}, not a list", value.kind()),
            )
        })?;
        items
            .iter()
            .map(|item| match item {
                ModelValue::Object(object) => T::from_object(object),
                other => Err(crate::Error::model(
                    &self.type_name,
                    format!("field '{field}' contains {}", other.kind()),
                )),
            })
            .collect()
    }
}

/// A Rust type the engine can produce and consume
///
/// Implementations describe the type once and convert to and from the
/// engine's [`ModelObject`] form.
pub trait Model: Sized {
    /// Type description registered with the engine
    fn descriptor() -> TypeDescriptor;

    /// Build the value from a mapped object
    ///
    /// # Errors
    ///
    /// Returns an error when a field is missing or holds another type.
    fn from_object(object: &ModelObject) -> crate::Result<Self>;

    /// Convert the value back into object form
    fn to_object(&self) -> ModelObject;
}

/// Conversion from a mapped value to a Rust field type
pub trait FromModelValue: Sized {
    /// Returns `Some` when the value has a compatible variant
    fn from_model_value(value: &ModelValue) -> Option<Self>;
}

/// Conversion from a Rust field type to a mapped value
pub trait IntoModelValue {
    fn into_model_value(self) -> ModelValue;
}

impl FromModelValue for bool {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromModelValue for i64 {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::Int(i) => Some(*i),
            ModelValue::LargeInt(big) => big.to_i64(),
            _ => None,
        }
    }
}

impl FromModelValue for i32 {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        i64::from_model_value(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl FromModelValue for u32 {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        i64::from_model_value(value).and_then(|i| u32::try_from(i).ok())
    }
}

impl FromModelValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::Float(f) => Some(*f),
            ModelValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromModelValue for String {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::String(s) => Some(s.clone()),
            ModelValue::Enum(e) => Some(e.case.clone()),
            _ => None,
        }
    }
}

impl FromModelValue for LargeInteger {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::LargeInt(big) => Some(big.clone()),
            ModelValue::Int(i) => Some(LargeInteger::from(*i)),
            _ => None,
        }
    }
}

impl FromModelValue for DateTime<Utc> {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::Instant(at) => Some(*at),
            _ => None,
        }
    }
}

impl FromModelValue for EnumValue {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::Enum(e) => Some(e.clone()),
            _ => None,
        }
    }
}

impl FromModelValue for Value {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::Raw(raw) => Some(raw.clone()),
            _ => None,
        }
    }
}

impl FromModelValue for ModelObject {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        value.as_object().cloned()
    }
}

impl<T: FromModelValue> FromModelValue for Option<T> {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::Null => Some(None),
            other => T::from_model_value(other).map(Some),
        }
    }
}

impl<T: FromModelValue> FromModelValue for Vec<T> {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        value
            .as_elements()?
            .iter()
            .map(T::from_model_value)
            .collect()
    }
}

impl<T: FromModelValue> FromModelValue for BTreeMap<String, T> {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::SortedMap(map) => map
                .iter()
                .map(|(k, v)| T::from_model_value(v).map(|v| (k.clone(), v)))
                .collect(),
            ModelValue::Map(map) => map
                .iter()
                .map(|(k, v)| T::from_model_value(v).map(|v| (k.clone(), v)))
                .collect(),
            _ => None,
        }
    }
}

impl<T: FromModelValue> FromModelValue for IndexMap<String, T> {
    fn from_model_value(value: &ModelValue) -> Option<Self> {
        match value {
            ModelValue::Map(map) => map
                .iter()
                .map(|(k, v)| T::from_model_value(v).map(|v| (k.clone(), v)))
                .collect(),
            ModelValue::SortedMap(map) => map
                .iter()
                .map(|(k, v)| T::from_model_value(v).map(|v| (k.clone(), v)))
                .collect(),
            _ => None,
        }
    }
}

impl IntoModelValue for ModelValue {
    fn into_model_value(self) -> ModelValue {
        self
    }
}

impl IntoModelValue for bool {
    fn into_model_value(self) -> ModelValue {
        ModelValue::Bool(self)
    }
}

impl IntoModelValue for i64 {
    fn into_model_value(self) -> ModelValue {
        ModelValue::Int(self)
    }
}

impl IntoModelValue for i32 {
    fn into_model_value(self) -> ModelValue {
        ModelValue::Int(i64::from(self))
    }
}

impl IntoModelValue for u32 {
    fn into_model_value(self) -> ModelValue {
        ModelValue::Int(i64::from(self))
    }
}

impl IntoModelValue for f64 {
    fn into_model_value(self) -> ModelValue {
        ModelValue::Float(self)
    }
}

impl IntoModelValue for String {
    fn into_model_value(self) -> ModelValue {
        ModelValue::String(self)
    }
}

impl IntoModelValue for &str {
    fn into_model_value(self) -> ModelValue {
        ModelValue::String(self.to_string())
    }
}

impl IntoModelValue for LargeInteger {
    fn into_model_value(self) -> ModelValue {
        ModelValue::LargeInt(self)
    }
}

impl IntoModelValue for DateTime<Utc> {
    fn into_model_value(self) -> ModelValue {
        ModelValue::Instant(self)
    }
}

impl IntoModelValue for EnumValue {
    fn into_model_value(self) -> ModelValue {
        ModelValue::Enum(self)
    }
}

impl IntoModelValue for Value {
    fn into_model_value(self) -> ModelValue {
        ModelValue::Raw(self)
    }
}

impl IntoModelValue for ModelObject {
    fn into_model_value(self) -> ModelValue {
        ModelValue::Object(self)
    }
}

impl<T: IntoModelValue> IntoModelValue for Option<T> {
    fn into_model_value(self) -> ModelValue {
        self.map_or(ModelValue::Null, IntoModelValue::into_model_value)
    }
}

impl<T: IntoModelValue> IntoModelValue for Vec<T> {
    fn into_model_value(self) -> ModelValue {
        ModelValue::List(self.into_iter().map(IntoModelValue::into_model_value).collect())
    }
}

impl<T: IntoModelValue> IntoModelValue for BTreeMap<String, T> {
    fn into_model_value(self) -> ModelValue {
        ModelValue::SortedMap(
            self.into_iter()
                .map(|(k, v)| (k, v.into_model_value()))
                .collect(),
        )
    }
}

impl<T: IntoModelValue> IntoModelValue for IndexMap<String, T> {
    fn into_model_value(self) -> ModelValue {
        ModelValue::Map(
            self.into_iter()
                .map(|(k, v)| (k, v.into_model_value()))
                .collect(),
        )
    }
}
