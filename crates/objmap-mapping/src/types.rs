//! Type descriptions consumed by the engine
//!
//! These are what an introspection facility reports about a model type:
//! its fields, each field's declared shape, and whether the field may be
//! left unset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar target types understood by coercion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    /// Arbitrary precision integer, carried as exact decimal digits
    LargeInt,
    String,
    /// Point in time, normalized to UTC
    Instant,
    /// Enum case; `domain` narrows the lookup to one registered domain
    Enum {
        #[serde(default)]
        domain: Option<String>,
    },
}

/// Collection flavours the resolver can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Ordered sequence
    List,
    /// Deduplicated sequence in first-occurrence order
    Set,
    /// Map ordered by key comparison
    SortedMap,
    /// Map with no ordering promise
    Map,
}

impl CollectionKind {
    /// Whether the kind is built from a sequence (as opposed to a map)
    #[must_use]
    pub fn is_sequence(self) -> bool {
        matches!(self, CollectionKind::List | CollectionKind::Set)
    }
}

/// Declared shape of a field or collection element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TypeSpec {
    /// Leaf converted by coercion
    Scalar { scalar: ScalarType },

    /// Raw generic value, kept as-is
    Any,

    /// Element type decided at mapping time from the node itself
    Inferred,

    /// Nested object of a fixed type
    Object { type_name: String },

    /// Nested object whose concrete type comes from a discriminator
    Polymorphic { base: String },

    /// Collection of elements (map values for map kinds)
    Collection {
        kind: CollectionKind,
        element: Box<TypeSpec>,
    },
}

impl TypeSpec {
    #[must_use]
    pub fn scalar(scalar: ScalarType) -> Self {
        TypeSpec::Scalar { scalar }
    }

    #[must_use]
    pub fn bool() -> Self {
        Self::scalar(ScalarType::Bool)
    }

    #[must_use]
    pub fn int() -> Self {
        Self::scalar(ScalarType::Int)
    }

    #[must_use]
    pub fn float() -> Self {
        Self::scalar(ScalarType::Float)
    }

    #[must_use]
    pub fn large_int() -> Self {
        Self::scalar(ScalarType::LargeInt)
    }

    #[must_use]
    pub fn string() -> Self {
        Self::scalar(ScalarType::String)
    }

    #[must_use]
    pub fn instant() -> Self {
        Self::scalar(ScalarType::Instant)
    }

    /// Enum resolved by whichever registered domain key the node carries
    #[must_use]
    pub fn any_enum() -> Self {
        Self::scalar(ScalarType::Enum { domain: None })
    }

    /// Enum restricted to one domain
    #[must_use]
    pub fn enumeration(domain: impl Into<String>) -> Self {
        Self::scalar(ScalarType::Enum {
            domain: Some(domain.into()),
        })
    }

    #[must_use]
    pub fn object(type_name: impl Into<String>) -> Self {
        TypeSpec::Object {
            type_name: type_name.into(),
        }
    }

    #[must_use]
    pub fn polymorphic(base: impl Into<String>) -> Self {
        TypeSpec::Polymorphic { base: base.into() }
    }

    #[must_use]
    pub fn collection(kind: CollectionKind, element: TypeSpec) -> Self {
        TypeSpec::Collection {
            kind,
            element: Box::new(element),
        }
    }

    #[must_use]
    pub fn list(element: TypeSpec) -> Self {
        Self::collection(CollectionKind::List, element)
    }

    #[must_use]
    pub fn set(element: TypeSpec) -> Self {
        Self::collection(CollectionKind::Set, element)
    }

    #[must_use]
    pub fn sorted_map(value: TypeSpec) -> Self {
        Self::collection(CollectionKind::SortedMap, value)
    }

    #[must_use]
    pub fn map(value: TypeSpec) -> Self {
        Self::collection(CollectionKind::Map, value)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Bool => f.write_str("boolean"),
            ScalarType::Int => f.write_str("integer"),
            ScalarType::Float => f.write_str("number"),
            ScalarType::LargeInt => f.write_str("large integer"),
            ScalarType::String => f.write_str("string"),
            ScalarType::Instant => f.write_str("timestamp"),
            ScalarType::Enum { domain: Some(d) } => write!(f, "enum {d}"),
            ScalarType::Enum { domain: None } => f.write_str("enum"),
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Scalar { scalar } => write!(f, "{scalar}"),
            TypeSpec::Any => f.write_str("any"),
            TypeSpec::Inferred => f.write_str("inferred"),
            TypeSpec::Object { type_name } => write!(f, "{type_name}"),
            TypeSpec::Polymorphic { base } => write!(f, "dyn {base}"),
            TypeSpec::Collection { kind, element } => match kind {
                CollectionKind::List => write!(f, "list<{element}>"),
                CollectionKind::Set => write!(f, "set<{element}>"),
                CollectionKind::SortedMap => write!(f, "sorted_map<{element}>"),
                CollectionKind::Map => write!(f, "map<{element}>"),
            },
        }
    }
}

/// One field of a model type as reported by introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name on the model
    pub name: String,

    /// Declared shape
    pub spec: TypeSpec,

    /// Whether the field may stay unset
    #[serde(default)]
    pub optional: bool,
}

impl FieldDescriptor {
    /// Describe a field that must be present in the source
    pub fn required(name: impl Into<String>, spec: TypeSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            optional: false,
        }
    }

    /// Describe a field that may be absent or unconvertible
    pub fn optional(name: impl Into<String>, spec: TypeSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            optional: true,
        }
    }
}

/// Whether a type can be instantiated or only stands for a hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Instantiable type
    #[default]
    Concrete,
    /// Interface or abstract base; mapping requires a discriminator
    Abstract,
}

/// Everything introspection knows about one model type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,

    #[serde(default)]
    pub kind: TypeKind,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Describe a concrete type with no fields yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Concrete,
            fields: Vec::new(),
        }
    }

    /// Describe an abstract base type
    pub fn abstract_type(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Abstract,
            fields: Vec::new(),
        }
    }

    /// Add a required field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: TypeSpec) -> Self {
        self.fields.push(FieldDescriptor::required(name, spec));
        self
    }

    /// Add an optional field
    #[must_use]
    pub fn optional_field(mut self, name: impl Into<String>, spec: TypeSpec) -> Self {
        self.fields.push(FieldDescriptor::optional(name, spec));
        self
    }

    /// Find a field by name
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}
