//! # objmap-mapping
//!
//! Mapping rules, value coercion, collection and polymorphic resolution, and
//! the object mapping engine.
//!
//! This crate turns loosely-typed [`Value`] trees into typed model objects
//! and back. Types are described to the engine through a [`TypeRegistry`]
//! (or any other [`Introspect`] implementation); per-field
//! [`MappingRule`]s are derived from those descriptions once per type and
//! cached for the lifetime of the [`ObjectMapper`].

pub mod cache;
pub mod coercion;
pub mod collection;
pub mod config;
pub mod engine;
pub mod model;
pub mod naming;
pub mod polymorphic;
pub mod registry;
pub mod rule;
pub mod transforms;
pub mod types;

pub use config::MapperConfig;
pub use engine::ObjectMapper;
pub use model::{EnumValue, LargeInteger, Model, ModelObject, ModelValue};
pub use naming::{KeyCase, NamingConventions};
pub use registry::{EnumDomain, Introspect, TypeRegistry};
pub use rule::{MappingRule, RuleSet, Transformer};
pub use types::{CollectionKind, FieldDescriptor, ScalarType, TypeDescriptor, TypeKind, TypeSpec};

pub use objmap_value::{Path, Value};

use thiserror::Error;

/// Errors that can occur during mapping
///
/// Field-level variants carry the path of the failing field; their display
/// form is `<path>: <message>`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{path}: expected {expected}, got {found}")]
    Coercion {
        path: Path,
        expected: String,
        found: String,
    },

    #[error("{path}: expected {expected} shape, got {found}")]
    ShapeMismatch {
        path: Path,
        expected: String,
        found: String,
    },

    #[error("{path}: unresolved type: {reason}")]
    UnresolvedType { path: Path, reason: String },

    #[error("{path}: missing required field")]
    MissingRequiredField { path: Path },

    #[error("{path}: transform failed: {message}")]
    Transform { path: Path, message: String },

    #[error("{path}: maximum nesting depth {limit} exceeded")]
    DepthExceeded { path: Path, limit: usize },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model conversion error for {type_name}: {message}")]
    Model { type_name: String, message: String },
}

impl Error {
    /// Build a shape mismatch error for the value found at `path`.
    pub fn shape_mismatch(path: &Path, expected: impl Into<String>, found: &Value) -> Self {
        Self::ShapeMismatch {
            path: path.clone(),
            expected: expected.into(),
            found: found.describe(),
        }
    }

    /// Build an unresolved type error.
    pub fn unresolved_type(path: &Path, reason: impl Into<String>) -> Self {
        Self::UnresolvedType {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Build a transform error, typically from a failing [`Transformer`].
    pub fn transform(path: &Path, message: impl Into<String>) -> Self {
        Self::Transform {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Build a model conversion error.
    pub fn model(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Whether an optional field may swallow this error and stay unset.
    ///
    /// Data problems are recoverable; configuration problems and runaway
    /// nesting are not.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Coercion { .. }
                | Error::ShapeMismatch { .. }
                | Error::UnresolvedType { .. }
                | Error::MissingRequiredField { .. }
                | Error::Transform { .. }
        )
    }

    /// Field path the error refers to, if it is a field-level error.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::Coercion { path, .. }
            | Error::ShapeMismatch { path, .. }
            | Error::UnresolvedType { path, .. }
            | Error::MissingRequiredField { path }
            | Error::Transform { path, .. }
            | Error::DepthExceeded { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
