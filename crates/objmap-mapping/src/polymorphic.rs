//! Polymorphic type resolution
//!
//! A map node declared as a polymorphic base names its concrete type in the
//! discriminator key. The value is reduced to a bare name by stripping the
//! registered affixes and package qualifier, then looked up in the
//! registry's subtype table.

use crate::naming::NamingConventions;
use crate::registry::{Introspect, TypeRegistry};
use crate::types::TypeKind;
use objmap_value::{Path, Value};
use tracing::debug;

/// Resolve the concrete type named by a node's discriminator
///
/// The result is always a concrete type, so resolution never needs to run
/// twice for one node.
///
/// # Errors
///
/// Returns [`crate::Error::UnresolvedType`] when the discriminator is
/// missing, names no registered subtype, or names an abstract type, and
/// [`crate::Error::UnknownType`] when the subtype table points at a type
/// introspection does not know.
pub fn resolve_target_type(
    value: &Value,
    registry: &TypeRegistry,
    naming: &NamingConventions,
    path: &Path,
) -> crate::Result<String> {
    let class_name = naming.class_name_of(value).ok_or_else(|| {
        crate::Error::unresolved_type(
            path,
            format!("missing discriminator key '{}'", naming.class_name_key),
        )
    })?;

    let bare = naming.bare_class_name(class_name);
    let concrete = registry.subtype(bare).ok_or_else(|| {
        crate::Error::unresolved_type(
            path,
            format!("'{bare}' (from '{class_name}') is not a registered subtype"),
        )
    })?;

    match registry.kind_of(concrete) {
        Some(TypeKind::Concrete) => {
            debug!("Resolved discriminator '{}' at {} to {}", class_name, path, concrete);
            Ok(concrete.to_string())
        }
        Some(TypeKind::Abstract) => Err(crate::Error::unresolved_type(
            path,
            format!("'{class_name}' resolves to abstract type {concrete}"),
        )),
        None => Err(crate::Error::UnknownType(concrete.to_string())),
    }
}

/// Resolve the concrete type, falling back to a concrete declared type
///
/// # Errors
///
/// Returns the resolution error when the declared type is abstract or
/// unknown.
pub fn resolve_or_declared(
    value: &Value,
    declared: &str,
    registry: &TypeRegistry,
    naming: &NamingConventions,
    path: &Path,
) -> crate::Result<String> {
    match resolve_target_type(value, registry, naming, path) {
        Ok(concrete) => Ok(concrete),
        Err(err @ crate::Error::UnresolvedType { .. }) => {
            if registry.kind_of(declared) == Some(TypeKind::Concrete) {
                debug!("Falling back to declared type {} at {}: {}", declared, path, err);
                Ok(declared.to_string())
            } else {
                Err(err)
            }
        }
        Err(err) => Err(err),
    }
}
