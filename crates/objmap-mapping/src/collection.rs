//! Collection resolution
//!
//! Finds the elements of a collection node, unwrapping class-tagged array,
//! set and map wrappers, and builds the collection kind a field declares.
//! Element conversion is delegated to the caller so nested elements go
//! through the full engine.

use crate::model::ModelValue;
use crate::naming::{ForeignClass, NamingConventions};
use crate::types::CollectionKind;
use indexmap::IndexMap;
use objmap_value::{Map, Path, Value};
use std::collections::BTreeMap;

/// Build a collection of `kind` from `value`
///
/// `map_element` converts one element found at the given path; the first
/// element error fails the whole collection.
///
/// # Errors
///
/// Returns a shape mismatch when `value` is not a sequence-like node for
/// list and set kinds, or not a map-like node for map kinds.
pub fn resolve_collection<F>(
    value: &Value,
    kind: CollectionKind,
    naming: &NamingConventions,
    path: &Path,
    mut map_element: F,
) -> crate::Result<ModelValue>
where
    F: FnMut(&Value, &Path) -> crate::Result<ModelValue>,
{
    if kind.is_sequence() {
        let items = sequence_elements(value, naming)
            .ok_or_else(|| crate::Error::shape_mismatch(path, "sequence", value))?;

        let mut elements = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let element = map_element(item, &path.index(index))?;
            if kind == CollectionKind::List || !elements.contains(&element) {
                elements.push(element);
            }
        }

        return Ok(if kind == CollectionKind::Set {
            ModelValue::Set(elements)
        } else {
            ModelValue::List(elements)
        });
    }

    let entries = map_entries(value, naming)
        .ok_or_else(|| crate::Error::shape_mismatch(path, "map", value))?;
    if kind == CollectionKind::SortedMap {
        let mut sorted = BTreeMap::new();
        for (key, item) in entries {
            sorted.insert(key.clone(), map_element(item, &path.key(key.as_str()))?);
        }
        return Ok(ModelValue::SortedMap(sorted));
    }

    let mut map = IndexMap::with_capacity(entries.len());
    for (key, item) in entries {
        map.insert(key.clone(), map_element(item, &path.key(key.as_str()))?);
    }
    Ok(ModelValue::Map(map))
}

/// Elements of a sequence-like node
///
/// Accepts a sequence, an array or hash-set wrapper whose payload is a
/// sequence (or a map, whose values are taken in order), and an untagged
/// map whose values are taken in order.
#[must_use]
pub fn sequence_elements<'a>(value: &'a Value, naming: &NamingConventions) -> Option<Vec<&'a Value>> {
    match value {
        Value::Sequence(items) => Some(items.iter().collect()),
        Value::Map(map) => match naming.class_name_of(value) {
            None => Some(map.values().collect()),
            Some(class) => {
                let payload = match naming.foreign_class(class)? {
                    ForeignClass::Array => first_present(map, [&naming.payload.list, &naming.payload.set]),
                    ForeignClass::HashSet => first_present(map, [&naming.payload.set, &naming.payload.list]),
                    _ => None,
                }?;
                match payload {
                    Value::Sequence(items) => Some(items.iter().collect()),
                    Value::Map(inner) => Some(inner.values().collect()),
                    _ => None,
                }
            }
        },
        _ => None,
    }
}

/// Entries of a map-like node
///
/// Accepts an untagged map, and a hash-map or tree-map wrapper whose `map`
/// or configuration map payload is a map.
#[must_use]
pub fn map_entries<'a>(value: &'a Value, naming: &NamingConventions) -> Option<&'a Map> {
    let map = value.as_map()?;
    let Some(class) = naming.class_name_of(value) else {
        return Some(map);
    };
    match naming.foreign_class(class)? {
        ForeignClass::HashMap | ForeignClass::TreeMap => {
            first_present(map, [&naming.payload.map, &naming.configuration_map_key])?.as_map()
        }
        _ => None,
    }
}

fn first_present<'a, const N: usize>(map: &'a Map, keys: [&String; N]) -> Option<&'a Value> {
    keys.into_iter().find_map(|key| map.get(key.as_str()))
}
