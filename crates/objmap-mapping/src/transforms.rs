//! Built-in transformers
//!
//! Ready-made [`Transformer`]s for the usual field touch-ups. Register them
//! with [`MappingRule::with_transformer`](crate::MappingRule::with_transformer).
//! String operations pass null through unchanged; errors carry the root
//! path and are re-anchored to the field by the engine.

use crate::rule::Transformer;
use objmap_value::{Path, Value};
use std::sync::Arc;

/// Piece of a concatenation: fixed text or a key of the parent node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcatPart {
    Literal(String),
    Key(String),
}

impl ConcatPart {
    pub fn literal(text: impl Into<String>) -> Self {
        ConcatPart::Literal(text.into())
    }

    pub fn key(key: impl Into<String>) -> Self {
        ConcatPart::Key(key.into())
    }
}

/// Scalars rendered as text
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn failure(message: impl Into<String>) -> crate::Error {
    crate::Error::transform(&Path::root(), message)
}

#[must_use]
pub fn uppercase() -> Transformer {
    Arc::new(|current: &Value, _: &Value| transform_uppercase(current))
}

#[must_use]
pub fn lowercase() -> Transformer {
    Arc::new(|current: &Value, _: &Value| transform_lowercase(current))
}

#[must_use]
pub fn trim() -> Transformer {
    Arc::new(|current: &Value, _: &Value| transform_trim(current))
}

/// Replace null or empty strings with `default`
#[must_use]
pub fn default_value(default: impl Into<Value>) -> Transformer {
    let default = default.into();
    Arc::new(move |current: &Value, _: &Value| transform_default(current, &default))
}

/// Keep the `index`-th piece of the value split on `delimiter`
#[must_use]
pub fn split(delimiter: impl Into<String>, index: usize) -> Transformer {
    let delimiter = delimiter.into();
    Arc::new(move |current: &Value, _: &Value| transform_split(current, &delimiter, index))
}

/// Join literals and parent values with `separator`
///
/// Parent keys that are absent or null are skipped. Forward mapping reads
/// keys of the source map; reverse mapping reads field names.
#[must_use]
pub fn concatenate(parts: Vec<ConcatPart>, separator: impl Into<String>) -> Transformer {
    let separator = separator.into();
    Arc::new(move |_: &Value, parent: &Value| transform_concatenate(parent, &parts, &separator))
}

/// Run transformers in order, each on the previous result
#[must_use]
pub fn chain(transformers: Vec<Transformer>) -> Transformer {
    Arc::new(move |current: &Value, parent: &Value| {
        let mut result = current.clone();
        for transform in &transformers {
            result = transform(&result, parent)?;
        }
        Ok(result)
    })
}

/// Convert string to uppercase
///
/// # Errors
///
/// Returns an error if the value cannot be represented as a string.
pub fn transform_uppercase(value: &Value) -> crate::Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        _ => text(value)
            .map(|s| Value::String(s.to_uppercase()))
            .ok_or_else(|| failure(format!("cannot uppercase {}", value.kind()))),
    }
}

/// Convert string to lowercase
///
/// # Errors
///
/// Returns an error if the value cannot be represented as a string.
pub fn transform_lowercase(value: &Value) -> crate::Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        _ => text(value)
            .map(|s| Value::String(s.to_lowercase()))
            .ok_or_else(|| failure(format!("cannot lowercase {}", value.kind()))),
    }
}

/// Trim whitespace from string
///
/// # Errors
///
/// Returns an error if the value cannot be represented as a string.
pub fn transform_trim(value: &Value) -> crate::Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        Value::Null => Ok(Value::Null),
        _ => text(value)
            .map(Value::String)
            .ok_or_else(|| failure(format!("cannot trim {}", value.kind()))),
    }
}

/// Return default value if input is null or empty
///
/// # Errors
///
/// This function currently does not return an error.
pub fn transform_default(value: &Value, default: &Value) -> crate::Result<Value> {
    match value {
        Value::Null => Ok(default.clone()),
        Value::String(s) if s.is_empty() => Ok(default.clone()),
        _ => Ok(value.clone()),
    }
}

/// Split string by delimiter and get indexed part
///
/// # Errors
///
/// Returns an error if the value cannot be represented as a string or index is out of bounds.
pub fn transform_split(value: &Value, delimiter: &str, index: usize) -> crate::Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let input = text(value).ok_or_else(|| failure(format!("cannot split {}", value.kind())))?;
    let parts: Vec<&str> = input.split(delimiter).collect();

    parts
        .get(index)
        .map(|part| Value::String((*part).to_string()))
        .ok_or_else(|| {
            failure(format!(
                "split index {} out of bounds ({} parts)",
                index,
                parts.len()
            ))
        })
}

/// Concatenate literals and values of the parent node
///
/// # Errors
///
/// Returns an error if a referenced parent value is not a scalar.
pub fn transform_concatenate(
    parent: &Value,
    parts: &[ConcatPart],
    separator: &str,
) -> crate::Result<Value> {
    let mut pieces = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            ConcatPart::Literal(literal) => pieces.push(literal.clone()),
            ConcatPart::Key(key) => match parent.get(key) {
                None | Some(Value::Null) => {}
                Some(value) => pieces.push(text(value).ok_or_else(|| {
                    failure(format!("cannot concatenate {} under '{key}'", value.kind()))
                })?),
            },
        }
    }
    Ok(Value::String(pieces.join(separator)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transform_string_ops() {
        let value = Value::from("  Hello World  ");
        assert_eq!(transform_uppercase(&value).unwrap(), Value::from("  HELLO WORLD  "));
        assert_eq!(transform_lowercase(&value).unwrap(), Value::from("  hello world  "));
        assert_eq!(transform_trim(&value).unwrap(), Value::from("Hello World"));
    }

    #[test]
    fn test_transform_string_ops_with_null() {
        assert_eq!(transform_uppercase(&Value::Null).unwrap(), Value::Null);
        assert_eq!(transform_lowercase(&Value::Null).unwrap(), Value::Null);
        assert_eq!(transform_trim(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_transform_string_ops_render_scalars() {
        assert_eq!(transform_uppercase(&Value::from(true)).unwrap(), Value::from("TRUE"));
        assert_eq!(transform_trim(&Value::from(42)).unwrap(), Value::from("42"));
        assert!(transform_uppercase(&Value::from(vec![Value::from(1)])).is_err());
    }

    #[test]
    fn test_transform_split() {
        let value = Value::from("2024-01-15");
        assert_eq!(transform_split(&value, "-", 1).unwrap(), Value::from("01"));
        assert_eq!(transform_split(&Value::Null, "-", 1).unwrap(), Value::Null);

        let err = transform_split(&value, "-", 3).unwrap_err();
        assert!(err.to_string().contains("out of bounds (3 parts)"));
    }

    #[test]
    fn test_transform_default() {
        let default = Value::from("N/A");
        assert_eq!(transform_default(&Value::Null, &default).unwrap(), default);
        assert_eq!(transform_default(&Value::from(""), &default).unwrap(), default);
        assert_eq!(transform_default(&Value::from(5), &default).unwrap(), Value::from(5));
    }

    #[test]
    fn test_concatenate_parent_keys() {
        let parent = Value::from(json!({"first": "Jane", "last": "Doe", "middle": null}));
        let join = concatenate(
            vec![
                ConcatPart::key("first"),
                ConcatPart::key("middle"),
                ConcatPart::key("last"),
            ],
            " ",
        );
        assert_eq!(join(&Value::Null, &parent).unwrap(), Value::from("Jane Doe"));

        let reference = concatenate(vec![ConcatPart::literal("REF"), ConcatPart::key("id")], "-");
        let parent = Value::from(json!({"id": 42}));
        assert_eq!(reference(&Value::Null, &parent).unwrap(), Value::from("REF-42"));
    }

    #[test]
    fn test_concatenate_rejects_nested_values() {
        let parent = Value::from(json!({"tags": ["a"]}));
        let join = concatenate(vec![ConcatPart::key("tags")], ",");
        assert!(join(&Value::Null, &parent).is_err());
    }

    #[test]
    fn test_chain() {
        let pipeline = chain(vec![trim(), default_value("unknown"), uppercase()]);
        assert_eq!(pipeline(&Value::from("  ok "), &Value::Null).unwrap(), Value::from("OK"));
        assert_eq!(pipeline(&Value::from("   "), &Value::Null).unwrap(), Value::from("UNKNOWN"));
    }

    #[test]
    fn test_split_transformer() {
        let year = split("-", 0);
        assert_eq!(year(&Value::from("2024-01-15"), &Value::Null).unwrap(), Value::from("2024"));
    }
}
