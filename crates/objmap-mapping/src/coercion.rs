//! Scalar coercion
//!
//! Converts generic scalars to the scalar type a field declares. Besides the
//! obvious cases this understands the encodings Java backends emit:
//! class-tagged `Long`/`BigInteger` wrappers, `Date` and `Timestamp` maps,
//! and enums whose domain is named by the key that carries them.

use crate::config::MapperConfig;
use crate::model::{EnumValue, LargeInteger, ModelValue};
use crate::naming::{ForeignClass, NamingConventions};
use crate::registry::TypeRegistry;
use crate::types::ScalarType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use objmap_value::{Number, Value};
use std::fmt::Display;
use thiserror::Error;

/// A value that is present but cannot become the requested type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, got {found}")]
pub struct CoercionError {
    pub expected: String,
    pub found: String,
}

impl CoercionError {
    pub fn new(expected: impl Display, found: &Value) -> Self {
        Self {
            expected: expected.to_string(),
            found: found.describe(),
        }
    }
}

type CoercionResult<T> = std::result::Result<T, CoercionError>;

/// Coercion with access to naming conventions, date formats and enum domains
#[derive(Debug, Clone, Copy)]
pub struct Coercion<'a> {
    naming: &'a NamingConventions,
    date_formats: &'a [String],
    registry: &'a TypeRegistry,
}

impl<'a> Coercion<'a> {
    pub fn new(config: &'a MapperConfig, registry: &'a TypeRegistry) -> Self {
        Self {
            naming: &config.naming,
            date_formats: &config.date_formats,
            registry,
        }
    }

    /// Convert `value` to `target`
    ///
    /// # Errors
    ///
    /// Returns a [`CoercionError`] when the value has no valid reading as
    /// the target type.
    pub fn coerce(&self, value: &Value, target: &ScalarType) -> CoercionResult<ModelValue> {
        self.coerce_keyed(value, target, None)
    }

    /// Convert `value` to `target`, knowing the source key it came from
    ///
    /// The key matters for enums without a declared domain: a key that
    /// belongs to an enum key family selects that domain.
    ///
    /// # Errors
    ///
    /// Returns a [`CoercionError`] when the value has no valid reading as
    /// the target type.
    pub fn coerce_keyed(
        &self,
        value: &Value,
        target: &ScalarType,
        source_key: Option<&str>,
    ) -> CoercionResult<ModelValue> {
        match target {
            ScalarType::Bool => to_bool(value).map(ModelValue::Bool),
            ScalarType::Int => to_i64(value).map(ModelValue::Int),
            ScalarType::Float => to_f64(value).map(ModelValue::Float),
            ScalarType::LargeInt => to_large_integer(value, self.naming).map(ModelValue::LargeInt),
            ScalarType::String => to_string(value).map(ModelValue::String),
            ScalarType::Instant => {
                to_instant(value, self.naming, self.date_formats).map(ModelValue::Instant)
            }
            ScalarType::Enum { domain } => self
                .to_enum(value, domain.as_deref(), source_key)
                .map(ModelValue::Enum),
        }
    }

    /// Resolve an enum case
    ///
    /// The domain comes from, in order: the declared domain, the source key
    /// when it belongs to an enum key family, or the first enum key family
    /// present inside a map value.
    fn to_enum(
        &self,
        value: &Value,
        domain: Option<&str>,
        source_key: Option<&str>,
    ) -> CoercionResult<EnumValue> {
        let expected = domain.map_or_else(|| "enum".to_string(), |d| format!("enum {d}"));

        if let Value::Map(map) = value {
            let (domain, key) = match domain {
                Some(domain) => self.naming.enum_key(domain).map(|key| (domain, key)),
                None => self
                    .naming
                    .enum_keys
                    .iter()
                    .find(|entry| map.contains_key(&entry.key))
                    .map(|entry| (entry.domain.as_str(), entry.key.as_str())),
            }
            .ok_or_else(|| CoercionError::new(&expected, value))?;
            let case = map
                .get(key)
                .ok_or_else(|| CoercionError::new(&expected, value))?;
            return self.enum_case(domain, case);
        }

        let domain = domain
            .or_else(|| {
                let key = source_key?;
                self.naming
                    .enum_keys
                    .iter()
                    .find(|entry| entry.key == key)
                    .map(|entry| entry.domain.as_str())
            })
            .ok_or_else(|| CoercionError::new(&expected, value))?;
        self.enum_case(domain, value)
    }

    fn enum_case(&self, domain: &str, value: &Value) -> CoercionResult<EnumValue> {
        let expected = format!("enum {domain}");
        let Some(cases) = self.registry.enum_domain(domain) else {
            return Err(CoercionError {
                expected: format!("{expected} (unregistered domain)"),
                found: value.describe(),
            });
        };
        let found = match value {
            Value::String(s) => cases.by_name(s.trim()),
            Value::Number(n) => n.as_i64().and_then(|i| cases.by_ordinal(i)),
            _ => None,
        };
        found.ok_or_else(|| CoercionError::new(&expected, value))
    }
}

/// Boolean from a boolean, numeric 0/1, or a `true`/`false`/`1`/`0` string
///
/// # Errors
///
/// Returns an error for any other value.
pub fn to_bool(value: &Value) -> CoercionResult<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") || s == "1" {
                Some(true)
            } else if s.eq_ignore_ascii_case("false") || s == "0" {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
    .ok_or_else(|| CoercionError::new(ScalarType::Bool, value))
}

/// Integer from a number without fraction or a numeric string
///
/// # Errors
///
/// Returns an error for fractions, out-of-range values and non-numbers.
pub fn to_i64(value: &Value) -> CoercionResult<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => parse_integral(s.trim()),
        _ => None,
    }
    .ok_or_else(|| CoercionError::new(ScalarType::Int, value))
}

/// Largest magnitude below which every integer has an exact `f64`
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Integer text, allowing a zero fraction (`"42.00"`) or float notation
/// within exact `f64` range
fn parse_integral(s: &str) -> Option<i64> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let zero_fraction = s
        .split_once('.')
        .filter(|(_, fraction)| !fraction.is_empty() && fraction.bytes().all(|b| b == b'0'));
    if let Some((whole, _)) = zero_fraction {
        if let Ok(i) = whole.parse::<i64>() {
            return Some(i);
        }
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.abs() <= MAX_EXACT_FLOAT_INT)
        .and_then(|f| Number::Float(f).as_i64())
}

/// Floating point from a number or numeric string
///
/// # Errors
///
/// Returns an error for non-numbers and non-finite strings.
pub fn to_f64(value: &Value) -> CoercionResult<f64> {
    match value {
        Value::Number(n) => Some(n.as_f64()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
    .ok_or_else(|| CoercionError::new(ScalarType::Float, value))
}

/// String pass-through; numbers and booleans render as text
///
/// # Errors
///
/// Returns an error for null, sequences and maps.
pub fn to_string(value: &Value) -> CoercionResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(CoercionError::new(ScalarType::String, value)),
    }
}

/// Arbitrary precision integer
///
/// Accepts integers, integral floats within 64-bit range, decimal strings
/// of any length, and class-tagged `Long`/`BigInteger` wrappers carrying
/// one of those under the value payload key.
///
/// # Errors
///
/// Returns an error for anything else.
pub fn to_large_integer(value: &Value, naming: &NamingConventions) -> CoercionResult<LargeInteger> {
    let fail = || CoercionError::new(ScalarType::LargeInt, value);
    match value {
        Value::Number(n) => n.as_i64().map(LargeInteger::from).ok_or_else(fail),
        Value::String(s) => s.parse().map_err(|_| fail()),
        Value::Map(_) => {
            let class = naming.class_name_of(value).ok_or_else(fail)?;
            if naming.foreign_class(class) != Some(ForeignClass::LargeInteger) {
                return Err(fail());
            }
            match value.get(&naming.payload.value) {
                Some(inner @ (Value::Number(_) | Value::String(_))) => {
                    to_large_integer(inner, naming).map_err(|_| fail())
                }
                _ => Err(fail()),
            }
        }
        _ => Err(fail()),
    }
}

/// Point in time from any supported wire encoding
///
/// - class-tagged timestamp map: epoch millis under `time`, with the
///   fractional second in nanoseconds under `nanos` when present
/// - class-tagged date map: epoch millis under `time`
/// - bare number: epoch seconds, fractions allowed
/// - string: RFC 3339, then each configured format as a date-time, then as
///   a date at midnight, all in UTC
///
/// # Errors
///
/// Returns an error for unrecognized encodings or out-of-range instants.
pub fn to_instant(
    value: &Value,
    naming: &NamingConventions,
    formats: &[String],
) -> CoercionResult<DateTime<Utc>> {
    let fail = || CoercionError::new(ScalarType::Instant, value);
    match value {
        Value::Number(n) => from_epoch_seconds(n.as_f64()).ok_or_else(fail),
        Value::String(s) => parse_date_string(s.trim(), formats).ok_or_else(fail),
        Value::Map(_) => {
            let class = naming.class_name_of(value).ok_or_else(fail)?;
            let millis = value
                .get(&naming.payload.time)
                .and_then(Value::as_i64)
                .ok_or_else(fail)?;
            match naming.foreign_class(class) {
                Some(ForeignClass::Date) => DateTime::from_timestamp_millis(millis).ok_or_else(fail),
                Some(ForeignClass::Timestamp) => {
                    let nanos = match value.get(&naming.payload.nanos) {
                        None | Some(Value::Null) => None,
                        Some(raw) => Some(raw.as_i64().ok_or_else(fail)?),
                    };
                    from_epoch_millis_and_nanos(millis, nanos).ok_or_else(fail)
                }
                _ => Err(fail()),
            }
        }
        _ => Err(fail()),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1_000_000_000.0).round();
    // Rounding can carry into the next second
    let (whole, nanos) = if nanos >= 1_000_000_000.0 {
        (whole + 1.0, 0.0)
    } else {
        (whole, nanos)
    };
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(whole as i64, nanos as u32)
}

fn from_epoch_millis_and_nanos(millis: i64, nanos: Option<i64>) -> Option<DateTime<Utc>> {
    let seconds = millis.div_euclid(1000);
    let nanos = match nanos {
        Some(n) => u32::try_from(n).ok().filter(|n| *n < 1_000_000_000)?,
        None => u32::try_from(millis.rem_euclid(1000)).ok()? * 1_000_000,
    };
    DateTime::from_timestamp(seconds, nanos)
}

fn parse_date_string(input: &str, formats: &[String]) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.with_timezone(&Utc));
    }
    formats.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(input, format)
            .map(|naive| naive.and_utc())
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(input, format)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EnumDomain;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register_enum(EnumDomain::new("Permission", ["READ", "WRITE", "ADMIN"]))
            .register_enum(EnumDomain::new("StationOperation", ["START", "STOP"]));
        registry
    }

    #[test]
    fn test_to_bool() {
        assert_eq!(to_bool(&v(json!(true))), Ok(true));
        assert_eq!(to_bool(&v(json!(0))), Ok(false));
        assert_eq!(to_bool(&v(json!(1))), Ok(true));
        assert_eq!(to_bool(&v(json!("TRUE"))), Ok(true));
        assert_eq!(to_bool(&v(json!("False"))), Ok(false));
        assert!(to_bool(&v(json!(2))).is_err());
        assert!(to_bool(&v(json!("yes"))).is_err());
    }

    #[test]
    fn test_to_i64() {
        assert_eq!(to_i64(&v(json!(42))), Ok(42));
        assert_eq!(to_i64(&v(json!(42.0))), Ok(42));
        assert_eq!(to_i64(&v(json!(" 17 "))), Ok(17));
        assert_eq!(to_i64(&v(json!("-3.0"))), Ok(-3));
        assert!(to_i64(&v(json!(1.5))).is_err());

        let err = to_i64(&v(json!("N/A"))).unwrap_err();
        assert_eq!(err.to_string(), "expected integer, got string 'N/A'");
    }

    #[test]
    fn test_to_i64_keeps_digits_beyond_float_precision() {
        assert_eq!(to_i64(&v(json!("12345678901234567.0"))), Ok(12_345_678_901_234_567));
        assert_eq!(to_i64(&v(json!("-9223372036854775808.00"))), Ok(i64::MIN));
        assert_eq!(to_i64(&v(json!("1e3"))), Ok(1000));
        assert!(to_i64(&v(json!("12345678901234567.5"))).is_err());
        assert!(to_i64(&v(json!("1e20"))).is_err());
        assert!(to_i64(&v(json!("9223372036854775808.0"))).is_err());
    }

    #[test]
    fn test_to_f64_and_string() {
        assert_eq!(to_f64(&v(json!(3))), Ok(3.0));
        assert_eq!(to_f64(&v(json!("2.5"))), Ok(2.5));
        assert!(to_f64(&v(json!("NaN"))).is_err());
        assert_eq!(to_string(&v(json!(12))), Ok("12".to_string()));
        assert_eq!(to_string(&v(json!(false))), Ok("false".to_string()));
        assert!(to_string(&v(json!([1]))).is_err());
    }

    #[test]
    fn test_large_integer_preserves_digits() {
        let naming = NamingConventions::default();
        let digits = "123456789012345678901234567890123456789";

        let big = to_large_integer(&v(json!(digits)), &naming).unwrap();
        assert_eq!(big.as_str(), digits);

        let wrapped = v(json!({"javaClass": "java.lang.Long", "value": "-9223372036854775809"}));
        let big = to_large_integer(&wrapped, &naming).unwrap();
        assert_eq!(big.as_str(), "-9223372036854775809");

        assert_eq!(to_large_integer(&v(json!(7)), &naming).unwrap().as_str(), "7");
        assert!(to_large_integer(&v(json!("12e3")), &naming).is_err());
        assert!(to_large_integer(&v(json!({"javaClass": "java.util.Date", "value": 1})), &naming).is_err());
    }

    #[test]
    fn test_instant_encodings() {
        let naming = NamingConventions::default();
        let formats = crate::config::MapperConfig::default().date_formats;

        let seconds = to_instant(&v(json!(1_700_000_000)), &naming, &formats).unwrap();
        assert_eq!(seconds.timestamp(), 1_700_000_000);

        let fractional = to_instant(&v(json!(1.5)), &naming, &formats).unwrap();
        assert_eq!(fractional.timestamp_subsec_millis(), 500);

        let date = v(json!({"javaClass": "java.util.Date", "time": 1_700_000_000_123_i64}));
        let date = to_instant(&date, &naming, &formats).unwrap();
        assert_eq!(date.timestamp_millis(), 1_700_000_000_123);

        let timestamp = v(json!({
            "javaClass": "java.sql.Timestamp",
            "time": 1_700_000_000_123_i64,
            "nanos": 123_456_789
        }));
        let timestamp = to_instant(&timestamp, &naming, &formats).unwrap();
        assert_eq!(timestamp.timestamp(), 1_700_000_000);
        assert_eq!(timestamp.timestamp_subsec_nanos(), 123_456_789);

        let rfc = to_instant(&v(json!("2024-03-01T10:20:30+02:00")), &naming, &formats).unwrap();
        assert_eq!(rfc.hour(), 8);

        let day = to_instant(&v(json!("2024-03-01")), &naming, &formats).unwrap();
        assert_eq!((day.year(), day.month(), day.day(), day.hour()), (2024, 3, 1, 0));

        let java = to_instant(&v(json!("Fri Mar 01 10:20:30 UTC 2024")), &naming, &formats).unwrap();
        assert_eq!(java.minute(), 20);
    }

    #[test]
    fn test_instant_rejects_unknown_encodings() {
        let naming = NamingConventions::default();
        let formats = crate::config::MapperConfig::default().date_formats;

        assert!(to_instant(&v(json!("yesterday")), &naming, &formats).is_err());
        assert!(to_instant(&v(json!({"time": 5})), &naming, &formats).is_err());
        assert!(to_instant(&v(json!({"javaClass": "java.util.HashMap", "time": 5})), &naming, &formats).is_err());
        assert!(to_instant(
            &v(json!({"javaClass": "java.sql.Timestamp", "time": 5, "nanos": 2_000_000_000_i64})),
            &naming,
            &formats
        )
        .is_err());
        assert!(to_instant(&v(json!(true)), &naming, &formats).is_err());
    }

    #[test]
    fn test_negative_millis_timestamp() {
        let naming = NamingConventions::default();
        let date = v(json!({"javaClass": "java.sql.Timestamp", "time": -1}));
        let at = to_instant(&date, &naming, &[]).unwrap();
        assert_eq!(at.timestamp_millis(), -1);
    }

    #[test]
    fn test_enum_by_declared_domain() {
        let config = MapperConfig::default();
        let registry = registry();
        let coercion = Coercion::new(&config, &registry);
        let target = ScalarType::Enum {
            domain: Some("Permission".to_string()),
        };

        let ModelValue::Enum(admin) = coercion.coerce(&v(json!("ADMIN")), &target).unwrap() else {
            panic!("expected enum");
        };
        assert_eq!((admin.case.as_str(), admin.ordinal), ("ADMIN", 2));

        let ModelValue::Enum(write) = coercion.coerce(&v(json!(1)), &target).unwrap() else {
            panic!("expected enum");
        };
        assert_eq!(write.case, "WRITE");

        assert!(coercion.coerce(&v(json!("OWNER")), &target).is_err());
        assert!(coercion.coerce(&v(json!(9)), &target).is_err());
    }

    #[test]
    fn test_enum_declared_domain_reads_its_embedded_key() {
        let config = MapperConfig::default();
        let registry = registry();
        let coercion = Coercion::new(&config, &registry);
        let target = ScalarType::Enum {
            domain: Some("Permission".to_string()),
        };

        let ModelValue::Enum(read) = coercion
            .coerce(&v(json!({"permission": "read"})), &target)
            .unwrap()
        else {
            panic!("expected enum");
        };
        assert_eq!((read.domain.as_str(), read.case.as_str()), ("Permission", "READ"));

        // Another domain's key does not satisfy a declared domain
        let err = coercion
            .coerce(&v(json!({"stationOperation": "STOP"})), &target)
            .unwrap_err();
        assert_eq!(err.expected, "enum Permission");
    }

    #[test]
    fn test_enum_domain_selected_by_key() {
        let config = MapperConfig::default();
        let registry = registry();
        let coercion = Coercion::new(&config, &registry);
        let any_enum = ScalarType::Enum { domain: None };

        // Embedded key family picks the domain
        let ModelValue::Enum(op) = coercion
            .coerce(&v(json!({"stationOperation": "STOP"})), &any_enum)
            .unwrap()
        else {
            panic!("expected enum");
        };
        assert_eq!((op.domain.as_str(), op.case.as_str()), ("StationOperation", "STOP"));

        // Source key picks the domain for a bare value
        let ModelValue::Enum(perm) = coercion
            .coerce_keyed(&v(json!(0)), &any_enum, Some("permission"))
            .unwrap()
        else {
            panic!("expected enum");
        };
        assert_eq!((perm.domain.as_str(), perm.case.as_str()), ("Permission", "READ"));

        // Nothing names a domain
        assert!(coercion.coerce(&v(json!("READ")), &any_enum).is_err());
    }

    #[test]
    fn test_enum_unregistered_domain() {
        let config = MapperConfig::default();
        let registry = registry();
        let coercion = Coercion::new(&config, &registry);

        let err = coercion
            .coerce(&v(json!({"stationErrorCode": 3})), &ScalarType::Enum { domain: None })
            .unwrap_err();
        assert!(err.expected.contains("unregistered"));
    }
}
