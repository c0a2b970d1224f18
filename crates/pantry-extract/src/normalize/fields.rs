//! Lenient lookups on a decoded JSON object
//!
//! Provider exports are inconsistent about numbers: the same field may be a
//! JSON number in one record and a numeric string in the next. Every numeric
//! accessor here accepts both.

use super::DecodeError;
use serde_json::{Map, Value};
use std::borrow::Cow;

pub type Object = Map<String, Value>;

/// Lookup key, possibly computed at runtime (`product_name` + `_de`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey<'a>(Cow<'a, str>);

impl<'a> FieldKey<'a> {
    pub fn new(key: impl Into<Cow<'a, str>>) -> Result<Self, DecodeError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(DecodeError::KeyConstruction(key.into_owned()));
        }
        Ok(Self(key))
    }

    pub fn suffixed(base: &str, suffix: &str) -> Result<FieldKey<'static>, DecodeError> {
        FieldKey::new(format!("{}{}", base, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FieldKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse one raw line into a JSON object
pub fn parse_object(line: &[u8]) -> Result<Object, DecodeError> {
    match serde_json::from_slice::<Value>(line)? {
        Value::Object(object) => Ok(object),
        _ => Err(DecodeError::NotAnObject),
    }
}

fn mismatch(key: &FieldKey<'_>, expected: &'static str) -> DecodeError {
    DecodeError::TypeMismatch {
        field: key.to_string(),
        expected,
    }
}

/// Value of `key`, treating JSON `null` as absent
pub fn get<'o>(object: &'o Object, key: &FieldKey<'_>) -> Option<&'o Value> {
    object.get(key.as_str()).filter(|v| !v.is_null())
}

pub fn require<'o>(object: &'o Object, key: &FieldKey<'_>) -> Result<&'o Value, DecodeError> {
    get(object, key).ok_or_else(|| DecodeError::MissingField(key.to_string()))
}

pub fn optional_str<'o>(object: &'o Object, key: &FieldKey<'_>) -> Result<Option<&'o str>, DecodeError> {
    match get(object, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(mismatch(key, "string")),
    }
}

pub fn require_str<'o>(object: &'o Object, key: &FieldKey<'_>) -> Result<&'o str, DecodeError> {
    optional_str(object, key)?.ok_or_else(|| DecodeError::MissingField(key.to_string()))
}

pub fn require_object<'o>(object: &'o Object, key: &FieldKey<'_>) -> Result<&'o Object, DecodeError> {
    require(object, key)?
        .as_object()
        .ok_or_else(|| mismatch(key, "object"))
}

pub fn optional_array<'o>(object: &'o Object, key: &FieldKey<'_>) -> Result<Option<&'o [Value]>, DecodeError> {
    match get(object, key) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(mismatch(key, "array")),
    }
}

pub fn require_array<'o>(object: &'o Object, key: &FieldKey<'_>) -> Result<&'o [Value], DecodeError> {
    optional_array(object, key)?.ok_or_else(|| DecodeError::MissingField(key.to_string()))
}

/// Integer from a JSON number or numeric string.
///
/// Integral floats (`114.0`) are accepted; fractional values are not.
pub fn lenient_i64(value: &Value, key: &FieldKey<'_>) -> Result<i64, DecodeError> {
    let integral = |f: f64| {
        (f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
            .then_some(f as i64)
    };

    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        },
        _ => None,
    };

    parsed.ok_or_else(|| mismatch(key, "integer"))
}

/// Decimal from a JSON number or numeric string
pub fn lenient_f64(value: &Value, key: &FieldKey<'_>) -> Result<f64, DecodeError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| mismatch(key, "number"))
}

pub fn require_i64(object: &Object, key: &FieldKey<'_>) -> Result<i64, DecodeError> {
    lenient_i64(require(object, key)?, key)
}

pub fn require_f64(object: &Object, key: &FieldKey<'_>) -> Result<f64, DecodeError> {
    lenient_f64(require(object, key)?, key)
}
