//! Sample value and expression literal storage types.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A literal value drawn from, or compared against, a dimension.
///
/// This enum stores the different value types a draw can produce uniformly:
/// booleans, integers, floats, and strings. It is also the literal type in
/// condition expressions and forbidden clauses.
///
/// Serialization is untagged, so values round-trip through JSON as plain
/// scalars (`true`, `3`, `0.5`, `"adam"`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean value.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A string value (categorical labels, mostly).
    Str(String),
}

impl Value {
    /// Returns the numeric content of this value, if it has one.
    ///
    /// Integers widen to `f64`; booleans and strings return `None`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(_) | Value::Str(_) => None,
        }
    }

    /// Equality with numeric coercion: `Int(1)` equals `Float(1.0)`.
    ///
    /// Condition and forbidden-clause matching use this rather than the
    /// derived `PartialEq`, so a clause written with an integer literal
    /// matches the float values a continuous dimension produces.
    #[must_use]
    pub fn coerced_eq(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Ordering with numeric coercion.
    ///
    /// Numbers compare numerically regardless of variant; strings compare
    /// lexicographically; any other mixed pairing is unordered.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Converts into the JSON document representation.
    #[must_use]
    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Value::from(*v),
            Value::Str(v) => serde_json::Value::String(v.clone()),
        }
    }

    /// Reads a value back from its JSON document representation.
    ///
    /// Arrays, objects, and `null` have no `Value` counterpart.
    pub(crate) fn from_json(doc: &serde_json::Value) -> Option<Value> {
        match doc {
            serde_json::Value::Bool(v) => Some(Value::Bool(*v)),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Some(Value::Int(v))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            serde_json::Value::String(v) => Some(Value::Str(v.clone())),
            _ => None,
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
