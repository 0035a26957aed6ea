//! Loosely typed field values exchanged with the generic record interface.
//!
//! Callers of [`create_new`](crate::record::create_new) describe a record as
//! a [`FieldMap`]; each entry is routed through the entity's `apply`
//! assignment path, so every value passes validation dispatch exactly as a
//! direct field assignment would.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Field name to value, for generic record construction.
pub type FieldMap = BTreeMap<String, Value>;

/// A field value as supplied to `create_new` or to an entity's `apply`
/// assignment path.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    Time(DateTime<Utc>),
    Json(serde_json::Value),
    /// Primary keys of related records, for to-many relationship fields.
    List(Vec<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Int(_) => "an integer",
            Value::Str(_) => "a string",
            Value::Bytes(_) => "bytes",
            Value::Time(_) => "a timestamp",
            Value::Json(_) => "a JSON value",
            Value::List(_) => "a key list",
        }
    }

    pub fn into_str(self) -> Result<String, String> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(format!("expected a string, got {}", other.type_name())),
        }
    }

    pub fn into_opt_str(self) -> Result<Option<String>, String> {
        match self {
            Value::Null => Ok(None),
            other => other.into_str().map(Some),
        }
    }

    pub fn into_bool(self) -> Result<bool, String> {
        match self {
            Value::Bool(b) => Ok(b),
            other => Err(format!("expected a boolean, got {}", other.type_name())),
        }
    }

    pub fn into_int(self) -> Result<i64, String> {
        match self {
            Value::Int(i) => Ok(i),
            other => Err(format!("expected an integer, got {}", other.type_name())),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, String> {
        match self {
            Value::Bytes(b) => Ok(b),
            other => Err(format!("expected bytes, got {}", other.type_name())),
        }
    }

    pub fn into_opt_bytes(self) -> Result<Option<Vec<u8>>, String> {
        match self {
            Value::Null => Ok(None),
            other => other.into_bytes().map(Some),
        }
    }

    /// Timestamps are accepted either as [`Value::Time`] or as an RFC 3339
    /// string.
    pub fn into_opt_time(self) -> Result<Option<DateTime<Utc>>, String> {
        match self {
            Value::Null => Ok(None),
            Value::Time(t) => Ok(Some(t)),
            Value::Str(s) => DateTime::parse_from_rfc3339(&s)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|e| format!("not an RFC 3339 timestamp: {e}")),
            other => Err(format!("expected a timestamp, got {}", other.type_name())),
        }
    }

    pub fn into_keys(self) -> Result<Vec<String>, String> {
        match self {
            Value::List(keys) => Ok(keys),
            other => Err(format!("expected a key list, got {}", other.type_name())),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(keys: [&str; N]) -> Self {
        Value::List(keys.iter().map(|k| k.to_string()).collect())
    }
}
