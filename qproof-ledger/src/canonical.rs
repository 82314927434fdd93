//! Canonical JSON encoding used as digest input

use crate::Result;
use serde::Serialize;
use serde_json::{Map, Value};

/// Deterministic byte encoding of any serializable value
///
/// Object keys are sorted recursively and the output is compact JSON, so the
/// bytes do not depend on field insertion order.
///
/// # Errors
/// Returns `LedgerError::Canonicalization` if the value cannot be represented
/// as JSON (for example a map with non-string keys).
///
/// # Example
/// ```
/// use qproof_ledger::canonicalize;
/// use serde_json::json;
///
/// let a = canonicalize(&json!({"a": 1, "b": 2})).unwrap();
/// let b = canonicalize(&json!({"b": 2, "a": 1})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a, br#"{"a":1,"b":2}"#);
/// ```
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&sort_json(value))?)
}

/// Canonical form as a `Value`, for callers that need to inspect it
pub fn canonical_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(sort_json(serde_json::to_value(value)?))
}

fn sort_json(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, val) in entries {
                sorted.insert(k, sort_json(val));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json).collect()),
        other => other,
    }
}
