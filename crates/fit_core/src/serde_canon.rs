//! Canonical JSON for artifact hashing
//!
//! Object keys are sorted recursively and output is compact, so the same
//! artifact always serializes to the same bytes.

use serde::Serialize;
use serde_json::{Map, Value};

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, val) in entries {
                sorted.insert(key, canonicalize(val));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serialize `value` to canonical JSON (sorted keys, no whitespace)
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    serde_json::to_string(&canonical)
}

/// BLAKE3 digest of a canonical JSON string, hex encoded
pub fn blake3_hex(canonical_json: &str) -> String {
    hex::encode(blake3::hash(canonical_json.as_bytes()).as_bytes())
}
