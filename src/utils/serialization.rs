// src/utils/serialization.rs
//! Serialization utilities for payloads that cross the native boundary.
//!
//! Provides serialization and deserialization functions for:
//! - JSON configuration strings handed to the native engine
//! - Inspection of engine-defined serialized objects

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serializes a value to a JSON string.
///
/// # Arguments
/// * `data` - The value to serialize (must implement `Serialize`)
///
/// # Returns
/// - `Ok(String)` with JSON representation on success
/// - `Err(serde_json::Error)` if serialization fails
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Deserializes a value from a JSON string.
///
/// # Arguments
/// * `data` - JSON string to deserialize
///
/// # Returns
/// - `Ok(T)` with deserialized value on success
/// - `Err(serde_json::Error)` if deserialization fails
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}

/// Returns the object holding an engine object's fields.
///
/// Engines wrap their state in a `{"version": "...", "data": {...}}` envelope;
/// older engines emit the fields at the top level. Both shapes are accepted.
///
/// # Returns
/// - `Some(&Value)` pointing at the field object
/// - `None` if `value` is not a JSON object
pub fn unwrap_versioned(value: &Value) -> Option<&Value> {
    let object = value.as_object()?;
    match (object.get("version"), object.get("data")) {
        (Some(_), Some(data)) if data.is_object() => Some(data),
        _ => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_versioned_envelope() {
        let value = json!({"version": "1.0", "data": {"name": "test-licence"}});
        let inner = unwrap_versioned(&value).unwrap();
        assert_eq!(inner["name"], "test-licence");
    }

    #[test]
    fn test_unwrap_flat_object() {
        let value = json!({"source_id": "12", "name": "test-licence"});
        let inner = unwrap_versioned(&value).unwrap();
        assert_eq!(inner["source_id"], "12");
    }

    #[test]
    fn test_unwrap_rejects_non_object() {
        assert!(unwrap_versioned(&json!(["not", "an", "object"])).is_none());
    }
}
