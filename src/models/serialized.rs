// src/models/serialized.rs
//! Portable form of a native-backed object.

use crate::error::{VcxError, VcxResult};
use crate::utils::serialization::{deserialize, unwrap_versioned};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Portable encoding of an object's full native state.
///
/// The encoding is owned by the native engine and carried here as an opaque
/// string. The wrapper only reads the `source_id` and `name` it needs to
/// rebuild its own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedForm(String);

impl SerializedForm {
    pub fn new(data: impl Into<String>) -> Self {
        SerializedForm(data.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Extracts the wrapper-level fields.
    ///
    /// # Errors
    /// `VcxError::MalformedState` if the data is not a JSON object or lacks
    /// `source_id` or `name`
    pub fn header(&self) -> VcxResult<SerializedHeader> {
        let value: Value = deserialize(&self.0)
            .map_err(|e| VcxError::MalformedState(format!("not valid JSON: {}", e)))?;
        let fields = unwrap_versioned(&value)
            .ok_or_else(|| VcxError::MalformedState("expected a JSON object".to_string()))?;

        let field = |key: &str| -> VcxResult<String> {
            fields
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| VcxError::MalformedState(format!("missing field '{}'", key)))
        };

        Ok(SerializedHeader {
            source_id: field("source_id")?,
            name: field("name")?,
        })
    }
}

impl fmt::Display for SerializedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wrapper-level fields recovered from a [`SerializedForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedHeader {
    pub source_id: String,
    pub name: String,
}
