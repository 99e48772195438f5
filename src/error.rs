// src/error.rs
//! Error taxonomy for native-backed objects.
//!
//! Every public operation either resolves with a value or fails with one of
//! the variants below. Native status codes are always reported together with
//! the name of the native entry point that produced them.

use crate::models::handle::{ErrorCode, ResourceHandle};
use crate::utils::error_message::error_message;
use std::time::Duration;
use thiserror::Error;

/// Result type for operations against the native engine.
pub type VcxResult<T> = Result<T, VcxError>;

/// The native engine returned a non-zero status, either as the immediate
/// return value of a call or through its completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed with code {code}: {}", error_message(*.code))]
pub struct NativeCallError {
    /// Name of the native entry point, e.g. `vcx_credentialdef_create`
    pub operation: &'static str,
    /// Raw status code reported by the engine
    pub code: ErrorCode,
}

impl NativeCallError {
    pub fn new(operation: &'static str, code: ErrorCode) -> Self {
        NativeCallError { operation, code }
    }
}

/// Errors that can occur while driving a native-backed object.
#[derive(Debug, Error)]
pub enum VcxError {
    /// Native engine reported a failure
    #[error(transparent)]
    NativeCall(#[from] NativeCallError),

    /// Operation attempted on an object with no live handle
    #[error("{operation}: object has no live native handle")]
    Unbound { operation: &'static str },

    /// Create attempted on an object that already owns a handle
    #[error("object is already bound to native handle {handle}")]
    AlreadyBound { handle: ResourceHandle },

    /// Create attempted on an object whose handle was released
    #[error("{operation}: object has been released")]
    Released { operation: &'static str },

    /// Serialized input is missing the fields needed to rebuild the object
    #[error("malformed serialized state: {0}")]
    MalformedState(String),

    /// Ledger creation of a credential definition failed
    #[error("failed to create credential definition '{source_id}': {source}")]
    Creation {
        source_id: String,
        #[source]
        source: NativeCallError,
    },

    /// Creation parameters rejected before reaching the native engine
    #[error("invalid credential definition descriptor: {0}")]
    InvalidDescriptor(String),

    /// Configured bridge timeout elapsed before the native completion fired
    #[error("{operation} did not complete within {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Native engine dropped the completion without ever firing it
    #[error("{operation}: native completion was dropped without firing")]
    CompletionDropped { operation: &'static str },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl VcxError {
    /// Returns the native status code behind this error, if there is one.
    pub fn native_code(&self) -> Option<ErrorCode> {
        match self {
            VcxError::NativeCall(err) => Some(err.code),
            VcxError::Creation { source, .. } => Some(source.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_call_error_names_operation() {
        let err = NativeCallError::new("vcx_credentialdef_create", 1034);
        assert_eq!(
            err.to_string(),
            "vcx_credentialdef_create failed with code 1034: Failed to create credential definition"
        );
    }

    #[test]
    fn test_creation_error_exposes_native_code() {
        let err = VcxError::Creation {
            source_id: "12".to_string(),
            source: NativeCallError::new("vcx_credentialdef_create", 1055),
        };
        assert_eq!(err.native_code(), Some(1055));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unbound_has_no_native_code() {
        let err = VcxError::Unbound { operation: "vcx_credentialdef_serialize" };
        assert_eq!(err.native_code(), None);
    }
}
