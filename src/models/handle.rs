// src/models/handle.rs
//! Native handle and status-code primitives.
//!
//! Every object that lives inside the native engine is addressed by an opaque
//! 32-bit token. These types keep the different kinds of integers apart so a
//! payment handle can never be passed where a resource handle is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation token attached to a single native call.
///
/// The engine echoes it back in the completion so the bridge can match the
/// completion with the call that produced it.
pub type CommandHandle = u32;

/// Status code returned by the native engine. `0` means success.
pub type ErrorCode = u32;

/// Status code for a successful native call.
pub const SUCCESS: ErrorCode = 0;

/// Handle to a pre-authorized payment source held by the native engine.
pub type PaymentHandle = u32;

/// Opaque identifier of an object living inside the native engine.
///
/// # Invariants
/// - Unique per live native-side object within a process
/// - Never reused while the owning object is alive
/// - Meaningless in another process unless round-tripped through serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(u32);

impl ResourceHandle {
    /// Wraps a raw handle issued by the native engine.
    pub const fn new(raw: u32) -> Self {
        ResourceHandle(raw)
    }

    /// Returns the raw value to pass back across the native boundary.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for ResourceHandle {
    fn from(raw: u32) -> Self {
        ResourceHandle(raw)
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
