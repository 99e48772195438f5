// src/native/engine.rs
//! Boundary to the native credential-definition engine.
//!
//! The engine performs schema resolution, signing and the ledger write. This
//! crate only sees the narrow call surface below, injected as an
//! `Arc<dyn NativeEngine>` so tests can substitute a deterministic double.
//!
//! Every completion-style call returns an immediate status code. When that
//! code is `0` the engine owns the trampoline and must fire it exactly once,
//! from any thread, with the same command handle it was given.

use crate::bridge::trampoline::Trampoline;
use crate::models::credential_def::CreateCredentialDefArgs;
use crate::models::handle::{CommandHandle, ErrorCode, ResourceHandle};

pub const OP_CREATE: &str = "vcx_credentialdef_create";
pub const OP_GET_CRED_DEF_ID: &str = "vcx_credentialdef_get_cred_def_id";
pub const OP_GET_PAYMENT_TXN: &str = "vcx_credentialdef_get_payment_txn";
pub const OP_SERIALIZE: &str = "vcx_credentialdef_serialize";
pub const OP_DESERIALIZE: &str = "vcx_credentialdef_deserialize";
pub const OP_RELEASE: &str = "vcx_credentialdef_release";

/// Credential-definition entry points of the native engine.
pub trait NativeEngine: Send + Sync {
    /// Publishes a credential definition; completes with its handle.
    fn credentialdef_create(
        &self,
        command_handle: CommandHandle,
        args: &CreateCredentialDefArgs<'_>,
        cb: Trampoline<ResourceHandle>,
    ) -> ErrorCode;

    /// Completes with the on-ledger credential definition identifier.
    fn credentialdef_get_cred_def_id(
        &self,
        command_handle: CommandHandle,
        handle: ResourceHandle,
        cb: Trampoline<String>,
    ) -> ErrorCode;

    /// Completes with the payment transaction receipt, absent when no fee
    /// was paid.
    fn credentialdef_get_payment_txn(
        &self,
        command_handle: CommandHandle,
        handle: ResourceHandle,
        cb: Trampoline<Option<String>>,
    ) -> ErrorCode;

    /// Completes with the engine-defined serialized state.
    fn credentialdef_serialize(
        &self,
        command_handle: CommandHandle,
        handle: ResourceHandle,
        cb: Trampoline<String>,
    ) -> ErrorCode;

    /// Rebuilds native state from `data`; completes with a fresh handle.
    fn credentialdef_deserialize(
        &self,
        command_handle: CommandHandle,
        data: &str,
        cb: Trampoline<ResourceHandle>,
    ) -> ErrorCode;

    /// Releases native state. Synchronous, takes no completion.
    fn credentialdef_release(&self, handle: ResourceHandle) -> ErrorCode;
}
