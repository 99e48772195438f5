// src/services/credential_def.rs
//! Credential Definition Service
//!
//! A credential definition binds a schema to an issuer and to a revocation
//! configuration, and must be on the ledger before credentials of that
//! schema can be issued. This module drives the native engine to publish
//! one and exposes the identifiers the ledger assigns to it.
//!
//! # Lifecycle
//! - [`CredentialDef::create`] publishes a new definition
//! - [`CredentialDef::deserialize`] restores one from [`SerializedForm`]
//! - [`CredentialDef::release`] frees the native handle
//!
//! # Concurrency
//! Read accessors take `&self`. Two concurrent [`CredentialDef::get_cred_def_id`]
//! calls on the same object both reach the native engine; serializing access to
//! a shared object is up to the caller.

use crate::bridge::ffi_callback::Bridge;
use crate::bridge::trampoline::Trampoline;
use crate::error::{VcxError, VcxResult};
use crate::models::credential_def::{CreateCredentialDefArgs, CredentialDefDescriptor};
use crate::models::handle::{CommandHandle, ErrorCode, ResourceHandle};
use crate::models::serialized::SerializedForm;
use crate::native::engine::{
    NativeEngine, OP_CREATE, OP_DESERIALIZE, OP_GET_CRED_DEF_ID, OP_GET_PAYMENT_TXN, OP_RELEASE,
    OP_SERIALIZE,
};
use crate::resource::lifecycle::{NativeResource, ResourceLifecycle, ResourceState};
use log::info;
use once_cell::sync::OnceCell;

/// Native entry points backing a [`CredentialDef`].
pub struct CredentialDefResource;

impl NativeResource for CredentialDefResource {
    const KIND: &'static str = "credential definition";
    const SERIALIZE_OP: &'static str = OP_SERIALIZE;
    const DESERIALIZE_OP: &'static str = OP_DESERIALIZE;
    const RELEASE_OP: &'static str = OP_RELEASE;

    fn serialize(
        engine: &dyn NativeEngine,
        command_handle: CommandHandle,
        handle: ResourceHandle,
        cb: Trampoline<String>,
    ) -> ErrorCode {
        engine.credentialdef_serialize(command_handle, handle, cb)
    }

    fn deserialize(
        engine: &dyn NativeEngine,
        command_handle: CommandHandle,
        data: &str,
        cb: Trampoline<ResourceHandle>,
    ) -> ErrorCode {
        engine.credentialdef_deserialize(command_handle, data, cb)
    }

    fn release(engine: &dyn NativeEngine, handle: ResourceHandle) -> ErrorCode {
        engine.credentialdef_release(handle)
    }
}

/// Validates `descriptor` and resolves it into native create arguments.
///
/// # Errors
/// `VcxError::InvalidDescriptor` if a required field is missing or empty
pub(crate) fn create_args(descriptor: &CredentialDefDescriptor) -> VcxResult<CreateCredentialDefArgs<'_>> {
    let payment_handle = descriptor.validate()?;

    Ok(CreateCredentialDefArgs {
        source_id: &descriptor.source_id,
        name: &descriptor.name,
        schema_id: &descriptor.schema_id,
        issuer_did: descriptor.issuer_did.as_deref(),
        tag: descriptor.tag_or_default(),
        revocation_details: descriptor.revocation_details().to_json()?,
        payment_handle,
    })
}

/// A credential definition backed by the native engine.
pub struct CredentialDef {
    /// Caller's correlation string, fixed at construction
    source_id: String,
    name: String,
    /// Known after create; not reconstructed by deserialize
    schema_id: Option<String>,
    /// Creation parameters, kept until the definition is published
    descriptor: Option<CredentialDefDescriptor>,
    lifecycle: ResourceLifecycle<CredentialDefResource>,
    cred_def_id: OnceCell<String>,
    payment_txn: OnceCell<Option<String>>,
}

impl CredentialDef {
    /// Builds an unbound credential definition from `descriptor`.
    ///
    /// Nothing is sent to the native engine until [`CredentialDef::publish`].
    ///
    /// # Errors
    /// `VcxError::InvalidDescriptor` if a required field is missing or empty
    pub fn new(bridge: &Bridge, descriptor: CredentialDefDescriptor) -> VcxResult<Self> {
        descriptor.validate()?;
        Ok(CredentialDef {
            source_id: descriptor.source_id.clone(),
            name: descriptor.name.clone(),
            schema_id: Some(descriptor.schema_id.clone()),
            descriptor: Some(descriptor),
            lifecycle: ResourceLifecycle::new(bridge.clone()),
            cred_def_id: OnceCell::new(),
            payment_txn: OnceCell::new(),
        })
    }

    /// Publishes a credential definition on the ledger.
    ///
    /// # Arguments
    /// * `bridge` - Bridge to the native engine
    /// * `descriptor` - Source id, name, schema, revocation and payment settings
    ///
    /// # Returns
    /// A bound `CredentialDef` whose `schema_id` matches the descriptor
    ///
    /// # Errors
    /// - `VcxError::InvalidDescriptor` before any native call
    /// - `VcxError::Creation` wrapping the native failure if the engine
    ///   rejects the schema, the payment handle or the ledger write
    ///
    /// # Example
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use vcx_credential_def::bridge::ffi_callback::Bridge;
    /// # use vcx_credential_def::models::credential_def::CredentialDefDescriptor;
    /// # use vcx_credential_def::native::in_memory::InMemoryEngine;
    /// # use vcx_credential_def::services::credential_def::CredentialDef;
    /// # async fn run() -> vcx_credential_def::error::VcxResult<()> {
    /// let bridge = Bridge::new(Arc::new(InMemoryEngine::default()));
    /// let descriptor = CredentialDefDescriptor::new(
    ///     "12",
    ///     "test-licence",
    ///     "2hoqvcwupRTUNkXn6ArYzs:2:test-licence:4.4.4",
    /// )
    /// .with_payment_handle(0);
    /// let cred_def = CredentialDef::create(&bridge, descriptor).await?;
    /// println!("{}", cred_def.get_cred_def_id().await?);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create(bridge: &Bridge, descriptor: CredentialDefDescriptor) -> VcxResult<Self> {
        let mut cred_def = CredentialDef::new(bridge, descriptor)?;
        cred_def.publish().await?;
        Ok(cred_def)
    }

    /// Submits this definition to the native engine.
    ///
    /// On failure the object stays unbound and may be published again.
    pub async fn publish(&mut self) -> VcxResult<ResourceHandle> {
        self.lifecycle.ensure_unbound(OP_CREATE)?;
        let descriptor = self.descriptor.as_ref().ok_or_else(|| {
            VcxError::InvalidDescriptor("no creation parameters for this object".to_string())
        })?;
        let args = create_args(descriptor)?;

        let handle = self
            .lifecycle
            .create(OP_CREATE, |engine, command_handle, cb| {
                engine.credentialdef_create(command_handle, &args, cb)
            })
            .await
            .map_err(|err| match err {
                VcxError::NativeCall(source) => VcxError::Creation {
                    source_id: self.source_id.clone(),
                    source,
                },
                other => other,
            })?;

        info!(
            "credential definition '{}' published against schema {} (handle {})",
            self.source_id, descriptor.schema_id, handle
        );
        Ok(handle)
    }

    /// Restores a credential definition from its serialized form.
    ///
    /// `name` and `source_id` come from `data`. `schema_id` is not part of
    /// what the wrapper reads back, so it is `None` until re-derived.
    ///
    /// # Errors
    /// - `VcxError::MalformedState` if `data` lacks `source_id` or `name`
    /// - `VcxError::NativeCall` if the engine rejects the data
    pub async fn deserialize(bridge: &Bridge, data: &SerializedForm) -> VcxResult<Self> {
        let header = data.header()?;
        let lifecycle = ResourceLifecycle::deserialize(bridge.clone(), data).await?;
        Ok(CredentialDef {
            source_id: header.source_id,
            name: header.name,
            schema_id: None,
            descriptor: None,
            lifecycle,
            cred_def_id: OnceCell::new(),
            payment_txn: OnceCell::new(),
        })
    }

    /// Serializes the full native state for persistence or transfer.
    pub async fn serialize(&self) -> VcxResult<SerializedForm> {
        self.lifecycle.serialize().await
    }

    /// Retrieves the ledger identifier of this credential definition.
    ///
    /// The first successful lookup is cached; later calls make no native
    /// call.
    ///
    /// # Errors
    /// - `VcxError::Unbound` before create/deserialize or after release
    /// - `VcxError::NativeCall` if the engine lookup fails
    pub async fn get_cred_def_id(&self) -> VcxResult<String> {
        let handle = self.lifecycle.handle(OP_GET_CRED_DEF_ID)?;
        if let Some(id) = self.cred_def_id.get() {
            return Ok(id.clone());
        }

        let id: String = self
            .lifecycle
            .bridge()
            .call(OP_GET_CRED_DEF_ID, |engine, command_handle, cb| {
                engine.credentialdef_get_cred_def_id(command_handle, handle, cb)
            })
            .await?;
        Ok(self.cred_def_id.get_or_init(|| id).clone())
    }

    /// Retrieves the payment transaction receipt of the ledger write.
    ///
    /// Resolves to `None` when the definition was published without a fee.
    /// Cached like [`CredentialDef::get_cred_def_id`].
    pub async fn get_payment_txn(&self) -> VcxResult<Option<String>> {
        let handle = self.lifecycle.handle(OP_GET_PAYMENT_TXN)?;
        if let Some(receipt) = self.payment_txn.get() {
            return Ok(receipt.clone());
        }

        let receipt: Option<String> = self
            .lifecycle
            .bridge()
            .call(OP_GET_PAYMENT_TXN, |engine, command_handle, cb| {
                engine.credentialdef_get_payment_txn(command_handle, handle, cb)
            })
            .await?;
        Ok(self.payment_txn.get_or_init(|| receipt).clone())
    }

    /// Releases the native handle. Safe to call more than once.
    pub fn release(&mut self) {
        self.lifecycle.release();
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }

    /// Ledger identifier if it has already been fetched.
    pub fn cached_cred_def_id(&self) -> Option<&str> {
        self.cred_def_id.get().map(String::as_str)
    }

    /// Live native handle, if any.
    pub fn handle(&self) -> Option<ResourceHandle> {
        match self.lifecycle.state() {
            ResourceState::Bound(handle) => Some(handle),
            ResourceState::Unbound | ResourceState::Released => None,
        }
    }

    pub fn state(&self) -> ResourceState {
        self.lifecycle.state()
    }

    pub fn is_bound(&self) -> bool {
        self.lifecycle.is_bound()
    }
}
