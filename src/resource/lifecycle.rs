// src/resource/lifecycle.rs
//! Lifecycle shared by every native-backed object.
//!
//! ```text
//! Unbound --create/deserialize--> Bound --release--> Released
//!                                   |
//!                                   +-- serialize (no state change)
//! ```
//!
//! The lifecycle owns the native handle exclusively. Operations that touch
//! the handle check that the object is bound before any native call is made,
//! and a failed create or deserialize leaves the object unbound.
//!
//! Mutating operations take `&mut self`, so a release can never overlap an
//! in-flight call on the same object. Callers that share one object between
//! tasks must provide their own exclusion.

use crate::bridge::ffi_callback::Bridge;
use crate::bridge::trampoline::Trampoline;
use crate::error::{VcxError, VcxResult};
use crate::models::handle::{CommandHandle, ErrorCode, ResourceHandle, SUCCESS};
use crate::models::serialized::SerializedForm;
use crate::native::engine::NativeEngine;
use log::{debug, warn};
use std::marker::PhantomData;

/// Native entry points a resource kind plugs into the lifecycle.
pub trait NativeResource: Send + Sync + 'static {
    /// Human-readable kind, used in log lines
    const KIND: &'static str;
    const SERIALIZE_OP: &'static str;
    const DESERIALIZE_OP: &'static str;
    const RELEASE_OP: &'static str;

    fn serialize(
        engine: &dyn NativeEngine,
        command_handle: CommandHandle,
        handle: ResourceHandle,
        cb: Trampoline<String>,
    ) -> ErrorCode;

    fn deserialize(
        engine: &dyn NativeEngine,
        command_handle: CommandHandle,
        data: &str,
        cb: Trampoline<ResourceHandle>,
    ) -> ErrorCode;

    fn release(engine: &dyn NativeEngine, handle: ResourceHandle) -> ErrorCode;
}

/// Where an object is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// No native state yet
    Unbound,
    /// Owns a live native handle
    Bound(ResourceHandle),
    /// Handle was released; every further operation fails
    Released,
}

/// Handle ownership and state machine for one native object of kind `K`.
pub struct ResourceLifecycle<K: NativeResource> {
    bridge: Bridge,
    state: ResourceState,
    _kind: PhantomData<K>,
}

impl<K: NativeResource> ResourceLifecycle<K> {
    /// Creates an unbound lifecycle.
    pub fn new(bridge: Bridge) -> Self {
        ResourceLifecycle {
            bridge,
            state: ResourceState::Unbound,
            _kind: PhantomData,
        }
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, ResourceState::Bound(_))
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Returns the live handle, or `Unbound` naming `operation`.
    pub fn handle(&self, operation: &'static str) -> VcxResult<ResourceHandle> {
        match self.state {
            ResourceState::Bound(handle) => Ok(handle),
            ResourceState::Unbound | ResourceState::Released => {
                Err(VcxError::Unbound { operation })
            }
        }
    }

    /// Fails unless the lifecycle can still be created.
    pub fn ensure_unbound(&self, operation: &'static str) -> VcxResult<()> {
        match self.state {
            ResourceState::Unbound => Ok(()),
            ResourceState::Bound(handle) => Err(VcxError::AlreadyBound { handle }),
            ResourceState::Released => Err(VcxError::Released { operation }),
        }
    }

    /// Creates native state through `starter` and takes ownership of the
    /// resulting handle.
    ///
    /// A handle the engine issues after the wait was abandoned (timeout or a
    /// dropped future) is released through `K::release`.
    ///
    /// # Errors
    /// - `AlreadyBound` / `Released` if the lifecycle is not unbound
    /// - Any bridge error; the lifecycle then stays unbound
    pub async fn create<F>(&mut self, operation: &'static str, starter: F) -> VcxResult<ResourceHandle>
    where
        F: FnOnce(&dyn NativeEngine, CommandHandle, Trampoline<ResourceHandle>) -> ErrorCode,
    {
        self.ensure_unbound(operation)?;
        let handle = self.bridge.call_owned(operation, K::release, starter).await?;
        debug!("{} bound to handle {}", K::KIND, handle);
        self.state = ResourceState::Bound(handle);
        Ok(handle)
    }

    /// Serializes the full native state. The handle stays valid.
    pub async fn serialize(&self) -> VcxResult<SerializedForm> {
        let handle = self.handle(K::SERIALIZE_OP)?;
        let data = self
            .bridge
            .call(K::SERIALIZE_OP, |engine, command_handle, cb| {
                K::serialize(engine, command_handle, handle, cb)
            })
            .await?;
        Ok(SerializedForm::new(data))
    }

    /// Rebuilds native state from `data` into a new, bound lifecycle.
    pub async fn deserialize(bridge: Bridge, data: &SerializedForm) -> VcxResult<Self> {
        let mut lifecycle = ResourceLifecycle::new(bridge);
        lifecycle
            .create(K::DESERIALIZE_OP, |engine, command_handle, cb| {
                K::deserialize(engine, command_handle, data.as_str(), cb)
            })
            .await?;
        Ok(lifecycle)
    }

    /// Releases the native handle.
    ///
    /// A no-op when the lifecycle is unbound or already released. The native
    /// release is fire-and-forget: a non-zero status is logged and the handle
    /// is considered gone regardless.
    pub fn release(&mut self) {
        let handle = match self.state {
            ResourceState::Bound(handle) => handle,
            ResourceState::Unbound | ResourceState::Released => return,
        };
        let rc = K::release(self.bridge.engine(), handle);
        if rc != SUCCESS {
            warn!("{} failed for handle {} with code {}", K::RELEASE_OP, handle, rc);
        }
        debug!("{} handle {} released", K::KIND, handle);
        self.state = ResourceState::Released;
    }
}

impl<K: NativeResource> Drop for ResourceLifecycle<K> {
    fn drop(&mut self) {
        if self.is_bound() {
            debug!("{} dropped while bound, releasing", K::KIND);
            self.release();
        }
    }
}
