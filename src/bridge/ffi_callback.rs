// src/bridge/ffi_callback.rs
//! Callback-to-future bridge over the native engine.
//!
//! Native entry points accept a completion callback and return an immediate
//! status code; the actual result arrives later, on a thread owned by the
//! engine. [`Bridge::call`] turns that pair into a single `Result` the caller
//! can `.await`.
//!
//! # Guarantees
//! - A non-zero immediate status fails the call without waiting
//! - At most one completion is delivered per call
//! - Every in-flight call is registered under its command handle until it
//!   completes or the caller stops waiting
//!
//! # Cancellation
//! There is none. Dropping the returned future or timing out only stops the
//! wait: the native side effect (e.g. a ledger write) still happens. A late
//! completion is discarded, except that a handle issued by a call made through
//! [`Bridge::call_owned`] is released so it never outlives its owner.

use crate::bridge::trampoline::{CompletionPayload, Reclaim, Trampoline};
use crate::error::{NativeCallError, VcxError, VcxResult};
use crate::models::handle::{CommandHandle, ErrorCode, ResourceHandle, SUCCESS};
use crate::native::engine::NativeEngine;
use crate::settings::Settings;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Registry of calls waiting on a native completion.
#[derive(Default)]
struct PendingCommands {
    next: AtomicU32,
    in_flight: Mutex<HashMap<CommandHandle, &'static str>>,
}

impl PendingCommands {
    fn in_flight(&self) -> MutexGuard<'_, HashMap<CommandHandle, &'static str>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves a fresh, non-zero command handle for `operation`.
    fn register(&self, operation: &'static str) -> Registration<'_> {
        let mut in_flight = self.in_flight();
        let command_handle = loop {
            let candidate = self.next.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if candidate != 0 && !in_flight.contains_key(&candidate) {
                break candidate;
            }
        };
        in_flight.insert(command_handle, operation);
        Registration {
            pending: self,
            command_handle,
        }
    }
}

/// Keeps a command handle registered for as long as its call is awaited.
struct Registration<'a> {
    pending: &'a PendingCommands,
    command_handle: CommandHandle,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.pending.in_flight().remove(&self.command_handle);
    }
}

/// Adapter between callback-style native calls and `async` callers.
///
/// Cloning is cheap; clones share the engine and the pending-call registry.
#[derive(Clone)]
pub struct Bridge {
    engine: Arc<dyn NativeEngine>,
    pending: Arc<PendingCommands>,
    timeout: Option<Duration>,
}

impl Bridge {
    /// Creates a bridge that waits indefinitely for completions.
    pub fn new(engine: Arc<dyn NativeEngine>) -> Self {
        Bridge {
            engine,
            pending: Arc::new(PendingCommands::default()),
            timeout: None,
        }
    }

    /// Creates a bridge using the timeout configured in `settings`.
    pub fn from_settings(engine: Arc<dyn NativeEngine>, settings: &Settings) -> Self {
        Bridge::new(engine).with_timeout(settings.bridge_timeout())
    }

    /// Bounds every wait on a native completion. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Engine this bridge drives, for calls that take no completion.
    pub fn engine(&self) -> &dyn NativeEngine {
        self.engine.as_ref()
    }

    /// Number of calls currently waiting on a completion.
    pub fn pending_calls(&self) -> usize {
        self.pending.in_flight().len()
    }

    /// Issues a native call and waits for its completion.
    ///
    /// # Arguments
    /// * `operation` - Native entry point name, used in errors and logs
    /// * `starter` - Issues the call with the given command handle and
    ///   trampoline and returns the engine's immediate status code
    ///
    /// # Returns
    /// The completion payload when the engine reports success
    ///
    /// # Errors
    /// - `VcxError::NativeCall` for a non-zero immediate or completion code
    /// - `VcxError::Timeout` if a timeout is configured and elapses
    /// - `VcxError::CompletionDropped` if the engine discards the trampoline
    ///   without firing it
    pub async fn call<P, F>(&self, operation: &'static str, starter: F) -> VcxResult<P>
    where
        P: CompletionPayload,
        F: FnOnce(&dyn NativeEngine, CommandHandle, Trampoline<P>) -> ErrorCode,
    {
        self.dispatch(operation, None, starter).await
    }

    /// Issues a native call that completes with a newly issued handle.
    ///
    /// Behaves like [`Bridge::call`]. If the handle arrives after the caller
    /// stopped waiting, it is passed to `release` instead of being leaked.
    ///
    /// # Arguments
    /// * `operation` - Native entry point name, used in errors and logs
    /// * `release` - Native release entry point for the issued handle
    /// * `starter` - Issues the call, as for [`Bridge::call`]
    pub async fn call_owned<F>(
        &self,
        operation: &'static str,
        release: fn(&dyn NativeEngine, ResourceHandle) -> ErrorCode,
        starter: F,
    ) -> VcxResult<ResourceHandle>
    where
        F: FnOnce(&dyn NativeEngine, CommandHandle, Trampoline<ResourceHandle>) -> ErrorCode,
    {
        let engine = Arc::clone(&self.engine);
        let reclaim: Reclaim<ResourceHandle> = Box::new(move |handle| {
            let rc = release(engine.as_ref(), handle);
            warn!(
                "{}: handle {} arrived after the caller stopped waiting, released it (code {})",
                operation, handle, rc
            );
        });
        self.dispatch(operation, Some(reclaim), starter).await
    }

    async fn dispatch<P, F>(
        &self,
        operation: &'static str,
        reclaim: Option<Reclaim<P>>,
        starter: F,
    ) -> VcxResult<P>
    where
        P: CompletionPayload,
        F: FnOnce(&dyn NativeEngine, CommandHandle, Trampoline<P>) -> ErrorCode,
    {
        let registration = self.pending.register(operation);
        let command_handle = registration.command_handle;
        let (trampoline, mut receiver) = Trampoline::with_reclaim(command_handle, operation, reclaim);

        debug!("{}: issuing native call (command handle {})", operation, command_handle);
        let rc = starter(self.engine.as_ref(), command_handle, trampoline);
        if rc != SUCCESS {
            warn!("{}: native engine refused the call with code {}", operation, rc);
            return Err(NativeCallError::new(operation, rc).into());
        }

        let received = match self.timeout {
            Some(after) => tokio::time::timeout(after, receiver.recv())
                .await
                .map_err(|_| VcxError::Timeout { operation, after })?,
            None => receiver.recv().await,
        };
        drop(registration);

        match received {
            Ok(Ok(payload)) => {
                debug!("{}: completed (command handle {})", operation, command_handle);
                Ok(payload)
            }
            Ok(Err(code)) => {
                warn!("{}: native completion reported code {}", operation, code);
                Err(NativeCallError::new(operation, code).into())
            }
            Err(_) => Err(VcxError::CompletionDropped { operation }),
        }
    }
}
