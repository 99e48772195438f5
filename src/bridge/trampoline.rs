// src/bridge/trampoline.rs
//! Single-fire completion handed to the native engine.
//!
//! A [`Trampoline`] is the Rust side of a native completion callback. The
//! engine keeps a clone for as long as the call is in flight and fires it,
//! from whatever thread it likes, with `(command_handle, error_code, payload)`.
//! The first matching completion is forwarded to the awaiting caller; any later
//! one is logged and dropped.
//!
//! A successful payload nobody is waiting for anymore goes to the reclaim
//! hook, if one is installed, so that owned resources such as native handles
//! are still released.

use crate::models::handle::{CommandHandle, ErrorCode, ResourceHandle, SUCCESS};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

mod sealed {
    pub trait Sealed {}
    impl Sealed for crate::models::handle::ResourceHandle {}
    impl Sealed for String {}
    impl Sealed for Option<String> {}
    impl Sealed for () {}
}

/// Payload a native completion may carry.
///
/// The set is closed: a handle for create/deserialize, a string for
/// identifiers and serialized state, an optional string for receipts that may
/// legitimately be absent, and nothing at all.
pub trait CompletionPayload: sealed::Sealed + Send + 'static {}

impl CompletionPayload for ResourceHandle {}
impl CompletionPayload for String {}
impl CompletionPayload for Option<String> {}
impl CompletionPayload for () {}

/// What the awaiting side receives: the payload, or the engine's error code.
pub(crate) type Outcome<P> = Result<P, ErrorCode>;

/// Takes ownership of a successful payload nobody is waiting for.
pub(crate) type Reclaim<P> = Box<dyn FnOnce(P) + Send>;

struct Slot<P> {
    command_handle: CommandHandle,
    operation: &'static str,
    fired: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<Outcome<P>>>>,
    reclaim: Mutex<Option<Reclaim<P>>>,
}

impl<P> Slot<P> {
    fn reclaim(&self, payload: P) {
        let reclaim = self
            .reclaim
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reclaim) = reclaim {
            reclaim(payload);
        }
    }
}

/// Native-callable completion for one in-flight call.
pub struct Trampoline<P: CompletionPayload> {
    slot: Arc<Slot<P>>,
}

impl<P: CompletionPayload> Clone for Trampoline<P> {
    fn clone(&self) -> Self {
        Trampoline {
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Awaiting side of a [`Trampoline`].
///
/// Dropping it stops the wait. A success already delivered but not yet
/// received, or delivered afterwards, is passed to the reclaim hook.
pub(crate) struct CompletionReceiver<P: CompletionPayload> {
    receiver: oneshot::Receiver<Outcome<P>>,
    slot: Arc<Slot<P>>,
}

impl<P: CompletionPayload> CompletionReceiver<P> {
    /// Waits for the completion. Fails if the engine dropped every clone of
    /// the trampoline without firing it.
    pub(crate) async fn recv(&mut self) -> Result<Outcome<P>, oneshot::error::RecvError> {
        (&mut self.receiver).await
    }
}

impl<P: CompletionPayload> Drop for CompletionReceiver<P> {
    fn drop(&mut self) {
        self.receiver.close();
        if let Ok(Ok(payload)) = self.receiver.try_recv() {
            debug!(
                "{}: completion for command handle {} was never received",
                self.slot.operation, self.slot.command_handle
            );
            self.slot.reclaim(payload);
        }
    }
}

impl<P: CompletionPayload> Trampoline<P> {
    /// Creates a trampoline and its awaiting side. `reclaim` receives a
    /// success that arrives after the caller stopped waiting.
    pub(crate) fn with_reclaim(
        command_handle: CommandHandle,
        operation: &'static str,
        reclaim: Option<Reclaim<P>>,
    ) -> (Self, CompletionReceiver<P>) {
        let (sender, receiver) = oneshot::channel();
        let slot = Arc::new(Slot {
            command_handle,
            operation,
            fired: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
            reclaim: Mutex::new(reclaim),
        });
        let receiver = CompletionReceiver {
            receiver,
            slot: Arc::clone(&slot),
        };
        (Trampoline { slot }, receiver)
    }

    /// Correlation token this trampoline answers to.
    pub fn command_handle(&self) -> CommandHandle {
        self.slot.command_handle
    }

    /// Whether a completion has already been accepted.
    pub fn has_fired(&self) -> bool {
        self.slot.fired.load(Ordering::Acquire)
    }

    /// Delivers a native completion.
    ///
    /// # Arguments
    /// * `command_handle` - Correlation token echoed by the engine
    /// * `error_code` - `0` on success, native status code otherwise
    /// * `payload` - Result of the call; ignored when `error_code != 0`
    pub fn complete(&self, command_handle: CommandHandle, error_code: ErrorCode, payload: P) {
        let outcome = if error_code == SUCCESS {
            Ok(payload)
        } else {
            Err(error_code)
        };
        self.fire(command_handle, outcome);
    }

    /// Delivers a failed completion without a payload.
    pub fn fail(&self, command_handle: CommandHandle, error_code: ErrorCode) {
        self.fire(command_handle, Err(error_code));
    }

    fn fire(&self, command_handle: CommandHandle, outcome: Outcome<P>) {
        let slot = &self.slot;
        if command_handle != slot.command_handle {
            warn!(
                "{}: completion for command handle {} delivered to trampoline {}, ignoring",
                slot.operation, command_handle, slot.command_handle
            );
            return;
        }
        if slot
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(
                "{}: command handle {} completed more than once, ignoring",
                slot.operation, command_handle
            );
            return;
        }

        let sender = slot
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let unclaimed = match sender {
            Some(sender) => match sender.send(outcome) {
                Ok(()) => return,
                Err(unclaimed) => unclaimed,
            },
            None => outcome,
        };
        debug!(
            "{}: caller stopped waiting for command handle {}",
            slot.operation, command_handle
        );
        if let Ok(payload) = unclaimed {
            slot.reclaim(payload);
        }
    }
}
