// src/native/in_memory.rs
//! In-process stand-in for the native credential-definition engine.
//!
//! Behaves like the real engine from the caller's point of view: it issues
//! handles, derives ledger identifiers, serializes state as versioned JSON and
//! fires every completion from a separate OS thread. No ledger is involved.
//!
//! Calls can be scripted to misbehave (refuse, fail, fire twice, fire late,
//! never fire) so the bridge's guarantees can be exercised deterministically.

use crate::bridge::trampoline::{CompletionPayload, Trampoline};
use crate::models::credential_def::{CreateCredentialDefArgs, RevocationDetails};
use crate::models::handle::{CommandHandle, ErrorCode, PaymentHandle, ResourceHandle, SUCCESS};
use crate::native::engine::{
    NativeEngine, OP_CREATE, OP_DESERIALIZE, OP_GET_CRED_DEF_ID, OP_GET_PAYMENT_TXN, OP_RELEASE,
    OP_SERIALIZE,
};
use crate::utils::serialization::{deserialize, serialize};
use log::debug;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// Institution DID used when none is configured.
pub const DEFAULT_INSTITUTION_DID: &str = "2hoqvcwupRTUNkXn6ArYzs";

/// Version tag written into serialized state.
pub const SERIALIZATION_VERSION: &str = "1.0";

pub const INVALID_JSON: ErrorCode = 1016;
pub const INVALID_SCHEMA: ErrorCode = 1031;
pub const INVALID_CREDENTIAL_DEF_HANDLE: ErrorCode = 1036;
pub const SERIALIZATION_ERROR: ErrorCode = 1049;

/// Scripted behaviour for the next call to one entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Return this code immediately; the completion never fires
    RejectImmediately(ErrorCode),
    /// Accept the call, then complete with this error code
    FailCompletion(ErrorCode),
    /// Complete successfully, then fire the same completion again
    CompleteTwice,
    /// Accept the call and keep the completion without ever firing it
    NeverComplete,
    /// Accept the call and discard the completion without firing it
    DropCompletion,
    /// Complete normally, but only after waiting this long
    DelayCompletion(Duration),
}

/// Native state of one credential definition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct CredentialDefRecord {
    source_id: String,
    name: String,
    id: String,
    issuer_did: String,
    tag: String,
    schema_id: String,
    signature_type: String,
    revocation_details: RevocationDetails,
    #[serde(default)]
    payment_txn: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct VersionedRecord {
    version: String,
    data: CredentialDefRecord,
}

#[derive(Default)]
struct EngineState {
    next_handle: u32,
    records: HashMap<u32, CredentialDefRecord>,
    scripts: HashMap<&'static str, VecDeque<Script>>,
    calls: HashMap<&'static str, usize>,
    parked: Vec<Box<dyn Any + Send>>,
}

/// Deterministic, thread-safe implementation of [`NativeEngine`].
pub struct InMemoryEngine {
    institution_did: String,
    state: Mutex<EngineState>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        InMemoryEngine::new(DEFAULT_INSTITUTION_DID)
    }
}

impl InMemoryEngine {
    /// Creates an engine publishing under `institution_did` by default.
    pub fn new(institution_did: &str) -> Self {
        InMemoryEngine {
            institution_did: institution_did.to_string(),
            state: Mutex::new(EngineState {
                next_handle: 1,
                ..EngineState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forces the raw value of the next issued handle.
    pub fn set_next_handle(&self, raw: u32) {
        self.state().next_handle = raw;
    }

    /// Queues a scripted behaviour for the next call to `operation`.
    pub fn script(&self, operation: &'static str, script: Script) {
        self.state()
            .scripts
            .entry(operation)
            .or_default()
            .push_back(script);
    }

    /// Number of times `operation` has been invoked.
    pub fn calls(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or(0)
    }

    /// Total number of native invocations across all entry points.
    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    /// Number of completions held back by [`Script::NeverComplete`].
    pub fn parked_completions(&self) -> usize {
        self.state().parked.len()
    }

    /// Forgets queued scripts and drops parked completions, so a waiting
    /// caller sees the completion as dropped. Records and counters are kept.
    pub fn reset(&self) {
        let mut state = self.state();
        state.scripts.clear();
        state.parked.clear();
    }

    /// Number of credential definitions currently held.
    pub fn live_handles(&self) -> usize {
        self.state().records.len()
    }

    /// Whether `handle` refers to live native state.
    pub fn is_live(&self, handle: ResourceHandle) -> bool {
        self.state().records.contains_key(&handle.raw())
    }

    fn issue_handle(state: &mut EngineState, record: CredentialDefRecord) -> ResourceHandle {
        while state.next_handle == 0 || state.records.contains_key(&state.next_handle) {
            state.next_handle = state.next_handle.wrapping_add(1);
        }
        let raw = state.next_handle;
        state.next_handle = state.next_handle.wrapping_add(1);
        state.records.insert(raw, record);
        ResourceHandle::new(raw)
    }

    fn lookup(state: &EngineState, handle: ResourceHandle) -> Result<&CredentialDefRecord, ErrorCode> {
        state
            .records
            .get(&handle.raw())
            .ok_or(INVALID_CREDENTIAL_DEF_HANDLE)
    }

    /// Runs one completion-style call: applies any script, computes the
    /// result under the state lock and fires the completion on a new thread.
    fn dispatch<P, F>(
        &self,
        operation: &'static str,
        command_handle: CommandHandle,
        cb: Trampoline<P>,
        work: F,
    ) -> ErrorCode
    where
        P: CompletionPayload + Clone,
        F: FnOnce(&mut EngineState) -> Result<P, ErrorCode>,
    {
        let mut state = self.state();
        *state.calls.entry(operation).or_insert(0) += 1;
        let script = state.scripts.get_mut(operation).and_then(VecDeque::pop_front);
        debug!("{} invoked (command handle {}, script {:?})", operation, command_handle, script);

        let outcome = match script {
            Some(Script::RejectImmediately(code)) => return code,
            Some(Script::NeverComplete) => {
                state.parked.push(Box::new(cb));
                return SUCCESS;
            }
            Some(Script::DropCompletion) => return SUCCESS,
            Some(Script::FailCompletion(code)) => Err(code),
            Some(Script::CompleteTwice) | Some(Script::DelayCompletion(_)) | None => {
                work(&mut *state)
            }
        };
        drop(state);

        let fire_twice = script == Some(Script::CompleteTwice);
        let delay = match script {
            Some(Script::DelayCompletion(delay)) => Some(delay),
            _ => None,
        };
        thread::spawn(move || {
            if let Some(delay) = delay {
                thread::sleep(delay);
            }
            let deliveries = if fire_twice { 2 } else { 1 };
            for _ in 0..deliveries {
                match outcome.clone() {
                    Ok(payload) => cb.complete(command_handle, SUCCESS, payload),
                    Err(code) => cb.fail(command_handle, code),
                }
            }
        });
        SUCCESS
    }

    fn payment_receipt(payment_handle: PaymentHandle, cred_def_id: &str) -> Option<String> {
        if payment_handle == 0 {
            return None;
        }
        let receipt = serde_json::json!({
            "amount": 0,
            "credit": false,
            "inputs": [format!("pay:null:{}", payment_handle)],
            "outputs": [],
            "reference": cred_def_id,
        });
        Some(receipt.to_string())
    }
}

impl NativeEngine for InMemoryEngine {
    fn credentialdef_create(
        &self,
        command_handle: CommandHandle,
        args: &CreateCredentialDefArgs<'_>,
        cb: Trampoline<ResourceHandle>,
    ) -> ErrorCode {
        let issuer_did = args.issuer_did.unwrap_or(self.institution_did.as_str()).to_string();
        let source_id = args.source_id.to_string();
        let name = args.name.to_string();
        let schema_id = args.schema_id.to_string();
        let tag = args.tag.to_string();
        let revocation_details = args.revocation_details.clone();
        let payment_handle = args.payment_handle;

        self.dispatch(OP_CREATE, command_handle, cb, move |state| {
            // Schema ids have the form <did>:2:<name>:<version>
            if schema_id.split(':').nth(1) != Some("2") {
                return Err(INVALID_SCHEMA);
            }
            let revocation_details: RevocationDetails =
                deserialize(&revocation_details).map_err(|_| INVALID_JSON)?;
            let id = format!("{}:3:CL:{}:{}", issuer_did, schema_id, tag);
            let record = CredentialDefRecord {
                payment_txn: Self::payment_receipt(payment_handle, &id),
                source_id,
                name,
                id,
                issuer_did,
                tag,
                schema_id,
                signature_type: "CL".to_string(),
                revocation_details,
            };
            Ok(Self::issue_handle(state, record))
        })
    }

    fn credentialdef_get_cred_def_id(
        &self,
        command_handle: CommandHandle,
        handle: ResourceHandle,
        cb: Trampoline<String>,
    ) -> ErrorCode {
        self.dispatch(OP_GET_CRED_DEF_ID, command_handle, cb, move |state| {
            Self::lookup(state, handle).map(|record| record.id.clone())
        })
    }

    fn credentialdef_get_payment_txn(
        &self,
        command_handle: CommandHandle,
        handle: ResourceHandle,
        cb: Trampoline<Option<String>>,
    ) -> ErrorCode {
        self.dispatch(OP_GET_PAYMENT_TXN, command_handle, cb, move |state| {
            Self::lookup(state, handle).map(|record| record.payment_txn.clone())
        })
    }

    fn credentialdef_serialize(
        &self,
        command_handle: CommandHandle,
        handle: ResourceHandle,
        cb: Trampoline<String>,
    ) -> ErrorCode {
        self.dispatch(OP_SERIALIZE, command_handle, cb, move |state| {
            let record = Self::lookup(state, handle)?;
            let versioned = VersionedRecord {
                version: SERIALIZATION_VERSION.to_string(),
                data: record.clone(),
            };
            serialize(&versioned).map_err(|_| SERIALIZATION_ERROR)
        })
    }

    fn credentialdef_deserialize(
        &self,
        command_handle: CommandHandle,
        data: &str,
        cb: Trampoline<ResourceHandle>,
    ) -> ErrorCode {
        let data = data.to_string();
        self.dispatch(OP_DESERIALIZE, command_handle, cb, move |state| {
            let versioned: VersionedRecord = deserialize(&data).map_err(|_| INVALID_JSON)?;
            Ok(Self::issue_handle(state, versioned.data))
        })
    }

    fn credentialdef_release(&self, handle: ResourceHandle) -> ErrorCode {
        let mut state = self.state();
        *state.calls.entry(OP_RELEASE).or_insert(0) += 1;
        if let Some(Script::RejectImmediately(code)) =
            state.scripts.get_mut(OP_RELEASE).and_then(VecDeque::pop_front)
        {
            return code;
        }
        match state.records.remove(&handle.raw()) {
            Some(_) => SUCCESS,
            None => INVALID_CREDENTIAL_DEF_HANDLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ffi_callback::Bridge;
    use std::sync::Arc;

    fn args(payment_handle: PaymentHandle) -> CreateCredentialDefArgs<'static> {
        CreateCredentialDefArgs {
            source_id: "12",
            name: "test-licence",
            schema_id: "2hoqvcwupRTUNkXn6ArYzs:2:test-licence:4.4.4",
            issuer_did: None,
            tag: "tag1",
            revocation_details: r#"{"support_revocation":false}"#.to_string(),
            payment_handle,
        }
    }

    async fn create(bridge: &Bridge, args: &CreateCredentialDefArgs<'_>) -> crate::error::VcxResult<ResourceHandle> {
        bridge
            .call(OP_CREATE, |engine, ch, cb| engine.credentialdef_create(ch, args, cb))
            .await
    }

    #[tokio::test]
    async fn test_cred_def_id_layout() {
        let engine = Arc::new(InMemoryEngine::new("V4SGRU86Z58d6TV7PBUe6f"));
        let bridge = Bridge::new(engine.clone());
        let handle = create(&bridge, &args(0)).await.unwrap();

        let id: String = bridge
            .call(OP_GET_CRED_DEF_ID, |engine, ch, cb| {
                engine.credentialdef_get_cred_def_id(ch, handle, cb)
            })
            .await
            .unwrap();
        assert_eq!(
            id,
            "V4SGRU86Z58d6TV7PBUe6f:3:CL:2hoqvcwupRTUNkXn6ArYzs:2:test-licence:4.4.4:tag1"
        );
    }

    #[tokio::test]
    async fn test_unknown_schema_is_rejected_on_completion() {
        let engine = Arc::new(InMemoryEngine::default());
        let bridge = Bridge::new(engine.clone());
        let mut bad = args(0);
        bad.schema_id = "not-a-schema";

        let err = create(&bridge, &bad).await.unwrap_err();
        assert_eq!(err.native_code(), Some(INVALID_SCHEMA));
        assert_eq!(engine.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_receipt_only_when_a_fee_was_paid() {
        let engine = Arc::new(InMemoryEngine::default());
        let bridge = Bridge::new(engine.clone());
        let free = create(&bridge, &args(0)).await.unwrap();
        let paid = create(&bridge, &args(4)).await.unwrap();

        let receipt = |handle| {
            bridge.call(OP_GET_PAYMENT_TXN, move |engine, ch, cb| {
                engine.credentialdef_get_payment_txn(ch, handle, cb)
            })
        };
        assert_eq!(receipt(free).await.unwrap(), None);
        assert!(receipt(paid).await.unwrap().unwrap().contains("pay:null:4"));
    }

    #[tokio::test]
    async fn test_delayed_completion_still_arrives() {
        let engine = Arc::new(InMemoryEngine::default());
        engine.script(OP_CREATE, Script::DelayCompletion(Duration::from_millis(20)));
        let bridge = Bridge::new(engine.clone());

        let handle = create(&bridge, &args(0)).await.unwrap();
        assert!(engine.is_live(handle));
    }

    #[tokio::test]
    async fn test_reset_drops_parked_completions() {
        let engine = Arc::new(InMemoryEngine::default());
        engine.script(OP_CREATE, Script::NeverComplete);
        engine.script(OP_CREATE, Script::NeverComplete);
        engine.script(OP_CREATE, Script::FailCompletion(1055));
        let bridge = Bridge::new(engine.clone()).with_timeout(Some(Duration::from_millis(20)));

        assert!(create(&bridge, &args(0)).await.is_err());
        assert!(create(&bridge, &args(0)).await.is_err());
        assert_eq!(engine.parked_completions(), 2);

        engine.reset();
        assert_eq!(engine.parked_completions(), 0);
        // The queued failure was forgotten too.
        assert!(create(&bridge, &args(0)).await.is_ok());
        assert_eq!(engine.calls(OP_CREATE), 3);
    }

    #[test]
    fn test_release_unknown_handle() {
        let engine = InMemoryEngine::default();
        assert_eq!(
            engine.credentialdef_release(ResourceHandle::new(99)),
            INVALID_CREDENTIAL_DEF_HANDLE
        );
        assert_eq!(engine.calls(OP_RELEASE), 1);
    }

    #[test]
    fn test_handles_skip_live_values() {
        let engine = InMemoryEngine::default();
        let mut state = engine.state();
        let record: CredentialDefRecord = deserialize(
            r#"{"source_id":"1","name":"n","id":"i","issuer_did":"d","tag":"t","schema_id":"s",
                "signature_type":"CL","revocation_details":{"support_revocation":false}}"#,
        )
        .unwrap();
        let first = InMemoryEngine::issue_handle(&mut state, record.clone());
        state.next_handle = first.raw();
        let second = InMemoryEngine::issue_handle(&mut state, record);
        assert_ne!(first, second);
    }
}
