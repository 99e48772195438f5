// tests/credential_def_lifecycle.rs
//! End-to-end lifecycle of a credential definition against the in-memory
//! engine, with completions arriving on engine-owned threads.

use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use vcx_credential_def::bridge::ffi_callback::Bridge;
use vcx_credential_def::error::{NativeCallError, VcxError};
use vcx_credential_def::models::credential_def::CredentialDefDescriptor;
use vcx_credential_def::models::handle::ResourceHandle;
use vcx_credential_def::native::engine::{
    OP_CREATE, OP_DESERIALIZE, OP_GET_CRED_DEF_ID, OP_GET_PAYMENT_TXN, OP_RELEASE, OP_SERIALIZE,
};
use vcx_credential_def::native::in_memory::{InMemoryEngine, Script};
use vcx_credential_def::resource::lifecycle::ResourceState;
use vcx_credential_def::services::credential_def::CredentialDef;

const SCHEMA_ID: &str = "2hoqvcwupRTUNkXn6ArYzs:2:test-licence:4.4.4";

fn licence() -> CredentialDefDescriptor {
    CredentialDefDescriptor::new("12", "test-licence", SCHEMA_ID).with_payment_handle(0)
}

fn setup() -> (Arc<InMemoryEngine>, Bridge) {
    let _ = env_logger::builder().is_test(true).try_init();
    let engine = Arc::new(InMemoryEngine::default());
    let bridge = Bridge::new(engine.clone());
    (engine, bridge)
}

#[tokio::test]
async fn create_binds_to_the_issued_handle() {
    let (engine, bridge) = setup();
    engine.set_next_handle(7);

    let cred_def = assert_ok!(CredentialDef::create(&bridge, licence()).await);
    assert!(cred_def.is_bound());
    assert_eq!(cred_def.handle(), Some(ResourceHandle::new(7)));
    assert_eq!(cred_def.schema_id(), Some(SCHEMA_ID));
}

#[tokio::test]
async fn rejected_ledger_write_leaves_object_unbound() {
    let (engine, bridge) = setup();
    engine.script(OP_CREATE, Script::FailCompletion(1055));

    let mut cred_def = assert_ok!(CredentialDef::new(&bridge, licence()));
    let err = assert_err!(cred_def.publish().await);
    match err {
        VcxError::Creation { source_id, source } => {
            assert_eq!(source_id, "12");
            assert_eq!(source, NativeCallError::new(OP_CREATE, 1055));
        }
        other => panic!("expected a creation error, got {:?}", other),
    }
    assert_eq!(cred_def.state(), ResourceState::Unbound);
    assert_eq!(cred_def.handle(), None);
    assert_eq!(engine.live_handles(), 0);
}

#[tokio::test]
async fn invalid_descriptor_never_reaches_the_engine() {
    let (engine, bridge) = setup();

    let mut no_payment = licence();
    no_payment.payment_handle = None;
    let err = CredentialDef::create(&bridge, no_payment).await.err();
    assert!(matches!(err, Some(VcxError::InvalidDescriptor(_))));

    let mut no_schema = licence();
    no_schema.schema_id = String::new();
    let err = CredentialDef::create(&bridge, no_schema).await.err();
    assert!(matches!(err, Some(VcxError::InvalidDescriptor(_))));

    assert_eq!(engine.total_calls(), 0);
}

#[tokio::test]
async fn accessors_fail_after_release() {
    let (engine, bridge) = setup();
    let mut cred_def = assert_ok!(CredentialDef::create(&bridge, licence()).await);

    cred_def.release();
    assert_eq!(cred_def.state(), ResourceState::Released);
    let calls_after_release = engine.total_calls();

    assert!(matches!(cred_def.get_cred_def_id().await, Err(VcxError::Unbound { .. })));
    assert!(matches!(cred_def.get_payment_txn().await, Err(VcxError::Unbound { .. })));
    assert!(matches!(cred_def.serialize().await, Err(VcxError::Unbound { .. })));
    assert_eq!(engine.total_calls(), calls_after_release);
}

#[tokio::test]
async fn release_twice_is_a_no_op() {
    let (engine, bridge) = setup();
    let mut cred_def = assert_ok!(CredentialDef::create(&bridge, licence()).await);

    cred_def.release();
    cred_def.release();
    assert_eq!(cred_def.state(), ResourceState::Released);
    assert_eq!(engine.live_handles(), 0);
}

#[tokio::test]
async fn cred_def_id_is_fetched_once() {
    let (engine, bridge) = setup();
    let cred_def = assert_ok!(CredentialDef::create(&bridge, licence()).await);

    let first = assert_ok!(cred_def.get_cred_def_id().await);
    let second = assert_ok!(cred_def.get_cred_def_id().await);
    assert_eq!(first, second);
    assert_eq!(cred_def.cached_cred_def_id(), Some(first.as_str()));
    assert_eq!(engine.calls(OP_GET_CRED_DEF_ID), 1);
}

#[tokio::test]
async fn accessor_on_unbound_object_makes_no_native_call() {
    let (engine, bridge) = setup();
    let cred_def = assert_ok!(CredentialDef::new(&bridge, licence()));

    let err = assert_err!(cred_def.get_cred_def_id().await);
    assert!(matches!(err, VcxError::Unbound { operation: OP_GET_CRED_DEF_ID }));
    assert_eq!(engine.total_calls(), 0);
}

#[tokio::test]
async fn serialize_round_trip_drops_schema_id() {
    let (engine, bridge) = setup();
    let original = assert_ok!(CredentialDef::create(&bridge, licence()).await);
    let original_id = assert_ok!(original.get_cred_def_id().await);

    let data = assert_ok!(original.serialize().await);
    let restored = assert_ok!(CredentialDef::deserialize(&bridge, &data).await);

    assert_eq!(restored.source_id(), original.source_id());
    assert_eq!(restored.name(), original.name());
    assert_eq!(assert_ok!(restored.get_cred_def_id().await), original_id);

    // The wrapper does not read the schema back: it stays unknown rather
    // than matching the original.
    assert_eq!(original.schema_id(), Some(SCHEMA_ID));
    assert_eq!(restored.schema_id(), None);

    assert_eq!(engine.calls(OP_SERIALIZE), 1);
    assert_eq!(engine.calls(OP_DESERIALIZE), 1);
    assert!(original.is_bound());
}

#[tokio::test]
async fn serialized_form_can_be_restored_by_another_engine() {
    let (_engine, bridge) = setup();
    let original = assert_ok!(CredentialDef::create(&bridge, licence()).await);
    let data = assert_ok!(original.serialize().await);

    let other_engine = Arc::new(InMemoryEngine::new("V4SGRU86Z58d6TV7PBUe6f"));
    let other_bridge = Bridge::new(other_engine.clone());
    let restored = assert_ok!(CredentialDef::deserialize(&other_bridge, &data).await);

    assert_eq!(
        assert_ok!(restored.get_cred_def_id().await),
        assert_ok!(original.get_cred_def_id().await)
    );
    assert_eq!(other_engine.live_handles(), 1);
}

#[tokio::test]
async fn engine_rejecting_serialized_data_is_reported() {
    let (engine, bridge) = setup();
    let cred_def = assert_ok!(CredentialDef::create(&bridge, licence()).await);
    let data = assert_ok!(cred_def.serialize().await);
    engine.script(OP_DESERIALIZE, Script::FailCompletion(1016));

    let err = CredentialDef::deserialize(&bridge, &data).await.err();
    assert!(matches!(
        err,
        Some(VcxError::NativeCall(NativeCallError { operation: OP_DESERIALIZE, code: 1016 }))
    ));
}

#[tokio::test]
async fn dropping_the_object_releases_native_state() {
    let (engine, bridge) = setup();
    {
        let _cred_def = assert_ok!(CredentialDef::create(&bridge, licence()).await);
        assert_eq!(engine.live_handles(), 1);
    }
    assert_eq!(engine.live_handles(), 0);
}

#[tokio::test]
async fn hung_completion_times_out_with_operation_name() {
    let (engine, _bridge) = setup();
    let bridge = Bridge::new(engine.clone()).with_timeout(Some(Duration::from_millis(50)));
    let cred_def = assert_ok!(CredentialDef::create(&bridge, licence()).await);
    engine.script(OP_GET_PAYMENT_TXN, Script::NeverComplete);

    let err = assert_err!(cred_def.get_payment_txn().await);
    assert!(matches!(err, VcxError::Timeout { operation: OP_GET_PAYMENT_TXN, .. }));
    assert_eq!(bridge.pending_calls(), 0);
}

/// Polls until the engine has seen a release, or gives up.
async fn wait_for_release(engine: &InMemoryEngine) {
    for _ in 0..200 {
        if engine.calls(OP_RELEASE) > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn handle_issued_after_a_timed_out_create_is_released() {
    let (engine, _bridge) = setup();
    let bridge = Bridge::new(engine.clone()).with_timeout(Some(Duration::from_millis(50)));
    engine.script(OP_CREATE, Script::DelayCompletion(Duration::from_millis(200)));

    let err = CredentialDef::create(&bridge, licence()).await.err();
    assert!(matches!(err, Some(VcxError::Timeout { operation: OP_CREATE, .. })));
    assert_eq!(bridge.pending_calls(), 0);

    // The engine finishes the write after the caller gave up.
    wait_for_release(&engine).await;
    assert_eq!(engine.calls(OP_RELEASE), 1);
    assert_eq!(engine.live_handles(), 0);
}

#[tokio::test]
async fn handle_issued_after_a_timed_out_restore_is_released() {
    let (engine, _bridge) = setup();
    let bridge = Bridge::new(engine.clone()).with_timeout(Some(Duration::from_millis(50)));
    let original = assert_ok!(CredentialDef::create(&bridge, licence()).await);
    let data = assert_ok!(original.serialize().await);
    engine.script(OP_DESERIALIZE, Script::DelayCompletion(Duration::from_millis(200)));

    let err = CredentialDef::deserialize(&bridge, &data).await.err();
    assert!(matches!(err, Some(VcxError::Timeout { operation: OP_DESERIALIZE, .. })));

    wait_for_release(&engine).await;
    assert_eq!(engine.calls(OP_RELEASE), 1);
    assert_eq!(engine.live_handles(), 1);
    assert!(engine.is_live(original.handle().unwrap()));
}
