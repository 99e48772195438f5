// src/main.rs

//! # VCX Credential Definition - Demo Entry Point
//!
//! Walks one credential definition through its whole lifecycle against the
//! in-memory engine: publish, query, serialize, release, restore.
//!
//! ## Environment Variables
//! - `RUST_LOG`: log filter for `env_logger` (e.g. `debug`)
//! - `VCX_INSTITUTION_DID`: (Optional) issuer DID
//! - `VCX_CRED_DEF_TAG`: (Optional) credential definition tag (default: tag1)
//! - `VCX_BRIDGE_TIMEOUT_SECS`: (Optional) bound on native completions
//! - `VCX_PAYMENT_HANDLE`: (Optional) payment source (default: 0, no fee)

use anyhow::Context;
use dotenv::dotenv;
use log::info;
use std::sync::Arc;
use vcx_credential_def::bridge::ffi_callback::Bridge;
use vcx_credential_def::models::credential_def::CredentialDefDescriptor;
use vcx_credential_def::native::in_memory::InMemoryEngine;
use vcx_credential_def::services::credential_def::CredentialDef;
use vcx_credential_def::settings::Settings;

const SOURCE_ID: &str = "12";
const NAME: &str = "test-licence";
const SCHEMA_ID: &str = "2hoqvcwupRTUNkXn6ArYzs:2:test-licence:4.4.4";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let settings = Settings::load().context("failed to load settings")?;
    info!("using institution DID {}", settings.institution_did);

    let engine = Arc::new(InMemoryEngine::new(&settings.institution_did));
    let bridge = Bridge::from_settings(engine, &settings);

    let descriptor = CredentialDefDescriptor::new(SOURCE_ID, NAME, SCHEMA_ID)
        .with_tag(&settings.cred_def_tag)
        .with_payment_handle(settings.payment_handle);

    let mut cred_def = CredentialDef::create(&bridge, descriptor)
        .await
        .context("failed to publish credential definition")?;
    println!("Credential definition id: {}", cred_def.get_cred_def_id().await?);
    match cred_def.get_payment_txn().await? {
        Some(receipt) => println!("Payment receipt: {}", receipt),
        None => println!("Payment receipt: none (no fee)"),
    }

    let serialized = cred_def.serialize().await?;
    println!("Serialized: {}", serialized);
    cred_def.release();

    let mut restored = CredentialDef::deserialize(&bridge, &serialized)
        .await
        .context("failed to restore credential definition")?;
    println!(
        "Restored '{}' with id {} (schema id known: {})",
        restored.name(),
        restored.get_cred_def_id().await?,
        restored.schema_id().is_some()
    );
    restored.release();

    Ok(())
}
