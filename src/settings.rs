// src/settings.rs
//! Runtime configuration.
//!
//! Values are layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. An optional `vcx.toml` (or any format the `config` crate detects)
//! 3. `VCX_*` environment variables, e.g. `VCX_BRIDGE_TIMEOUT_SECS=30`
//!
//! `.env` files are picked up by the binary through `dotenv` before loading.

use crate::error::VcxResult;
use crate::models::credential_def::DEFAULT_TAG;
use crate::models::handle::PaymentHandle;
use crate::native::in_memory::DEFAULT_INSTITUTION_DID;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Default configuration file name, without extension.
pub const DEFAULT_CONFIG_FILE: &str = "vcx";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "VCX";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// DID that credential definitions are published under by default
    pub institution_did: String,

    /// Tag given to new credential definitions
    pub cred_def_tag: String,

    /// Upper bound on waiting for a native completion; unset waits forever
    #[serde(default)]
    pub bridge_timeout_secs: Option<u64>,

    /// Payment source charged for ledger writes
    pub payment_handle: PaymentHandle,
}

impl Settings {
    /// Loads settings from defaults, `vcx.*` and the environment.
    pub fn load() -> VcxResult<Self> {
        Self::load_from(Some(DEFAULT_CONFIG_FILE))
    }

    /// Loads settings, reading `file` if given and present.
    ///
    /// # Errors
    /// `VcxError::Config` if a source is unreadable or a value has the wrong
    /// type
    pub fn load_from(file: Option<&str>) -> VcxResult<Self> {
        let mut builder = Config::builder()
            .set_default("institution_did", DEFAULT_INSTITUTION_DID)?
            .set_default("cred_def_tag", DEFAULT_TAG)?
            .set_default("payment_handle", 0)?;
        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Bridge timeout as a `Duration`.
    pub fn bridge_timeout(&self) -> Option<Duration> {
        self.bridge_timeout_secs.map(Duration::from_secs)
    }
}
