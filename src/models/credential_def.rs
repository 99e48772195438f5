// src/models/credential_def.rs
//! Credential definition data model.
//!
//! Defines the parameters a caller supplies to publish a credential
//! definition and the revocation configuration forwarded to the native
//! engine.

use crate::error::{VcxError, VcxResult};
use crate::models::handle::PaymentHandle;
use crate::utils::serialization::serialize;
use serde::{Deserialize, Serialize};

/// Tag used when the caller does not choose one.
pub const DEFAULT_TAG: &str = "tag1";

/// Caller-supplied parameters for publishing a credential definition.
///
/// # Example
/// ```
/// use vcx_credential_def::models::credential_def::CredentialDefDescriptor;
///
/// let descriptor = CredentialDefDescriptor::new(
///     "12",
///     "test-licence",
///     "2hoqvcwupRTUNkXn6ArYzs:2:test-licence:4.4.4",
/// )
/// .with_payment_handle(0);
/// assert!(!descriptor.revocation_enabled);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CredentialDefDescriptor {
    /// Caller-chosen correlation string, must be non-empty
    pub source_id: String,

    /// Human-readable label
    pub name: String,

    /// Identifier of a previously published schema
    /// Example: "2hoqvcwupRTUNkXn6ArYzs:2:test-licence:4.4.4"
    pub schema_id: String,

    /// Whether a revocation registry is provisioned with the definition
    #[serde(default)]
    pub revocation_enabled: bool,

    /// Pre-authorized payment source for the ledger fee.
    /// Required: `None` is rejected before any native call.
    pub payment_handle: Option<PaymentHandle>,

    /// Issuer DID; the engine's institution DID is used when absent
    #[serde(default)]
    pub issuer_did: Option<String>,

    /// Credential definition tag, defaults to [`DEFAULT_TAG`]
    #[serde(default)]
    pub tag: Option<String>,

    /// Location of the revocation tails file (revocation only)
    #[serde(default)]
    pub tails_file: Option<String>,

    /// Capacity of the revocation registry (revocation only)
    #[serde(default)]
    pub max_creds: Option<u32>,
}

impl CredentialDefDescriptor {
    /// Starts a descriptor with revocation disabled and no payment handle.
    pub fn new(source_id: &str, name: &str, schema_id: &str) -> Self {
        CredentialDefDescriptor {
            source_id: source_id.to_string(),
            name: name.to_string(),
            schema_id: schema_id.to_string(),
            revocation_enabled: false,
            payment_handle: None,
            issuer_did: None,
            tag: None,
            tails_file: None,
            max_creds: None,
        }
    }

    pub fn with_payment_handle(mut self, payment_handle: PaymentHandle) -> Self {
        self.payment_handle = Some(payment_handle);
        self
    }

    pub fn with_revocation(mut self, tails_file: Option<&str>, max_creds: Option<u32>) -> Self {
        self.revocation_enabled = true;
        self.tails_file = tails_file.map(str::to_string);
        self.max_creds = max_creds;
        self
    }

    pub fn with_issuer_did(mut self, issuer_did: &str) -> Self {
        self.issuer_did = Some(issuer_did.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    /// Checks every field the native engine requires.
    ///
    /// # Returns
    /// The payment handle to charge, which must be present
    ///
    /// # Errors
    /// `VcxError::InvalidDescriptor` naming the first missing field
    pub fn validate(&self) -> VcxResult<PaymentHandle> {
        let required = [
            ("source_id", &self.source_id),
            ("name", &self.name),
            ("schema_id", &self.schema_id),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(VcxError::InvalidDescriptor(format!("{} must not be empty", field)));
        }
        self.payment_handle
            .ok_or_else(|| VcxError::InvalidDescriptor("payment_handle is required".to_string()))
    }

    /// Tag to publish with, falling back to [`DEFAULT_TAG`].
    pub fn tag_or_default(&self) -> &str {
        self.tag.as_deref().unwrap_or(DEFAULT_TAG)
    }

    /// Revocation configuration derived from this descriptor.
    pub fn revocation_details(&self) -> RevocationDetails {
        if self.revocation_enabled {
            RevocationDetails {
                support_revocation: true,
                tails_file: self.tails_file.clone(),
                max_creds: self.max_creds,
            }
        } else {
            RevocationDetails::disabled()
        }
    }
}

/// Revocation configuration forwarded to the native engine as JSON.
///
/// The engine has no implicit default, so a disabled configuration is always
/// sent explicitly as `{"support_revocation":false}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RevocationDetails {
    pub support_revocation: bool,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tails_file: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_creds: Option<u32>,
}

impl RevocationDetails {
    pub fn disabled() -> Self {
        RevocationDetails {
            support_revocation: false,
            tails_file: None,
            max_creds: None,
        }
    }

    pub fn to_json(&self) -> VcxResult<String> {
        Ok(serialize(self)?)
    }
}

/// Fully resolved arguments of the native create call.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCredentialDefArgs<'a> {
    pub source_id: &'a str,
    pub name: &'a str,
    pub schema_id: &'a str,
    pub issuer_did: Option<&'a str>,
    pub tag: &'a str,
    pub revocation_details: String,
    pub payment_handle: PaymentHandle,
}
