// src/lib.rs

//! # VCX Credential Definition
//!
//! Async Rust handle to a native credential-definition engine used in a
//! decentralized identity system.
//!
//! ## Architecture Overview
//! 1. **Models**: native handles, creation descriptors, serialized state
//! 2. **Bridge**: turns one-shot native completions into awaitable results
//! 3. **Resource Layer**: create/serialize/deserialize/release state machine
//! 4. **Services**: the credential definition object itself
//! 5. **Native Layer**: the engine boundary and an in-memory engine

pub mod bridge;     // Callback-to-future adapter
pub mod error;      // Error taxonomy
pub mod models;     // Data structures
pub mod native;     // Native engine boundary
pub mod resource;   // Shared lifecycle of native-backed objects
pub mod services;   // Credential definition
pub mod settings;   // Layered configuration
pub mod utils;      // Helper functions
