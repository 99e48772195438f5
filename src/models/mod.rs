// src/models/mod.rs
pub mod credential_def;
pub mod handle;
pub mod serialized;
