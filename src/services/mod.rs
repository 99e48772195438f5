// src/services/mod.rs
pub mod credential_def;
