// src/utils/mod.rs
pub mod error_message;
pub mod serialization;
