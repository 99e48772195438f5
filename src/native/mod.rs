// src/native/mod.rs
pub mod engine;
pub mod in_memory;
