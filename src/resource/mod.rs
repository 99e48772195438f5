// src/resource/mod.rs
pub mod lifecycle;
