// src/bridge/mod.rs
pub mod ffi_callback;
pub mod trampoline;
