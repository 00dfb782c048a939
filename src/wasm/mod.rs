//! WebAssembly bindings for the a2core emulator.
//!
//! This module provides JavaScript-callable interfaces to an assembled machine,
//! enabling browser front ends to drive the CPU, power and interrupt lines.

#[cfg(feature = "wasm")]
pub mod api;

#[cfg(feature = "wasm")]
pub use api::Emulator;
