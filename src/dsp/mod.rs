//! DSP building blocks shared by the synthesizers, the mixer and the
//! renderer.
//!
//! All DSP runs in Rust for deterministic output: the same code powers the
//! WASM bindings and offline WAV export.

pub mod buffer;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
pub mod resonance;
