//! Physical-modeling instrument synthesis.
//!
//! Patterns of notes are rendered per instrument by additive harmonic
//! synthesis shaped by technique envelopes and body resonance, then layered
//! by the mixer into one mono buffer at 44.1 kHz. A band-mask isolation
//! engine and a 16-bit WAV codec round out the pipeline.

pub mod config;
pub mod dsp;
pub mod error;
pub mod instrument;
pub mod pattern;
pub mod pcm;
pub mod registry;
pub mod samples;
pub mod spectral;
pub mod synth;

use std::sync::Arc;

use wasm_bindgen::prelude::*;

use crate::dsp::renderer::{self, Arrangement};
use crate::pattern::{Context, TrackPattern};
use crate::registry::InstrumentRegistry;
use crate::synth::Synthesizer;

pub use crate::error::SynthError;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the instrument_synth version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn builtin_synth() -> Synthesizer {
    Synthesizer::new(Arc::new(InstrumentRegistry::builtin()))
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed: list the built-in instrument ids.
#[wasm_bindgen]
pub fn instrument_ids() -> Vec<String> {
    let registry = InstrumentRegistry::builtin();
    let mut ids: Vec<String> = registry.ids().into_iter().map(String::from).collect();
    ids.sort();
    ids
}

/// WASM-exposed: render one instrument track to mono f32 samples.
/// `pattern` is a note/chord array or a drum-part map; `context` may be
/// `undefined` for defaults.
#[wasm_bindgen]
pub fn render_instrument_samples(
    instrument_id: &str,
    pattern: JsValue,
    context: JsValue,
) -> Result<Vec<f32>, JsValue> {
    let pattern: TrackPattern = serde_wasm_bindgen::from_value(pattern).map_err(js_err)?;
    let context: Context = if context.is_undefined() || context.is_null() {
        Context::default()
    } else {
        serde_wasm_bindgen::from_value(context).map_err(js_err)?
    };
    let buffer = builtin_synth()
        .synthesize(instrument_id, &pattern, &context)
        .map_err(js_err)?;
    Ok(buffer.samples)
}

/// WASM-exposed: render a JSON arrangement to a mono 16-bit WAV byte array.
#[wasm_bindgen]
pub fn render_arrangement_wav(arrangement_json: &str) -> Result<Vec<u8>, JsValue> {
    let arrangement = Arrangement::from_json(arrangement_json).map_err(js_err)?;
    renderer::render_wav(&builtin_synth(), &arrangement).map_err(js_err)
}

/// WASM-exposed: isolate `target`'s band from mono samples and return the
/// isolated samples together with the quality score.
#[wasm_bindgen]
pub fn isolate_samples(
    samples: Vec<f32>,
    sample_rate: u32,
    target: &str,
) -> Result<JsValue, JsValue> {
    let buffer = dsp::buffer::SampleBuffer::from_samples(samples, sample_rate);
    let result = spectral::IsolationEngine::new()
        .isolate(&buffer, target)
        .map_err(js_err)?;
    let out = IsolationOutput {
        samples: result.isolated.samples,
        quality: result.quality,
        dominant_pitch: result.dominant_pitch,
    };
    serde_wasm_bindgen::to_value(&out).map_err(js_err)
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct IsolationOutput {
    samples: Vec<f32>,
    quality: spectral::QualityScore,
    dominant_pitch: Option<f64>,
}
