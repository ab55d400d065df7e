//! Body/soundboard resonance.
//!
//! A handful of fixed low-frequency modes modulate the note amplitude around
//! unity: `1 + Σ gain_i · sin(2π · freq_i · t)`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Upper bound for a single mode gain.
pub const MAX_MODE_GAIN: f64 = 0.1;

/// One body mode of an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceMode {
    /// Mode label, e.g. "air" or "top plate".
    pub name: String,
    /// Mode frequency in Hz.
    pub frequency: f64,
    /// Relative gain, at most [`MAX_MODE_GAIN`].
    pub gain: f64,
}

impl ResonanceMode {
    pub fn new(name: &str, frequency: f64, gain: f64) -> Self {
        ResonanceMode {
            name: name.to_string(),
            frequency,
            gain,
        }
    }
}

/// Resonance multiplier at time `t`, with every gain scaled by `depth`.
///
/// The result is clamped to [0, 2] so it can be composed with other
/// multiplicative stages without flipping the sign of the signal.
pub fn multiplier(modes: &[ResonanceMode], t: f64, depth: f64) -> f64 {
    let sum: f64 = modes
        .iter()
        .map(|m| m.gain.clamp(-MAX_MODE_GAIN, MAX_MODE_GAIN) * (2.0 * PI * m.frequency * t).sin())
        .sum();
    (1.0 + depth * sum).clamp(0.0, 2.0)
}

/// Largest value [`multiplier`] can reach for these modes.
pub fn max_multiplier(modes: &[ResonanceMode], depth: f64) -> f64 {
    let sum: f64 = modes
        .iter()
        .map(|m| m.gain.abs().min(MAX_MODE_GAIN))
        .sum();
    (1.0 + depth * sum).min(2.0)
}
