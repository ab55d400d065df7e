//! Synthesis configuration.
//!
//! Every tunable weight the synthesizers read lives here and is handed to the
//! [`Synthesizer`](crate::synth::Synthesizer) explicitly. Nothing is global.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sample rate used throughout the crate.
pub const SAMPLE_RATE: u32 = 44_100;

/// Peak ceiling applied to notes, tracks and the final mix.
pub const HEADROOM: f32 = 0.95;

/// Tunable synthesis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthesisConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Peak ceiling for per-note and per-track limiting.
    pub headroom: f32,
    /// Scales every resonance mode gain (1.0 = as specified).
    pub resonance_depth: f64,
    /// Divisor applied to the piano decay constant while the pedal is down.
    pub pedal_decay_factor: f64,
    /// Oscillator weights for the electronic family.
    pub electronic: ElectronicMix,
    /// Section humanization for the orchestral family.
    pub ensemble: EnsembleConfig,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            headroom: HEADROOM,
            resonance_depth: 1.0,
            pedal_decay_factor: 4.0,
            electronic: ElectronicMix::default(),
            ensemble: EnsembleConfig::default(),
        }
    }
}

impl SynthesisConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: SynthesisConfig = serde_json::from_str(json)?;
        config.sanitize();
        Ok(config)
    }

    /// Clamp fields into the ranges the synthesizers rely on.
    pub fn sanitize(&mut self) {
        if self.sample_rate == 0 {
            self.sample_rate = SAMPLE_RATE;
        }
        if !self.headroom.is_finite() || self.headroom <= 0.0 {
            self.headroom = HEADROOM;
        }
        self.headroom = self.headroom.min(1.0);
        self.resonance_depth = self.resonance_depth.clamp(0.0, 1.0);
        self.pedal_decay_factor = self.pedal_decay_factor.clamp(3.0, 10.0);
        self.ensemble.players = self.ensemble.players.max(1);
    }
}

/// Mix weights for the three electronic oscillators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElectronicMix {
    pub sine: f64,
    pub saw: f64,
    pub sub_square: f64,
    /// Detune of the sawtooth in cents.
    pub saw_detune_cents: f64,
}

impl Default for ElectronicMix {
    fn default() -> Self {
        Self {
            sine: 0.6,
            saw: 0.3,
            sub_square: 0.1,
            saw_detune_cents: 1.0,
        }
    }
}

/// How a simulated section spreads its players.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnsembleConfig {
    /// Players per section when an instrument does not name a section size.
    pub players: usize,
    /// Maximum pitch deviation per player, in cents.
    pub pitch_spread_cents: f64,
    /// Maximum relative velocity deviation per player.
    pub velocity_spread: f64,
    /// Maximum onset delay per player, in seconds.
    pub timing_spread: f64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            players: 6,
            pitch_spread_cents: 8.0,
            velocity_spread: 0.1,
            timing_spread: 0.015,
        }
    }
}
