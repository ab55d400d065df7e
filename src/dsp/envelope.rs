//! Technique envelopes.
//!
//! Each shape is a closed-form function of time within the note, so the
//! synthesizers can evaluate it per sample without carrying state.

use serde::{Deserialize, Serialize};

/// Decay constant numerator for percussive shapes: `k = DECAY_SCALE / decay`.
/// At `t = attack + decay` the level is `e^-5`, roughly -43 dB.
pub const DECAY_SCALE: f64 = 5.0;

/// Fraction of a sustained note spent releasing when none is specified.
pub const DEFAULT_RELEASE_FRACTION: f64 = 0.3;

/// Amplitude envelope for one playing technique.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EnvelopeShape {
    /// Plucked, slapped or hammered: linear ramp, then exponential decay.
    #[serde(rename_all = "camelCase")]
    Percussive {
        /// Ramp time in seconds.
        attack: f64,
        /// Time in seconds for the level to fall by `e^-DECAY_SCALE`.
        decay: f64,
    },
    /// Bowed, blown or held: linear attack, flat plateau, linear release over
    /// the last `release_fraction` of the note.
    #[serde(rename_all = "camelCase")]
    Sustained {
        attack: f64,
        #[serde(default = "default_release_fraction")]
        release_fraction: f64,
    },
    /// Four-stage synth envelope. Times in seconds, `sustain` is a level.
    Adsr {
        attack: f64,
        decay: f64,
        sustain: f64,
        release: f64,
    },
}

fn default_release_fraction() -> f64 {
    DEFAULT_RELEASE_FRACTION
}

impl EnvelopeShape {
    pub fn percussive(attack: f64, decay: f64) -> Self {
        EnvelopeShape::Percussive { attack, decay }
    }

    pub fn sustained(attack: f64) -> Self {
        EnvelopeShape::Sustained {
            attack,
            release_fraction: DEFAULT_RELEASE_FRACTION,
        }
    }

    pub fn adsr(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        EnvelopeShape::Adsr {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Time at which the envelope first reaches full level.
    pub fn attack_time(&self) -> f64 {
        match *self {
            EnvelopeShape::Percussive { attack, .. }
            | EnvelopeShape::Sustained { attack, .. }
            | EnvelopeShape::Adsr { attack, .. } => attack.max(0.0),
        }
    }

    /// Envelope level at `t` seconds into a note lasting `duration` seconds.
    /// Always in [0, 1].
    pub fn value(&self, t: f64, duration: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        let level = match *self {
            EnvelopeShape::Percussive { attack, decay } => percussive(t, attack, decay),
            EnvelopeShape::Sustained {
                attack,
                release_fraction,
            } => {
                let release =
                    release_window(duration, attack, duration * release_fraction.clamp(0.0, 1.0));
                ramp_up(t, attack).min(ramp_down(t, duration, release))
            }
            EnvelopeShape::Adsr {
                attack,
                decay,
                sustain,
                release,
            } => adsr(t, duration, attack, decay, sustain.clamp(0.0, 1.0), release),
        };
        level.clamp(0.0, 1.0)
    }

    /// Piano hammer envelope: harder strikes decay faster, the sustain pedal
    /// slows the decay by `pedal_factor`.
    pub fn hammer(attack: f64, decay: f64, velocity: f64, pedal_factor: Option<f64>) -> Self {
        let mut k = decay_constant(decay) * (0.5 + velocity.clamp(0.0, 1.0));
        if let Some(factor) = pedal_factor {
            k /= factor.max(1.0);
        }
        EnvelopeShape::Percussive {
            attack,
            decay: DECAY_SCALE / k,
        }
    }
}

/// Named ADSR preset for an electronic patch. Unknown names give `lead`.
pub fn patch_envelope(patch: &str) -> EnvelopeShape {
    match patch {
        "pad" => EnvelopeShape::adsr(0.4, 0.3, 0.7, 0.8),
        "bass" => EnvelopeShape::adsr(0.005, 0.08, 0.9, 0.1),
        "pluck" => EnvelopeShape::adsr(0.002, 0.2, 0.0, 0.05),
        "lead" => EnvelopeShape::adsr(0.01, 0.1, 0.8, 0.2),
        other => {
            log::warn!("unknown synth patch '{other}', using lead");
            EnvelopeShape::adsr(0.01, 0.1, 0.8, 0.2)
        }
    }
}

/// Whether `patch` names a built-in preset.
pub fn is_known_patch(patch: &str) -> bool {
    matches!(patch, "lead" | "pad" | "bass" | "pluck")
}

fn decay_constant(decay: f64) -> f64 {
    if decay > 0.0 {
        DECAY_SCALE / decay
    } else {
        f64::INFINITY
    }
}

fn percussive(t: f64, attack: f64, decay: f64) -> f64 {
    if attack > 0.0 && t < attack {
        return t / attack;
    }
    let k = decay_constant(decay);
    if k.is_infinite() {
        return if t <= attack.max(0.0) { 1.0 } else { 0.0 };
    }
    (-k * (t - attack.max(0.0))).exp()
}

/// Release length that starts no earlier than the end of the attack.
fn release_window(duration: f64, attack: f64, release: f64) -> f64 {
    let release = release.max(0.0).min(duration);
    let start = (duration - release).max(attack.max(0.0));
    (duration - start).max(0.0)
}

fn ramp_up(t: f64, attack: f64) -> f64 {
    if attack <= 0.0 { 1.0 } else { (t / attack).min(1.0) }
}

fn ramp_down(t: f64, duration: f64, release: f64) -> f64 {
    if release <= 0.0 {
        return if t < duration { 1.0 } else { 0.0 };
    }
    ((duration - t) / release).clamp(0.0, 1.0)
}

fn adsr(t: f64, duration: f64, attack: f64, decay: f64, sustain: f64, release: f64) -> f64 {
    let held = |t: f64| -> f64 {
        if attack > 0.0 && t < attack {
            t / attack
        } else if decay > 0.0 && t < attack.max(0.0) + decay {
            1.0 - (1.0 - sustain) * (t - attack.max(0.0)) / decay
        } else {
            sustain
        }
    };
    let release = release_window(duration, attack, release);
    let release_start = duration - release;
    if t < release_start {
        held(t)
    } else if release > 0.0 {
        held(release_start) * (1.0 - (t - release_start) / release)
    } else {
        0.0
    }
}
