//! Additive harmonic summation shared by the acoustic families.

use std::f64::consts::PI;

use crate::dsp::envelope::EnvelopeShape;
use crate::dsp::resonance::{self, ResonanceMode};
use crate::instrument::Rolloff;

/// One sinusoidal component of a note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    pub frequency: f64,
    pub amplitude: f64,
}

/// Build the partials for `fundamental` from a harmonic series.
///
/// Partial `h` sits at `f·h·(1 + B·h²)` with relative amplitude from
/// `rolloff`. Partials at or above Nyquist are dropped, at most `limit` are
/// kept, and the amplitudes are normalized to sum to 1 so the summed wave
/// never exceeds unity.
pub fn partials(
    fundamental: f64,
    harmonics: &[u32],
    rolloff: Rolloff,
    inharmonicity: f64,
    limit: Option<usize>,
    sample_rate: f64,
) -> Vec<Partial> {
    let nyquist = sample_rate / 2.0;
    let mut out: Vec<Partial> = harmonics
        .iter()
        .map(|&h| {
            let hf = h as f64;
            Partial {
                frequency: fundamental * hf * (1.0 + inharmonicity * hf * hf),
                amplitude: rolloff.amplitude(h),
            }
        })
        .filter(|p| p.frequency < nyquist)
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    let total: f64 = out.iter().map(|p| p.amplitude).sum();
    if total > 0.0 {
        for p in &mut out {
            p.amplitude /= total;
        }
    }
    out
}

/// Sum of all partials at time `t`.
#[inline]
pub fn sum_partials(partials: &[Partial], t: f64) -> f64 {
    partials
        .iter()
        .map(|p| p.amplitude * (2.0 * PI * p.frequency * t).sin())
        .sum()
}

/// Everything needed to render one additive note.
pub struct AdditiveNote<'a> {
    pub partials: &'a [Partial],
    pub envelope: EnvelopeShape,
    pub velocity: f64,
    pub resonance: &'a [ResonanceMode],
    pub resonance_depth: f64,
    pub duration: f64,
}

impl AdditiveNote<'_> {
    /// Render `len` samples: partials × envelope × velocity × resonance.
    pub fn render(&self, len: usize, sample_rate: f64) -> Vec<f32> {
        let mut out = vec![0.0_f32; len];
        if self.partials.is_empty() {
            return out;
        }
        for (i, sample) in out.iter_mut().enumerate() {
            let t = i as f64 / sample_rate;
            let env = self.envelope.value(t, self.duration);
            if env == 0.0 {
                continue;
            }
            let body = resonance::multiplier(self.resonance, t, self.resonance_depth);
            *sample = (sum_partials(self.partials, t) * env * self.velocity * body) as f32;
        }
        out
    }
}
