//! Subtractive-style synth voices.
//!
//! Three oscillators (sine at pitch, sawtooth a cent sharp, square an octave
//! below) are mixed at fixed weights. Instead of a real filter, brightness
//! follows the envelope: the output is scaled by `0.2 + 0.8 · env`, so the
//! voice dulls as it decays.

use rand_pcg::Pcg32;

use super::{FamilySynth, Voicing};
use crate::dsp::envelope::patch_envelope;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::pattern::Note;

/// Floor of the envelope-tracking brightness gain.
const MIN_BRIGHTNESS: f64 = 0.2;

pub struct ElectronicSynth;

/// Envelope-tracking gain in [0.2, 1.0].
pub fn brightness(envelope: f64) -> f64 {
    MIN_BRIGHTNESS + (1.0 - MIN_BRIGHTNESS) * envelope.clamp(0.0, 1.0)
}

impl FamilySynth for ElectronicSynth {
    fn render_note(&self, voicing: &Voicing<'_>, note: &Note, _rng: &mut Pcg32) -> Vec<f32> {
        let sample_rate = voicing.sample_rate();
        let mix = voicing.config.electronic;
        let envelope = match note.patch.as_deref() {
            Some(patch) => patch_envelope(patch),
            None => voicing.spec.technique(note.technique.as_deref()).1.envelope,
        };

        let mut sine = Oscillator::new(Waveform::Sine, note.frequency, sample_rate);
        let mut saw = Oscillator::new(Waveform::Sawtooth, note.frequency, sample_rate)
            .detuned(mix.saw_detune_cents);
        let mut sub = Oscillator::new(Waveform::Square, note.frequency / 2.0, sample_rate);

        let weight_sum = mix.sine.abs() + mix.saw.abs() + mix.sub_square.abs();
        let norm = if weight_sum > 1.0 { 1.0 / weight_sum } else { 1.0 };

        let mut out = vec![0.0_f32; voicing.note_len(note.duration)];
        for (i, sample) in out.iter_mut().enumerate() {
            let t = i as f64 / sample_rate;
            let osc = mix.sine * sine.next_sample()
                + mix.saw * saw.next_sample()
                + mix.sub_square * sub.next_sample();
            let env = envelope.value(t, note.duration);
            *sample = (osc * norm * env * brightness(env) * note.velocity) as f32;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisConfig;
    use crate::pattern::Context;
    use crate::registry::InstrumentRegistry;
    use rand::SeedableRng;

    fn render(note: &Note) -> Vec<f32> {
        let registry = InstrumentRegistry::builtin();
        let context = Context::default();
        let config = SynthesisConfig::default();
        let voicing = Voicing {
            spec: registry.spec("synth_lead").unwrap(),
            context: &context,
            config: &config,
        };
        ElectronicSynth.render_note(&voicing, note, &mut Pcg32::seed_from_u64(0))
    }

    #[test]
    fn brightness_tracks_envelope() {
        assert_eq!(brightness(0.0), 0.2);
        assert_eq!(brightness(1.0), 1.0);
        assert!((brightness(0.5) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn patches_shape_the_note() {
        let pad = render(&Note::new(220.0, 0.8, 0.0, 1.0).with_patch("pad"));
        let pluck = render(&Note::new(220.0, 0.8, 0.0, 1.0).with_patch("pluck"));
        let early = |v: &[f32]| v[441..2205].iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
        // pad is still fading in at 50 ms, pluck has already peaked
        assert!(early(&pluck) > early(&pad));
    }

    #[test]
    fn unknown_patch_sounds_like_lead() {
        let lead = render(&Note::new(330.0, 0.8, 0.0, 0.5).with_patch("lead"));
        let odd = render(&Note::new(330.0, 0.8, 0.0, 0.5).with_patch("laser"));
        assert_eq!(lead, odd);
    }

    #[test]
    fn output_bounded_by_velocity() {
        let out = render(&Note::new(110.0, 0.5, 0.0, 1.0));
        assert!(out.iter().all(|s| s.abs() <= 0.5 * 1.05));
        assert!(out.iter().any(|s| s.abs() > 0.05));
    }
}
