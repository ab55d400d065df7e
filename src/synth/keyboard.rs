//! Struck strings: piano and electric piano.
//!
//! Partials fall off as `1/h²`. The hammer envelope decays faster for harder
//! strikes; holding the sustain pedal slows the decay.

use rand_pcg::Pcg32;

use super::additive::{AdditiveNote, partials};
use super::{FamilySynth, Voicing};
use crate::dsp::envelope::EnvelopeShape;
use crate::pattern::Note;

pub struct KeyboardSynth;

impl FamilySynth for KeyboardSynth {
    fn render_note(&self, voicing: &Voicing<'_>, note: &Note, _rng: &mut Pcg32) -> Vec<f32> {
        let spec = voicing.spec;
        let sample_rate = voicing.sample_rate();
        let (_, technique) = spec.technique(note.technique.as_deref());

        let pedal = voicing
            .context
            .sustain_pedal
            .then_some(voicing.config.pedal_decay_factor);
        let envelope = match technique.envelope {
            EnvelopeShape::Percussive { attack, decay } => {
                EnvelopeShape::hammer(attack, decay, note.velocity, pedal)
            }
            other => other,
        };

        let partials = partials(
            note.frequency,
            &technique.harmonics,
            spec.family.rolloff(),
            0.0,
            voicing.harmonic_limit(),
            sample_rate,
        );

        AdditiveNote {
            partials: &partials,
            envelope,
            velocity: note.velocity,
            resonance: &spec.resonance,
            resonance_depth: voicing.config.resonance_depth,
            duration: note.duration,
        }
        .render(voicing.note_len(note.duration), sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisConfig;
    use crate::pattern::Context;
    use crate::registry::InstrumentRegistry;
    use rand::SeedableRng;

    fn tail_energy(context: &Context, velocity: f64) -> f32 {
        let registry = InstrumentRegistry::builtin();
        let config = SynthesisConfig::default();
        let voicing = Voicing {
            spec: registry.spec("piano").unwrap(),
            context,
            config: &config,
        };
        let note = Note::new(261.63, velocity, 0.0, 3.0);
        let out = KeyboardSynth.render_note(&voicing, &note, &mut Pcg32::seed_from_u64(0));
        // normalize out the velocity so only the decay shape is compared
        let tail: f32 = out[88_200..].iter().map(|s| s * s).sum();
        tail / (velocity * velocity) as f32
    }

    #[test]
    fn pedal_lengthens_decay() {
        let dry = Context::default();
        let pedal = Context {
            sustain_pedal: true,
            ..Context::default()
        };
        assert!(tail_energy(&pedal, 0.8) > tail_energy(&dry, 0.8) * 2.0);
    }

    #[test]
    fn harder_strikes_die_sooner() {
        let ctx = Context::default();
        assert!(tail_energy(&ctx, 1.0) < tail_energy(&ctx, 0.3));
    }
}
