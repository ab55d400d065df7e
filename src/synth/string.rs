//! Plucked and bowed strings.
//!
//! Stiff-string partials (`f·h·(1 + B·h²)`) with a `1/√h` series, shaped by
//! the technique envelope and the body modes of the instrument.

use rand_pcg::Pcg32;

use super::additive::{AdditiveNote, partials};
use super::{FamilySynth, Voicing};
use crate::pattern::Note;

pub struct StringSynth;

impl FamilySynth for StringSynth {
    fn render_note(&self, voicing: &Voicing<'_>, note: &Note, _rng: &mut Pcg32) -> Vec<f32> {
        let spec = voicing.spec;
        let sample_rate = voicing.sample_rate();
        let (_, technique) = spec.technique(note.technique.as_deref());

        let partials = partials(
            note.frequency,
            &technique.harmonics,
            spec.family.rolloff(),
            spec.inharmonicity(),
            voicing.harmonic_limit(),
            sample_rate,
        );

        AdditiveNote {
            partials: &partials,
            envelope: technique.envelope,
            velocity: note.velocity,
            resonance: &spec.resonance,
            resonance_depth: voicing.config.resonance_depth,
            duration: note.duration,
        }
        .render(voicing.note_len(note.duration), sample_rate)
    }
}
