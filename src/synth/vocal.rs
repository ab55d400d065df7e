//! Voice family.
//!
//! Vocal synthesis is not implemented: notes render as silence of the right
//! length so arrangements containing a vocal part still line up.

use rand_pcg::Pcg32;

use super::{FamilySynth, Voicing};
use crate::pattern::Note;

pub struct VocalSynth;

impl FamilySynth for VocalSynth {
    fn render_note(&self, voicing: &Voicing<'_>, note: &Note, _rng: &mut Pcg32) -> Vec<f32> {
        log::warn!("{}: vocal synthesis is not implemented, rendering silence", voicing.spec.id);
        vec![0.0; voicing.note_len(note.duration)]
    }
}
