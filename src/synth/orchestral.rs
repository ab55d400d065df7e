//! Orchestral sections.
//!
//! A section is simulated by rendering the note once per player, each with
//! its own small pitch, velocity and onset deviation, and averaging. The
//! deviations come from the caller-seeded generator, so a given seed always
//! produces the same section.

use rand::Rng;
use rand_pcg::Pcg32;

use super::additive::{AdditiveNote, partials};
use super::{FamilySynth, Voicing};
use crate::pattern::Note;

pub struct OrchestralSynth;

/// One player's deviation from the written note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerOffset {
    pub cents: f64,
    pub velocity: f64,
    pub delay: f64,
}

impl PlayerOffset {
    /// Draw a player's deviation within the configured spreads.
    pub fn draw(rng: &mut Pcg32, pitch_spread: f64, velocity_spread: f64, timing_spread: f64) -> Self {
        PlayerOffset {
            cents: rng.random_range(-1.0..=1.0) * pitch_spread,
            velocity: 1.0 + rng.random_range(-1.0..=1.0) * velocity_spread,
            delay: rng.random_range(0.0..=1.0) * timing_spread,
        }
    }
}

impl FamilySynth for OrchestralSynth {
    fn render_note(&self, voicing: &Voicing<'_>, note: &Note, rng: &mut Pcg32) -> Vec<f32> {
        let spec = voicing.spec;
        let sample_rate = voicing.sample_rate();
        let ensemble = voicing.config.ensemble;
        let players = spec.section_size.unwrap_or(ensemble.players).max(1);
        let (_, technique) = spec.technique(note.technique.as_deref());

        let len = voicing.note_len(note.duration);
        let mut section = vec![0.0_f32; len];

        for _ in 0..players {
            let offset = PlayerOffset::draw(
                rng,
                ensemble.pitch_spread_cents,
                ensemble.velocity_spread,
                ensemble.timing_spread,
            );
            let start = voicing.note_len(offset.delay).min(len);
            let frequency = note.frequency * 2f64.powf(offset.cents / 1200.0);
            let partials = partials(
                frequency,
                &technique.harmonics,
                spec.family.rolloff(),
                0.0,
                voicing.harmonic_limit(),
                sample_rate,
            );
            let player = AdditiveNote {
                partials: &partials,
                envelope: technique.envelope,
                velocity: (note.velocity * offset.velocity).clamp(0.0, 1.0),
                resonance: &spec.resonance,
                resonance_depth: voicing.config.resonance_depth,
                duration: (note.duration - offset.delay).max(0.0),
            }
            .render(len - start, sample_rate);

            for (dst, src) in section[start..].iter_mut().zip(&player) {
                *dst += src;
            }
        }

        let scale = 1.0 / players as f32;
        for s in &mut section {
            *s *= scale;
        }
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisConfig;
    use crate::pattern::Context;
    use crate::registry::InstrumentRegistry;
    use rand::SeedableRng;

    #[test]
    fn offsets_stay_within_spread() {
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..1000 {
            let p = PlayerOffset::draw(&mut rng, 8.0, 0.1, 0.015);
            assert!(p.cents.abs() <= 8.0);
            assert!((0.9..=1.1).contains(&p.velocity));
            assert!((0.0..=0.015).contains(&p.delay));
        }
    }

    #[test]
    fn single_player_without_spread_matches_plain_additive() {
        let registry = InstrumentRegistry::builtin();
        let context = Context::default();
        let mut config = SynthesisConfig::default();
        config.ensemble.pitch_spread_cents = 0.0;
        config.ensemble.velocity_spread = 0.0;
        config.ensemble.timing_spread = 0.0;

        let mut spec = registry.spec("woodwinds").unwrap().clone();
        spec.section_size = Some(1);
        let voicing = Voicing {
            spec: &spec,
            context: &context,
            config: &config,
        };
        let note = Note::new(392.0, 0.6, 0.0, 0.4);
        let out = OrchestralSynth.render_note(&voicing, &note, &mut Pcg32::seed_from_u64(1));

        let (_, technique) = spec.technique(None);
        let p = partials(392.0, &technique.harmonics, spec.family.rolloff(), 0.0, Some(8), 44_100.0);
        let plain = AdditiveNote {
            partials: &p,
            envelope: technique.envelope,
            velocity: 0.6,
            resonance: &spec.resonance,
            resonance_depth: 1.0,
            duration: 0.4,
        }
        .render(out.len(), 44_100.0);
        assert_eq!(out, plain);
    }

    #[test]
    fn section_averaging_keeps_level_bounded() {
        let registry = InstrumentRegistry::builtin();
        let context = Context::default();
        let config = SynthesisConfig::default();
        let voicing = Voicing {
            spec: registry.spec("strings_section").unwrap(),
            context: &context,
            config: &config,
        };
        let note = Note::new(220.0, 1.0, 0.0, 1.0);
        let out = OrchestralSynth.render_note(&voicing, &note, &mut Pcg32::seed_from_u64(9));
        assert_eq!(out.len(), 44_100);
        assert!(out.iter().all(|s| s.abs() <= 1.1));
    }
}
