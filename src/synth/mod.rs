//! Per-family synthesizers and the track driver.
//!
//! [`Synthesizer::synthesize`] resolves an instrument id, picks the family
//! implementation in [`family_synth`] (the single dispatch point), renders
//! every note of the pattern and overlays the results into one track.
//! Percussion goes to a [`DrumSynthesizer`] instead.

pub mod additive;
pub mod drums;
pub mod electronic;
pub mod keyboard;
pub mod orchestral;
pub mod string;
pub mod vocal;

use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::config::SynthesisConfig;
use crate::dsp::buffer::{SampleBuffer, samples_for};
use crate::error::{Result, SynthError};
use crate::instrument::{Family, InstrumentSpec};
use crate::pattern::{Context, Note, Pattern, TrackPattern};
use crate::registry::{InstrumentRegistry, is_percussion_id};

pub use drums::{DrumSynthesizer, ProceduralDrums};

/// Read-only inputs shared by every note of one synthesis call.
pub struct Voicing<'a> {
    pub spec: &'a InstrumentSpec,
    pub context: &'a Context,
    pub config: &'a SynthesisConfig,
}

impl Voicing<'_> {
    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate as f64
    }

    /// Maximum number of partials summed per note at this quality.
    pub fn harmonic_limit(&self) -> Option<usize> {
        self.context.quality.max_harmonics()
    }

    /// Samples in a note of `duration` seconds.
    pub fn note_len(&self, duration: f64) -> usize {
        samples_for(duration, self.config.sample_rate)
    }
}

/// One family's synthesis algorithm.
pub trait FamilySynth: Sync {
    /// Render a validated note into a fresh buffer of
    /// `round(note.duration × sample_rate)` samples.
    fn render_note(&self, voicing: &Voicing<'_>, note: &Note, rng: &mut Pcg32) -> Vec<f32>;
}

/// The synthesizer for a family, or `None` if the family is not synthesized
/// here (percussion and unrecognized tags).
pub fn family_synth(family: &Family) -> Option<&'static dyn FamilySynth> {
    match family {
        Family::Strings => Some(&string::StringSynth),
        Family::Keyboard => Some(&keyboard::KeyboardSynth),
        Family::Electronic => Some(&electronic::ElectronicSynth),
        Family::Orchestral => Some(&orchestral::OrchestralSynth),
        Family::Voice => Some(&vocal::VocalSynth),
        Family::Percussion | Family::Other(_) => None,
    }
}

/// Deterministic per-call seed: the caller's seed mixed with the instrument
/// id so parts of one arrangement get independent streams.
pub fn call_seed(seed: u64, instrument_id: &str) -> u64 {
    // FNV-1a over the id, folded into the caller seed
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in instrument_id.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    seed ^ hash
}

/// Turns patterns into instrument tracks.
pub struct Synthesizer<D = ProceduralDrums> {
    registry: Arc<InstrumentRegistry>,
    config: SynthesisConfig,
    drums: D,
}

impl Synthesizer {
    /// A synthesizer with default configuration and procedural drums.
    pub fn new(registry: Arc<InstrumentRegistry>) -> Self {
        Self::with_config(registry, SynthesisConfig::default())
    }

    pub fn with_config(registry: Arc<InstrumentRegistry>, mut config: SynthesisConfig) -> Self {
        config.sanitize();
        let drums = ProceduralDrums::new(config.sample_rate, config.headroom);
        Synthesizer {
            registry,
            config,
            drums,
        }
    }
}

impl<D: DrumSynthesizer> Synthesizer<D> {
    /// A synthesizer that hands percussion to a custom drum collaborator.
    pub fn with_drums(registry: Arc<InstrumentRegistry>, mut config: SynthesisConfig, drums: D) -> Self {
        config.sanitize();
        Synthesizer {
            registry,
            config,
            drums,
        }
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    fn is_percussion(&self, instrument_id: &str) -> bool {
        is_percussion_id(instrument_id)
            || matches!(self.registry.spec(instrument_id), Ok(spec) if spec.family == Family::Percussion)
    }

    /// Render a full track for one instrument.
    ///
    /// The track lasts `context.duration` seconds (or until the last note
    /// ends when the context gives no duration) and its peak never exceeds
    /// the configured headroom.
    pub fn synthesize(
        &self,
        instrument_id: &str,
        pattern: &TrackPattern,
        context: &Context,
    ) -> Result<SampleBuffer> {
        context.validate()?;
        if self.is_percussion(instrument_id) {
            return match pattern {
                TrackPattern::Drums(drums) => {
                    log::debug!("{instrument_id}: routing {} drum parts", drums.parts.len());
                    Ok(self.drums.synthesize_drums(instrument_id, drums, context))
                }
                TrackPattern::Melodic(_) => Err(SynthError::PatternMismatch {
                    instrument: instrument_id.to_string(),
                    expected: "drum",
                }),
            };
        }

        let (spec, synth) = self.resolve(instrument_id)?;
        match pattern {
            TrackPattern::Melodic(pattern) => self.render_pattern(spec, synth, pattern, context),
            TrackPattern::Drums(_) => Err(SynthError::PatternMismatch {
                instrument: instrument_id.to_string(),
                expected: "melodic",
            }),
        }
    }

    /// Render a single note on its own, without track placement.
    ///
    /// The buffer is exactly `round(note.duration × sample_rate)` samples.
    pub fn synthesize_note(
        &self,
        instrument_id: &str,
        note: &Note,
        context: &Context,
    ) -> Result<SampleBuffer> {
        context.validate()?;
        if self.is_percussion(instrument_id) {
            return Err(SynthError::PatternMismatch {
                instrument: instrument_id.to_string(),
                expected: "drum",
            });
        }
        let (spec, synth) = self.resolve(instrument_id)?;
        note.validate()
            .map_err(|reason| SynthError::InvalidNote { index: 0, reason })?;

        let voicing = Voicing {
            spec,
            context,
            config: &self.config,
        };
        let mut rng = Pcg32::seed_from_u64(call_seed(context.seed, &spec.id));
        let mut buffer =
            SampleBuffer::from_samples(synth.render_note(&voicing, note, &mut rng), self.config.sample_rate);
        buffer.limit_peak(self.config.headroom);
        Ok(buffer)
    }

    fn resolve(&self, instrument_id: &str) -> Result<(&InstrumentSpec, &'static dyn FamilySynth)> {
        let spec = self.registry.spec(instrument_id)?;
        let synth = family_synth(&spec.family).ok_or_else(|| SynthError::UnknownInstrumentType {
            instrument: instrument_id.to_string(),
            family: spec.family.to_string(),
        })?;
        Ok((spec, synth))
    }

    fn render_pattern(
        &self,
        spec: &InstrumentSpec,
        synth: &dyn FamilySynth,
        pattern: &Pattern,
        context: &Context,
    ) -> Result<SampleBuffer> {
        pattern.validate()?;

        let sample_rate = self.config.sample_rate;
        let len = if context.duration > 0.0 {
            samples_for(context.duration, sample_rate)
        } else {
            pattern
                .notes()
                .map(|n| samples_for(n.start_time + n.duration, sample_rate))
                .max()
                .unwrap_or(0)
        };
        let mut track = SampleBuffer::silent_at(len, sample_rate);

        let voicing = Voicing {
            spec,
            context,
            config: &self.config,
        };
        let mut rng = Pcg32::seed_from_u64(call_seed(context.seed, &spec.id));

        let mut rendered = 0usize;
        for note in pattern.notes() {
            if !spec.range.contains(note.frequency) {
                log::debug!(
                    "{}: {:.2} Hz is outside {:.2}..{:.2} Hz",
                    spec.id,
                    note.frequency,
                    spec.range.low,
                    spec.range.high
                );
            }
            let offset = samples_for(note.start_time, sample_rate);
            if offset >= track.len() {
                continue;
            }
            let mut samples = SampleBuffer::from_samples(synth.render_note(&voicing, note, &mut rng), sample_rate);
            samples.limit_peak(self.config.headroom);
            track.overlay(&samples.samples, offset);
            rendered += 1;
        }

        let gain = track.limit_peak(self.config.headroom);
        log::debug!(
            "{}: rendered {rendered} notes into {} samples (limiter gain {gain:.3})",
            spec.id,
            track.len()
        );
        Ok(track)
    }
}
