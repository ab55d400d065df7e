//! Arrangement renderer: synthesizes every part and mixes them down.

use serde::{Deserialize, Serialize};

use super::mixer::{MixResult, Mixer, Track};
use crate::error::Result;
use crate::pattern::{Context, TrackPattern};
use crate::pcm;
use crate::synth::{DrumSynthesizer, Synthesizer};

/// One instrument part of an arrangement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Track name used in logs and mixer errors. Defaults to the instrument id.
    #[serde(default)]
    pub name: String,
    pub instrument: String,
    pub pattern: TrackPattern,
    /// Mixer gain in [0, 1]; `None` lets the mixer pick `1/√N`.
    #[serde(default)]
    pub volume: Option<f32>,
}

impl Part {
    pub fn new(instrument: impl Into<String>, pattern: impl Into<TrackPattern>) -> Self {
        let instrument = instrument.into();
        Part {
            name: instrument.clone(),
            instrument,
            pattern: pattern.into(),
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    fn track_name(&self) -> &str {
        if self.name.is_empty() { &self.instrument } else { &self.name }
    }
}

/// A set of parts sharing one context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrangement {
    #[serde(default)]
    pub context: Context,
    pub parts: Vec<Part>,
}

impl Arrangement {
    pub fn new(context: Context) -> Self {
        Arrangement {
            context,
            parts: Vec::new(),
        }
    }

    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Synthesize each part on its own. A failing part yields its error without
/// affecting the others.
pub fn render_tracks<D: DrumSynthesizer>(
    synth: &Synthesizer<D>,
    arrangement: &Arrangement,
) -> Vec<Result<Track>> {
    arrangement
        .parts
        .iter()
        .map(|part| {
            let buffer = synth.synthesize(&part.instrument, &part.pattern, &arrangement.context)?;
            let track = Track::new(part.track_name(), buffer);
            Ok(match part.volume {
                Some(volume) => track.with_volume(volume),
                None => track,
            })
        })
        .collect()
}

/// Render and mix the whole arrangement. Fails with the first part error.
pub fn render<D: DrumSynthesizer>(
    synth: &Synthesizer<D>,
    arrangement: &Arrangement,
) -> Result<MixResult> {
    let tracks = render_tracks(synth, arrangement)
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    let mixer = Mixer {
        ceiling: synth.config().headroom,
        sample_rate: synth.config().sample_rate,
    };
    let result = mixer.mix(&tracks)?;
    log::info!(
        "rendered {} parts ({} audible), {:.2}s, peak {:.3}",
        arrangement.parts.len(),
        result.tracks_mixed,
        result.buffer.duration(),
        result.peak
    );
    Ok(result)
}

/// Render the arrangement to a mono 16-bit WAV file in memory.
pub fn render_wav<D: DrumSynthesizer>(
    synth: &Synthesizer<D>,
    arrangement: &Arrangement,
) -> Result<Vec<u8>> {
    let mix = render(synth, arrangement)?;
    Ok(pcm::encode_wav(&mix.buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::error::SynthError;
    use crate::pattern::{DrumHit, DrumPattern, Note, Pattern};
    use crate::registry::InstrumentRegistry;

    fn synth() -> Synthesizer {
        Synthesizer::new(Arc::new(InstrumentRegistry::builtin()))
    }

    fn band() -> Arrangement {
        let bass = Pattern::new()
            .note(Note::new(55.0, 0.9, 0.0, 0.5))
            .note(Note::new(82.41, 0.9, 0.5, 0.5));
        let keys = Pattern::new().chord(vec![
            Note::new(261.63, 0.6, 0.0, 1.0),
            Note::new(329.63, 0.6, 0.0, 1.0),
            Note::new(392.0, 0.6, 0.0, 1.0),
        ]);
        let drums = DrumPattern::new().part("kick", vec![DrumHit::new(1.0), DrumHit::rest()]);
        Arrangement::new(Context::with_duration(1.0))
            .part(Part::new("bass_guitar", bass))
            .part(Part::new("piano", keys).with_volume(0.8))
            .part(Part::new("drums", drums))
    }

    #[test]
    fn mixes_all_parts_under_headroom() {
        let result = render(&synth(), &band()).unwrap();
        assert_eq!(result.buffer.len(), 44_100);
        assert_eq!(result.tracks_mixed, 3);
        assert!(result.peak <= 0.95 + 1e-6);
    }

    #[test]
    fn failing_part_does_not_touch_the_others() {
        let arrangement = band().part(Part::new("kazoo", Pattern::new()));
        let tracks = render_tracks(&synth(), &arrangement);
        assert_eq!(tracks.len(), 4);
        assert!(tracks[..3].iter().all(|t| t.is_ok()));
        assert!(matches!(tracks[3], Err(SynthError::UnsupportedInstrument(_))));
        assert!(matches!(
            render(&synth(), &arrangement),
            Err(SynthError::UnsupportedInstrument(_))
        ));
    }

    #[test]
    fn renders_wav_bytes() {
        let wav = render_wav(&synth(), &band()).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(wav.len(), 44 + 2 * 44_100);
    }

    #[test]
    fn loads_from_json() {
        let json = r#"{
            "context": { "duration": 0.5, "tempo": 100 },
            "parts": [
                { "instrument": "violin",
                  "pattern": [ { "frequency": 440, "velocity": 0.7, "startTime": 0, "duration": 0.5 } ] },
                { "instrument": "drums", "volume": 0.5,
                  "pattern": { "kick": [ { "hit": 1.0 } ] } }
            ]
        }"#;
        let arrangement = Arrangement::from_json(json).unwrap();
        assert_eq!(arrangement.context.tempo, 100.0);
        assert!(matches!(arrangement.parts[0].pattern, TrackPattern::Melodic(_)));
        assert!(matches!(arrangement.parts[1].pattern, TrackPattern::Drums(_)));
        let result = render(&synth(), &arrangement).unwrap();
        assert_eq!(result.buffer.len(), 22_050);
    }
}
