//! Pattern types: the caller-owned musical input to synthesis.
//!
//! These map directly to the JSON that pattern generators emit, e.g.
//!
//! ```json
//! [ { "frequency": 110.0, "velocity": 0.8, "startTime": 0.0, "duration": 1.0 },
//!   [ { "frequency": 220.0, ... }, { "frequency": 277.2, ... } ] ]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

// ── Notes ───────────────────────────────────────────────────

/// A single pitched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Fundamental frequency in Hz.
    pub frequency: f64,
    /// Linear gain proxy in [0, 1].
    pub velocity: f64,
    /// Onset in seconds from the start of the track.
    #[serde(default)]
    pub start_time: f64,
    /// Length in seconds.
    pub duration: f64,
    /// Playing technique (e.g. "fingered", "bowed"). Falls back to the
    /// instrument's default technique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique: Option<String>,
    /// Synth patch name for electronic instruments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

impl Note {
    pub fn new(frequency: f64, velocity: f64, start_time: f64, duration: f64) -> Self {
        Note {
            frequency,
            velocity,
            start_time,
            duration,
            technique: None,
            patch: None,
        }
    }

    pub fn with_technique(mut self, technique: impl Into<String>) -> Self {
        self.technique = Some(technique.into());
        self
    }

    pub fn with_patch(mut self, patch: impl Into<String>) -> Self {
        self.patch = Some(patch.into());
        self
    }

    /// Check the note against the ranges synthesis relies on.
    ///
    /// Out-of-range values are rejected rather than clamped so that bugs in
    /// pattern generation surface where they happen.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(format!("frequency must be > 0, got {}", self.frequency));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(format!("duration must be > 0, got {}", self.duration));
        }
        if !(0.0..=1.0).contains(&self.velocity) {
            return Err(format!("velocity must be in [0, 1], got {}", self.velocity));
        }
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(format!("start time must be >= 0, got {}", self.start_time));
        }
        Ok(())
    }
}

/// One step of a pattern: a lone note or a group of simultaneous notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternEvent {
    Note(Note),
    Chord(Vec<Note>),
}

/// Ordered note events for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern {
    pub events: Vec<PatternEvent>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(mut self, note: Note) -> Self {
        self.events.push(PatternEvent::Note(note));
        self
    }

    pub fn chord(mut self, notes: Vec<Note>) -> Self {
        self.events.push(PatternEvent::Chord(notes));
        self
    }

    /// All notes in order, chords flattened.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.events.iter().flat_map(|event| match event {
            PatternEvent::Note(note) => std::slice::from_ref(note),
            PatternEvent::Chord(notes) => notes.as_slice(),
        })
    }

    /// Validate every note, reporting the first offender by flattened index.
    pub fn validate(&self) -> Result<()> {
        for (index, note) in self.notes().enumerate() {
            note.validate()
                .map_err(|reason| SynthError::InvalidNote { index, reason })?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.notes().next().is_none()
    }
}

// ── Drums ───────────────────────────────────────────────────

/// One step of a drum part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumHit {
    /// Intensity in [0, 1]; 0 is a rest.
    pub hit: f64,
    /// Multiplier on the step's grid position (1.0 = on the grid).
    #[serde(default = "default_timing")]
    pub timing: f64,
    /// Optional tone/technique tag (e.g. "rimshot", "open").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

fn default_timing() -> f64 {
    1.0
}

impl DrumHit {
    pub fn new(hit: f64) -> Self {
        DrumHit {
            hit,
            timing: 1.0,
            tone: None,
        }
    }

    pub fn rest() -> Self {
        Self::new(0.0)
    }
}

/// Drum part name (`kick`, `snare`, `hiHat`, ...) to its step sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrumPattern {
    pub parts: BTreeMap<String, Vec<DrumHit>>,
}

impl DrumPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part(mut self, name: impl Into<String>, hits: Vec<DrumHit>) -> Self {
        self.parts.insert(name.into(), hits);
        self
    }

    /// Longest part, in steps.
    pub fn steps(&self) -> usize {
        self.parts.values().map(Vec::len).max().unwrap_or(0)
    }
}

/// What a track is asked to play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackPattern {
    Melodic(Pattern),
    Drums(DrumPattern),
}

impl From<Pattern> for TrackPattern {
    fn from(p: Pattern) -> Self {
        TrackPattern::Melodic(p)
    }
}

impl From<DrumPattern> for TrackPattern {
    fn from(p: DrumPattern) -> Self {
        TrackPattern::Drums(p)
    }
}

// ── Context ─────────────────────────────────────────────────

/// Production quality tag. Caps how many partials are summed per note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Draft,
    #[default]
    Standard,
    Studio,
}

impl Quality {
    pub fn max_harmonics(self) -> Option<usize> {
        match self {
            Quality::Draft => Some(4),
            Quality::Standard => Some(8),
            Quality::Studio => None,
        }
    }
}

/// Slowest tempo a context may ask for, in beats per minute.
pub const MIN_TEMPO: f64 = 1.0;
/// Fastest tempo a context may ask for, in beats per minute.
pub const MAX_TEMPO: f64 = 1000.0;
/// Longest track a context may ask for, in seconds.
pub const MAX_DURATION: f64 = 3600.0;

const DEFAULT_TEMPO: f64 = 120.0;

/// Read-only configuration for one synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Context {
    /// Total track length in seconds.
    pub duration: f64,
    /// Beats per minute.
    pub tempo: f64,
    /// Style/genre tag.
    pub style: String,
    pub quality: Quality,
    /// Seed for ensemble humanization and drum noise.
    pub seed: u64,
    /// Hold the piano sustain pedal for the whole track.
    pub sustain_pedal: bool,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            duration: 4.0,
            tempo: DEFAULT_TEMPO,
            style: "pop".to_string(),
            quality: Quality::Standard,
            seed: 0,
            sustain_pedal: false,
        }
    }
}

impl Context {
    pub fn with_duration(duration: f64) -> Self {
        Context {
            duration,
            ..Default::default()
        }
    }

    /// Check tempo and duration before anything is allocated for them.
    pub fn validate(&self) -> Result<()> {
        if !self.tempo.is_finite() || !(MIN_TEMPO..=MAX_TEMPO).contains(&self.tempo) {
            return Err(SynthError::InvalidContext(format!(
                "tempo must be in {MIN_TEMPO}..={MAX_TEMPO} bpm, got {}",
                self.tempo
            )));
        }
        if !self.duration.is_finite() || !(0.0..=MAX_DURATION).contains(&self.duration) {
            return Err(SynthError::InvalidContext(format!(
                "duration must be in 0..={MAX_DURATION} s, got {}",
                self.duration
            )));
        }
        Ok(())
    }

    /// Length of a sixteenth note in seconds. Tempos outside the accepted
    /// range are clamped into it.
    pub fn sixteenth(&self) -> f64 {
        let tempo = if self.tempo.is_finite() && self.tempo > 0.0 {
            self.tempo.clamp(MIN_TEMPO, MAX_TEMPO)
        } else {
            DEFAULT_TEMPO
        };
        60.0 / tempo / 4.0
    }
}
