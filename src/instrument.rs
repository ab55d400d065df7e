//! Instrument acoustic models.
//!
//! An [`InstrumentSpec`] describes everything the synthesizers need to know
//! about an instrument: its family, playable range, the partials and envelope
//! of each playing technique, and its body resonance. Specs are plain data,
//! immutable once registered.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dsp::envelope::EnvelopeShape;
use crate::dsp::resonance::ResonanceMode;

// ── Family ──────────────────────────────────────────────────

/// Instrument family tag. Anything outside the known set is kept verbatim
/// in `Other` so that dispatch can report it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Family {
    Strings,
    Keyboard,
    Electronic,
    Orchestral,
    Voice,
    Percussion,
    Other(String),
}

impl Family {
    pub fn as_str(&self) -> &str {
        match self {
            Family::Strings => "string",
            Family::Keyboard => "keyboard",
            Family::Electronic => "electronic",
            Family::Orchestral => "orchestral",
            Family::Voice => "voice",
            Family::Percussion => "percussion",
            Family::Other(name) => name,
        }
    }

    /// How partial amplitudes fall off with harmonic index.
    pub fn rolloff(&self) -> Rolloff {
        match self {
            Family::Keyboard => Rolloff::InverseSquare,
            _ => Rolloff::InverseSqrt,
        }
    }
}

impl From<String> for Family {
    fn from(s: String) -> Self {
        match s.as_str() {
            "string" | "strings" => Family::Strings,
            "keyboard" => Family::Keyboard,
            "electronic" => Family::Electronic,
            "orchestral" => Family::Orchestral,
            "voice" | "vocal" => Family::Voice,
            "percussion" => Family::Percussion,
            _ => Family::Other(s),
        }
    }
}

impl From<Family> for String {
    fn from(f: Family) -> Self {
        f.as_str().to_string()
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Harmonic amplitude law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rolloff {
    /// `1/√h`: bowed and plucked strings, winds.
    InverseSqrt,
    /// `1/h²`: struck strings, bright attack that dulls quickly.
    InverseSquare,
}

impl Rolloff {
    /// Relative amplitude of harmonic `h` (1-based).
    pub fn amplitude(self, h: u32) -> f64 {
        let h = h.max(1) as f64;
        match self {
            Rolloff::InverseSqrt => 1.0 / h.sqrt(),
            Rolloff::InverseSquare => 1.0 / (h * h),
        }
    }
}

// ── Spec ────────────────────────────────────────────────────

/// Playable fundamental range in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub low: f64,
    pub high: f64,
}

impl FrequencyRange {
    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.low && frequency <= self.high
    }
}

/// A playing technique: which partials sound and how the note is shaped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    /// Harmonic indices, ascending, each ≥ 1.
    pub harmonics: Vec<u32>,
    pub envelope: EnvelopeShape,
}

impl Technique {
    pub fn new(harmonics: impl IntoIterator<Item = u32>, envelope: EnvelopeShape) -> Self {
        Technique {
            harmonics: harmonics.into_iter().collect(),
            envelope,
        }
    }
}

/// Physical string layout for string-family instruments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringSetup {
    pub count: u8,
    /// Open-string frequencies, low to high.
    pub tuning: Vec<f64>,
    /// Stiffness coefficient B in `f(h) = f·h·(1 + B·h²)`.
    pub inharmonicity: f64,
}

/// Full acoustic model of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentSpec {
    pub id: String,
    pub name: String,
    pub family: Family,
    pub range: FrequencyRange,
    pub default_technique: String,
    pub techniques: BTreeMap<String, Technique>,
    #[serde(default)]
    pub resonance: Vec<ResonanceMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strings: Option<StringSetup>,
    /// Simulated players for orchestral sections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_size: Option<usize>,
}

impl InstrumentSpec {
    /// Resolve a technique by name, falling back to the default technique.
    pub fn technique(&self, name: Option<&str>) -> (&str, &Technique) {
        if let Some(name) = name {
            if let Some((key, technique)) = self.techniques.get_key_value(name) {
                return (key.as_str(), technique);
            }
            log::warn!(
                "{}: unknown technique '{name}', using '{}'",
                self.id,
                self.default_technique
            );
        }
        match self.techniques.get_key_value(&self.default_technique) {
            Some((key, technique)) => (key.as_str(), technique),
            // validate() guarantees the default exists; fall back to any entry
            None => {
                let (key, technique) = self
                    .techniques
                    .iter()
                    .next()
                    .map(|(k, t)| (k.as_str(), t))
                    .unwrap_or(("", &FALLBACK_TECHNIQUE));
                (key, technique)
            }
        }
    }

    /// Inharmonicity coefficient; zero outside the string family.
    pub fn inharmonicity(&self) -> f64 {
        match (&self.family, &self.strings) {
            (Family::Strings, Some(setup)) => setup.inharmonicity,
            (Family::Strings, None) => DEFAULT_INHARMONICITY,
            _ => 0.0,
        }
    }

    /// Relative amplitude of harmonic `h` for this instrument.
    pub fn harmonic_amplitude(&self, h: u32) -> f64 {
        self.family.rolloff().amplitude(h)
    }

    /// Check the structural invariants the synthesizers rely on.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.is_empty() {
            return Err("empty id".into());
        }
        if !(self.range.low > 0.0 && self.range.low < self.range.high) {
            return Err(format!(
                "bad frequency range {}..{}",
                self.range.low, self.range.high
            ));
        }
        if !self.techniques.contains_key(&self.default_technique) {
            return Err(format!(
                "default technique '{}' is not defined",
                self.default_technique
            ));
        }
        for (name, technique) in &self.techniques {
            if technique.harmonics.is_empty() {
                return Err(format!("technique '{name}' has no harmonics"));
            }
            if technique.harmonics[0] == 0
                || technique.harmonics.windows(2).any(|w| w[0] >= w[1])
            {
                return Err(format!(
                    "technique '{name}' harmonics must be ascending and >= 1"
                ));
            }
        }
        if let Some(setup) = &self.strings {
            if setup.tuning.len() != setup.count as usize {
                return Err(format!(
                    "{} strings but {} tuning entries",
                    setup.count,
                    setup.tuning.len()
                ));
            }
            if !(0.0..=0.1).contains(&setup.inharmonicity) {
                return Err(format!("inharmonicity {} out of range", setup.inharmonicity));
            }
        }
        Ok(())
    }
}

/// Inharmonicity used for string instruments that do not specify one.
pub const DEFAULT_INHARMONICITY: f64 = 0.01;

static FALLBACK_TECHNIQUE: Technique = Technique {
    harmonics: Vec::new(),
    envelope: EnvelopeShape::Sustained {
        attack: 0.01,
        release_fraction: 0.3,
    },
};
