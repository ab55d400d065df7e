//! Instrument spec registry.
//!
//! Maps instrument ids to their [`InstrumentSpec`]. The built-in table covers
//! the instruments the pattern generators emit; callers may add their own
//! from JSON before wrapping the registry in an `Arc` and handing it to a
//! synthesizer.

use std::collections::{BTreeMap, HashMap};

use crate::dsp::envelope::EnvelopeShape;
use crate::dsp::resonance::ResonanceMode;
use crate::error::{Result, SynthError};
use crate::instrument::{Family, FrequencyRange, InstrumentSpec, StringSetup, Technique};

/// Ids routed to the drum synthesizer regardless of registration.
pub const PERCUSSION_IDS: &[&str] = &[
    "drums",
    "drum_kit",
    "percussion",
    "kick",
    "snare",
    "hihat",
    "hi_hat",
    "hiHat",
    "toms",
    "cymbals",
];

/// Whether `id` names a percussion instrument.
pub fn is_percussion_id(id: &str) -> bool {
    PERCUSSION_IDS.contains(&id)
}

/// Read-only lookup from instrument id to acoustic model.
#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    specs: HashMap<String, InstrumentSpec>,
}

impl InstrumentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in instrument table.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for spec in builtin_specs() {
            registry.specs.insert(spec.id.clone(), spec);
        }
        registry
    }

    /// Look up a spec by id.
    pub fn spec(&self, id: &str) -> Result<&InstrumentSpec> {
        self.specs
            .get(id)
            .ok_or_else(|| SynthError::UnsupportedInstrument(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.specs.contains_key(id)
    }

    /// Register (or replace) a spec after validating it.
    pub fn insert(&mut self, spec: InstrumentSpec) -> Result<()> {
        spec.validate().map_err(|reason| SynthError::InvalidSpec {
            id: spec.id.clone(),
            reason,
        })?;
        if self.specs.contains_key(&spec.id) {
            log::debug!("replacing instrument spec {}", spec.id);
        }
        self.specs.insert(spec.id.clone(), spec);
        Ok(())
    }

    /// Build a registry from a JSON array of specs.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut registry = Self::new();
        registry.extend_from_json(json)?;
        Ok(registry)
    }

    /// Add every spec in a JSON array. Returns how many were added.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize> {
        let specs: Vec<InstrumentSpec> = serde_json::from_str(json)?;
        let count = specs.len();
        for spec in specs {
            self.insert(spec)?;
        }
        Ok(count)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.specs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstrumentSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

// ── Built-in table ──────────────────────────────────────────

fn harmonics(n: u32) -> Vec<u32> {
    (1..=n).collect()
}

fn techniques(entries: Vec<(&str, Technique)>) -> BTreeMap<String, Technique> {
    entries
        .into_iter()
        .map(|(name, technique)| (name.to_string(), technique))
        .collect()
}

fn body(modes: &[(&str, f64, f64)]) -> Vec<ResonanceMode> {
    modes
        .iter()
        .map(|&(name, frequency, gain)| ResonanceMode::new(name, frequency, gain))
        .collect()
}

struct Model {
    id: &'static str,
    name: &'static str,
    family: Family,
    range: (f64, f64),
    default_technique: &'static str,
    techniques: Vec<(&'static str, Technique)>,
    resonance: &'static [(&'static str, f64, f64)],
    strings: Option<(Vec<f64>, f64)>,
    section_size: Option<usize>,
}

impl From<Model> for InstrumentSpec {
    fn from(m: Model) -> Self {
        InstrumentSpec {
            id: m.id.to_string(),
            name: m.name.to_string(),
            family: m.family,
            range: FrequencyRange {
                low: m.range.0,
                high: m.range.1,
            },
            default_technique: m.default_technique.to_string(),
            techniques: techniques(m.techniques),
            resonance: body(m.resonance),
            strings: m.strings.map(|(tuning, inharmonicity)| StringSetup {
                count: tuning.len() as u8,
                tuning,
                inharmonicity,
            }),
            section_size: m.section_size,
        }
    }
}

fn builtin_specs() -> Vec<InstrumentSpec> {
    let pct = EnvelopeShape::percussive;
    let sus = EnvelopeShape::sustained;
    let models = vec![
        // Plucked and bowed strings
        Model {
            id: "acoustic_guitar",
            name: "Acoustic Guitar",
            family: Family::Strings,
            range: (82.41, 1318.51),
            default_technique: "fingered",
            techniques: vec![
                ("fingered", Technique::new(harmonics(10), pct(0.005, 1.2))),
                ("picked", Technique::new(harmonics(12), pct(0.002, 0.9))),
                ("strummed", Technique::new(harmonics(8), pct(0.012, 1.5))),
                ("muted", Technique::new(harmonics(4), pct(0.003, 0.15))),
            ],
            resonance: &[("air", 98.0, 0.08), ("top", 204.0, 0.05), ("back", 390.0, 0.03)],
            strings: Some((vec![82.41, 110.0, 146.83, 196.0, 246.94, 329.63], 0.01)),
            section_size: None,
        },
        Model {
            id: "electric_guitar",
            name: "Electric Guitar",
            family: Family::Strings,
            range: (82.41, 1318.51),
            default_technique: "picked",
            techniques: vec![
                ("picked", Technique::new(harmonics(14), pct(0.002, 1.6))),
                ("fingered", Technique::new(harmonics(10), pct(0.005, 1.8))),
                ("palm_muted", Technique::new(harmonics(5), pct(0.002, 0.2))),
            ],
            resonance: &[("pickup", 120.0, 0.03), ("body", 240.0, 0.02)],
            strings: Some((vec![82.41, 110.0, 146.83, 196.0, 246.94, 329.63], 0.01)),
            section_size: None,
        },
        Model {
            id: "bass_guitar",
            name: "Bass Guitar",
            family: Family::Strings,
            range: (41.2, 392.0),
            default_technique: "fingered",
            techniques: vec![
                ("fingered", Technique::new(harmonics(8), pct(0.008, 1.8))),
                ("picked", Technique::new(harmonics(10), pct(0.003, 1.4))),
                ("slapped", Technique::new(harmonics(12), pct(0.002, 0.6))),
            ],
            resonance: &[("body", 60.0, 0.06), ("neck", 120.0, 0.03)],
            strings: Some((vec![41.2, 55.0, 73.42, 98.0], 0.02)),
            section_size: None,
        },
        Model {
            id: "violin",
            name: "Violin",
            family: Family::Strings,
            range: (196.0, 3520.0),
            default_technique: "bowed",
            techniques: vec![
                ("bowed", Technique::new(harmonics(12), sus(0.08))),
                ("pizzicato", Technique::new(harmonics(6), pct(0.003, 0.4))),
            ],
            resonance: &[("air", 275.0, 0.06), ("body", 460.0, 0.05)],
            strings: Some((vec![196.0, 293.66, 440.0, 659.25], 0.01)),
            section_size: None,
        },
        Model {
            id: "cello",
            name: "Cello",
            family: Family::Strings,
            range: (65.41, 1046.5),
            default_technique: "bowed",
            techniques: vec![
                ("bowed", Technique::new(harmonics(10), sus(0.12))),
                ("pizzicato", Technique::new(harmonics(6), pct(0.004, 0.7))),
            ],
            resonance: &[("air", 100.0, 0.07), ("body", 200.0, 0.05)],
            strings: Some((vec![65.41, 98.0, 146.83, 220.0], 0.012)),
            section_size: None,
        },
        // Keyboards
        Model {
            id: "piano",
            name: "Acoustic Piano",
            family: Family::Keyboard,
            range: (27.5, 4186.0),
            default_technique: "normal",
            techniques: vec![
                ("normal", Technique::new(harmonics(10), pct(0.002, 2.5))),
                ("staccato", Technique::new(harmonics(8), pct(0.002, 0.4))),
                ("soft", Technique::new(harmonics(6), pct(0.006, 3.0))),
            ],
            resonance: &[("soundboard", 110.0, 0.04), ("case", 220.0, 0.02)],
            strings: None,
            section_size: None,
        },
        Model {
            id: "electric_piano",
            name: "Electric Piano",
            family: Family::Keyboard,
            range: (27.5, 4186.0),
            default_technique: "normal",
            techniques: vec![("normal", Technique::new(harmonics(6), pct(0.003, 1.8)))],
            resonance: &[("tine", 7.0, 0.03)],
            strings: None,
            section_size: None,
        },
        // Synths: oscillator-based, harmonics only describe the nominal series
        Model {
            id: "synth_lead",
            name: "Synth Lead",
            family: Family::Electronic,
            range: (55.0, 4186.0),
            default_technique: "sustain",
            techniques: vec![(
                "sustain",
                Technique::new(harmonics(3), EnvelopeShape::adsr(0.01, 0.1, 0.8, 0.2)),
            )],
            resonance: &[],
            strings: None,
            section_size: None,
        },
        Model {
            id: "synth_pad",
            name: "Synth Pad",
            family: Family::Electronic,
            range: (55.0, 2093.0),
            default_technique: "sustain",
            techniques: vec![(
                "sustain",
                Technique::new(harmonics(3), EnvelopeShape::adsr(0.4, 0.3, 0.7, 0.8)),
            )],
            resonance: &[],
            strings: None,
            section_size: None,
        },
        Model {
            id: "synth_bass",
            name: "Synth Bass",
            family: Family::Electronic,
            range: (30.87, 523.25),
            default_technique: "sustain",
            techniques: vec![(
                "sustain",
                Technique::new(harmonics(3), EnvelopeShape::adsr(0.005, 0.08, 0.9, 0.1)),
            )],
            resonance: &[],
            strings: None,
            section_size: None,
        },
        // Orchestral sections
        Model {
            id: "strings_section",
            name: "String Section",
            family: Family::Orchestral,
            range: (65.41, 3520.0),
            default_technique: "sustained",
            techniques: vec![
                ("sustained", Technique::new(harmonics(10), sus(0.15))),
                ("staccato", Technique::new(harmonics(8), pct(0.01, 0.25))),
                ("pizzicato", Technique::new(harmonics(6), pct(0.003, 0.35))),
            ],
            resonance: &[("hall", 80.0, 0.03), ("body", 280.0, 0.04)],
            strings: None,
            section_size: Some(8),
        },
        Model {
            id: "brass_section",
            name: "Brass Section",
            family: Family::Orchestral,
            range: (58.27, 1174.66),
            default_technique: "sustained",
            techniques: vec![
                ("sustained", Technique::new(harmonics(12), sus(0.06))),
                ("staccato", Technique::new(harmonics(10), pct(0.008, 0.3))),
            ],
            resonance: &[("bell", 180.0, 0.04)],
            strings: None,
            section_size: Some(4),
        },
        Model {
            id: "woodwinds",
            name: "Woodwind Section",
            family: Family::Orchestral,
            range: (116.54, 2349.32),
            default_technique: "sustained",
            techniques: vec![("sustained", Technique::new(harmonics(5), sus(0.05)))],
            resonance: &[("bore", 150.0, 0.02)],
            strings: None,
            section_size: Some(3),
        },
        // Voice (not synthesized yet)
        Model {
            id: "vocals",
            name: "Lead Vocals",
            family: Family::Voice,
            range: (82.41, 1046.5),
            default_technique: "sustained",
            techniques: vec![("sustained", Technique::new(harmonics(6), sus(0.1)))],
            resonance: &[],
            strings: None,
            section_size: None,
        },
        // Percussion is rendered by the drum synthesizer
        Model {
            id: "drums",
            name: "Drum Kit",
            family: Family::Percussion,
            range: (40.0, 12_000.0),
            default_technique: "hit",
            techniques: vec![("hit", Technique::new([1], pct(0.001, 0.3)))],
            resonance: &[],
            strings: None,
            section_size: None,
        },
    ];
    models.into_iter().map(InstrumentSpec::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_specs_are_valid() {
        let registry = InstrumentRegistry::builtin();
        assert!(registry.len() >= 15);
        for spec in registry.iter() {
            assert!(spec.validate().is_ok(), "{}: {:?}", spec.id, spec.validate());
        }
    }

    #[test]
    fn harmonic_amplitudes_strictly_decrease_for_every_instrument() {
        let registry = InstrumentRegistry::builtin();
        for spec in registry.iter() {
            for (name, technique) in &spec.techniques {
                for pair in technique.harmonics.windows(2) {
                    assert!(
                        spec.harmonic_amplitude(pair[1]) < spec.harmonic_amplitude(pair[0]),
                        "{} / {name}: amplitude not decreasing at h={}",
                        spec.id,
                        pair[1]
                    );
                }
            }
        }
    }

    #[test]
    fn resonance_gains_are_small() {
        for spec in InstrumentRegistry::builtin().iter() {
            assert!(spec.resonance.len() <= 3, "{}", spec.id);
            assert!(spec.resonance.iter().all(|m| m.gain.abs() <= 0.1), "{}", spec.id);
        }
    }

    #[test]
    fn string_inharmonicity_in_expected_band() {
        for spec in InstrumentRegistry::builtin().iter() {
            if spec.family == Family::Strings {
                let b = spec.inharmonicity();
                assert!((0.01..=0.02).contains(&b), "{}: {b}", spec.id);
            }
        }
    }

    #[test]
    fn unknown_id_is_unsupported() {
        let registry = InstrumentRegistry::builtin();
        assert!(matches!(
            registry.spec("theremin"),
            Err(SynthError::UnsupportedInstrument(id)) if id == "theremin"
        ));
        assert_eq!(registry.spec("piano").unwrap().family, Family::Keyboard);
    }

    #[test]
    fn loads_specs_from_json() {
        let json = r#"[{
            "id": "mandolin",
            "name": "Mandolin",
            "family": "string",
            "range": { "low": 196.0, "high": 2637.0 },
            "defaultTechnique": "picked",
            "techniques": {
                "picked": {
                    "harmonics": [1, 2, 3, 4, 5, 6],
                    "envelope": { "kind": "percussive", "attack": 0.002, "decay": 0.6 }
                }
            },
            "resonance": [ { "name": "air", "frequency": 180.0, "gain": 0.05 } ],
            "strings": { "count": 4, "tuning": [196.0, 293.66, 440.0, 659.25], "inharmonicity": 0.015 }
        }]"#;
        let mut registry = InstrumentRegistry::builtin();
        assert_eq!(registry.extend_from_json(json).unwrap(), 1);
        let spec = registry.spec("mandolin").unwrap();
        assert_eq!(spec.inharmonicity(), 0.015);
        assert!(registry.ids().contains(&"mandolin"));
    }

    #[test]
    fn rejects_invalid_json_spec() {
        let json = r#"[{
            "id": "broken",
            "name": "Broken",
            "family": "string",
            "range": { "low": 100.0, "high": 200.0 },
            "defaultTechnique": "missing",
            "techniques": {}
        }]"#;
        assert!(matches!(
            InstrumentRegistry::from_json(json),
            Err(SynthError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn percussion_ids() {
        assert!(is_percussion_id("drums"));
        assert!(is_percussion_id("hiHat"));
        assert!(!is_percussion_id("piano"));
    }
}
