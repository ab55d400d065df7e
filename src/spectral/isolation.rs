//! Band-mask isolation of one instrument from a mixed recording.
//!
//! Each target has a frequency band. The engine transforms the input,
//! zeroes every bin outside that band, resynthesizes, and scores the result.
//! This is band filtering, not source separation: anything else sounding in
//! the same band comes through too.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::analyzer::{SpectralAnalyzer, Spectrogram, Stft};
use super::pitch::detect_pitch;
use crate::dsp::buffer::SampleBuffer;
use crate::error::{Result, SynthError};

/// Frequency band kept for an isolation target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Band {
    Lowpass { cutoff: f32 },
    Highpass { cutoff: f32 },
    Bandpass { low: f32, high: f32 },
}

impl Band {
    pub fn passes(&self, freq: f32) -> bool {
        match *self {
            Band::Lowpass { cutoff } => freq <= cutoff,
            Band::Highpass { cutoff } => freq >= cutoff,
            Band::Bandpass { low, high } => freq >= low && freq <= high,
        }
    }

    /// Search range for the fundamental inside this band, if one is pitched.
    fn pitch_range(&self) -> Option<(f64, f64)> {
        let (low, high) = match *self {
            Band::Lowpass { cutoff } => (0.0, cutoff as f64),
            Band::Highpass { cutoff } => (cutoff as f64, f64::INFINITY),
            Band::Bandpass { low, high } => (low as f64, high as f64),
        };
        let (low, high) = (low.max(40.0), high.min(2_000.0));
        (low < high).then_some((low, high))
    }
}

const BUILTIN_BANDS: &[(&str, Band)] = &[
    ("bass", Band::Lowpass { cutoff: 250.0 }),
    ("bass_guitar", Band::Lowpass { cutoff: 250.0 }),
    ("synth_bass", Band::Lowpass { cutoff: 250.0 }),
    ("kick", Band::Lowpass { cutoff: 120.0 }),
    ("hihat", Band::Highpass { cutoff: 6_000.0 }),
    ("piano", Band::Bandpass { low: 27.0, high: 4_200.0 }),
    ("electric_piano", Band::Bandpass { low: 27.0, high: 4_200.0 }),
    ("guitar", Band::Bandpass { low: 80.0, high: 5_000.0 }),
    ("acoustic_guitar", Band::Bandpass { low: 80.0, high: 5_000.0 }),
    ("electric_guitar", Band::Bandpass { low: 80.0, high: 5_000.0 }),
    ("violin", Band::Bandpass { low: 196.0, high: 8_000.0 }),
    ("vocals", Band::Bandpass { low: 80.0, high: 1_100.0 }),
];

/// Isolation quality. Every component is in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// In-band to out-of-band energy of the input, 0 dB to 40 dB mapped to [0, 1].
    pub snr: f64,
    /// Share of the isolated signal's energy that lies inside the band.
    pub purity: f64,
    /// Correlation of the frame energy envelopes of input and output.
    pub coherence: f64,
    pub overall: f64,
}

impl QualityScore {
    pub fn new(snr: f64, purity: f64, coherence: f64) -> Self {
        let (snr, purity, coherence) = (unit(snr), unit(purity), unit(coherence));
        QualityScore {
            snr,
            purity,
            coherence,
            overall: 0.4 * snr + 0.4 * purity + 0.2 * coherence,
        }
    }
}

fn unit(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}

#[derive(Debug, Clone)]
pub struct IsolationResult {
    pub isolated: SampleBuffer,
    pub quality: QualityScore,
    /// Fundamental of the isolated signal, when it is pitched.
    pub dominant_pitch: Option<f64>,
}

/// Band-mask isolation over a [`SpectralAnalyzer`].
pub struct IsolationEngine<A = Stft> {
    analyzer: A,
    bands: BTreeMap<String, Band>,
}

impl Default for IsolationEngine {
    fn default() -> Self {
        IsolationEngine::new()
    }
}

impl IsolationEngine {
    pub fn new() -> Self {
        IsolationEngine::with_analyzer(Stft::default())
    }
}

impl<A: SpectralAnalyzer> IsolationEngine<A> {
    /// Engine with the built-in band table and a custom analyzer.
    pub fn with_analyzer(analyzer: A) -> Self {
        IsolationEngine {
            analyzer,
            bands: BUILTIN_BANDS
                .iter()
                .map(|(id, band)| (id.to_string(), *band))
                .collect(),
        }
    }

    /// Add or replace the band for `target`.
    pub fn with_band(mut self, target: impl Into<String>, band: Band) -> Self {
        self.bands.insert(target.into(), band);
        self
    }

    pub fn band(&self, target: &str) -> Result<Band> {
        self.bands
            .get(target)
            .copied()
            .ok_or_else(|| SynthError::UnsupportedIsolationTarget(target.to_string()))
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    /// Keep only `target`'s band of `buffer`.
    pub fn isolate(&self, buffer: &SampleBuffer, target: &str) -> Result<IsolationResult> {
        let band = self.band(target)?;
        if buffer.is_silent() {
            log::debug!("isolate '{target}': silent input");
            return Ok(IsolationResult {
                isolated: SampleBuffer::silent_at(buffer.len(), buffer.sample_rate),
                quality: QualityScore::default(),
                dominant_pitch: None,
            });
        }

        let input = self.analyzer.analyze(&buffer.samples, buffer.sample_rate)?;
        let mut masked = input.clone();
        masked.apply_mask(|f| band.passes(f));
        let isolated =
            SampleBuffer::from_samples(self.analyzer.resynthesize(&masked)?, buffer.sample_rate);

        let output = self.analyzer.analyze(&isolated.samples, isolated.sample_rate)?;
        let quality = QualityScore::new(
            snr_score(&input, &masked),
            purity(&output, band),
            coherence(&input.frame_energies(), &output.frame_energies()),
        );
        let dominant_pitch = dominant_pitch(&isolated, band);
        log::debug!(
            "isolate '{target}': quality {:.3} (snr {:.3}, purity {:.3}, coherence {:.3})",
            quality.overall,
            quality.snr,
            quality.purity,
            quality.coherence
        );

        Ok(IsolationResult {
            isolated,
            quality,
            dominant_pitch,
        })
    }
}

/// In-band vs out-of-band energy of the input, 0 dB .. 40 dB mapped to [0, 1].
fn snr_score(input: &Spectrogram, masked: &Spectrogram) -> f64 {
    let signal = masked.energy();
    let noise = (input.energy() - signal).max(0.0);
    if signal <= f64::EPSILON {
        return 0.0;
    }
    if noise <= signal * 1e-12 {
        return 1.0;
    }
    10.0 * (signal / noise).log10() / 40.0
}

fn purity(output: &Spectrogram, band: Band) -> f64 {
    let total = output.energy();
    if total <= f64::EPSILON {
        return 0.0;
    }
    output.energy_where(|f| band.passes(f)) / total
}

/// Pearson correlation, 0 when either series is flat.
fn coherence(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    cov / (var_a * var_b).sqrt()
}

/// Pitch of the loudest stretch of the isolated signal.
fn dominant_pitch(isolated: &SampleBuffer, band: Band) -> Option<f64> {
    let (low, high) = band.pitch_range()?;
    let segment = (4.0 * isolated.sample_rate as f64 / low).ceil() as usize;
    let samples = &isolated.samples;
    if samples.len() < segment / 2 {
        return None;
    }
    let peak_at = samples
        .iter()
        .enumerate()
        .fold((0, 0.0f32), |(at, max), (i, s)| if s.abs() > max { (i, s.abs()) } else { (at, max) })
        .0;
    let start = peak_at.min(samples.len().saturating_sub(segment));
    let end = (start + segment).min(samples.len());
    let estimate = detect_pitch(&samples[start..end], isolated.sample_rate, Some(low), Some(high));
    (!estimate.is_noise).then_some(estimate.frequency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use std::sync::Arc;

    use crate::pattern::{Context, Note};
    use crate::registry::InstrumentRegistry;
    use crate::synth::Synthesizer;

    fn two_tones() -> (SampleBuffer, Vec<f32>) {
        let low: Vec<f32> = (0..44_100)
            .map(|i| 0.5 * (2.0 * PI * 100.0 * i as f32 / 44_100.0).sin())
            .collect();
        let mixed = low
            .iter()
            .enumerate()
            .map(|(i, l)| l + 0.3 * (2.0 * PI * 8_000.0 * i as f32 / 44_100.0).sin())
            .collect();
        (SampleBuffer::from_samples(mixed, 44_100), low)
    }

    #[test]
    fn bass_band_keeps_the_low_tone() {
        let (mixed, low) = two_tones();
        let result = IsolationEngine::new().isolate(&mixed, "bass").unwrap();
        assert_eq!(result.isolated.len(), mixed.len());
        let err = result.isolated.samples[2_048..40_000]
            .iter()
            .zip(&low[2_048..40_000])
            .fold(0.0f32, |m, (a, b)| m.max((a - b).abs()));
        assert!(err < 0.05, "max error {err}");

        let q = result.quality;
        assert!(q.purity > 0.95, "purity {}", q.purity);
        assert!(q.snr > 0.0 && q.snr < 1.0);
        assert!((q.overall - (0.4 * q.snr + 0.4 * q.purity + 0.2 * q.coherence)).abs() < 1e-12);

        let pitch = result.dominant_pitch.unwrap();
        assert!((pitch - 100.0).abs() < 2.0, "pitch {pitch}");
    }

    #[test]
    fn weaker_target_scores_lower_snr() {
        let (mixed, _) = two_tones();
        let engine = IsolationEngine::new();
        let bass = engine.isolate(&mixed, "bass").unwrap();
        let hats = engine.isolate(&mixed, "hihat").unwrap();
        assert!(hats.quality.snr < bass.quality.snr);
        assert!(hats.dominant_pitch.is_none());
        for q in [bass.quality, hats.quality] {
            for v in [q.snr, q.purity, q.coherence, q.overall] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn unknown_target_is_rejected() {
        let (mixed, _) = two_tones();
        let err = IsolationEngine::new().isolate(&mixed, "theremin").unwrap_err();
        assert!(matches!(err, SynthError::UnsupportedIsolationTarget(ref t) if t == "theremin"));
    }

    #[test]
    fn silent_input_scores_zero() {
        let engine = IsolationEngine::new();
        for len in [0, 4_410] {
            let result = engine.isolate(&SampleBuffer::silent(len), "piano").unwrap();
            assert_eq!(result.isolated.len(), len);
            assert!(result.isolated.is_silent());
            assert_eq!(result.quality, QualityScore::default());
            assert!(result.dominant_pitch.is_none());
        }
    }

    #[test]
    fn finds_the_pitch_of_a_piano_note() {
        let synth = Synthesizer::new(Arc::new(InstrumentRegistry::builtin()));
        let note = Note::new(220.0, 0.8, 0.0, 1.0);
        let buffer = synth
            .synthesize_note("piano", &note, &Context::with_duration(1.0))
            .unwrap();
        let result = IsolationEngine::new().isolate(&buffer, "piano").unwrap();
        let pitch = result.dominant_pitch.unwrap();
        assert!((pitch - 220.0).abs() < 3.0, "pitch {pitch}");
        assert!(result.quality.snr > 0.75, "snr {}", result.quality.snr);
        assert!(result.quality.coherence > 0.9);
    }

    #[test]
    fn custom_bands() {
        let engine = IsolationEngine::new().with_band("theremin", Band::Bandpass { low: 500.0, high: 900.0 });
        assert!(engine.band("theremin").is_ok());
        assert!(engine.targets().any(|t| t == "violin"));
        let band: Band = serde_json::from_str(r#"{"kind":"highpass","cutoff":5000}"#).unwrap();
        assert_eq!(band, Band::Highpass { cutoff: 5_000.0 });
        assert!(band.passes(6_000.0) && !band.passes(4_000.0));
    }
}
