//! Sample buffers: owned mono f32 audio at a fixed sample rate.

use serde::{Deserialize, Serialize};

use crate::config::SAMPLE_RATE;

/// Number of samples covering `seconds` at `sample_rate`.
pub fn samples_for(seconds: f64, sample_rate: u32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as usize
}

/// Mono audio owned by whoever synthesized it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        SampleBuffer::silent(0)
    }
}

impl SampleBuffer {
    /// A zeroed buffer of `len` samples at the default rate.
    pub fn silent(len: usize) -> Self {
        Self::silent_at(len, SAMPLE_RATE)
    }

    pub fn silent_at(len: usize, sample_rate: u32) -> Self {
        SampleBuffer {
            samples: vec![0.0; len],
            sample_rate,
        }
    }

    /// A zeroed buffer long enough for `seconds` of audio.
    pub fn for_duration(seconds: f64, sample_rate: u32) -> Self {
        Self::silent_at(samples_for(seconds, sample_rate), sample_rate)
    }

    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        SampleBuffer {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
    }

    /// Root-mean-square level.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / self.samples.len() as f64).sqrt() as f32
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }

    /// Add `other` into this buffer starting at `offset`. Samples that would
    /// land past the end are dropped.
    pub fn overlay(&mut self, other: &[f32], offset: usize) {
        if offset >= self.samples.len() {
            return;
        }
        for (dst, &src) in self.samples[offset..].iter_mut().zip(other) {
            *dst += src;
        }
    }

    /// Multiply every sample by `gain`.
    pub fn scale(&mut self, gain: f32) {
        for s in &mut self.samples {
            *s *= gain;
        }
    }

    /// If the peak exceeds `ceiling`, scale the whole buffer down so that it
    /// sits exactly at `ceiling`. Returns the gain applied.
    ///
    /// A silent buffer is left untouched.
    pub fn limit_peak(&mut self, ceiling: f32) -> f32 {
        let peak = self.peak();
        if peak <= ceiling || peak == 0.0 {
            return 1.0;
        }
        let gain = ceiling / peak;
        self.scale(gain);
        gain
    }
}
