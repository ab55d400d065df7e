//! Short-time Fourier analysis and overlap-add resynthesis.

use std::f32::consts::PI;
use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::error::{Result, SynthError};

/// Default analysis frame length in samples.
pub const DEFAULT_FRAME_SIZE: usize = 1024;

/// Frames of complex spectra over time.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<Complex<f32>>>,
    pub frame_size: usize,
    pub hop: usize,
    pub sample_rate: u32,
    /// Length of the analyzed signal in samples.
    pub len: usize,
}

impl Spectrogram {
    /// Number of bins per frame (`frame_size / 2 + 1`).
    pub fn bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Centre frequency of bin `k` in Hz.
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.frame_size as f32
    }

    /// Zero every bin whose frequency fails `keep`.
    pub fn apply_mask(&mut self, keep: impl Fn(f32) -> bool) {
        let mask: Vec<bool> = (0..self.bins()).map(|k| keep(self.bin_frequency(k))).collect();
        for frame in &mut self.frames {
            for (bin, &pass) in frame.iter_mut().zip(&mask) {
                if !pass {
                    *bin = Complex::new(0.0, 0.0);
                }
            }
        }
    }

    /// Summed squared magnitude of the bins accepted by `select`.
    pub fn energy_where(&self, select: impl Fn(f32) -> bool) -> f64 {
        let mask: Vec<bool> = (0..self.bins()).map(|k| select(self.bin_frequency(k))).collect();
        self.frames
            .iter()
            .flat_map(|frame| frame.iter().zip(&mask))
            .filter(|(_, pass)| **pass)
            .map(|(bin, _)| bin.norm_sqr() as f64)
            .sum()
    }

    pub fn energy(&self) -> f64 {
        self.energy_where(|_| true)
    }

    /// Energy of each frame, in time order.
    pub fn frame_energies(&self) -> Vec<f64> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|bin| bin.norm_sqr() as f64).sum())
            .collect()
    }
}

/// Forward and inverse spectral transform used by the isolation engine.
pub trait SpectralAnalyzer {
    fn analyze(&self, samples: &[f32], sample_rate: u32) -> Result<Spectrogram>;
    /// Inverse of [`SpectralAnalyzer::analyze`], returning `spectrogram.len` samples.
    fn resynthesize(&self, spectrogram: &Spectrogram) -> Result<Vec<f32>>;
}

/// Hann-windowed STFT with 50 % overlap.
///
/// The periodic Hann window sums to exactly one at half-frame hops, so
/// overlap-adding the unmodified inverse frames reconstructs the input.
/// The signal is padded by half a frame at the start so every sample is
/// covered by two frames.
pub struct Stft {
    frame_size: usize,
    window: Vec<f32>,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
}

impl Default for Stft {
    fn default() -> Self {
        Stft::build(DEFAULT_FRAME_SIZE)
    }
}

impl Stft {
    /// Frame size must be even and at least 4.
    pub fn with_frame_size(frame_size: usize) -> Result<Self> {
        if frame_size < 4 || frame_size % 2 != 0 {
            return Err(SynthError::Spectral(format!(
                "frame size must be even and >= 4, got {frame_size}"
            )));
        }
        Ok(Stft::build(frame_size))
    }

    fn build(frame_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let window = (0..frame_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / frame_size as f32).cos()))
            .collect();
        Stft {
            frame_size,
            window,
            forward: planner.plan_fft_forward(frame_size),
            inverse: planner.plan_fft_inverse(frame_size),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop(&self) -> usize {
        self.frame_size / 2
    }

    fn frame_count(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (len - 1 + self.hop()) / self.hop() + 1
    }
}

impl SpectralAnalyzer for Stft {
    fn analyze(&self, samples: &[f32], sample_rate: u32) -> Result<Spectrogram> {
        let n = self.frame_size;
        let hop = self.hop();
        let count = self.frame_count(samples.len());

        let mut padded = vec![0.0f32; (count.max(1) - 1) * hop + n];
        padded[hop..hop + samples.len()].copy_from_slice(samples);

        let mut scratch = self.forward.make_input_vec();
        let mut frames = Vec::with_capacity(count);
        for k in 0..count {
            let start = k * hop;
            for ((dst, &src), &w) in scratch
                .iter_mut()
                .zip(&padded[start..start + n])
                .zip(&self.window)
            {
                *dst = src * w;
            }
            let mut spectrum = self.forward.make_output_vec();
            self.forward.process(&mut scratch, &mut spectrum)?;
            frames.push(spectrum);
        }

        Ok(Spectrogram {
            frames,
            frame_size: n,
            hop,
            sample_rate,
            len: samples.len(),
        })
    }

    fn resynthesize(&self, spectrogram: &Spectrogram) -> Result<Vec<f32>> {
        if spectrogram.frame_size != self.frame_size {
            return Err(SynthError::Spectral(format!(
                "spectrogram frame size {} does not match analyzer frame size {}",
                spectrogram.frame_size, self.frame_size
            )));
        }
        let n = self.frame_size;
        let hop = self.hop();
        if spectrogram.frames.is_empty() {
            return Ok(vec![0.0; spectrogram.len]);
        }

        let mut out = vec![0.0f32; (spectrogram.frames.len() - 1) * hop + n];
        let mut time = self.inverse.make_output_vec();
        let scale = 1.0 / n as f32;
        for (k, frame) in spectrogram.frames.iter().enumerate() {
            let mut spectrum = frame.clone();
            // DC and Nyquist bins of a real signal have no imaginary part
            if let Some(first) = spectrum.first_mut() {
                first.im = 0.0;
            }
            if let Some(last) = spectrum.last_mut() {
                last.im = 0.0;
            }
            self.inverse.process(&mut spectrum, &mut time)?;
            let start = k * hop;
            for (dst, &s) in out[start..start + n].iter_mut().zip(&time) {
                *dst += s * scale;
            }
        }

        let end = (hop + spectrogram.len).min(out.len());
        let mut samples = out[hop..end].to_vec();
        samples.resize(spectrogram.len, 0.0);
        Ok(samples)
    }
}
