//! Biquad filters for shaping noise in the drum voices.

use std::f64::consts::PI;

/// Filter response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
}

/// A 2nd-order IIR section, Direct Form II Transposed.
/// Coefficients from the Audio EQ Cookbook.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, frequency: f64, q: f64, sample_rate: f64) -> Self {
        let nyquist = sample_rate / 2.0;
        let frequency = frequency.clamp(1.0, nyquist * 0.99);
        let w0 = 2.0 * PI * frequency / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q.max(1e-3));

        let (b0, b1, b2) = match filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
            FilterType::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;

        BiquadFilter {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Filter a whole buffer in place.
    pub fn process_buffer(&mut self, samples: &mut [f64]) {
        for s in samples {
            *s = self.process(*s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(filter: &mut BiquadFilter, input: f64) -> f64 {
        let mut output = 0.0;
        for _ in 0..2000 {
            output = filter.process(input);
        }
        output
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut f = BiquadFilter::new(FilterType::Lowpass, 5000.0, 0.707, 44100.0);
        assert!((settle(&mut f, 1.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = BiquadFilter::new(FilterType::Highpass, 1000.0, 0.707, 44100.0);
        assert!(settle(&mut f, 1.0).abs() < 0.001);
    }

    #[test]
    fn highpass_attenuates_low_freq() {
        let mut f = BiquadFilter::new(FilterType::Highpass, 7000.0, 0.707, 44100.0);
        let mut max_out = 0.0_f64;
        for i in 0..4410 {
            let input = (2.0 * PI * 100.0 * i as f64 / 44100.0).sin();
            let out = f.process(input);
            if i > 1000 {
                max_out = max_out.max(out.abs());
            }
        }
        assert!(max_out < 0.01, "7 kHz highpass let 100 Hz through: {max_out}");
    }

    #[test]
    fn bandpass_output_finite() {
        let mut f = BiquadFilter::new(FilterType::Bandpass, 1000.0, 1.0, 44100.0);
        for i in 0..10000 {
            let input = if i % 100 == 0 { 1.0 } else { 0.0 };
            assert!(f.process(input).is_finite(), "not finite at sample {i}");
        }
    }
}
