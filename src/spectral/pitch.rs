//! Fundamental-frequency estimation.
//!
//! Autocorrelation-style pitch detection (YIN difference function with
//! cumulative mean normalization and parabolic refinement).

/// Result of pitch detection on a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchEstimate {
    /// Estimated fundamental frequency in Hz.
    pub frequency: f64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Nearest MIDI note number.
    pub midi_note: u8,
    /// Offset in cents from the nearest MIDI note.
    pub cents: f64,
    /// The buffer looks non-melodic (noise, drums, silence).
    pub is_noise: bool,
}

impl PitchEstimate {
    fn none() -> Self {
        PitchEstimate {
            frequency: 0.0,
            confidence: 0.0,
            midi_note: 0,
            cents: 0.0,
            is_noise: true,
        }
    }
}

const YIN_THRESHOLD: f64 = 0.15;

/// Detect the fundamental frequency of a mono buffer.
///
/// `min_freq` defaults to 50 Hz and `max_freq` to 2000 Hz. The buffer must
/// hold at least two periods of the lowest detectable frequency.
pub fn detect_pitch(
    samples: &[f32],
    sample_rate: u32,
    min_freq: Option<f64>,
    max_freq: Option<f64>,
) -> PitchEstimate {
    let sr = sample_rate as f64;
    let min_f = min_freq.unwrap_or(50.0);
    let max_f = max_freq.unwrap_or(2000.0);
    if min_f <= 0.0 || max_f <= min_f {
        return PitchEstimate::none();
    }

    let min_lag = ((sr / max_f).ceil() as usize).max(1);
    let max_lag = (sr / min_f).floor() as usize;
    if samples.len() < max_lag * 2 || max_lag <= min_lag {
        return PitchEstimate::none();
    }
    let window = max_lag;

    // difference function
    let mut diff = vec![0.0f64; window + 1];
    for (tau, d) in diff.iter_mut().enumerate().skip(1) {
        *d = (0..window)
            .map(|j| {
                let x = samples[j] as f64 - samples[j + tau] as f64;
                x * x
            })
            .sum();
    }

    // cumulative mean normalized difference
    let mut cmnd = vec![1.0f64; window + 1];
    let mut running = 0.0;
    for tau in 1..=window {
        running += diff[tau];
        if running > 0.0 {
            cmnd[tau] = diff[tau] * tau as f64 / running;
        }
    }

    let mut best_tau = 0usize;
    let mut best_val = 1.0f64;
    for tau in min_lag..=window {
        if cmnd[tau] < YIN_THRESHOLD {
            let mut t = tau;
            while t < window && cmnd[t + 1] < cmnd[t] {
                t += 1;
            }
            best_tau = t;
            best_val = cmnd[t];
            break;
        }
    }
    if best_tau == 0 {
        for tau in min_lag..=window {
            if cmnd[tau] < best_val {
                best_val = cmnd[tau];
                best_tau = tau;
            }
        }
    }
    if best_tau == 0 {
        return PitchEstimate::none();
    }

    let tau = if best_tau < window {
        let (a, b, c) = (cmnd[best_tau - 1], cmnd[best_tau], cmnd[best_tau + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > 1e-12 {
            best_tau as f64 + 0.5 * (a - c) / denom
        } else {
            best_tau as f64
        }
    } else {
        best_tau as f64
    };

    let frequency = sr / tau;
    let confidence = (1.0 - best_val).clamp(0.0, 1.0);
    let (midi_note, cents) = freq_to_midi_cents(frequency);
    PitchEstimate {
        frequency,
        confidence,
        midi_note,
        cents,
        is_noise: confidence < 0.5,
    }
}

/// Nearest MIDI note (A4 = 440 Hz) and the offset from it in cents.
pub fn freq_to_midi_cents(freq: f64) -> (u8, f64) {
    if freq <= 0.0 {
        return (0, 0.0);
    }
    let midi = 69.0 + 12.0 * (freq / 440.0).log2();
    let nearest = midi.round() as i32;
    ((nearest.clamp(0, 127)) as u8, (midi - nearest as f64) * 100.0)
}
