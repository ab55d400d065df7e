//! Mixer: layers independently synthesized tracks into one buffer.
//!
//! Each track is normalized on its own (gain capped so it alone stays under
//! the ceiling), the tracks are summed, and the sum is scaled down by a
//! single factor if it still exceeds the ceiling. All tracks must share one
//! sample rate.

use crate::config::{HEADROOM, SAMPLE_RATE};
use crate::dsp::buffer::SampleBuffer;
use crate::error::{Result, SynthError};

/// One mixer input.
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub buffer: SampleBuffer,
    /// Target gain in [0, 1]. `None` uses `1/√N` for N tracks.
    pub volume: Option<f32>,
}

impl Track {
    pub fn new(name: impl Into<String>, buffer: SampleBuffer) -> Self {
        Track {
            name: name.into(),
            buffer,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// Output of [`Mixer::mix`].
#[derive(Debug, Clone)]
pub struct MixResult {
    pub buffer: SampleBuffer,
    /// Peak absolute sample of the final mix.
    pub peak: f32,
    /// Tracks that contributed audio (silent and empty tracks excluded).
    pub tracks_mixed: usize,
}

/// A summing mixer with per-track normalization and a global ceiling.
#[derive(Debug, Clone)]
pub struct Mixer {
    /// Peak ceiling for individual tracks and for the final mix.
    pub ceiling: f32,
    pub sample_rate: u32,
}

impl Default for Mixer {
    fn default() -> Self {
        Mixer::new()
    }
}

impl Mixer {
    pub fn new() -> Self {
        Mixer {
            ceiling: HEADROOM,
            sample_rate: SAMPLE_RATE,
        }
    }

    /// Gain used for tracks without an explicit volume.
    pub fn default_gain(track_count: usize) -> f32 {
        if track_count == 0 {
            return 0.0;
        }
        1.0 / (track_count as f32).sqrt()
    }

    /// Gain actually applied to a track: the requested gain, capped so the
    /// track alone peaks at the ceiling. Silent tracks get zero.
    pub fn track_gain(&self, requested: f32, peak: f32) -> f32 {
        if peak <= 0.0 {
            return 0.0;
        }
        requested.min(self.ceiling / peak)
    }

    /// Mix `tracks` into a new buffer. Inputs are not modified.
    pub fn mix(&self, tracks: &[Track]) -> Result<MixResult> {
        let default_gain = Self::default_gain(tracks.len());
        for track in tracks {
            if let Some(gain) = track.volume {
                if !gain.is_finite() || gain < 0.0 {
                    return Err(SynthError::InvalidGain {
                        track: track.name.clone(),
                        gain,
                    });
                }
            }
        }

        let sample_rate = tracks
            .first()
            .map(|t| t.buffer.sample_rate)
            .unwrap_or(self.sample_rate);
        if let Some(track) = tracks.iter().find(|t| t.buffer.sample_rate != sample_rate) {
            return Err(SynthError::SampleRateMismatch {
                track: track.name.clone(),
                expected: sample_rate,
                found: track.buffer.sample_rate,
            });
        }

        let len = tracks.iter().map(|t| t.buffer.len()).max().unwrap_or(0);
        let mut output = SampleBuffer::silent_at(len, sample_rate);

        let mut mixed = 0usize;
        for track in tracks {
            let requested = track.volume.unwrap_or(default_gain);
            let gain = self.track_gain(requested, track.buffer.peak());
            if gain == 0.0 {
                continue;
            }
            log::debug!("mix: '{}' gain {gain:.3} (requested {requested:.3})", track.name);
            for (dst, &src) in output.samples.iter_mut().zip(&track.buffer.samples) {
                *dst += src * gain;
            }
            mixed += 1;
        }

        output.limit_peak(self.ceiling);
        let peak = output.peak();
        Ok(MixResult {
            buffer: output,
            peak,
            tracks_mixed: mixed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, amplitude: f32, len: usize) -> SampleBuffer {
        let samples = (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / 44_100.0).sin())
            .collect();
        SampleBuffer::from_samples(samples, 44_100)
    }

    #[test]
    fn empty_mix() {
        let result = Mixer::new().mix(&[]).unwrap();
        assert!(result.buffer.is_empty());
        assert_eq!(result.tracks_mixed, 0);
        assert_eq!(result.peak, 0.0);
    }

    #[test]
    fn output_length_is_longest_track() {
        let tracks = vec![
            Track::new("short", sine(220.0, 0.5, 1000)),
            Track::new("long", sine(330.0, 0.5, 5000)),
        ];
        let result = Mixer::new().mix(&tracks).unwrap();
        assert_eq!(result.buffer.len(), 5000);
        assert_eq!(result.tracks_mixed, 2);
    }

    #[test]
    fn two_identical_tracks_do_not_clip() {
        // sine with RMS 0.5 has amplitude 0.5·√2
        let a = sine(440.0, 0.5 * 2f32.sqrt(), 44_100);
        assert!((a.rms() - 0.5).abs() < 0.01);
        let tracks = vec![Track::new("a", a.clone()), Track::new("b", a)];
        let result = Mixer::new().mix(&tracks).unwrap();
        assert!(result.peak <= 0.95 + 1e-6, "peak {}", result.peak);
    }

    #[test]
    fn peak_never_exceeds_ceiling() {
        for n in 1..8 {
            let tracks: Vec<Track> = (0..n)
                .map(|i| {
                    Track::new(format!("t{i}"), sine(110.0 * (i + 1) as f32, 3.0, 4410))
                        .with_volume(1.0)
                })
                .collect();
            let result = Mixer::new().mix(&tracks).unwrap();
            assert!(result.peak <= 0.95 + 1e-6, "{n} tracks peak {}", result.peak);
            assert!(result.buffer.samples.iter().all(|s| s.abs() <= 0.95 + 1e-6));
        }
    }

    #[test]
    fn mixing_is_commutative() {
        let a = Track::new("a", sine(220.0, 0.7, 3000)).with_volume(0.6);
        let b = Track::new("b", sine(330.0, 0.4, 2000)).with_volume(0.8);
        let ab = Mixer::new().mix(&[a.clone(), b.clone()]).unwrap();
        let ba = Mixer::new().mix(&[b, a]).unwrap();
        for (x, y) in ab.buffer.samples.iter().zip(&ba.buffer.samples) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn per_track_gain_is_capped_by_peak() {
        let m = Mixer::new();
        assert_eq!(m.track_gain(0.5, 0.5), 0.5);
        assert!((m.track_gain(1.0, 2.0) - 0.475).abs() < 1e-6);
        assert_eq!(m.track_gain(1.0, 0.0), 0.0);
    }

    #[test]
    fn silent_and_empty_tracks_contribute_nothing() {
        let tracks = vec![
            Track::new("empty", SampleBuffer::silent(0)),
            Track::new("silent", SampleBuffer::silent(100)),
            Track::new("tone", sine(440.0, 0.5, 100)).with_volume(1.0),
        ];
        let result = Mixer::new().mix(&tracks).unwrap();
        assert_eq!(result.tracks_mixed, 1);
        assert!(result.buffer.samples.iter().all(|s| s.is_finite()));
        assert_eq!(result.buffer.samples, tracks[2].buffer.samples);
    }

    #[test]
    fn rejects_bad_gains() {
        for gain in [-0.1, f32::NAN, f32::INFINITY] {
            let tracks = vec![Track::new("bad", sine(440.0, 0.5, 10)).with_volume(gain)];
            assert!(matches!(
                Mixer::new().mix(&tracks),
                Err(SynthError::InvalidGain { .. })
            ));
        }
    }

    #[test]
    fn rejects_mixed_sample_rates() {
        let half_rate = SampleBuffer::from_samples(vec![0.25; 50], 22_050);
        let tracks = vec![
            Track::new("tone", sine(440.0, 0.5, 100)),
            Track::new("slow", half_rate),
        ];
        match Mixer::new().mix(&tracks) {
            Err(SynthError::SampleRateMismatch {
                track,
                expected,
                found,
            }) => {
                assert_eq!(track, "slow");
                assert_eq!((expected, found), (44_100, 22_050));
            }
            other => panic!("expected a sample rate mismatch, got {other:?}"),
        }
    }

    #[test]
    fn inputs_are_untouched() {
        let tracks = vec![Track::new("loud", sine(440.0, 4.0, 500)).with_volume(1.0)];
        let before = tracks[0].buffer.clone();
        Mixer::new().mix(&tracks).unwrap();
        assert_eq!(tracks[0].buffer, before);
    }
}
