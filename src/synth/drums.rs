//! Drum synthesis.
//!
//! Percussion tracks are produced by a [`DrumSynthesizer`]. The default,
//! [`ProceduralDrums`], builds each hit from pitch-swept sines and filtered
//! noise and lays the pattern out on a sixteenth-note grid, looping it until
//! the track is full.

use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::call_seed;
use crate::config::{HEADROOM, SAMPLE_RATE};
use crate::dsp::buffer::{SampleBuffer, samples_for};
use crate::dsp::filter::{BiquadFilter, FilterType};
use crate::pattern::{Context, DrumPattern, MAX_DURATION};

/// Renders a drum pattern into one track.
pub trait DrumSynthesizer {
    /// `instrument_id` names the track so separate percussion parts can
    /// vary independently.
    fn synthesize_drums(
        &self,
        instrument_id: &str,
        pattern: &DrumPattern,
        context: &Context,
    ) -> SampleBuffer;
}

/// Synthesized kit: kick, snare, hats, tom, cymbals and clap.
#[derive(Debug, Clone)]
pub struct ProceduralDrums {
    sample_rate: u32,
    headroom: f32,
}

impl Default for ProceduralDrums {
    fn default() -> Self {
        ProceduralDrums::new(SAMPLE_RATE, HEADROOM)
    }
}

/// Kit pieces the procedural kit knows how to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrumPart {
    Kick,
    Snare,
    HiHat,
    OpenHat,
    Tom,
    Crash,
    Ride,
    Clap,
}

impl DrumPart {
    /// Map a pattern part name (and optional tone tag) to a kit piece.
    pub fn parse(name: &str, tone: Option<&str>) -> Option<Self> {
        let part = match name {
            "kick" | "bassDrum" => DrumPart::Kick,
            "snare" => DrumPart::Snare,
            "hiHat" | "hihat" | "hi_hat" | "closedHat" => DrumPart::HiHat,
            "openHat" | "open_hat" => DrumPart::OpenHat,
            "tom" | "toms" => DrumPart::Tom,
            "crash" | "cymbal" => DrumPart::Crash,
            "ride" => DrumPart::Ride,
            "clap" => DrumPart::Clap,
            _ => return None,
        };
        Some(match (part, tone) {
            (DrumPart::HiHat, Some("open")) => DrumPart::OpenHat,
            (part, _) => part,
        })
    }

    /// Ring time in seconds.
    fn length(self) -> f64 {
        match self {
            DrumPart::Kick => 0.45,
            DrumPart::Snare => 0.25,
            DrumPart::HiHat => 0.06,
            DrumPart::OpenHat => 0.35,
            DrumPart::Tom => 0.4,
            DrumPart::Crash => 1.5,
            DrumPart::Ride => 0.8,
            DrumPart::Clap => 0.2,
        }
    }
}

impl ProceduralDrums {
    pub fn new(sample_rate: u32, headroom: f32) -> Self {
        ProceduralDrums {
            sample_rate,
            headroom,
        }
    }

    /// Render one hit of `part` at full intensity.
    pub fn hit(&self, part: DrumPart, tone: Option<&str>, rng: &mut Pcg32) -> Vec<f64> {
        let sr = self.sample_rate as f64;
        let len = samples_for(part.length(), self.sample_rate);
        match part {
            DrumPart::Kick => {
                let (start, end) = if tone == Some("sub") { (110.0, 38.0) } else { (150.0, 50.0) };
                sweep(len, sr, start, end, 30.0, 8.0)
            }
            DrumPart::Tom => sweep(len, sr, 220.0, 110.0, 20.0, 9.0),
            DrumPart::Snare => {
                let decay = if tone == Some("rimshot") { 28.0 } else { 18.0 };
                let body = sweep(len, sr, 200.0, 180.0, 0.0, 25.0);
                let rattle = filtered_noise(len, sr, rng, FilterType::Bandpass, 3000.0, 0.8, decay);
                body.iter()
                    .zip(&rattle)
                    .map(|(b, r)| 0.45 * b + 0.75 * r)
                    .collect()
            }
            DrumPart::HiHat => filtered_noise(len, sr, rng, FilterType::Highpass, 7000.0, 0.707, 60.0),
            DrumPart::OpenHat => filtered_noise(len, sr, rng, FilterType::Highpass, 6500.0, 0.707, 9.0),
            DrumPart::Crash => filtered_noise(len, sr, rng, FilterType::Highpass, 4000.0, 0.5, 2.5),
            DrumPart::Ride => {
                let ping = sweep(len, sr, 520.0, 520.0, 0.0, 4.0);
                let wash = filtered_noise(len, sr, rng, FilterType::Highpass, 5000.0, 0.707, 5.0);
                ping.iter().zip(&wash).map(|(p, w)| 0.3 * p + 0.5 * w).collect()
            }
            DrumPart::Clap => {
                let mut out = filtered_noise(len, sr, rng, FilterType::Bandpass, 1200.0, 1.2, 22.0);
                // three quick re-triggers before the tail
                for (i, s) in out.iter_mut().enumerate() {
                    let t = i as f64 / sr;
                    if t < 0.03 && ((t * 100.0) as usize) % 2 == 1 {
                        *s *= 0.3;
                    }
                }
                out
            }
        }
    }
}

impl DrumSynthesizer for ProceduralDrums {
    fn synthesize_drums(
        &self,
        instrument_id: &str,
        pattern: &DrumPattern,
        context: &Context,
    ) -> SampleBuffer {
        let step = context.sixteenth();
        let steps = pattern.steps();
        let loop_len = steps as f64 * step;

        let len = if context.duration > 0.0 {
            samples_for(context.duration.min(MAX_DURATION), self.sample_rate)
        } else {
            samples_for(loop_len + 1.5, self.sample_rate)
        };
        let mut track = SampleBuffer::silent_at(len, self.sample_rate);
        let loop_samples = samples_for(loop_len, self.sample_rate);
        if steps == 0 || loop_samples == 0 {
            return track;
        }
        let bars = if context.duration > 0.0 {
            len.div_ceil(loop_samples)
        } else {
            1
        };

        let mut rng = Pcg32::seed_from_u64(call_seed(context.seed, instrument_id));
        let mut hits = 0usize;
        for bar in 0..bars {
            let bar_start = bar as f64 * loop_len;
            if samples_for(bar_start, self.sample_rate) >= len {
                break;
            }
            for (name, sequence) in &pattern.parts {
                for (i, hit) in sequence.iter().enumerate() {
                    if hit.hit <= 0.0 {
                        continue;
                    }
                    let Some(part) = DrumPart::parse(name, hit.tone.as_deref()) else {
                        if bar == 0 && i == 0 {
                            log::warn!("unknown drum part '{name}', skipping");
                        }
                        continue;
                    };
                    let time = bar_start + i as f64 * step * hit.timing.max(0.0);
                    let offset = samples_for(time, self.sample_rate);
                    if offset >= len {
                        continue;
                    }
                    let intensity = hit.hit.min(1.0);
                    let voice: Vec<f32> = self
                        .hit(part, hit.tone.as_deref(), &mut rng)
                        .into_iter()
                        .map(|s| (s * intensity) as f32)
                        .collect();
                    track.overlay(&voice, offset);
                    hits += 1;
                }
            }
        }

        let gain = track.limit_peak(self.headroom);
        log::debug!("{instrument_id}: {hits} hits over {bars} bars (limiter gain {gain:.3})");
        track
    }
}

/// Exponentially decaying sine whose pitch glides from `start` to `end` Hz.
/// `glide` sets how fast the pitch settles, `decay` the amplitude decay rate.
fn sweep(len: usize, sr: f64, start: f64, end: f64, glide: f64, decay: f64) -> Vec<f64> {
    let mut phase = 0.0;
    (0..len)
        .map(|i| {
            let t = i as f64 / sr;
            let freq = end + (start - end) * (-glide * t).exp();
            phase += 2.0 * PI * freq / sr;
            phase.sin() * (-decay * t).exp()
        })
        .collect()
}

/// White noise through a biquad with an exponential decay.
fn filtered_noise(
    len: usize,
    sr: f64,
    rng: &mut Pcg32,
    filter_type: FilterType,
    frequency: f64,
    q: f64,
    decay: f64,
) -> Vec<f64> {
    let mut filter = BiquadFilter::new(filter_type, frequency, q, sr);
    let mut out: Vec<f64> = (0..len).map(|_| rng.random_range(-1.0..1.0)).collect();
    filter.process_buffer(&mut out);
    for (i, s) in out.iter_mut().enumerate() {
        *s *= (-decay * i as f64 / sr).exp();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::DrumHit;

    fn backbeat() -> DrumPattern {
        let mut kick = vec![DrumHit::rest(); 16];
        kick[0] = DrumHit::new(1.0);
        kick[8] = DrumHit::new(0.9);
        let mut snare = vec![DrumHit::rest(); 16];
        snare[4] = DrumHit::new(0.8);
        snare[12] = DrumHit::new(0.8);
        DrumPattern::new()
            .part("kick", kick)
            .part("snare", snare)
            .part("hiHat", vec![DrumHit::new(0.5); 16])
    }

    #[test]
    fn fills_track_and_respects_headroom() {
        let drums = ProceduralDrums::default();
        let ctx = Context::with_duration(4.0);
        let buf = drums.synthesize_drums("drums", &backbeat(), &ctx);
        assert_eq!(buf.len(), 176_400);
        assert!(buf.peak() <= 0.95 + 1e-6);
        // the one-bar pattern loops: the second bar starts with a kick
        let second_bar = 88_200;
        assert!(buf.samples[second_bar..second_bar + 2205].iter().any(|s| s.abs() > 0.05));
    }

    #[test]
    fn rests_stay_silent() {
        let drums = ProceduralDrums::default();
        let pattern = DrumPattern::new().part(
            "kick",
            vec![DrumHit::rest(), DrumHit::rest(), DrumHit::rest(), DrumHit::new(1.0)],
        );
        let buf = drums.synthesize_drums("drums", &pattern, &Context::with_duration(0.5));
        // first hit at step 3 = 0.375 s
        assert!(buf.samples[..16_000].iter().all(|&s| s == 0.0));
        assert!(!buf.is_silent());
    }

    #[test]
    fn deterministic_for_seed() {
        let drums = ProceduralDrums::default();
        let ctx = Context::with_duration(1.0);
        let a = drums.synthesize_drums("drums", &backbeat(), &ctx);
        let b = drums.synthesize_drums("drums", &backbeat(), &ctx);
        assert_eq!(a, b);
    }

    #[test]
    fn percussion_parts_get_their_own_noise() {
        let drums = ProceduralDrums::default();
        let hats = DrumPattern::new().part("hiHat", vec![DrumHit::new(0.7); 4]);
        let ctx = Context::with_duration(0.5);
        let kick = drums.synthesize_drums("kick", &hats, &ctx);
        let snare = drums.synthesize_drums("snare", &hats, &ctx);
        assert_ne!(kick.samples, snare.samples);
    }

    #[test]
    fn extreme_tempos_stay_bounded() {
        let drums = ProceduralDrums::default();
        let pattern = DrumPattern::new().part("kick", vec![DrumHit::new(1.0), DrumHit::rest()]);
        let fast = Context {
            tempo: 1e300,
            ..Context::with_duration(0.5)
        };
        assert_eq!(drums.synthesize_drums("drums", &pattern, &fast).len(), 22_050);
        let slow = Context {
            tempo: 1e-300,
            ..Context::with_duration(0.0)
        };
        // clamped to 1 bpm: two sixteenths of 15 s plus the 1.5 s tail
        let buf = drums.synthesize_drums("drums", &pattern, &slow);
        assert_eq!(buf.len(), samples_for(31.5, 44_100));
    }

    #[test]
    fn parses_part_names_and_tones() {
        assert_eq!(DrumPart::parse("hiHat", None), Some(DrumPart::HiHat));
        assert_eq!(DrumPart::parse("hiHat", Some("open")), Some(DrumPart::OpenHat));
        assert_eq!(DrumPart::parse("cowbell", None), None);
    }

    #[test]
    fn empty_pattern_is_silent() {
        let drums = ProceduralDrums::default();
        let buf = drums.synthesize_drums("drums", &DrumPattern::new(), &Context::with_duration(1.0));
        assert_eq!(buf.len(), 44_100);
        assert!(buf.is_silent());
    }
}
