//! 16-bit PCM WAV encoding and decoding.
//!
//! In-memory codec for mono (or interleaved multi-channel) little-endian
//! RIFF/WAVE data. With the `wav` feature, [`write_wav_file`] and
//! [`read_wav_file`] go through `hound` for files on disk.

use crate::config::SAMPLE_RATE;
use crate::dsp::buffer::SampleBuffer;
use crate::error::{Result, SynthError};

/// Full-scale value for 16-bit quantization.
pub const PCM_SCALE: f32 = 32767.0;

/// PCM stream layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        PcmFormat {
            sample_rate: SAMPLE_RATE,
            channels: 1,
            bit_depth: 16,
        }
    }
}

/// Clamp to [-1, 1] and quantize to a signed 16-bit sample.
pub fn quantize(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    (s * PCM_SCALE).round() as i16
}

/// Inverse of [`quantize`].
pub fn dequantize(sample: i16) -> f32 {
    (sample as f32 / PCM_SCALE).clamp(-1.0, 1.0)
}

/// Encode a mono buffer as a 16-bit WAV file in memory.
pub fn encode_wav(buffer: &SampleBuffer) -> Vec<u8> {
    let pcm: Vec<i16> = buffer.samples.iter().map(|&s| quantize(s)).collect();
    encode_pcm(
        &pcm,
        PcmFormat {
            sample_rate: buffer.sample_rate,
            ..PcmFormat::default()
        },
    )
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
pub fn encode_pcm(samples: &[i16], format: PcmFormat) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let channels = format.channels.max(1);
    let byte_rate = format.sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&format.sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| SynthError::InvalidWav(format!("truncated at byte {at}")))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| SynthError::InvalidWav(format!("truncated at byte {at}")))
}

/// Decode 16-bit PCM WAV bytes. Multi-channel input is downmixed to mono by
/// averaging the channels of each frame.
pub fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(SynthError::InvalidWav("missing RIFF/WAVE header".into()));
    }

    let mut format: Option<PcmFormat> = None;
    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = read_u32(bytes, pos + 4)? as usize;
        let body = pos + 8;
        match id {
            b"fmt " => {
                let audio_format = read_u16(bytes, body)?;
                if audio_format != 1 {
                    return Err(SynthError::InvalidWav(format!(
                        "unsupported audio format {audio_format}"
                    )));
                }
                let parsed = PcmFormat {
                    channels: read_u16(bytes, body + 2)?,
                    sample_rate: read_u32(bytes, body + 4)?,
                    bit_depth: read_u16(bytes, body + 14)?,
                };
                if parsed.bit_depth != 16 || parsed.channels == 0 {
                    return Err(SynthError::InvalidWav(format!(
                        "expected 16-bit PCM, got {} bits x {} channels",
                        parsed.bit_depth, parsed.channels
                    )));
                }
                format = Some(parsed);
            }
            b"data" => {
                let format = format
                    .ok_or_else(|| SynthError::InvalidWav("data chunk before fmt chunk".into()))?;
                let end = (body + size).min(bytes.len());
                let pcm: Vec<i16> = bytes[body..end]
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]))
                    .collect();
                let channels = format.channels as usize;
                let samples = pcm
                    .chunks_exact(channels)
                    .map(|frame| frame.iter().map(|&s| dequantize(s)).sum::<f32>() / channels as f32)
                    .collect();
                return Ok(SampleBuffer::from_samples(samples, format.sample_rate));
            }
            _ => {}
        }
        // chunks are word-aligned
        pos = body + size + (size & 1);
    }

    Err(SynthError::InvalidWav("no data chunk".into()))
}

/// Write a mono 16-bit WAV file.
#[cfg(feature = "wav")]
pub fn write_wav_file(path: impl AsRef<std::path::Path>, buffer: &SampleBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in &buffer.samples {
        writer.write_sample(quantize(s))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a 16-bit WAV file, downmixing to mono.
#[cfg(feature = "wav")]
pub fn read_wav_file(path: impl AsRef<std::path::Path>) -> Result<SampleBuffer> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(SynthError::InvalidWav(format!(
            "expected 16-bit integer PCM, got {} bits",
            spec.bits_per_sample
        )));
    }
    let pcm = reader.samples::<i16>().collect::<std::result::Result<Vec<_>, _>>()?;
    let channels = spec.channels.max(1) as usize;
    let samples = pcm
        .chunks_exact(channels)
        .map(|frame| frame.iter().map(|&s| dequantize(s)).sum::<f32>() / channels as f32)
        .collect();
    Ok(SampleBuffer::from_samples(samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_mono_16_bit() {
        let wav = encode_wav(&SampleBuffer::silent(100));

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        let ch = u16::from_le_bytes([wav[22], wav[23]]);
        assert_eq!(ch, 1);
        let sr = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(sr, 44100);
        let bits = u16::from_le_bytes([wav[34], wav[35]]);
        assert_eq!(bits, 16);
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 200);
        assert_eq!(wav.len(), 244);
    }

    #[test]
    fn quantization_clamps_and_rounds() {
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.0), -32767);
        assert_eq!(quantize(2.5), 32767);
        assert_eq!(quantize(-7.0), -32767);
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(f32::NAN), 0);
        assert_eq!(quantize(0.5), 16384);
    }

    #[test]
    fn round_trip_error_within_one_step() {
        let samples: Vec<f32> = (0..10_000)
            .map(|i| ((i as f32 * 0.37).sin() * 0.93) + if i % 97 == 0 { 0.05 } else { 0.0 })
            .map(|s| s.clamp(-1.0, 1.0))
            .collect();
        let buffer = SampleBuffer::from_samples(samples, 44_100);
        let decoded = decode_wav(&encode_wav(&buffer)).unwrap();
        assert_eq!(decoded.len(), buffer.len());
        assert_eq!(decoded.sample_rate, 44_100);
        for (a, b) in buffer.samples.iter().zip(&decoded.samples) {
            assert!((a - b).abs() <= 1.0 / PCM_SCALE, "{a} vs {b}");
        }
    }

    #[test]
    fn decodes_stereo_by_averaging() {
        let wav = encode_pcm(
            &[16384, 0, -32767, -32767],
            PcmFormat {
                channels: 2,
                ..PcmFormat::default()
            },
        );
        let decoded = decode_wav(&wav).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!((decoded.samples[0] - 0.25).abs() < 1e-3);
        assert!((decoded.samples[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn skips_unknown_chunks() {
        let mut wav = encode_wav(&SampleBuffer::from_samples(vec![0.5, -0.5], 22_050));
        // splice a LIST chunk between fmt and data
        let list = [b"LIST".as_slice(), &3u32.to_le_bytes(), b"abc\0"].concat();
        wav.splice(36..36, list);
        let decoded = decode_wav(&wav).unwrap();
        assert_eq!(decoded.sample_rate, 22_050);
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_wav(b"nope"), Err(SynthError::InvalidWav(_))));
        let mut wav = encode_wav(&SampleBuffer::silent(4));
        wav[20] = 3; // IEEE float format tag
        assert!(matches!(decode_wav(&wav), Err(SynthError::InvalidWav(_))));
    }

    #[cfg(feature = "wav")]
    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let buffer = SampleBuffer::from_samples(vec![0.0, 0.25, -0.75, 1.0], 44_100);
        write_wav_file(&path, &buffer).unwrap();
        let decoded = read_wav_file(&path).unwrap();
        for (a, b) in buffer.samples.iter().zip(&decoded.samples) {
            assert!((a - b).abs() <= 1.0 / PCM_SCALE);
        }
    }
}
