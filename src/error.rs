//! Error types for synthesis, mixing, isolation and PCM I/O.

use std::io;
use thiserror::Error;

/// Everything that can go wrong while building or combining tracks.
#[derive(Error, Debug)]
pub enum SynthError {
    /// The registry has no spec for this instrument id.
    #[error("Unsupported instrument: {0}")]
    UnsupportedInstrument(String),

    /// A spec exists but no synthesizer handles its family.
    #[error("Unknown instrument type '{family}' for instrument {instrument}")]
    UnknownInstrumentType { instrument: String, family: String },

    /// The isolation engine has no band config for this instrument.
    #[error("Unsupported isolation target: {0}")]
    UnsupportedIsolationTarget(String),

    /// A note failed validation before synthesis.
    #[error("Invalid note #{index}: {reason}")]
    InvalidNote { index: usize, reason: String },

    /// A mixer gain was negative or not finite.
    #[error("Invalid gain {gain} for track '{track}'")]
    InvalidGain { track: String, gain: f32 },

    /// The call context has a tempo or duration synthesis cannot use.
    #[error("Invalid context: {0}")]
    InvalidContext(String),

    /// Mixer inputs were rendered at different sample rates.
    #[error("Track '{track}' is at {found} Hz, mix is at {expected} Hz")]
    SampleRateMismatch {
        track: String,
        expected: u32,
        found: u32,
    },

    /// An instrument spec failed validation on registration.
    #[error("Invalid instrument spec {id}: {reason}")]
    InvalidSpec { id: String, reason: String },

    /// The pattern kind does not match the instrument (drum pattern for a
    /// melodic instrument or the reverse).
    #[error("Instrument {instrument} expects a {expected} pattern")]
    PatternMismatch {
        instrument: String,
        expected: &'static str,
    },

    /// Malformed WAV bytes.
    #[error("Invalid WAV data: {0}")]
    InvalidWav(String),

    /// Short-time transform failure.
    #[error("Spectral processing error: {0}")]
    Spectral(String),

    /// Malformed JSON spec or configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for synthesis operations
pub type Result<T> = std::result::Result<T, SynthError>;

#[cfg(feature = "wav")]
impl From<hound::Error> for SynthError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => SynthError::Io(io),
            other => SynthError::InvalidWav(other.to_string()),
        }
    }
}

impl From<realfft::FftError> for SynthError {
    fn from(e: realfft::FftError) -> Self {
        SynthError::Spectral(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let e = SynthError::UnsupportedInstrument("theremin".into());
        assert_eq!(e.to_string(), "Unsupported instrument: theremin");

        let e = SynthError::UnknownInstrumentType {
            instrument: "glass_harp".into(),
            family: "idiophone".into(),
        };
        assert!(e.to_string().contains("idiophone"));
        assert!(e.to_string().contains("glass_harp"));
    }

    #[test]
    fn json_errors_convert() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: SynthError = parse.unwrap_err().into();
        assert!(matches!(err, SynthError::Json(_)));
    }
}
