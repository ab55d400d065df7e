//! Spectral analysis and band isolation.
//!
//! [`Stft`] is the default [`SpectralAnalyzer`]; [`IsolationEngine`] masks a
//! target instrument's band out of a mixed buffer and scores the result.

pub mod analyzer;
pub mod isolation;
pub mod pitch;

pub use analyzer::{SpectralAnalyzer, Spectrogram, Stft};
pub use isolation::{Band, IsolationEngine, IsolationResult, QualityScore};
pub use pitch::{PitchEstimate, detect_pitch};
