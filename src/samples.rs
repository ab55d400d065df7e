//! Recorded-sample lookup.
//!
//! Synthesis never needs samples; this is the lookup used by callers that
//! prefer a recording when one exists. A library is laid out as
//! `<root>/<family>/<midi>_<layer>.wav`, where the layer is `pp`, `mf` or `ff`.

use std::path::{Path, PathBuf};

use crate::instrument::Family;

/// Velocity layers, softest first.
pub const LAYERS: [&str; 3] = ["pp", "mf", "ff"];

/// Recorded layer for a velocity in [0, 1].
pub fn velocity_layer(velocity: f64) -> &'static str {
    if velocity < 0.4 {
        "pp"
    } else if velocity < 0.75 {
        "mf"
    } else {
        "ff"
    }
}

/// Finds recorded notes.
pub trait SampleLibrary: Send + Sync {
    /// File for `pitch` (MIDI note) at `velocity`, if the library has one.
    fn get_note(&self, family: &Family, pitch: u8, velocity: f64) -> Option<PathBuf>;
}

/// A sample library stored as plain files under one root directory.
#[derive(Debug, Clone)]
pub struct DirectorySampleLibrary {
    root: PathBuf,
}

impl DirectorySampleLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySampleLibrary { root: root.into() }
    }

    /// Library in the platform data directory (e.g. `~/.local/share/instrument-synth/samples`).
    #[cfg(feature = "sample-library")]
    pub fn platform_default() -> Option<Self> {
        directories::ProjectDirs::from("org", "instrument-synth", "instrument-synth")
            .map(|dirs| DirectorySampleLibrary::new(dirs.data_dir().join("samples")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn note_path(&self, family: &Family, pitch: u8, layer: &str) -> PathBuf {
        self.root
            .join(family.as_str())
            .join(format!("{pitch}_{layer}.wav"))
    }
}

impl SampleLibrary for DirectorySampleLibrary {
    /// Tries the matching velocity layer first, then the nearest other
    /// layers.
    fn get_note(&self, family: &Family, pitch: u8, velocity: f64) -> Option<PathBuf> {
        let wanted = velocity_layer(velocity);
        let wanted_idx = LAYERS.iter().position(|&l| l == wanted).unwrap_or(1);
        let mut order: Vec<usize> = (0..LAYERS.len()).collect();
        order.sort_by_key(|&i| (i as isize - wanted_idx as isize).abs());

        let found = order
            .into_iter()
            .map(|i| self.note_path(family, pitch, LAYERS[i]))
            .find(|path| path.is_file());
        if found.is_none() {
            log::trace!("no sample for {family} note {pitch} ({wanted})");
        }
        found
    }
}
