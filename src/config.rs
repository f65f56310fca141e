//! SoundBox configuration
//!
//! Settings the host decides once per session. Stored as JSON so a frontend
//! can persist them next to its other settings.

use crate::error::SoundBoxError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default host output rate.
pub const DEFAULT_SOUND_RATE: u32 = 48_000;

/// Gain applied to the PSG output.
pub const DEFAULT_PSG_VOLUME: f64 = 0.681;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundBoxConfig {
    /// Reproduce the quantization bug of the official ADPCM encoder.
    pub emulate_buggy_codec: bool,
    /// Fade out the pre-reset sample instead of snapping to zero.
    pub reset_anti_click: bool,
    /// Host output rate in Hz. `0` disables sound output.
    pub sound_rate: u32,
    /// PSG output gain.
    pub psg_volume: f64,
}

impl Default for SoundBoxConfig {
    fn default() -> Self {
        Self {
            emulate_buggy_codec: false,
            reset_anti_click: true,
            sound_rate: DEFAULT_SOUND_RATE,
            psg_volume: DEFAULT_PSG_VOLUME,
        }
    }
}

impl SoundBoxConfig {
    pub fn from_json(json: &str) -> Result<Self, SoundBoxError> {
        serde_json::from_str(json).map_err(SoundBoxError::Config)
    }

    /// Load a config file, falling back to defaults when it is missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_json(&content) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("{}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SoundBoxError> {
        let json = serde_json::to_string_pretty(self).map_err(SoundBoxError::Config)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
