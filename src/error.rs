//! Error types for the SoundBox crate.
//!
//! Chip-level operations (register writes, clock catch-up, nibble decode)
//! never fail: bad input is masked or clamped. Only the host-facing edges
//! report errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoundBoxError {
    /// Configuration JSON could not be parsed.
    #[error("invalid sound box configuration: {0}")]
    Config(#[source] serde_json::Error),

    /// A state blob did not have the shape of a SoundBox state.
    #[error("malformed sound box state: {0}")]
    State(#[source] serde_json::Error),

    /// The requested host rate exceeds what the decimating resampler can produce.
    #[error("sound rate {rate} Hz is above the synthesis rate of {max} Hz")]
    SoundRate { rate: u32, max: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
