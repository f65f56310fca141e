//! Per-channel ADPCM nibble decoder
//!
//! Each of the two channels consumes a 16-bit half-word from KING four bits
//! at a time, low nibble first. A nibble becomes a signed delta scaled by the
//! current quantizer step; the delta is queued and applied to the 15-bit
//! predictor once per sample period (or spread over several periods when
//! linear interpolation is on).

use super::tables::{MAX_STEP_INDEX, STEP_INDEX_DELTAS, STEP_SIZES};
use serde::{Deserialize, Serialize};

/// Predictor range (15-bit signed).
pub const PREDICTOR_MIN: i32 = -0x4000;
pub const PREDICTOR_MAX: i32 = 0x3FFF;

/// Largest step size in the table, and the value the buggy encoder used in its place.
const TOP_STEP_SIZE: i32 = 1552;
const BUGGY_TOP_STEP_SIZE: i32 = 1522;

/// Largest delta magnitude any nibble can produce.
pub const MAX_DELTA: i32 = TOP_STEP_SIZE * 8 * 2;

/// Control inputs for one channel's nibble step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelControl {
    /// KING is streaming ADPCM data for this channel.
    pub fetch_enabled: bool,
    /// Reset bit in the ADPCM control register; the decoder idles while set.
    pub reset: bool,
    /// Linear interpolation bit in the ADPCM control register.
    pub interpolate: bool,
    /// Nibble fetch cadence exponent from KING (0-3).
    pub cadence_shift: u32,
}

impl ChannelControl {
    /// Derive the controls for `channel` from the local control register and KING's mirror.
    pub fn new(adpcm_control: u16, king_control: u32, channel: usize) -> Self {
        Self {
            fetch_enabled: king_control & (1 << channel) != 0,
            reset: adpcm_control & (0x10 << channel) != 0,
            interpolate: adpcm_control & (0x4 << channel) != 0,
            cadence_shift: (king_control >> 2) & 0x3,
        }
    }
}

/// Decode one nibble into a signed predictor delta.
///
/// `shift` spreads the delta over `1 << shift` sample periods under linear
/// interpolation; pass 0 otherwise.
pub fn nibble_delta(nibble: u8, step_index: i32, shift: u32, buggy_codec: bool) -> i32 {
    let mut step = STEP_SIZES[step_index.clamp(0, MAX_STEP_INDEX) as usize];
    let magnitude = ((nibble & 0x7) + 1) as i32;

    let mut delta = if buggy_codec {
        if step == TOP_STEP_SIZE {
            step = BUGGY_TOP_STEP_SIZE;
        }
        step * magnitude * 2
    } else {
        step * magnitude
    };

    delta >>= shift & 0x3;

    if nibble & 0x8 != 0 {
        -delta
    } else {
        delta
    }
}

/// Step index after consuming `nibble`.
pub fn next_step_index(step_index: i32, nibble: u8) -> i32 {
    (step_index + STEP_INDEX_DELTAS[(nibble & 0xF) as usize]).clamp(0, MAX_STEP_INDEX)
}

/// Decoder state for one ADPCM channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdpcmChannel {
    /// Running 15-bit reconstructed sample.
    pub predictor: i32,
    /// Index into the step size table.
    pub step_index: i32,
    /// Delta queued for the predictor.
    pub delta: i32,
    /// How many more sample periods the queued delta applies for.
    pub pending: i32,
    /// Bit offset of the next nibble in `half_word` (0, 4, 8 or 12).
    pub which_nibble: u32,
    pub half_word: u16,
    pub have_half_word: bool,
    /// Last emitted sample per side, the reference for the next mixer delta.
    pub last: [i32; 2],
}

impl AdpcmChannel {
    /// Consume the next nibble, fetching a fresh half-word when the previous
    /// one is exhausted.
    ///
    /// A half-word already in hand keeps playing even after KING stops
    /// streaming for the channel.
    pub fn clock_nibble<F>(&mut self, fetch: F, control: ChannelControl, buggy_codec: bool)
    where
        F: FnOnce() -> u16,
    {
        if !self.have_half_word && !control.fetch_enabled {
            return;
        }

        if self.which_nibble == 0 {
            self.half_word = fetch();
            self.have_half_word = true;
        }

        if control.reset {
            self.delta = 0;
        } else {
            let nibble = ((self.half_word >> (self.which_nibble & 0xC)) & 0xF) as u8;
            let shift = if control.interpolate { control.cadence_shift } else { 0 };

            self.delta = nibble_delta(nibble, self.step_index, shift, buggy_codec);
            self.step_index = next_step_index(self.step_index, nibble);
        }

        self.pending = if control.interpolate {
            1 << (control.cadence_shift & 0x3)
        } else {
            1
        };

        self.which_nibble = (self.which_nibble + 4) & 0xF;
        if self.which_nibble == 0 {
            self.have_half_word = false;
        }
    }

    /// Apply one queued delta to the predictor, saturating at the 15-bit range.
    pub fn apply_pending(&mut self) {
        if self.pending > 0 {
            self.predictor = self
                .predictor
                .saturating_add(self.delta)
                .clamp(PREDICTOR_MIN, PREDICTOR_MAX);
            self.pending -= 1;
        }
    }

    /// Snap to the reset state triggered by a 0->1 reset bit transition.
    pub fn hard_reset(&mut self) {
        self.predictor = 0;
        self.step_index = 0;
    }
}
