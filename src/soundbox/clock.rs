//! Nested sample clock
//!
//! The outer divider counts half-ticks of the V810 clock down to the next
//! ADPCM output sample (one every 1365 half-ticks, ~31.47kHz). The inner
//! divider counts output samples down to the next nibble fetch, reloading
//! with `1 << cadence` from KING's ADPCM control. Keeping the two counters
//! separate lets both rates stay exact in integer arithmetic.

use serde::{Deserialize, Serialize};

/// Outer divider period in half-ticks.
pub const SAMPLE_PERIOD: i32 = 1365;

/// Largest inner divider reload (`1 << 3`).
pub const MAX_SMALL_DIV: i32 = 8;

/// Outer divider value after a reset.
// TODO: KING->SBOX ADPCM sync; the post-reset phase relative to KING is unverified on hardware.
pub const RESET_BIG_DIV: i32 = 2;

/// Where an output sample lands in the synthesis buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthPosition {
    /// Synthesis buffer slot (12 ticks per slot), relative to the current frame base.
    pub time: u32,
    /// Sub-slot phase, selects the FIR kernel row (0-7).
    pub phase: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockDivider {
    pub big: i32,
    pub small: i32,
}

impl ClockDivider {
    pub fn reset(&mut self) {
        self.big = RESET_BIG_DIV;
        self.small = 0;
    }

    /// Account for `run_time` elapsed ticks.
    pub fn charge(&mut self, run_time: i32) {
        self.big = self.big.wrapping_sub(run_time.wrapping_mul(2));
    }

    /// An output sample is due at or before the charged timestamp.
    pub fn sample_due(&self) -> bool {
        self.big <= 0
    }

    /// Count down the inner divider for one output sample and return how
    /// many nibble steps fire.
    pub fn nibble_steps(&mut self, cadence_shift: u32) -> u32 {
        let reload = 1 << (cadence_shift & 0x3);
        let mut steps = 0;
        self.small -= 1;
        while self.small <= 0 {
            self.small += reload;
            steps += 1;
        }
        steps
    }

    /// Position of the sample currently due, given the timestamp the clock was charged to.
    ///
    /// `big` is the (non-positive) distance in half-ticks from `timestamp`
    /// back to the sample instant. Dividing the combined half-tick count by
    /// 3 gives 1/8-slot units.
    pub fn position(&self, timestamp: u32) -> SynthPosition {
        let half_ticks = (timestamp << 1).wrapping_add(self.big as u32);
        let eighths = half_ticks / 3;
        SynthPosition {
            time: eighths >> 3,
            phase: (eighths & 7) as usize,
        }
    }

    /// Schedule the next output sample.
    pub fn rearm(&mut self) {
        self.big += SAMPLE_PERIOD;
    }

    /// Timestamp at which the next output sample becomes due.
    pub fn next_event(&self, timestamp: u32) -> u32 {
        timestamp.wrapping_add(((self.big + 1) / 2) as u32)
    }

    /// Force both dividers into their legal ranges. Returns whether anything changed.
    pub fn sanitize(&mut self) -> bool {
        let before = self.clone();
        self.big = self.big.clamp(1, SAMPLE_PERIOD);
        self.small = self.small.clamp(1, MAX_SMALL_DIV);
        *self != before
    }
}
