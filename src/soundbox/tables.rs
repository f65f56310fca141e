//! Constant tables used by the ADPCM decoder and mixer.

use std::sync::OnceLock;

/// Number of entries in the quantizer step table.
pub const STEP_COUNT: usize = 49;

/// Largest valid step index.
pub const MAX_STEP_INDEX: i32 = STEP_COUNT as i32 - 1;

/// ADPCM quantizer step sizes.
pub const STEP_SIZES: [i32; STEP_COUNT] = [
    16, 17, 19, 21, 23, 25, 28, 31, 34, 37,
    41, 45, 50, 55, 60, 66, 73, 80, 88, 97,
    107, 118, 130, 143, 157, 173, 190, 209, 230, 253,
    279, 307, 337, 371, 408, 449, 494, 544, 598, 658,
    724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552,
];

/// Step index adjustment per nibble. The sign bit does not matter.
pub const STEP_INDEX_DELTAS: [i32; 16] = [
    -1, -1, -1, -1, 2, 4, 6, 8,
    -1, -1, -1, -1, 2, 4, 6, 8,
];

/// Number of taps per FIR phase.
pub const PHASE_TAPS: usize = 7;

/// Fractional-delay interpolation kernels, one row per 1/8 sub-sample phase.
/// Every row sums to 2048.
pub const PHASE_FILTER: [[i16; PHASE_TAPS]; 8] = [
    [40, 283, 654, 683, 331, 56, 1],
    [28, 238, 618, 706, 381, 75, 2],
    [19, 197, 577, 720, 432, 99, 4],
    [12, 160, 532, 726, 483, 128, 7],
    [7, 128, 483, 726, 532, 160, 12],
    [4, 99, 432, 720, 577, 197, 19],
    [2, 75, 381, 706, 618, 238, 28],
    [1, 56, 331, 683, 654, 283, 40],
];

/// Highest volume code at which a channel is silent.
pub const SILENT_VOLUME_MAX: u8 = 0x1B;

/// ADPCM volume gains indexed by the 6-bit volume register.
///
/// 1.5dB per step down from unity at 0x3F; codes 0x00 through 0x1B are silent.
pub fn adpcm_volume_table() -> &'static [f64; 64] {
    static TABLE: OnceLock<[f64; 64]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0; 64];
        for attenuation in 0..64usize {
            let code = 0x3F - attenuation;
            if code > SILENT_VOLUME_MAX as usize {
                table[code] = 1.0 / f64::powf(2.0, 0.25 * attenuation as f64);
            }
        }
        table
    })
}
