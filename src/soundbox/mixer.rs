//! Polyphase delta mixer
//!
//! A channel's output changes at ~31.47kHz while the synthesis buffer runs at
//! master/12. Each change is written as a delta spread over seven slots by
//! the FIR row matching its 1/8-slot phase, so sample edges land between
//! slots instead of snapping to them. Writes are additive: both ADPCM
//! channels and the PSG superpose into the same rings.

use super::clock::SynthPosition;
use super::tables::PHASE_FILTER;
use crate::audio::SynthBuffer;

/// Spread `delta` into `buf` starting at `pos`.
pub fn spread(buf: &mut SynthBuffer, pos: SynthPosition, delta: i32) {
    let coeffs = &PHASE_FILTER[pos.phase & 7];
    for (tap, &coeff) in coeffs.iter().enumerate() {
        buf.add(pos.time as usize + tap, delta.wrapping_mul(coeff as i32));
    }
}

/// Emit a new stereo sample for one channel, writing only the change from
/// `last`, which is then updated.
pub fn emit(last: &mut [i32; 2], samples: [i32; 2], pos: SynthPosition, buffers: &mut [SynthBuffer; 2]) {
    for (side, buf) in buffers.iter_mut().enumerate() {
        let delta = samples[side].wrapping_sub(last[side]);
        if delta != 0 {
            spread(buf, pos, delta);
        }
    }
    *last = samples;
}
