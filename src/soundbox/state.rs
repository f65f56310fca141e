//! SoundBox chip state and save-state sanitizing
//!
//! The whole mutable chip state lives in [`SoundBoxState`] and is saved as a
//! named-field JSON object. Loading never rejects out-of-range values: save
//! states may come from a different configuration or be damaged, so every
//! field is forced back into its legal range instead.

use super::clock::ClockDivider;
use super::decoder::{AdpcmChannel, MAX_DELTA, PREDICTOR_MAX, PREDICTOR_MIN};
use super::filter::{AntiClick, VolumeFilter};
use super::tables::MAX_STEP_INDEX;
use serde::{Deserialize, Serialize};

/// Mask for the 6-bit volume registers.
pub const VOLUME_MASK: u8 = 0x3F;

/// Largest number of sample periods one nibble's delta can be spread over.
const MAX_PENDING: i32 = 8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundBoxState {
    /// Bits 0-1 rate divisor, 2-3 interpolation, 4-5 reset, per channel.
    pub adpcm_control: u16,
    /// `[channel][side]`, 6-bit volume codes.
    pub adpcm_volume: [[u8; 2]; 2],
    /// `[side]`, 6-bit CD-DA volume codes.
    pub cdda_volume: [u8; 2],
    pub clock: ClockDivider,
    pub anti_click: [AntiClick; 2],
    /// `[channel][side]`
    pub volume_filter: [[VolumeFilter; 2]; 2],
    pub channels: [AdpcmChannel; 2],
}

impl SoundBoxState {
    /// CD-DA gains as pushed to the CD drive.
    pub fn cdda_gains(&self) -> (f32, f32) {
        (
            0.50 * self.cdda_volume[0] as f32 / 63.0,
            0.50 * self.cdda_volume[1] as f32 / 63.0,
        )
    }

    /// Force every field into its legal range. Returns the names of the
    /// fields that had to be corrected.
    pub fn sanitize(&mut self, anti_click_enabled: bool) -> Vec<&'static str> {
        let mut fixed = Vec::new();

        let volumes = self.adpcm_volume;
        for v in self.adpcm_volume.iter_mut().flatten() {
            *v &= VOLUME_MASK;
        }
        if volumes != self.adpcm_volume {
            fixed.push("adpcm_volume");
        }

        let cdda = self.cdda_volume;
        for v in self.cdda_volume.iter_mut() {
            *v &= VOLUME_MASK;
        }
        if cdda != self.cdda_volume {
            fixed.push("cdda_volume");
        }

        if self.clock.sanitize() {
            fixed.push("clock");
        }

        for ac in self.anti_click.iter_mut() {
            if !anti_click_enabled {
                if ac.0 != 0 {
                    ac.0 = 0;
                    fixed.push("anti_click");
                }
            } else if ac.clamp() {
                fixed.push("anti_click");
            }
        }

        for vf in self.volume_filter.iter_mut().flatten() {
            if vf.sanitize() {
                fixed.push("volume_filter");
            }
        }

        for channel in self.channels.iter_mut() {
            let before = channel.clone();
            channel.predictor = channel.predictor.clamp(PREDICTOR_MIN, PREDICTOR_MAX);
            channel.step_index = channel.step_index.clamp(0, MAX_STEP_INDEX);
            channel.delta = channel.delta.clamp(-MAX_DELTA, MAX_DELTA);
            channel.pending = channel.pending.clamp(0, MAX_PENDING);
            channel.which_nibble &= 0xC;
            if *channel != before {
                fixed.push("channels");
            }
        }

        fixed.dedup();
        fixed
    }
}
