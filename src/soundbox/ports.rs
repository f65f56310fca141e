//! Interfaces to the chips the SoundBox talks to.

use crate::audio::SynthBuffer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The rest of the machine, as seen from the SoundBox.
pub trait SoundBoxBus {
    /// Fetch the next 16 bits of compressed ADPCM data for `channel` from KING.
    fn adpcm_half_word(&mut self, channel: usize) -> u16;

    /// Push new CD-DA gains to the CD drive's mixer.
    fn set_cdda_volume(&mut self, left: f32, right: f32);
}

/// PCE PSG wavetable synthesizer.
///
/// Timestamps are in the PSG's own domain (V810 ticks / 3). Output goes into
/// the same delta rings the ADPCM mixer writes.
pub trait Psg {
    fn write(&mut self, timestamp: u32, reg: u8, value: u8, out: &mut [SynthBuffer; 2]);

    /// Run the PSG up to `timestamp`.
    fn update(&mut self, timestamp: u32, out: &mut [SynthBuffer; 2]);

    fn set_volume(&mut self, volume: f64);

    /// Re-base the PSG's timestamps after a frame.
    fn reset_ts(&mut self, ts_base: u32);

    /// Power-on reset at `timestamp`.
    fn power(&mut self, timestamp: u32, out: &mut [SynthBuffer; 2]);

    fn get_register(&self, id: u8) -> u32;

    fn set_register(&mut self, id: u8, value: u32);

    fn save_state(&self) -> Value;

    /// Restore from a blob produced by `save_state`; unknown shapes are ignored.
    fn load_state(&mut self, state: &Value);
}

/// Number of PSG register addresses reachable through the SoundBox window.
pub const PSG_REGISTER_COUNT: usize = 16;

/// A PSG that latches register writes but produces no sound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullPsg {
    pub registers: [u8; PSG_REGISTER_COUNT],
    pub volume: f64,
    pub last_ts: u32,
}

impl Psg for NullPsg {
    fn write(&mut self, timestamp: u32, reg: u8, value: u8, out: &mut [SynthBuffer; 2]) {
        self.update(timestamp, out);
        self.registers[reg as usize % PSG_REGISTER_COUNT] = value;
    }

    fn update(&mut self, timestamp: u32, _out: &mut [SynthBuffer; 2]) {
        self.last_ts = timestamp;
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn reset_ts(&mut self, ts_base: u32) {
        self.last_ts = ts_base;
    }

    fn power(&mut self, timestamp: u32, out: &mut [SynthBuffer; 2]) {
        self.update(timestamp, out);
        self.registers = [0; PSG_REGISTER_COUNT];
    }

    fn get_register(&self, id: u8) -> u32 {
        self.registers
            .get(id as usize)
            .map(|&v| v as u32)
            .unwrap_or(0)
    }

    fn set_register(&mut self, id: u8, value: u32) {
        if let Some(reg) = self.registers.get_mut(id as usize) {
            *reg = value as u8;
        }
    }

    fn save_state(&self) -> Value {
        serde_json::to_value(&self.registers).unwrap_or(Value::Null)
    }

    fn load_state(&mut self, state: &Value) {
        if let Ok(registers) = serde_json::from_value(state.clone()) {
            self.registers = registers;
        }
    }
}
