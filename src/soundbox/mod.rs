//! PC-FX SoundBox
//!
//! The SoundBox combines:
//! - The PCE PSG (a separate chip, reached through [`Psg`])
//! - Two ADPCM channels fed 16 bits at a time by KING
//! - CD-DA volume control
//!
//! It is driven entirely by the V810: register writes arrive with a
//! timestamp, and every write that affects audio first catches the engine up
//! to that timestamp so the old settings apply strictly before it. The CPU
//! also calls [`SoundBox::update`] when the timestamp it last returned comes
//! due, and [`SoundBox::flush`] once per frame.

pub mod clock;
pub mod decoder;
pub mod filter;
pub mod mixer;
pub mod ports;
pub mod registers;
pub mod state;
pub mod tables;

#[cfg(test)]
mod tests_engine;

use crate::audio::{CddaBuffer, Resampler, SynthBuffer, SYNTH_RATE};
use crate::config::SoundBoxConfig;
use crate::error::SoundBoxError;
use decoder::ChannelControl;
use ports::{NullPsg, Psg, SoundBoxBus};
use registers::Register;
use serde_json::{json, Value};
use state::{SoundBoxState, VOLUME_MASK};
use tables::adpcm_volume_table;

/// Result of a frame flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOutput {
    /// Stereo frames written to the output buffer.
    pub frames: usize,
    /// Timestamp the next frame starts from (the ticks not consumed by this one).
    pub new_base_timestamp: u32,
    /// Ticks consumed by this frame.
    pub consumed_ticks: u32,
}

#[derive(Debug)]
pub struct SoundBox<P: Psg = NullPsg> {
    emulate_buggy_codec: bool,
    reset_anti_click: bool,
    psg_volume: f64,
    state: SoundBoxState,
    /// ADPCM control mirrored from KING: bits 0-1 fetch enable, 2-3 cadence.
    king_control: u32,
    last_ts: u32,
    psg: P,
    buffers: [SynthBuffer; 2],
    cdda: [CddaBuffer; 2],
    /// Present while sound output is enabled.
    resampler: Option<Resampler>,
}

impl SoundBox<NullPsg> {
    /// Build with a silent PSG.
    pub fn with_null_psg(config: &SoundBoxConfig) -> Result<Self, SoundBoxError> {
        Self::new(config, NullPsg::default())
    }
}

impl<P: Psg> SoundBox<P> {
    /// Build a powered-off engine and configure the output rate.
    pub fn new(config: &SoundBoxConfig, psg: P) -> Result<Self, SoundBoxError> {
        let mut sbox = Self {
            emulate_buggy_codec: config.emulate_buggy_codec,
            reset_anti_click: config.reset_anti_click,
            psg_volume: config.psg_volume,
            state: SoundBoxState::default(),
            king_control: 0,
            last_ts: 0,
            psg,
            buffers: [SynthBuffer::new(), SynthBuffer::new()],
            cdda: [CddaBuffer::new(), CddaBuffer::new()],
            resampler: None,
        };
        sbox.set_sound_rate(config.sound_rate)?;
        Ok(sbox)
    }

    /// Rebuild the resampler for a new host rate; `0` disables output.
    /// Decode state is untouched.
    pub fn set_sound_rate(&mut self, rate: u32) -> Result<(), SoundBoxError> {
        if rate > SYNTH_RATE {
            return Err(SoundBoxError::SoundRate { rate, max: SYNTH_RATE });
        }

        self.resampler = (rate > 0).then(|| Resampler::new(SYNTH_RATE, rate));
        self.psg.set_volume(self.psg_volume);
        log::debug!("sound rate set to {} Hz (output {})", rate, if rate > 0 { "on" } else { "off" });
        Ok(())
    }

    pub fn sound_enabled(&self) -> bool {
        self.resampler.is_some()
    }

    /// Host output rate in Hz, `0` while output is disabled.
    pub fn sound_rate(&self) -> u32 {
        self.resampler.as_ref().map_or(0, Resampler::output_rate)
    }

    /// Mirror KING's ADPCM control register.
    pub fn set_king_adpcm_control(&mut self, value: u32) {
        self.king_control = value;
    }

    /// Power-on reset at `timestamp`.
    pub fn reset(&mut self, bus: &mut impl SoundBoxBus, timestamp: u32) {
        self.update(bus, timestamp);
        self.psg.power(timestamp / 3, &mut self.buffers);

        let state = &mut self.state;
        state.adpcm_control = 0;
        state.adpcm_volume = [[0; 2]; 2];
        state.cdda_volume = [0; 2];
        state.volume_filter = Default::default();

        for channel in state.channels.iter_mut() {
            channel.hard_reset();
            channel.which_nibble = 0;
            channel.half_word = 0;
            channel.have_half_word = false;
        }

        let (left, right) = state.cdda_gains();
        bus.set_cdda_volume(left, right);

        state.clock.reset();
        log::debug!("sound box reset at {}", timestamp);
    }

    /// Re-base timestamps after the host starts a new frame at `ts_base`.
    pub fn reset_ts(&mut self, ts_base: u32) {
        self.psg.reset_ts(ts_base / 3);
        self.last_ts = ts_base;
    }

    /// Handle a bus write to the SoundBox window.
    pub fn write(&mut self, bus: &mut impl SoundBoxBus, address: u32, value: u16, timestamp: u32) {
        let Some(register) = Register::decode(address) else {
            log::trace!("ignoring write {:#06x} to unmapped offset {:#04x}", value, address & 0x3F);
            return;
        };

        match register {
            Register::Psg(reg) => {
                self.psg.write(timestamp / 3, reg, value as u8, &mut self.buffers);
            }
            Register::AdpcmControl => {
                self.update(bus, timestamp);
                self.write_control(value);
            }
            Register::AdpcmVolume { channel, side } => {
                self.update(bus, timestamp);
                self.state.adpcm_volume[channel][side] = value as u8 & VOLUME_MASK;
            }
            Register::CddaVolume { side } => {
                self.state.cdda_volume[side] = value as u8 & VOLUME_MASK;
                let (left, right) = self.state.cdda_gains();
                bus.set_cdda_volume(left, right);
            }
        }
    }

    fn write_control(&mut self, value: u16) {
        let state = &mut self.state;
        for ch in 0..2 {
            let bit = 0x10 << ch;
            if state.adpcm_control & bit == 0 && value & bit != 0 {
                let channel = &mut state.channels[ch];
                if self.reset_anti_click {
                    state.anti_click[ch].capture(channel.predictor);
                }
                log::trace!(
                    "channel {} reset, predictor {} anti-click {}",
                    ch,
                    channel.predictor,
                    state.anti_click[ch].0 >> 32
                );
                channel.hard_reset();
            }
        }
        state.adpcm_control = value;
    }

    /// Run the engine up to `timestamp`. Returns the timestamp at which it
    /// must run again.
    ///
    /// With sound output disabled the decoders and filters still advance, so
    /// re-enabling output resumes exactly; only the buffer writes are skipped.
    pub fn update(&mut self, bus: &mut impl SoundBoxBus, timestamp: u32) -> u32 {
        let run_time = timestamp.wrapping_sub(self.last_ts) as i32;
        self.last_ts = timestamp;

        let buggy = self.emulate_buggy_codec;
        let sound_enabled = self.resampler.is_some();
        let king_control = self.king_control;
        let cadence_shift = (king_control >> 2) & 0x3;
        let volume_table = adpcm_volume_table();
        let state = &mut self.state;

        state.clock.charge(run_time);

        while state.clock.sample_due() {
            for _ in 0..state.clock.nibble_steps(cadence_shift) {
                for ch in 0..2 {
                    let control = ChannelControl::new(state.adpcm_control, king_control, ch);
                    state.channels[ch].clock_nibble(|| bus.adpcm_half_word(ch), control, buggy);
                }
            }

            let pos = state.clock.position(timestamp);

            for ch in 0..2 {
                let channel = &mut state.channels[ch];
                channel.apply_pending();

                if sound_enabled {
                    let base = if buggy {
                        (channel.predictor >> 1) as i64 + state.anti_click[ch].contribution(true)
                    } else {
                        channel.predictor as i64 + state.anti_click[ch].contribution(false)
                    };
                    let samples = [
                        (base as f64 * state.volume_filter[ch][0].filtered) as i32,
                        (base as f64 * state.volume_filter[ch][1].filtered) as i32,
                    ];
                    mixer::emit(&mut channel.last, samples, pos, &mut self.buffers);
                }
            }

            for ac in state.anti_click.iter_mut() {
                ac.decay();
            }

            for ch in 0..2 {
                for side in 0..2 {
                    let target = volume_table[state.adpcm_volume[ch][side] as usize];
                    state.volume_filter[ch][side].step(target);
                }
            }

            state.clock.rearm();
        }

        state.clock.next_event(timestamp)
    }

    /// Finish the frame ending at `end_timestamp`: catch up, drain the
    /// synthesis buffers through the resampler into `out` (interleaved
    /// stereo), and re-base to the returned timestamp.
    pub fn flush(
        &mut self,
        bus: &mut impl SoundBoxBus,
        end_timestamp: u32,
        out: &mut [i16],
        max_frames: usize,
        reverse: bool,
    ) -> FlushOutput {
        self.update(bus, end_timestamp);

        let slots = (end_timestamp / 12).min(crate::audio::RING_LEN as u32) as usize;
        let new_base_timestamp = end_timestamp % 12;

        self.psg.update(end_timestamp / 3, &mut self.buffers);

        let mut frames = 0;
        for side in 0..2 {
            let buf = &mut self.buffers[side];
            match self.resampler.as_mut() {
                Some(resampler) => {
                    buf.integrate(slots, &self.cdda[side]);
                    frames = resampler.resample(side, buf, slots, out, max_frames, reverse);
                    buf.consume(slots);
                }
                None => buf.skip(slots),
            }
            self.cdda[side].finish(slots);
        }

        self.reset_ts(new_base_timestamp);

        FlushOutput {
            frames,
            new_base_timestamp,
            consumed_ticks: end_timestamp - new_base_timestamp,
        }
    }

    /// Serialize the chip (and PSG) state.
    pub fn save_state(&self) -> Value {
        json!({
            "sbox": self.state,
            "psg": self.psg.save_state(),
        })
    }

    /// Restore a saved state, forcing every field back into range, then
    /// push the restored CD-DA volume.
    pub fn load_state(&mut self, bus: &mut impl SoundBoxBus, blob: &Value) -> Result<(), SoundBoxError> {
        let sbox = blob.get("sbox").cloned().unwrap_or(Value::Null);
        let mut state: SoundBoxState = serde_json::from_value(sbox).map_err(SoundBoxError::State)?;

        let fixed = state.sanitize(self.reset_anti_click);
        if !fixed.is_empty() {
            log::warn!("save state out of range, clamped: {}", fixed.join(", "));
        }
        self.state = state;

        if let Some(psg) = blob.get("psg") {
            self.psg.load_state(psg);
        }

        let (left, right) = self.state.cdda_gains();
        bus.set_cdda_volume(left, right);
        log::debug!("sound box state loaded");
        Ok(())
    }

    /// Save into or load from `blob` depending on `load`.
    pub fn state_action(
        &mut self,
        bus: &mut impl SoundBoxBus,
        blob: &mut Value,
        load: bool,
    ) -> Result<(), SoundBoxError> {
        if load {
            self.load_state(bus, blob)
        } else {
            *blob = self.save_state();
            Ok(())
        }
    }

    pub fn state(&self) -> &SoundBoxState {
        &self.state
    }

    pub fn king_adpcm_control(&self) -> u32 {
        self.king_control
    }

    pub fn psg(&self) -> &P {
        &self.psg
    }

    pub fn psg_mut(&mut self) -> &mut P {
        &mut self.psg
    }

    /// Synthesis ring for `side` (0 = left, 1 = right).
    pub fn synth_buffer(&self, side: usize) -> &SynthBuffer {
        &self.buffers[side]
    }

    /// CD-DA staging ring for `side`, for the CD drive to fill.
    pub fn cdda_buffer_mut(&mut self, side: usize) -> &mut CddaBuffer {
        &mut self.cdda[side]
    }
}
