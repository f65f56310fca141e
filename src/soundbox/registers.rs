//! SoundBox register decode
//!
//! The SoundBox occupies a 64-byte window of 16-bit registers. The lower half
//! belongs to the PSG; the upper half holds the ADPCM and CD-DA controls.
//! Unmapped offsets are ignored, as on hardware.
//!
//! ## Register Map
//! | Offset | Register |
//! |--------|----------|
//! | 0x00-0x1E | PSG register `offset >> 1` |
//! | 0x20 | ADPCM control |
//! | 0x22 | ADPCM ch0 left volume |
//! | 0x24 | ADPCM ch0 right volume |
//! | 0x26 | ADPCM ch1 left volume |
//! | 0x28 | ADPCM ch1 right volume |
//! | 0x2A | CD-DA left volume |
//! | 0x2C | CD-DA right volume |

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Psg(u8),
    AdpcmControl,
    AdpcmVolume { channel: usize, side: usize },
    CddaVolume { side: usize },
}

impl Register {
    /// Decode a bus address (only the low 6 bits matter).
    pub fn decode(address: u32) -> Option<Self> {
        let offset = address & 0x3F;
        if offset < 0x20 {
            return Some(Register::Psg((offset >> 1) as u8));
        }

        match offset {
            0x20 => Some(Register::AdpcmControl),
            0x22 => Some(Register::AdpcmVolume { channel: 0, side: 0 }),
            0x24 => Some(Register::AdpcmVolume { channel: 0, side: 1 }),
            0x26 => Some(Register::AdpcmVolume { channel: 1, side: 0 }),
            0x28 => Some(Register::AdpcmVolume { channel: 1, side: 1 }),
            0x2A => Some(Register::CddaVolume { side: 0 }),
            0x2C => Some(Register::CddaVolume { side: 1 }),
            _ => None,
        }
    }
}

#[cfg(feature = "debugger")]
pub use self::debug::DebugRegister;

#[cfg(feature = "debugger")]
mod debug {
    use super::super::ports::{Psg, SoundBoxBus};
    use super::super::state::VOLUME_MASK;
    use super::super::SoundBox;

    /// Registers exposed to a debugger by name rather than bus address.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DebugRegister {
        AdpcmCtrl,
        Adpcm0LVol,
        Adpcm0RVol,
        Adpcm1LVol,
        Adpcm1RVol,
        CddaLVol,
        CddaRVol,
        /// Current predictor of channel 0.
        Adpcm0Cur,
        Adpcm1Cur,
        /// PSG register by its own id.
        Psg(u8),
    }

    impl DebugRegister {
        pub const ALL_SOUNDBOX: [DebugRegister; 9] = [
            DebugRegister::AdpcmCtrl,
            DebugRegister::Adpcm0LVol,
            DebugRegister::Adpcm0RVol,
            DebugRegister::Adpcm1LVol,
            DebugRegister::Adpcm1RVol,
            DebugRegister::CddaLVol,
            DebugRegister::CddaRVol,
            DebugRegister::Adpcm0Cur,
            DebugRegister::Adpcm1Cur,
        ];

        pub fn name(&self) -> &'static str {
            match self {
                DebugRegister::AdpcmCtrl => "ADPCMCtrl",
                DebugRegister::Adpcm0LVol => "ADPCM0LVol",
                DebugRegister::Adpcm0RVol => "ADPCM0RVol",
                DebugRegister::Adpcm1LVol => "ADPCM1LVol",
                DebugRegister::Adpcm1RVol => "ADPCM1RVol",
                DebugRegister::CddaLVol => "CDDALVol",
                DebugRegister::CddaRVol => "CDDARVol",
                DebugRegister::Adpcm0Cur => "ADPCM0Cur",
                DebugRegister::Adpcm1Cur => "ADPCM1Cur",
                DebugRegister::Psg(_) => "PSG",
            }
        }
    }

    fn describe_control(value: u32) -> String {
        let on_off = |bit: u32| if value & bit != 0 { "On" } else { "Off" };
        format!(
            "Frequency: ~{}KHz, Ch0 Interpolation: {}, Ch1 Interpolation: {}, Ch0 Reset: {}, Ch1 Reset: {}",
            32 >> (value & 0x3),
            on_off(0x4),
            on_off(0x8),
            (value >> 4) & 1,
            (value >> 5) & 1,
        )
    }

    impl<P: Psg> SoundBox<P> {
        /// Read a register for display. The second value is a human-readable
        /// decoding where one exists.
        pub fn get_register(&self, reg: DebugRegister) -> (u32, Option<String>) {
            let state = &self.state;
            match reg {
                DebugRegister::AdpcmCtrl => {
                    let value = state.adpcm_control as u32;
                    (value, Some(describe_control(value)))
                }
                DebugRegister::Adpcm0LVol => (state.adpcm_volume[0][0] as u32, None),
                DebugRegister::Adpcm0RVol => (state.adpcm_volume[0][1] as u32, None),
                DebugRegister::Adpcm1LVol => (state.adpcm_volume[1][0] as u32, None),
                DebugRegister::Adpcm1RVol => (state.adpcm_volume[1][1] as u32, None),
                DebugRegister::CddaLVol => (state.cdda_volume[0] as u32, None),
                DebugRegister::CddaRVol => (state.cdda_volume[1] as u32, None),
                DebugRegister::Adpcm0Cur => (state.channels[0].predictor as u32, None),
                DebugRegister::Adpcm1Cur => (state.channels[1].predictor as u32, None),
                DebugRegister::Psg(id) => (self.psg.get_register(id), None),
            }
        }

        /// Poke a register directly, bypassing clock catch-up.
        pub fn set_register(&mut self, bus: &mut impl SoundBoxBus, reg: DebugRegister, value: u32) {
            let volume = value as u8 & VOLUME_MASK;
            let state = &mut self.state;
            match reg {
                DebugRegister::AdpcmCtrl => state.adpcm_control = value as u16,
                DebugRegister::Adpcm0LVol => state.adpcm_volume[0][0] = volume,
                DebugRegister::Adpcm0RVol => state.adpcm_volume[0][1] = volume,
                DebugRegister::Adpcm1LVol => state.adpcm_volume[1][0] = volume,
                DebugRegister::Adpcm1RVol => state.adpcm_volume[1][1] = volume,
                DebugRegister::CddaLVol | DebugRegister::CddaRVol => {
                    let side = (reg == DebugRegister::CddaRVol) as usize;
                    state.cdda_volume[side] = volume;
                    let (left, right) = state.cdda_gains();
                    bus.set_cdda_volume(left, right);
                }
                DebugRegister::Adpcm0Cur | DebugRegister::Adpcm1Cur => {
                    let ch = (reg == DebugRegister::Adpcm1Cur) as usize;
                    state.channels[ch].predictor = (value as i32).clamp(
                        super::super::decoder::PREDICTOR_MIN,
                        super::super::decoder::PREDICTOR_MAX,
                    );
                }
                DebugRegister::Psg(id) => self.psg.set_register(id, value),
            }
        }
    }

}
