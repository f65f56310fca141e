#![no_main]

use libfuzzer_sys::fuzz_target;
use pcfx_soundbox::{SoundBox, SoundBoxBus, SoundBoxConfig};

struct FuzzBus<'a> {
    data: &'a [u8],
    pos: usize,
}

impl SoundBoxBus for FuzzBus<'_> {
    fn adpcm_half_word(&mut self, _channel: usize) -> u16 {
        let lo = self.data.get(self.pos).copied().unwrap_or(0);
        let hi = self.data.get(self.pos + 1).copied().unwrap_or(0);
        self.pos = (self.pos + 2) % self.data.len().max(1);
        u16::from_le_bytes([lo, hi])
    }

    fn set_cdda_volume(&mut self, left: f32, right: f32) {
        assert!((0.0..=0.5).contains(&left) && (0.0..=0.5).contains(&right));
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let config = SoundBoxConfig {
        emulate_buggy_codec: data[0] & 1 != 0,
        reset_anti_click: data[0] & 2 != 0,
        sound_rate: if data[0] & 4 != 0 { 0 } else { 48_000 },
        ..Default::default()
    };
    let mut sbox = SoundBox::with_null_psg(&config).unwrap();
    let mut bus = FuzzBus { data, pos: 0 };
    let mut out = vec![0i16; 4096];
    let mut ts = 0u32;

    sbox.reset(&mut bus, 0);

    // Each 4-byte record is one operation
    for op in data[1..].chunks_exact(4) {
        let arg = u16::from_le_bytes([op[2], op[3]]);
        match op[0] & 3 {
            0 => sbox.write(&mut bus, op[1] as u32, arg, ts),
            1 => {
                ts = ts.wrapping_add(arg as u32 * 8);
                sbox.update(&mut bus, ts);
            }
            2 => sbox.set_king_adpcm_control(op[1] as u32),
            _ => {
                let result = sbox.flush(&mut bus, ts.wrapping_add(arg as u32 * 16), &mut out, 2048, op[1] & 1 != 0);
                assert!(result.frames <= 2048);
                ts = result.new_base_timestamp;
            }
        }

        let state = sbox.state();
        for channel in &state.channels {
            assert!((-0x4000..=0x3FFF).contains(&channel.predictor));
            assert!((0..=48).contains(&channel.step_index));
        }
        if !config.reset_anti_click {
            assert!(state.anti_click.iter().all(|ac| ac.0 == 0));
        }
    }
});
