#![no_main]

use libfuzzer_sys::fuzz_target;
use pcfx_soundbox::{SoundBox, SoundBoxBus, SoundBoxConfig};

struct SilentBus;

impl SoundBoxBus for SilentBus {
    fn adpcm_half_word(&mut self, _channel: usize) -> u16 {
        0x7777
    }

    fn set_cdda_volume(&mut self, _left: f32, _right: f32) {}
}

fuzz_target!(|data: &[u8]| {
    let Ok(blob) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let mut sbox = SoundBox::with_null_psg(&SoundBoxConfig::default()).unwrap();
    let mut bus = SilentBus;
    if sbox.load_state(&mut bus, &blob).is_err() {
        return;
    }

    // Whatever was loaded must run without panicking
    sbox.set_king_adpcm_control(0xF);
    let mut out = vec![0i16; 4096];
    let mut base = 0;
    for _ in 0..4 {
        let result = sbox.flush(&mut bus, base + 357_954, &mut out, 2048, false);
        base = result.new_base_timestamp;
    }
});
