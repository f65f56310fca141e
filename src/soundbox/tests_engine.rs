use super::clock::SAMPLE_PERIOD;
use super::decoder::PREDICTOR_MAX;
use super::filter::AntiClick;
use super::ports::Psg;
use super::test_utils::{config, pack_nibbles, playing_engine, ScriptedBus};
use super::SoundBox;
use crate::audio::RING_LEN;
use crate::config::SoundBoxConfig;
use crate::error::SoundBoxError;

fn silent_config() -> SoundBoxConfig {
    SoundBoxConfig { sound_rate: 0, ..Default::default() }
}

#[test]
fn test_reset_defaults() {
    let mut bus = ScriptedBus::new();
    let mut sbox = SoundBox::with_null_psg(&SoundBoxConfig::default()).unwrap();
    sbox.write(&mut bus, 0x2A, 0x3F, 0);
    sbox.write(&mut bus, 0x22, 0x3F, 0);

    sbox.reset(&mut bus, 10);

    let state = sbox.state();
    assert_eq!(state.adpcm_control, 0);
    assert_eq!(state.adpcm_volume, [[0; 2]; 2]);
    assert_eq!(state.cdda_volume, [0; 2]);
    assert_eq!(state.clock.big, 2);
    assert_eq!(state.clock.small, 0);
    assert_eq!(bus.cdda_volume, Some((0.0, 0.0)));
}

#[test]
fn test_volume_writes_masked() {
    let mut bus = ScriptedBus::new();
    let mut sbox = SoundBox::with_null_psg(&SoundBoxConfig::default()).unwrap();
    sbox.reset(&mut bus, 0);
    sbox.write(&mut bus, 0x22, 0xFFC1, 0);
    sbox.write(&mut bus, 0x24, 0x12, 0);
    sbox.write(&mut bus, 0x26, 0x40, 0);
    sbox.write(&mut bus, 0x28, 0x3F, 0);
    assert_eq!(sbox.state().adpcm_volume, [[0x01, 0x12], [0x00, 0x3F]]);
}

#[test]
fn test_cdda_volume_pushed_scaled() {
    let mut bus = ScriptedBus::new();
    let mut sbox = SoundBox::with_null_psg(&SoundBoxConfig::default()).unwrap();
    sbox.write(&mut bus, 0x2A, 0x3F, 0);
    assert_eq!(bus.cdda_volume, Some((0.5, 0.0)));
    sbox.write(&mut bus, 0x2C, 0xFF, 0);
    assert_eq!(bus.cdda_volume, Some((0.5, 0.5)));
    assert_eq!(sbox.state().cdda_volume, [0x3F, 0x3F]);
}

#[test]
fn test_unmapped_offsets_ignored() {
    let mut bus = ScriptedBus::new();
    let mut sbox = SoundBox::with_null_psg(&SoundBoxConfig::default()).unwrap();
    sbox.reset(&mut bus, 0);
    let before = sbox.state().clone();
    for offset in [0x21, 0x2E, 0x30, 0x3E] {
        sbox.write(&mut bus, offset, 0xFFFF, 1_000_000);
    }
    assert_eq!(sbox.state(), &before);
    assert!(bus.cdda_volume == Some((0.0, 0.0)));
}

#[test]
fn test_psg_passthrough_divides_timestamp() {
    let mut bus = ScriptedBus::new();
    let mut sbox = SoundBox::with_null_psg(&SoundBoxConfig::default()).unwrap();
    sbox.write(&mut bus, 0x08, 0x1F9F, 300);
    assert_eq!(sbox.psg().get_register(4), 0x9F);
    assert_eq!(sbox.psg().last_ts, 100);
}

#[test]
fn test_nibbles_fetched_at_king_cadence() {
    for shift in 0..4u32 {
        let mut bus = ScriptedBus::new();
        let mut sbox = playing_engine(&mut bus, &config(false, true));
        sbox.set_king_adpcm_control(0x1 | (shift << 2));

        // First sample sits at tick 1; the divider starts at 0 so a
        // reload of 1 fires twice.
        sbox.update(&mut bus, 1);
        assert_eq!(bus.fetches[0], 1);

        let samples = 64;
        sbox.update(&mut bus, 1 + samples * SAMPLE_PERIOD as u32 / 2);
        let first = if shift == 0 { 2 } else { 1 };
        let nibbles = first + (samples as usize >> shift);
        assert_eq!(bus.fetches[0], nibbles.div_ceil(4), "shift {}", shift);
        assert_eq!(bus.fetches[1], 0);
    }
}

#[test]
fn test_update_returns_next_sample_time() {
    let mut bus = ScriptedBus::new();
    let mut sbox = playing_engine(&mut bus, &config(false, true));
    // bigdiv 2 after reset: next sample at tick 1
    assert_eq!(sbox.update(&mut bus, 0), 1);
    let next = sbox.update(&mut bus, 1);
    assert_eq!(next, 1 + 683);
    // Running to just before the event produces nothing new
    sbox.update(&mut bus, next - 1);
    assert_eq!(bus.fetches[0], 1);
    assert_eq!(sbox.update(&mut bus, next), next + 682);
}

#[test]
fn test_channel_reset_captures_anti_click() {
    let mut bus = ScriptedBus::new();
    bus.fill = 0x7777;
    let mut sbox = playing_engine(&mut bus, &config(false, true));
    sbox.update(&mut bus, 2000);
    let predictor = sbox.state().channels[0].predictor;
    assert!(predictor > 0);

    sbox.write(&mut bus, 0x20, 0x10, 2000);
    let state = sbox.state();
    assert_eq!(state.channels[0].predictor, 0);
    assert_eq!(state.channels[0].step_index, 0);
    assert_eq!(state.anti_click[0], AntiClick((predictor as i64) << 32));
    assert_eq!(state.anti_click[1], AntiClick(0));

    // Holding the bit is not another transition
    sbox.write(&mut bus, 0x20, 0x10, 2000);
    assert_eq!(sbox.state().anti_click[0], AntiClick((predictor as i64) << 32));
}

#[test]
fn test_anti_click_decays_through_engine() {
    let mut bus = ScriptedBus::new();
    bus.fill = 0x7777;
    let mut sbox = playing_engine(&mut bus, &config(false, true));
    sbox.update(&mut bus, 5000);
    sbox.write(&mut bus, 0x20, 0x10, 5000);

    let mut last = sbox.state().anti_click[0].0;
    assert!(last > 0);
    let mut ts = 5000;
    for _ in 0..200 {
        ts += SAMPLE_PERIOD as u32 / 2 + 1;
        sbox.update(&mut bus, ts);
        let now = sbox.state().anti_click[0].0;
        assert!(now < last && now > 0);
        last = now;
        // The decoder idles while the reset bit is held
        assert_eq!(sbox.state().channels[0].predictor, 0);
    }
}

#[test]
fn test_anti_click_disabled_stays_zero() {
    let mut bus = ScriptedBus::new();
    bus.fill = 0x7777;
    let mut sbox = playing_engine(&mut bus, &config(false, false));
    sbox.update(&mut bus, 2000);
    assert!(sbox.state().channels[0].predictor > 0);
    sbox.write(&mut bus, 0x20, 0x30, 2000);
    assert_eq!(sbox.state().anti_click, [AntiClick(0); 2]);

    let mut blob = sbox.save_state();
    let ghost = 1i64 << 40;
    blob["sbox"]["anti_click"] = serde_json::json!([ghost, -ghost]);
    sbox.load_state(&mut bus, &blob).unwrap();
    assert_eq!(sbox.state().anti_click, [AntiClick(0); 2]);
}

#[test]
fn test_predictor_saturates_in_engine() {
    let mut bus = ScriptedBus::new();
    bus.fill = 0x7777;
    let mut sbox = playing_engine(&mut bus, &config(true, true));
    let mut ts = 0;
    for _ in 0..100 {
        ts += 700;
        sbox.update(&mut bus, ts);
        assert!(sbox.state().channels[0].predictor <= PREDICTOR_MAX);
    }
    assert_eq!(sbox.state().channels[0].predictor, PREDICTOR_MAX);
}

#[test]
fn test_decode_runs_with_sound_disabled() {
    let script = pack_nibbles(&[0x7, 0xF, 0x0, 0x8, 0x3, 0xB, 0x5, 0xD]);
    let mut bus_on = ScriptedBus::with_words(0, &script);
    let mut bus_off = ScriptedBus::with_words(0, &script);

    let mut on = playing_engine(&mut bus_on, &config(false, true));
    let mut off = playing_engine(&mut bus_off, &SoundBoxConfig { sound_rate: 0, ..config(false, true) });
    assert!(!off.sound_enabled());

    for ts in (0..40_000).step_by(977) {
        on.update(&mut bus_on, ts);
        off.update(&mut bus_off, ts);
        for ch in 0..2 {
            assert_eq!(on.state().channels[ch].predictor, off.state().channels[ch].predictor);
            assert_eq!(on.state().channels[ch].step_index, off.state().channels[ch].step_index);
        }
        assert_eq!(on.state().clock, off.state().clock);
    }

    assert!(on.synth_buffer(0).energy() > 0);
    assert_eq!(off.synth_buffer(0).energy(), 0);
    assert_eq!(off.synth_buffer(1).energy(), 0);
}

#[test]
fn test_volume_write_lands_on_sample_boundary() {
    const T: u32 = 5000;
    let mut bus_a = ScriptedBus::new();
    let mut bus_b = ScriptedBus::new();
    bus_a.fill = 0x7777;
    bus_b.fill = 0x7777;
    let mut a = playing_engine(&mut bus_a, &config(false, true));
    let mut b = playing_engine(&mut bus_b, &config(false, true));

    a.update(&mut bus_a, T - 1);
    b.update(&mut bus_b, T - 1);

    a.write(&mut bus_a, 0x22, 0x30, T);
    b.update(&mut bus_b, T);

    for slot in 0..RING_LEN {
        assert_eq!(a.synth_buffer(0).slot(slot), b.synth_buffer(0).slot(slot));
    }

    a.update(&mut bus_a, T + 20_000);
    b.update(&mut bus_b, T + 20_000);

    let boundary = (T / 12) as usize;
    for slot in 0..boundary {
        assert_eq!(
            a.synth_buffer(0).slot(slot),
            b.synth_buffer(0).slot(slot),
            "slot {} before the write changed",
            slot
        );
    }
    assert!((boundary..RING_LEN).any(|s| a.synth_buffer(0).slot(s) != b.synth_buffer(0).slot(s)));
    // Right side volume was not touched
    for slot in 0..RING_LEN {
        assert_eq!(a.synth_buffer(1).slot(slot), b.synth_buffer(1).slot(slot));
    }
}

#[test]
fn test_flush_rebases_without_losing_ticks() {
    let mut bus_a = ScriptedBus::new();
    let mut bus_b = ScriptedBus::new();
    bus_a.fill = 0x37B1;
    bus_b.fill = 0x37B1;
    let mut framed = playing_engine(&mut bus_a, &config(false, true));
    let mut continuous = playing_engine(&mut bus_b, &config(false, true));

    let mut out = vec![0i16; 8192];
    let mut base = 0u32;
    let mut absolute = 0u32;
    let mut elapsed = 0u32;

    for len in [357_954u32, 357_955, 100_001, 7, 12, 250_000] {
        let result = framed.flush(&mut bus_a, base + len, &mut out, 4096, false);
        elapsed += len;
        absolute += result.consumed_ticks;
        base = result.new_base_timestamp;

        assert!(base < 12);
        assert_eq!(absolute + base, elapsed);

        continuous.update(&mut bus_b, elapsed);
        assert_eq!(framed.state(), continuous.state());
    }
}

#[test]
fn test_flush_disabled_produces_nothing() {
    let mut bus = ScriptedBus::new();
    bus.fill = 0x7777;
    let mut sbox = playing_engine(&mut bus, &silent_config());
    let mut out = vec![0i16; 2048];
    let result = sbox.flush(&mut bus, 60_000, &mut out, 1024, false);
    assert_eq!(result.frames, 0);
    assert_eq!(result.new_base_timestamp, 0);
    assert_eq!(result.consumed_ticks, 60_000);
    assert!(out.iter().all(|&s| s == 0));
}

#[test]
fn test_flush_clamps_to_ring() {
    let mut bus = ScriptedBus::new();
    let mut sbox = playing_engine(&mut bus, &config(false, true));
    let mut out = vec![0i16; 8192];
    let result = sbox.flush(&mut bus, 12 * 70_000 + 5, &mut out, 4096, false);
    assert_eq!(result.new_base_timestamp, 5);
    let expected = (RING_LEN as u64 * 48_000 / crate::audio::SYNTH_RATE as u64) as usize;
    assert!(result.frames.abs_diff(expected) <= 1);
}

#[test]
fn test_sound_rate_changes() {
    let mut sbox = SoundBox::with_null_psg(&silent_config()).unwrap();
    assert!(!sbox.sound_enabled());
    assert_eq!(sbox.sound_rate(), 0);
    sbox.set_sound_rate(44_100).unwrap();
    assert!(sbox.sound_enabled());
    assert_eq!(sbox.sound_rate(), 44_100);
    assert_eq!(sbox.psg().volume, 0.681);

    let err = sbox.set_sound_rate(5_000_000).unwrap_err();
    assert!(matches!(err, SoundBoxError::SoundRate { rate: 5_000_000, .. }));
    assert!(sbox.sound_enabled());
    assert_eq!(sbox.sound_rate(), 44_100);

    sbox.set_sound_rate(0).unwrap();
    assert!(!sbox.sound_enabled());
    assert_eq!(sbox.sound_rate(), 0);
}

#[test]
fn test_new_rejects_bad_rate() {
    let result = SoundBox::with_null_psg(&SoundBoxConfig { sound_rate: u32::MAX, ..Default::default() });
    assert!(result.is_err());
}

#[test]
fn test_state_round_trip() {
    let mut bus = ScriptedBus::new();
    bus.fill = 0x19F4;
    let mut sbox = playing_engine(&mut bus, &config(false, true));
    sbox.write(&mut bus, 0x20, 0x04, 100);
    sbox.write(&mut bus, 0x2C, 0x20, 100);
    sbox.update(&mut bus, 12_345);
    sbox.psg_mut().set_register(3, 0x42);

    let mut blob = serde_json::Value::Null;
    sbox.state_action(&mut bus, &mut blob, false).unwrap();
    let text = serde_json::to_string(&blob).unwrap();

    let mut restored = SoundBox::with_null_psg(&config(false, true)).unwrap();
    let mut other_bus = ScriptedBus::new();
    let mut parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    restored.state_action(&mut other_bus, &mut parsed, true).unwrap();

    assert_eq!(restored.state(), sbox.state());
    assert_eq!(restored.psg().get_register(3), 0x42);
    assert_eq!(other_bus.cdda_volume, Some(sbox.state().cdda_gains()));
}

#[test]
fn test_load_state_clamps_corrupt_values() {
    let mut bus = ScriptedBus::new();
    let mut sbox = SoundBox::with_null_psg(&config(false, true)).unwrap();
    let blob = serde_json::json!({
        "sbox": {
            "adpcm_volume": [[255, 64], [1, 2]],
            "cdda_volume": [200, 63],
            "clock": { "big": 100000, "small": -3 },
            "anti_click": [i64::MAX, 0],
            "channels": [
                { "predictor": 40000, "step_index": 99, "which_nibble": 7 },
                { "predictor": -40000, "step_index": -1 }
            ]
        }
    });
    sbox.load_state(&mut bus, &blob).unwrap();

    let state = sbox.state();
    assert_eq!(state.adpcm_volume, [[0x3F, 0x00], [1, 2]]);
    assert_eq!(state.cdda_volume, [200 & 0x3F, 63]);
    assert_eq!(state.clock.big, SAMPLE_PERIOD);
    assert_eq!(state.clock.small, 1);
    assert_eq!(state.anti_click[0].0, 0x3FFFi64 << 32);
    assert_eq!(state.channels[0].predictor, 0x3FFF);
    assert_eq!(state.channels[0].step_index, 48);
    assert_eq!(state.channels[0].which_nibble, 4);
    assert_eq!(state.channels[1].predictor, -0x4000);
    assert_eq!(state.channels[1].step_index, 0);
    assert!(bus.cdda_volume.is_some());
}

#[test]
fn test_load_state_rejects_wrong_shape() {
    let mut bus = ScriptedBus::new();
    let mut sbox = SoundBox::with_null_psg(&config(false, true)).unwrap();
    let blob = serde_json::json!({ "sbox": { "adpcm_control": "loud" } });
    assert!(matches!(sbox.load_state(&mut bus, &blob), Err(SoundBoxError::State(_))));
}

#[cfg(feature = "debugger")]
#[test]
fn test_debug_registers() {
    use super::registers::DebugRegister;

    let mut bus = ScriptedBus::new();
    bus.fill = 0x7777;
    let mut sbox = playing_engine(&mut bus, &config(false, true));
    sbox.write(&mut bus, 0x20, 0x05, 0);
    sbox.update(&mut bus, 3000);

    let (value, special) = sbox.get_register(DebugRegister::AdpcmCtrl);
    assert_eq!(value, 0x05);
    assert_eq!(
        special.as_deref(),
        Some("Frequency: ~16KHz, Ch0 Interpolation: On, Ch1 Interpolation: Off, Ch0 Reset: 0, Ch1 Reset: 0")
    );
    assert_eq!(sbox.get_register(DebugRegister::Adpcm0LVol), (0x3F, None));
    assert_eq!(
        sbox.get_register(DebugRegister::Adpcm0Cur).0,
        sbox.state().channels[0].predictor as u32
    );

    sbox.set_register(&mut bus, DebugRegister::Adpcm1RVol, 0x1FF);
    assert_eq!(sbox.state().adpcm_volume[1][1], 0x3F);

    sbox.set_register(&mut bus, DebugRegister::CddaRVol, 63);
    assert_eq!(bus.cdda_volume, Some((0.0, 0.5)));

    sbox.set_register(&mut bus, DebugRegister::Adpcm1Cur, (-5i32) as u32);
    assert_eq!(sbox.state().channels[1].predictor, -5);

    sbox.set_register(&mut bus, DebugRegister::Psg(9), 0x77);
    assert_eq!(sbox.get_register(DebugRegister::Psg(9)).0, 0x77);
}

#[test]
fn test_load_state_lifts_inner_divider_to_one() {
    for small in [-7, 0] {
        let mut bus = ScriptedBus::new();
        let mut sbox = playing_engine(&mut bus, &config(false, true));
        let blob = serde_json::json!({ "sbox": { "clock": { "big": 500, "small": small } } });
        sbox.load_state(&mut bus, &blob).unwrap();
        assert_eq!(sbox.state().clock.small, 1, "loaded {}", small);

        // One nibble per sample at cadence 0, not the double step of a fresh reset
        sbox.reset_ts(0);
        sbox.update(&mut bus, 250);
        assert_eq!(sbox.state().channels[0].which_nibble, 4);
    }
}
