//! Render a raw PC-FX ADPCM stream to a WAV file through the SoundBox.
//!
//! The input is the byte stream KING would feed channel 0, read as
//! little-endian half-words.

use pcfx_soundbox::audio::PCFX_MASTER_CLOCK;
use pcfx_soundbox::wav_writer::WavWriter;
use pcfx_soundbox::{SoundBox, SoundBoxBus, SoundBoxConfig};
use std::path::{Path, PathBuf};

/// V810 ticks per emulated frame (~60 Hz).
const FRAME_TICKS: u32 = PCFX_MASTER_CLOCK / 60;

/// Output sample ticks are 1365 half-ticks apart.
const SAMPLE_HALF_TICKS: u64 = 1365;

struct FileBus {
    data: Vec<u8>,
    pos: usize,
}

impl FileBus {
    fn exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }
}

impl SoundBoxBus for FileBus {
    fn adpcm_half_word(&mut self, channel: usize) -> u16 {
        if channel != 0 || self.exhausted() {
            return 0;
        }
        let lo = self.data[self.pos];
        let hi = self.data.get(self.pos + 1).copied().unwrap_or(0);
        self.pos += 2;
        u16::from_le_bytes([lo, hi])
    }

    fn set_cdda_volume(&mut self, left: f32, right: f32) {
        log::debug!("CD-DA volume {:.3} / {:.3}", left, right);
    }
}

fn usage() -> ! {
    eprintln!(
        "Usage: adpcm_render [--config <file.json>] [--rate-shift 0-3] [--interpolate] [--volume 0-63] <input.adpcm> <output.wav>"
    );
    std::process::exit(1);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path: Option<PathBuf> = None;
    let mut rate_shift = 0u32;
    let mut interpolate = false;
    let mut volume = 0x3Fu16;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => config_path = iter.next().map(PathBuf::from),
            "--rate-shift" => {
                rate_shift = iter.next().and_then(|s| s.parse::<u32>().ok()).unwrap_or_else(|| usage()) & 0x3
            }
            "--volume" => {
                volume = iter.next().and_then(|s| s.parse::<u16>().ok()).unwrap_or_else(|| usage())
            }
            "--interpolate" => interpolate = true,
            s if s.starts_with("--") => usage(),
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let [input, output] = positional.as_slice() else {
        usage();
    };

    let config = config_path
        .map(SoundBoxConfig::load_or_default)
        .unwrap_or_default();

    let data = match std::fs::read(input) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to read {}: {}", input.display(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = render(data, output, &config, rate_shift, interpolate, volume) {
        eprintln!("Render failed: {}", e);
        std::process::exit(1);
    }
}

fn render(
    data: Vec<u8>,
    output: &Path,
    config: &SoundBoxConfig,
    rate_shift: u32,
    interpolate: bool,
    volume: u16,
) -> Result<(), pcfx_soundbox::SoundBoxError> {
    let nibbles = data.len() as u64 * 2;
    let mut bus = FileBus { data, pos: 0 };
    let mut sbox = SoundBox::with_null_psg(config)?;
    let rate = sbox.sound_rate();
    if rate == 0 {
        log::warn!("sound output disabled in config; the WAV will be empty");
    }

    sbox.reset(&mut bus, 0);
    sbox.set_king_adpcm_control(0x1 | (rate_shift << 2));
    sbox.write(&mut bus, 0x20, if interpolate { 0x4 } else { 0 }, 0);
    sbox.write(&mut bus, 0x22, volume, 0);
    sbox.write(&mut bus, 0x24, volume, 0);

    // Stream length plus one frame for the tail to ring out
    let total_ticks = (nibbles << rate_shift) * SAMPLE_HALF_TICKS / 2 + FRAME_TICKS as u64;
    let mut wav = WavWriter::create(output, rate.max(1), 2)?;
    let mut out = vec![0i16; 8192];
    let max_frames = out.len() / 2;
    let mut base = 0u32;
    let mut rendered = 0u64;

    while rendered < total_ticks {
        let mut ts = base;
        let end = base + FRAME_TICKS;
        while ts < end {
            ts = sbox.update(&mut bus, ts).min(end);
        }
        let result = sbox.flush(&mut bus, end, &mut out, max_frames, false);
        wav.write_frames(&out, result.frames)?;
        rendered += result.consumed_ticks as u64;
        base = result.new_base_timestamp;
    }

    log::info!(
        "rendered {} bytes of ADPCM into {} ({} channels, {} bytes of PCM)",
        bus.pos.min(bus.data.len()),
        output.display(),
        wav.channels(),
        wav.data_size()
    );
    Ok(())
}
