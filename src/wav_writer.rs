//! 16-bit PCM WAV output for rendered SoundBox audio.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Size of the canonical RIFF/fmt/data header.
const HEADER_LEN: u32 = 44;

pub struct WavWriter<W: Write + Seek> {
    inner: W,
    data_size: u32,
    channels: u16,
    finalized: bool,
}

impl WavWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32, channels: u16) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), sample_rate, channels)
    }
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(mut inner: W, sample_rate: u32, channels: u16) -> std::io::Result<Self> {
        inner.write_all(b"RIFF")?;
        inner.write_all(&[0; 4])?; // patched on finalize
        inner.write_all(b"WAVE")?;

        inner.write_all(b"fmt ")?;
        inner.write_all(&16u32.to_le_bytes())?;
        inner.write_all(&1u16.to_le_bytes())?; // PCM
        inner.write_all(&channels.to_le_bytes())?;
        inner.write_all(&sample_rate.to_le_bytes())?;
        inner.write_all(&(sample_rate * u32::from(channels) * 2).to_le_bytes())?;
        inner.write_all(&(channels * 2).to_le_bytes())?;
        inner.write_all(&16u16.to_le_bytes())?;

        inner.write_all(b"data")?;
        inner.write_all(&[0; 4])?; // patched on finalize

        Ok(Self {
            inner,
            data_size: 0,
            channels,
            finalized: false,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of bytes of sample data written so far.
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Append interleaved samples; the count must be a whole number of frames.
    pub fn write_samples(&mut self, samples: &[i16]) -> std::io::Result<()> {
        if samples.len() % (self.channels as usize) != 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Sample count not aligned with channel count",
            ));
        }
        for &sample in samples {
            self.inner.write_all(&sample.to_le_bytes())?;
        }
        self.data_size += (samples.len() * 2) as u32;
        Ok(())
    }

    /// Append the first `frames` frames of an interleaved flush buffer.
    pub fn write_frames(&mut self, out: &[i16], frames: usize) -> std::io::Result<()> {
        let len = (frames * self.channels as usize).min(out.len());
        self.write_samples(&out[..len - len % self.channels as usize])
    }

    fn finalize(&mut self) -> std::io::Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.inner.flush()?;

        // RIFF size covers everything after the size field itself
        self.inner.seek(SeekFrom::Start(4))?;
        self.inner.write_all(&(HEADER_LEN - 8 + self.data_size).to_le_bytes())?;

        self.inner.seek(SeekFrom::Start(40))?;
        self.inner.write_all(&self.data_size.to_le_bytes())?;

        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;
        self.finalized = true;
        Ok(())
    }

    /// Patch the header sizes and hand back the underlying writer.
    pub fn finish(mut self) -> std::io::Result<W>
    where
        W: Clone,
    {
        self.finalize()?;
        Ok(self.inner.clone())
    }
}

impl<W: Write + Seek> Drop for WavWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            log::warn!("failed to finalize WAV header: {}", e);
        }
    }
}
