//! Synthesis buffers and output resampling
//!
//! The ADPCM mixer and the PSG do not write samples; they add band-limited
//! *deltas* into a 65536-slot ring per side at the synthesis rate (one slot
//! per 12 V810 ticks). Once per frame the consumed span is integrated back
//! into a waveform, CD-DA is mixed in, and the result is decimated to the
//! host rate.

/// V810 master clock in Hz.
pub const PCFX_MASTER_CLOCK: u32 = 21_477_272;

/// Synthesis buffer rate in Hz (12 ticks per slot).
pub const SYNTH_RATE: u32 = PCFX_MASTER_CLOCK / 12;

/// Slots per ring.
pub const RING_LEN: usize = 65536;
const RING_MASK: usize = RING_LEN - 1;

/// Deltas are written pre-multiplied by the FIR gain (2048 = 1 << 11).
const INTEGRATE_SHIFT: u32 = 11;

/// Additive delta ring for one output side.
#[derive(Debug)]
pub struct SynthBuffer {
    buffer: Box<[i32]>,
    /// Slot of the current frame's time zero.
    head: usize,
    /// Running integral carried across frames.
    accum: i32,
}

impl SynthBuffer {
    pub fn new() -> Self {
        Self {
            buffer: vec![0; RING_LEN].into_boxed_slice(),
            head: 0,
            accum: 0,
        }
    }

    /// Add `delta` at `offset` slots past the frame base.
    #[inline]
    pub fn add(&mut self, offset: usize, delta: i32) {
        let slot = &mut self.buffer[(self.head + offset) & RING_MASK];
        *slot = slot.wrapping_add(delta);
    }

    /// Raw slot value at `offset` past the frame base.
    pub fn slot(&self, offset: usize) -> i32 {
        self.buffer[(self.head + offset) & RING_MASK]
    }

    /// Sum of absolute slot values over the whole ring.
    pub fn energy(&self) -> u64 {
        self.buffer.iter().map(|&v| v.unsigned_abs() as u64).sum()
    }

    /// Turn the first `count` slots into waveform samples in place, mixing in CD-DA.
    ///
    /// Must be followed by [`SynthBuffer::consume`] for the same span.
    pub fn integrate(&mut self, count: usize, cdda: &CddaBuffer) {
        for i in 0..count.min(RING_LEN) {
            let slot = (self.head + i) & RING_MASK;
            self.accum = self.accum.wrapping_add(self.buffer[slot]);
            self.buffer[slot] = (self.accum >> INTEGRATE_SHIFT).wrapping_add(cdda.sample(i));
        }
    }

    /// Clear the first `count` slots and move the frame base past them.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(RING_LEN);
        for i in 0..count {
            self.buffer[(self.head + i) & RING_MASK] = 0;
        }
        self.head = (self.head + count) & RING_MASK;
    }

    /// Advance past `count` slots without producing output, keeping the
    /// running integral consistent.
    pub fn skip(&mut self, count: usize) {
        for i in 0..count.min(RING_LEN) {
            let slot = (self.head + i) & RING_MASK;
            self.accum = self.accum.wrapping_add(self.buffer[slot]);
        }
        self.consume(count);
    }

    /// Current integrated level, in sample units.
    pub fn level(&self) -> i32 {
        self.accum >> INTEGRATE_SHIFT
    }
}

impl Default for SynthBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// CD-DA staging ring for one side, filled by the CD drive at the synthesis rate.
#[derive(Debug)]
pub struct CddaBuffer {
    buffer: Box<[i32]>,
    head: usize,
}

impl CddaBuffer {
    pub fn new() -> Self {
        Self {
            buffer: vec![0; RING_LEN].into_boxed_slice(),
            head: 0,
        }
    }

    /// Mix a CD-DA sample (already volume-scaled) at `offset` slots past the frame base.
    pub fn add(&mut self, offset: usize, sample: i32) {
        let slot = &mut self.buffer[(self.head + offset) & RING_MASK];
        *slot = slot.wrapping_add(sample);
    }

    pub fn sample(&self, offset: usize) -> i32 {
        self.buffer[(self.head + offset) & RING_MASK]
    }

    /// Drop the first `count` slots and move the frame base past them.
    pub fn finish(&mut self, count: usize) {
        let count = count.min(RING_LEN);
        for i in 0..count {
            self.buffer[(self.head + i) & RING_MASK] = 0;
        }
        self.head = (self.head + count) & RING_MASK;
    }
}

impl Default for CddaBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DecimatorState {
    /// 32.32 fixed-point output phase.
    phase: u64,
    sum: i64,
    count: u32,
}

/// Box-filter decimator from the synthesis rate to the host rate.
///
/// One instance serves both sides; each side keeps its own phase so frames
/// line up as long as both are fed the same slot counts.
#[derive(Debug)]
pub struct Resampler {
    output_rate: u32,
    step: u64,
    sides: [DecimatorState; 2],
}

impl Resampler {
    /// `output_rate` must be non-zero and no higher than `input_rate`.
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        debug_assert!(output_rate > 0 && output_rate <= input_rate);
        Self {
            output_rate,
            step: ((output_rate as u64) << 32) / input_rate as u64,
            sides: [DecimatorState::default(); 2],
        }
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Decimate `count` integrated slots of `buf` into the interleaved stereo
    /// `out`, writing only channel `side`. Frames beyond `max_frames` or the
    /// end of `out` are dropped. With `reverse` the produced block is written
    /// back to front.
    pub fn resample(
        &mut self,
        side: usize,
        buf: &SynthBuffer,
        count: usize,
        out: &mut [i16],
        max_frames: usize,
        reverse: bool,
    ) -> usize {
        let capacity = max_frames.min(out.len() / 2);
        let state = &mut self.sides[side];
        let mut frames = 0;

        for i in 0..count.min(RING_LEN) {
            state.sum += buf.slot(i) as i64;
            state.count += 1;
            state.phase += self.step;

            if state.phase >= 1 << 32 {
                state.phase -= 1 << 32;
                let sample = state.sum / state.count as i64;
                state.sum = 0;
                state.count = 0;

                if frames < capacity {
                    out[frames * 2 + side] = sample.clamp(i16::MIN as i64, i16::MAX as i64) as i16;
                    frames += 1;
                }
            }
        }

        if reverse {
            for i in 0..frames / 2 {
                out.swap(i * 2 + side, (frames - 1 - i) * 2 + side);
            }
        }

        frames
    }
}
