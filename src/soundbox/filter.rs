//! Reset anti-click and volume smoothing
//!
//! When a channel's reset bit goes high its predictor snaps to zero. The
//! anti-click accumulator keeps the pre-reset value in 32.32 fixed point and
//! lets it decay by 1/256 per output sample, so the step becomes a fade.
//!
//! Volume register changes are smoothed by a one-pole low-pass (designed with
//! mkfilter: Butterworth, order 1, corner 1.5888889125e-04 of the sample rate).

use super::decoder::{PREDICTOR_MAX, PREDICTOR_MIN};
use serde::{Deserialize, Serialize};

const ANTI_CLICK_MAX: i64 = (PREDICTOR_MAX as i64) << 32;
const ANTI_CLICK_MIN: i64 = (PREDICTOR_MIN as i64) << 32;

/// Decaying ghost of the last pre-reset predictor value, 32.32 fixed point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AntiClick(pub i64);

impl AntiClick {
    /// Fold the predictor value being discarded by a reset into the accumulator.
    pub fn capture(&mut self, predictor: i32) {
        self.0 = self
            .0
            .saturating_add((predictor as i64) << 32)
            .clamp(ANTI_CLICK_MIN, ANTI_CLICK_MAX);
    }

    /// One output sample of exponential decay.
    pub fn decay(&mut self) {
        self.0 -= self.0 >> 8;
    }

    /// Integer contribution to the channel sample.
    ///
    /// The buggy codec path halves the predictor, so it also takes one more
    /// bit off here.
    pub fn contribution(&self, buggy_codec: bool) -> i64 {
        if buggy_codec {
            self.0 >> 33
        } else {
            self.0 >> 32
        }
    }

    pub fn clamp(&mut self) -> bool {
        let before = self.0;
        self.0 = self.0.clamp(ANTI_CLICK_MIN, ANTI_CLICK_MAX);
        self.0 != before
    }
}

const FILTER_GAIN: f64 = 2.004348738e+03;
const FILTER_POLE: f64 = 0.9990021696;

/// One-pole low-pass over a volume gain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeFilter {
    pub xv: [f64; 2],
    pub yv: [f64; 2],
    /// Current smoothed gain.
    pub filtered: f64,
}

impl VolumeFilter {
    /// Advance by one output sample toward `target`.
    pub fn step(&mut self, target: f64) {
        self.xv[0] = self.xv[1];
        self.xv[1] = target / FILTER_GAIN;

        self.yv[0] = self.yv[1];
        self.yv[1] = (self.xv[0] + self.xv[1]) + FILTER_POLE * self.yv[0];
        self.filtered = self.yv[1];
    }

    /// Zero any non-finite history. Returns whether anything changed.
    pub fn sanitize(&mut self) -> bool {
        let mut changed = false;
        for v in self.xv.iter_mut().chain(self.yv.iter_mut()).chain(std::iter::once(&mut self.filtered)) {
            if !v.is_finite() {
                *v = 0.0;
                changed = true;
            }
        }
        changed
    }
}
