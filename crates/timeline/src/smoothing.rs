//! Optional jitter smoothing for speed samples.
//!
//! Positional noise between two close fixes can produce brief, implausible
//! speed spikes. [`WindowSmoother`] replaces each sample's speed with the
//! total distance over total time of the samples that ended within a
//! trailing time window. Interval bounds are never changed, so the output
//! keeps the ordering and length of the input.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::TimeDelta;

use speedcue_common::error::{SpeedcueError, SpeedcueResult};

use crate::speed::SpeedSample;

/// Trailing-window distance/time smoother.
#[derive(Debug, Clone)]
pub struct WindowSmoother {
    window: TimeDelta,
    recent: VecDeque<SpeedSample>,
}

impl WindowSmoother {
    /// Create a smoother averaging over `window`. The window must be non-zero.
    pub fn new(window: Duration) -> SpeedcueResult<Self> {
        if window.is_zero() {
            return Err(SpeedcueError::config("smoothing window must be non-zero"));
        }
        let window = TimeDelta::from_std(window)
            .map_err(|_| SpeedcueError::config("smoothing window is too large"))?;
        Ok(Self {
            window,
            recent: VecDeque::new(),
        })
    }

    /// Create a smoother from a window length in seconds.
    pub fn from_secs(secs: f64) -> SpeedcueResult<Self> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(SpeedcueError::config(format!(
                "smoothing window must be a positive number of seconds, got {secs}"
            )));
        }
        Self::new(Duration::from_secs_f64(secs))
    }

    pub fn window(&self) -> Duration {
        self.window.to_std().unwrap_or_default()
    }

    /// Feed the next sample (in track order) and get its smoothed version.
    pub fn apply(&mut self, sample: SpeedSample) -> SpeedSample {
        // A window reaching past the earliest representable instant keeps everything.
        if let Some(cutoff) = sample.end.checked_sub_signed(self.window) {
            while self.recent.front().is_some_and(|s| s.end <= cutoff) {
                self.recent.pop_front();
            }
        }
        self.recent.push_back(sample);

        let (distance, secs) = self
            .recent
            .iter()
            .fold((0.0, 0.0), |(d, t), s| (d + s.distance_m, t + s.elapsed_secs()));

        let speed_mps = if secs > 0.0 {
            distance / secs
        } else {
            sample.speed_mps
        };
        SpeedSample { speed_mps, ..sample }
    }
}
