//! Mapping track time onto the video's time axis.
//!
//! A track instant `t` lands at video offset `t - video_reference_time`.
//! Samples are clipped to `[0, video_duration]`; samples with no visible
//! portion are dropped. No timezone handling happens here: both clocks are
//! expected to be UTC already.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use speedcue_common::error::{SpeedcueError, SpeedcueResult};

use crate::speed::SpeedSample;

/// Run-wide mapping from absolute track time to video-relative time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentContext {
    /// Wall-clock time of the video's first frame.
    pub video_reference_time: DateTime<Utc>,

    /// Total video length, from the container metadata.
    pub video_duration: Duration,
}

/// A non-empty span on the video's time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInterval {
    pub start: Duration,
    pub end: Duration,
}

/// Where a sample falls relative to the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Visible(VideoInterval),
    /// Ends at or before the first frame.
    BeforeVideo,
    /// Starts at or after the last frame. Later samples will too.
    AfterVideo,
}

impl AlignmentContext {
    pub fn new(video_reference_time: DateTime<Utc>, video_duration: Duration) -> Self {
        Self {
            video_reference_time,
            video_duration,
        }
    }

    /// Shift the reference time by a signed number of seconds.
    ///
    /// Positive values move the video start later on the track's clock,
    /// which corrects a camera clock that runs behind the GPS.
    /// A shift that is not finite or moves the reference outside the
    /// representable date range is a `Config` error.
    pub fn with_offset_secs(self, secs: f64) -> SpeedcueResult<Self> {
        let micros = (secs * 1_000_000.0).round();
        if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
            return Err(SpeedcueError::config(format!(
                "time offset of {secs}s is out of range"
            )));
        }
        let video_reference_time = self
            .video_reference_time
            .checked_add_signed(TimeDelta::microseconds(micros as i64))
            .ok_or_else(|| {
                SpeedcueError::config(format!("time offset of {secs}s is out of range"))
            })?;
        Ok(Self {
            video_reference_time,
            ..self
        })
    }

    /// Signed offset of an absolute instant from the first frame.
    pub fn offset_of(&self, time: DateTime<Utc>) -> TimeDelta {
        time - self.video_reference_time
    }

    /// Place a speed sample on the video's time axis.
    pub fn align(&self, sample: &SpeedSample) -> Alignment {
        let duration = TimeDelta::from_std(self.video_duration).unwrap_or(TimeDelta::MAX);
        let start = self.offset_of(sample.start).max(TimeDelta::zero());
        let end = self.offset_of(sample.end);

        if end <= TimeDelta::zero() {
            return Alignment::BeforeVideo;
        }
        if start >= duration {
            return Alignment::AfterVideo;
        }
        let end = end.min(duration);

        Alignment::Visible(VideoInterval {
            start: start.to_std().unwrap_or_default(),
            end: end.to_std().unwrap_or_default(),
        })
    }
}
