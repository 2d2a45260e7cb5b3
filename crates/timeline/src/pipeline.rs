//! Single-pass track-to-subtitle pipeline.
//!
//! ```text
//! TrackPoint ─► SpeedSamples ─► [WindowSmoother] ─► AlignmentContext ─► format_cue ─► AssWriter
//! ```
//!
//! Each stage pulls one item at a time from the previous one. The estimator
//! keeps a single previous point, the smoother keeps only its window, and
//! the writer streams events straight to its output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use speedcue_common::error::{SpeedcueError, SpeedcueResult};
use speedcue_track_model::point::TrackPoint;

use crate::align::{Alignment, AlignmentContext};
use crate::ass::{AssHeader, AssWriter};
use crate::cue::{format_cue, OverlayConfig, OverlayCue};
use crate::smoothing::WindowSmoother;
use crate::speed::{estimate_speeds, SpeedSamples};

/// Everything that shapes one run's cue sequence.
#[derive(Debug, Clone)]
pub struct TimelineSettings {
    pub alignment: AlignmentContext,
    pub overlay: OverlayConfig,
    /// Trailing smoothing window; `None` leaves raw per-pair speeds.
    pub smoothing_window: Option<Duration>,
}

/// Counters collected while generating cues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayStats {
    /// Speed samples produced by the estimator.
    pub samples: usize,
    /// Point pairs skipped for zero elapsed time.
    pub degenerate_pairs: usize,
    /// Samples that ended before the first video frame.
    pub before_video: usize,
    /// Whether generation stopped because the track ran past the video.
    pub reached_video_end: bool,
    /// Cues written to the subtitle track.
    pub cues_written: usize,
    /// Cues dropped for rounding to zero length.
    pub cues_filtered: usize,
}

/// Lazy stream of overlay cues for a track.
///
/// Yields at most one error, after which it is exhausted.
pub struct CueStream<I> {
    samples: SpeedSamples<I>,
    smoother: Option<WindowSmoother>,
    alignment: AlignmentContext,
    overlay: OverlayConfig,
    stats: OverlayStats,
    done: bool,
}

impl<I> CueStream<I> {
    pub fn stats(&self) -> OverlayStats {
        OverlayStats {
            degenerate_pairs: self.samples.degenerate_pairs(),
            ..self.stats
        }
    }
}

impl<I: Iterator<Item = TrackPoint>> Iterator for CueStream<I> {
    type Item = SpeedcueResult<OverlayCue>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let sample = match self.samples.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                Some(Ok(sample)) => sample,
            };
            self.stats.samples += 1;

            let sample = match self.smoother.as_mut() {
                Some(smoother) => smoother.apply(sample),
                None => sample,
            };

            match self.alignment.align(&sample) {
                Alignment::Visible(interval) => {
                    return Some(Ok(format_cue(interval, sample.speed_mps, &self.overlay)));
                }
                Alignment::BeforeVideo => {
                    self.stats.before_video += 1;
                }
                Alignment::AfterVideo => {
                    tracing::debug!(at = %sample.start, "Track continues past video end");
                    self.stats.reached_video_end = true;
                    self.done = true;
                }
            }
        }
        None
    }
}

/// Build the cue stream for `points` under `settings`.
pub fn cue_stream<P>(points: P, settings: &TimelineSettings) -> SpeedcueResult<CueStream<P::IntoIter>>
where
    P: IntoIterator<Item = TrackPoint>,
{
    let smoother = settings
        .smoothing_window
        .map(WindowSmoother::new)
        .transpose()?;
    Ok(CueStream {
        samples: estimate_speeds(points),
        smoother,
        alignment: settings.alignment,
        overlay: settings.overlay,
        stats: OverlayStats::default(),
        done: false,
    })
}

/// Generate the subtitle track for `points` and stream it into `out`.
pub fn write_overlay<P, W>(
    points: P,
    settings: &TimelineSettings,
    header: &AssHeader,
    out: W,
) -> SpeedcueResult<OverlayStats>
where
    P: IntoIterator<Item = TrackPoint>,
    W: Write,
{
    let mut cues = cue_stream(points, settings)?;
    let mut writer = AssWriter::new(out, header)?;
    for cue in cues.by_ref() {
        writer.write_cue(&cue?)?;
    }

    let stats = OverlayStats {
        cues_written: writer.written(),
        cues_filtered: writer.filtered(),
        ..cues.stats()
    };
    writer.finish()?;

    tracing::info!(
        samples = stats.samples,
        degenerate = stats.degenerate_pairs,
        before_video = stats.before_video,
        cues = stats.cues_written,
        filtered = stats.cues_filtered,
        "Generated speed overlay"
    );
    Ok(stats)
}

/// Generate the subtitle track into a file.
///
/// Output goes to a sibling temporary file that replaces `path` only once
/// the whole track has been written, so a failed run never leaves a
/// truncated file behind.
pub fn write_overlay_file<P>(
    points: P,
    settings: &TimelineSettings,
    header: &AssHeader,
    path: &Path,
) -> SpeedcueResult<OverlayStats>
where
    P: IntoIterator<Item = TrackPoint>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let partial = partial_path(path);
    let result = File::create(&partial)
        .map_err(SpeedcueError::from)
        .and_then(|file| write_overlay(points, settings, header, BufWriter::new(file)));

    match result {
        Ok(stats) => {
            std::fs::rename(&partial, path)?;
            tracing::debug!(path = %path.display(), "Wrote subtitle track");
            Ok(stats)
        }
        Err(err) => {
            if let Err(cleanup) = std::fs::remove_file(&partial) {
                tracing::warn!(path = %partial.display(), error = %cleanup, "Failed to remove partial subtitle file");
            }
            Err(err)
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
