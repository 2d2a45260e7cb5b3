//! Speedcue Timeline
//!
//! Turns a GPS track into a timed speed readout for a video:
//! - **Speed:** Haversine distance over elapsed time for each pair of fixes
//! - **Smoothing:** Optional trailing-window average against GPS jitter
//! - **Alignment:** Maps track time onto the video's time axis
//! - **Cues:** Formats speeds into styled overlay text
//! - **ASS:** Writes cues as an Advanced SubStation Alpha subtitle track
//!
//! Every stage is a lazy, single-pass transform. Nothing here touches
//! video frames; the cost of a run scales with track length only.

pub mod align;
pub mod ass;
pub mod cue;
pub mod pipeline;
pub mod smoothing;
pub mod speed;

pub use align::{AlignmentContext, VideoInterval};
pub use ass::{AssHeader, AssWriter};
pub use cue::{OverlayConfig, OverlayCue, ScreenPosition, SpeedUnit};
pub use pipeline::{cue_stream, write_overlay, write_overlay_file, OverlayStats, TimelineSettings};
pub use smoothing::WindowSmoother;
pub use speed::{estimate_speeds, SpeedSample};
