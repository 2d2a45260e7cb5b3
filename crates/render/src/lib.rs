//! Speedcue Render
//!
//! Everything that touches the video file, delegated to ffmpeg:
//!
//! ```text
//! input.mp4 ──► ffprobe ──► VideoInfo (size, fps, duration)
//!
//! input.mp4 ──┐
//!             ├── ffmpeg ──► output.partial.mp4 ──rename──► output.mp4
//! speed.ass ──┘
//!   burn: ass filter + re-encode
//!   soft: stream copy + subtitle track
//! ```
//!
//! Frames are never decoded by this crate.

pub mod mux;
pub mod probe;

pub use mux::*;
pub use probe::*;
