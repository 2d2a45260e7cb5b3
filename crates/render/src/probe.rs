//! Video metadata via ffprobe.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;

use speedcue_common::error::{SpeedcueError, SpeedcueResult};

/// Properties of the first video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second, when the container reports a usable rate.
    pub fps: Option<f64>,
    pub duration: Duration,
    /// Recording time from container tags, if the camera wrote one.
    pub creation_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: Option<ProbeTags>,
}

#[derive(Debug, Deserialize)]
struct ProbeTags {
    creation_time: Option<String>,
}

/// Probe a video file with ffprobe.
pub async fn probe_video(ffprobe: &str, path: &Path) -> SpeedcueResult<VideoInfo> {
    if !path.exists() {
        return Err(SpeedcueError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,duration:format=duration:format_tags=creation_time",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| SpeedcueError::video(format!("Failed to run {ffprobe}: {e}")))?;

    if !output.status.success() {
        return Err(SpeedcueError::video(format!(
            "ffprobe could not read {} (status {}): {}",
            path.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&raw)
        .map_err(|e| SpeedcueError::video(format!("{}: {e}", path.display())))?;
    tracing::info!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        fps = ?info.fps,
        duration_secs = info.duration.as_secs_f64(),
        "Probed video"
    );
    Ok(info)
}

/// Parse ffprobe's JSON output.
pub fn parse_probe_output(raw: &str) -> anyhow::Result<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(raw)?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no video stream"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => anyhow::bail!("video stream has no dimensions"),
    };

    let format_duration = probe.format.as_ref().and_then(|f| f.duration.as_deref());
    let duration_secs = format_duration
        .or(stream.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| anyhow::anyhow!("video has no usable duration"))?;

    let creation_time = probe
        .format
        .and_then(|f| f.tags)
        .and_then(|t| t.creation_time)
        .and_then(|t| DateTime::parse_from_rfc3339(t.trim()).ok())
        .map(|t| t.with_timezone(&Utc));

    Ok(VideoInfo {
        width,
        height,
        fps: stream.r_frame_rate.as_deref().and_then(parse_frame_rate),
        duration: Duration::from_secs_f64(duration_secs),
        creation_time,
    })
}

/// Parse a rational (`30000/1001`) or decimal frame rate.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}
