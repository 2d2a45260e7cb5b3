//! Write the subtitle track without a video.

use std::path::PathBuf;

use speedcue_common::config::AppConfig;
use speedcue_timeline::{write_overlay_file, AssHeader};
use speedcue_track_model::gpx::load_gpx;

use super::{duration_from_secs, StyleArgs};

pub fn run(
    config: &AppConfig,
    gpx: PathBuf,
    duration_secs: f64,
    output: Option<PathBuf>,
    width: u32,
    height: u32,
    style: StyleArgs,
) -> anyhow::Result<()> {
    let duration = duration_from_secs(duration_secs, "--duration")?;
    let points = load_gpx(&gpx)?;
    let settings = style.settings(&config.overlay, &points, duration)?;

    let output_path = output.unwrap_or_else(|| gpx.with_extension("ass"));
    let header = AssHeader::for_video(width, height, &settings.overlay);
    let stats = write_overlay_file(points, &settings, &header, &output_path)?;

    println!("Subtitle track: {}", output_path.display());
    println!("  Speed samples: {}", stats.samples);
    if stats.degenerate_pairs > 0 {
        println!("  Skipped (same timestamp): {}", stats.degenerate_pairs);
    }
    if stats.before_video > 0 {
        println!("  Before video start: {}", stats.before_video);
    }
    println!("  Cues written: {}", stats.cues_written);
    if stats.cues_filtered > 0 {
        println!("  Cues too short to show: {}", stats.cues_filtered);
    }
    if stats.cues_written == 0 {
        println!("\nNo cues fall inside the video. Check --video-date and --time-delta.");
    }

    Ok(())
}
