//! Show track information.

use std::path::PathBuf;

use chrono::TimeDelta;
use speedcue_common::config::AppConfig;
use speedcue_render::probe::probe_video;
use speedcue_track_model::gpx::load_gpx;
use speedcue_track_model::point::TrackSummary;

pub async fn run(config: &AppConfig, gpx: PathBuf, video: Option<PathBuf>) -> anyhow::Result<()> {
    let points = load_gpx(&gpx)?;
    let summary = TrackSummary::from_points(&points);

    println!("Track: {}", gpx.display());
    println!("  Points: {}", summary.points);
    if let (Some(start), Some(end)) = (summary.start, summary.end) {
        println!("  Start: {}", start.to_rfc3339());
        println!("  End: {}", end.to_rfc3339());
    }
    let duration_secs = secs(summary.duration());
    println!("  Duration: {duration_secs:.1}s");
    println!("  Distance: {:.2} km", summary.distance_m / 1000.0);
    if duration_secs > 0.0 {
        println!(
            "  Average speed: {:.1} km/h",
            summary.distance_m / duration_secs * 3.6
        );
    }

    let Some(video) = video else {
        return Ok(());
    };

    let info = probe_video(&config.ffmpeg.ffprobe(), &video).await?;
    println!();
    println!("Video: {}", video.display());
    println!("  Resolution: {}x{}", info.width, info.height);
    if let Some(fps) = info.fps {
        println!("  Frame rate: {fps:.2} fps");
    }
    println!("  Duration: {:.1}s", info.duration.as_secs_f64());

    match (info.creation_time, summary.start) {
        (Some(created), Some(track_start)) => {
            println!("  Created: {}", created.to_rfc3339());
            println!(
                "  Video starts {:+.1}s from the first track point",
                secs(created - track_start)
            );
            println!("  Suggested: --video-date {}", created.to_rfc3339());
        }
        (Some(created), None) => println!("  Created: {}", created.to_rfc3339()),
        (None, _) => println!("  Created: unknown (pass --video-date explicitly)"),
    }

    Ok(())
}

fn secs(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}
