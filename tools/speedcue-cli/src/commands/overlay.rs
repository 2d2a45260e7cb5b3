//! Generate the speed overlay and merge it into the video.

use std::path::{Path, PathBuf};

use speedcue_common::config::AppConfig;
use speedcue_render::mux::{default_output_path, mux_overlay, MuxJob, MuxMode, MuxProgress};
use speedcue_render::probe::probe_video;
use speedcue_timeline::{write_overlay_file, AssHeader};
use speedcue_track_model::gpx::load_gpx;

use super::StyleArgs;

pub async fn run(
    config: &AppConfig,
    video: PathBuf,
    gpx: PathBuf,
    output: Option<PathBuf>,
    style: StyleArgs,
    mode: MuxMode,
    keep_ass: bool,
) -> anyhow::Result<()> {
    println!("Adding speed overlay to: {}", video.display());

    let points = load_gpx(&gpx)?;
    let info = probe_video(&config.ffmpeg.ffprobe(), &video).await?;
    let settings = style.settings(&config.overlay, &points, info.duration)?;

    let output_path = output.unwrap_or_else(|| default_output_path(&video));
    let ass_path = output_path.with_extension("ass");

    println!("  Track: {} ({} points)", gpx.display(), points.len());
    println!(
        "  Video: {}x{}, {:.1}s",
        info.width,
        info.height,
        info.duration.as_secs_f64()
    );
    println!(
        "  Video start: {}",
        settings.alignment.video_reference_time.to_rfc3339()
    );
    println!("  Output: {}", output_path.display());
    println!("  Mode: {:?}", mode);

    let header = AssHeader::for_video(info.width, info.height, &settings.overlay);
    let stats = write_overlay_file(points, &settings, &header, &ass_path)?;
    if stats.cues_written == 0 {
        tracing::warn!("Track does not overlap the video; output will have no speed overlay");
    }
    println!("  Cues: {}", stats.cues_written);

    let job = MuxJob {
        video_path: video,
        subtitle_path: ass_path.clone(),
        output_path: output_path.clone(),
        mode,
        duration: info.duration,
        ffmpeg: config.ffmpeg.clone(),
    };

    let progress_cb: Box<dyn Fn(MuxProgress) + Send> = Box::new(|p| {
        print!(
            "\r  Progress: {:.1}% ({:.0}s, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.out_time_secs,
            p.eta_secs,
        );
    });

    let result = mux_overlay(job, Some(progress_cb)).await;
    if !keep_ass {
        remove_subtitle_file(&ass_path);
    }

    match result {
        Ok(path) => {
            println!("\nOverlay complete: {}", path.display());
            if keep_ass {
                println!("  Subtitles: {}", ass_path.display());
            }
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::Error::new(e).context("Overlay failed"))
        }
    }
}

fn remove_subtitle_file(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %err, "Failed to remove subtitle file");
    }
}
