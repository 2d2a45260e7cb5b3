//! speedcue CLI: overlay GPS speed from a GPX track onto a video.
//!
//! Usage:
//!   speedcue overlay <VIDEO> <GPX>         Generate the overlay and mux it into the video
//!   speedcue cues <GPX> --duration SECS    Write the subtitle track only
//!   speedcue info <GPX> [--video VIDEO]    Show track (and video) information
//!   speedcue config [--init]               Show or write the config file
//!
//! Exits with status 2 when an input (track, video, option) is rejected and
//! 1 for any other failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use speedcue_common::config::{config_file_path, AppConfig};
use speedcue_common::error::SpeedcueError;
use speedcue_render::mux::MuxMode;

mod commands;

use commands::StyleArgs;

#[derive(Parser)]
#[command(
    name = "speedcue",
    about = "Overlay GPS speed from a GPX track onto action-camera video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the speed overlay and merge it into the video
    Overlay {
        /// Input video file
        video: PathBuf,

        /// GPX track recorded alongside the video
        gpx: PathBuf,

        /// Output file (default: <video>_with_speed.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        style: StyleArgs,

        /// burn: render into the picture; soft: add a subtitle stream
        #[arg(long, default_value = "burn")]
        mode: MuxMode,

        /// Keep the generated .ass file next to the output
        #[arg(long)]
        keep_ass: bool,

        /// ffmpeg executable
        #[arg(long)]
        ffmpeg: Option<String>,
    },

    /// Write the subtitle track only, without touching any video
    Cues {
        /// GPX track
        gpx: PathBuf,

        /// Length of the target video (seconds)
        #[arg(long)]
        duration: f64,

        /// Output .ass file (default: <gpx>.ass)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Script width in pixels
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Script height in pixels
        #[arg(long, default_value = "1080")]
        height: u32,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Show track information, and how it lines up with a video
    Info {
        /// GPX track
        gpx: PathBuf,

        /// Video to probe and compare against
        #[arg(long)]
        video: Option<PathBuf>,

        /// ffmpeg executable (ffprobe is looked up next to it)
        #[arg(long)]
        ffmpeg: Option<String>,
    },

    /// Show the resolved configuration, or write it out as a starting point
    Config {
        /// Write the current settings to the config file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SpeedcueError>() {
        Some(e) if e.is_input_error() => 2,
        _ => 1,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (config_path, mut config) = match &cli.config {
        Some(path) => (path.clone(), AppConfig::load_from(path)),
        None => (config_file_path(), AppConfig::load()),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    speedcue_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Overlay {
            video,
            gpx,
            output,
            style,
            mode,
            keep_ass,
            ffmpeg,
        } => {
            if let Some(ffmpeg) = ffmpeg {
                config.ffmpeg.ffmpeg_path = ffmpeg;
            }
            commands::overlay::run(&config, video, gpx, output, style, mode, keep_ass).await
        }
        Commands::Cues {
            gpx,
            duration,
            output,
            width,
            height,
            style,
        } => commands::cues::run(&config, gpx, duration, output, width, height, style),
        Commands::Info { gpx, video, ffmpeg } => {
            if let Some(ffmpeg) = ffmpeg {
                config.ffmpeg.ffmpeg_path = ffmpeg;
            }
            commands::info::run(&config, gpx, video).await
        }
        Commands::Config { init, force } => {
            commands::config::run(&config, &config_path, init, force)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_separates_input_errors() {
        let input: anyhow::Error = SpeedcueError::track("no <gpx> root").into();
        assert_eq!(exit_status(&input), 2);

        let wrapped =
            anyhow::Error::new(SpeedcueError::config("bad scale")).context("Overlay failed");
        assert_eq!(exit_status(&wrapped), 2);

        let mux: anyhow::Error = SpeedcueError::mux("ffmpeg exited with 1").into();
        assert_eq!(exit_status(&mux), 1);
        assert_eq!(exit_status(&anyhow::anyhow!("unexpected")), 1);
    }

    #[test]
    fn test_cli_parses_overlay_flags() {
        let cli = Cli::try_parse_from([
            "speedcue", "overlay", "ride.mp4", "ride.gpx", "-t", "-2.5", "-u", "mph", "--mode",
            "soft",
        ])
        .unwrap();
        match cli.command {
            Commands::Overlay { style, mode, .. } => {
                assert_eq!(style.time_delta, -2.5);
                assert_eq!(style.unit, Some(speedcue_timeline::SpeedUnit::MilesPerHour));
                assert_eq!(mode, MuxMode::Soft);
            }
            _ => panic!("expected overlay command"),
        }
    }
}
