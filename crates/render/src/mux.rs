//! Merging the speed subtitle track into the video.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use speedcue_common::config::FfmpegConfig;
use speedcue_common::error::{SpeedcueError, SpeedcueResult};

/// How the overlay ends up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MuxMode {
    /// Render the text into the picture (re-encodes video).
    #[default]
    Burn,
    /// Add a selectable subtitle stream (copies video and audio).
    Soft,
}

impl std::str::FromStr for MuxMode {
    type Err = SpeedcueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "burn" | "hard" => Ok(Self::Burn),
            "soft" | "embed" => Ok(Self::Soft),
            _ => Err(SpeedcueError::config(format!(
                "Unknown mux mode: {s}. Use: burn, soft"
            ))),
        }
    }
}

/// A mux job ready to run.
#[derive(Debug, Clone)]
pub struct MuxJob {
    /// Source video.
    pub video_path: PathBuf,

    /// Generated ASS track.
    pub subtitle_path: PathBuf,

    /// Final output file.
    pub output_path: PathBuf,

    pub mode: MuxMode,

    /// Source duration, used for progress reporting.
    pub duration: Duration,

    pub ffmpeg: FfmpegConfig,
}

/// Progress callback for muxing.
pub type ProgressCallback = Box<dyn Fn(MuxProgress) + Send>;

/// Mux progress report.
#[derive(Debug, Clone)]
pub struct MuxProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Output position reached so far, in seconds.
    pub out_time_secs: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: MuxStage,
}

/// Stages of a mux run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxStage {
    Preparing,
    Encoding,
    Finalizing,
    Complete,
}

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Trait for mux backends.
pub trait MuxBackend {
    /// Build the command that writes the muxed result to `output`.
    fn command(&self, job: &MuxJob, output: &Path) -> SpeedcueResult<MuxCommand>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Mux backend that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    config: FfmpegConfig,
}

impl FfmpegMuxer {
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }
}

impl MuxBackend for FfmpegMuxer {
    fn command(&self, job: &MuxJob, output: &Path) -> SpeedcueResult<MuxCommand> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-y".into(), "-i".into()];
        args.push(path_arg(&job.video_path));

        match job.mode {
            MuxMode::Burn => {
                args.extend([
                    "-vf".to_string(),
                    format!("ass={}", escape_filter_value(&path_arg(&job.subtitle_path))),
                    "-c:v".to_string(),
                    "libx264".to_string(),
                    "-crf".to_string(),
                    self.config.crf.to_string(),
                    "-preset".to_string(),
                    self.config.preset.clone(),
                    "-c:a".to_string(),
                    "copy".to_string(),
                ]);
            }
            MuxMode::Soft => {
                let codec = soft_subtitle_codec(&job.output_path)?;
                args.extend([
                    "-i".to_string(),
                    path_arg(&job.subtitle_path),
                    "-map".to_string(),
                    "0:v".to_string(),
                    "-map".to_string(),
                    "0:a?".to_string(),
                    "-map".to_string(),
                    "1:0".to_string(),
                    "-c:v".to_string(),
                    "copy".to_string(),
                    "-c:a".to_string(),
                    "copy".to_string(),
                    "-c:s".to_string(),
                    codec.to_string(),
                    "-metadata:s:s:0".to_string(),
                    "title=Speed".to_string(),
                    "-disposition:s:0".to_string(),
                    "default".to_string(),
                ]);
            }
        }

        args.extend([
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
        ]);
        args.push(path_arg(output));

        Ok(MuxCommand {
            program: self.config.ffmpeg_path.clone(),
            args,
        })
    }

    fn is_available(&self) -> bool {
        command_exists(&self.config.ffmpeg_path)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Merge the subtitle track into the video.
///
/// This is the main entry point for muxing. The output only appears at
/// `job.output_path` once ffmpeg has finished successfully.
pub async fn mux_overlay(
    job: MuxJob,
    progress: Option<ProgressCallback>,
) -> SpeedcueResult<PathBuf> {
    tracing::info!(
        output = %job.output_path.display(),
        mode = ?job.mode,
        "Starting mux"
    );

    if !job.video_path.exists() {
        return Err(SpeedcueError::FileNotFound {
            path: job.video_path.clone(),
        });
    }
    if !job.subtitle_path.exists() {
        return Err(SpeedcueError::FileNotFound {
            path: job.subtitle_path.clone(),
        });
    }
    if same_file(&job.video_path, &job.output_path) {
        return Err(SpeedcueError::config(
            "output path must differ from the input video",
        ));
    }

    if let Some(parent) = job.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    if let Some(cb) = &progress {
        cb(MuxProgress {
            progress: 0.0,
            out_time_secs: 0.0,
            eta_secs: 0.0,
            stage: MuxStage::Preparing,
        });
    }

    let backend = FfmpegMuxer::new(job.ffmpeg.clone());
    if !backend.is_available() {
        return Err(SpeedcueError::unsupported(format!(
            "No supported mux backend found (expected {} in PATH)",
            job.ffmpeg.ffmpeg_path
        )));
    }
    tracing::info!(backend = backend.name(), "Using mux backend");

    let partial = partial_output_path(&job.output_path);
    let command = backend.command(&job, &partial)?;
    match run_command(&command, job.duration, progress.as_ref()).await {
        Ok(()) => {
            std::fs::rename(&partial, &job.output_path)?;
            if let Some(cb) = &progress {
                cb(MuxProgress {
                    progress: 1.0,
                    out_time_secs: job.duration.as_secs_f64(),
                    eta_secs: 0.0,
                    stage: MuxStage::Complete,
                });
            }
            Ok(job.output_path)
        }
        Err(err) => {
            if partial.exists() {
                if let Err(cleanup) = std::fs::remove_file(&partial) {
                    tracing::warn!(path = %partial.display(), error = %cleanup, "Failed to remove partial output");
                }
            }
            Err(err)
        }
    }
}

async fn run_command(
    command: &MuxCommand,
    expected_duration: Duration,
    progress: Option<&ProgressCallback>,
) -> SpeedcueResult<()> {
    tracing::debug!(program = %command.program, args = ?command.args, "Running ffmpeg");
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| SpeedcueError::mux(format!("Failed to start ffmpeg: {e}")))?;

    tracing::info!(pid = ?child.id(), args_len = command.args.len(), "ffmpeg process started");

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SpeedcueError::mux("Failed to capture ffmpeg stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| SpeedcueError::mux("Failed to capture ffmpeg stderr"))?;

    let expected_secs = expected_duration.as_secs_f64();
    let start = Instant::now();

    // Both pipes are drained together so ffmpeg never blocks on a full stderr.
    let read_progress = async {
        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = Instant::now();
        while let Some(line) = lines.next_line().await? {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key != "progress" {
                continue;
            }
            if state.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = state.out_time_secs;
                last_progress_wall = Instant::now();
            }
            if let Some(cb) = progress {
                cb(progress_report(
                    &state,
                    expected_secs,
                    start.elapsed().as_secs_f64(),
                ));
            }
            if last_progress_wall.elapsed().as_secs() >= 10 {
                tracing::warn!(
                    out_time_secs = state.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_progress_wall = Instant::now();
            }
        }
        Ok::<_, std::io::Error>(())
    };
    let read_stderr = async {
        let mut output = String::new();
        BufReader::new(stderr).read_to_string(&mut output).await?;
        Ok::<_, std::io::Error>(output)
    };

    let (progress_result, stderr_result) = tokio::join!(read_progress, read_stderr);
    let status = child
        .wait()
        .await
        .map_err(|e| SpeedcueError::mux(format!("Failed to wait on ffmpeg: {e}")))?;

    let stderr_output =
        stderr_result.unwrap_or_else(|err| format!("<failed to read ffmpeg stderr: {err}>"));
    progress_result
        .map_err(|e| SpeedcueError::mux(format!("Failed reading ffmpeg progress: {e}")))?;

    if !status.success() {
        return Err(SpeedcueError::mux(format!(
            "ffmpeg failed (status {}): {}",
            status,
            stderr_output.trim()
        )));
    }

    tracing::info!(
        elapsed_secs = start.elapsed().as_secs_f64(),
        "ffmpeg finished"
    );
    Ok(())
}

/// Default output location: `<dir>/<stem>_with_speed.<ext>` next to the video.
pub fn default_output_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match video.extension() {
        Some(ext) => format!("{stem}_with_speed.{}", ext.to_string_lossy()),
        None => format!("{stem}_with_speed"),
    };
    video.with_file_name(name)
}

/// Temporary sibling path that keeps the extension, so ffmpeg still picks
/// the right container: `ride.mp4` -> `ride.partial.mp4`.
pub fn partial_output_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    output.with_file_name(name)
}

/// Subtitle codec the output container can hold.
fn soft_subtitle_codec(output: &Path) -> SpeedcueResult<&'static str> {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" | "mov" => Ok("mov_text"),
        "mkv" | "mka" => Ok("ass"),
        "webm" => Ok("webvtt"),
        _ => Err(SpeedcueError::unsupported(format!(
            "Soft subtitles are not supported for '.{ext}' outputs. Use: mp4, mov, mkv, webm"
        ))),
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Escape a value for use inside an ffmpeg filtergraph option.
///
/// Backslashes become forward slashes first so Windows paths survive, then
/// the value is escaped for the option level and the graph level in turn.
fn escape_filter_value(value: &str) -> String {
    let value = value.replace('\\', "/");
    let mut option_level = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ':' | '\'') {
            option_level.push('\\');
        }
        option_level.push(c);
    }
    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn command_exists(binary: &str) -> bool {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(binary).is_file();
    }
    std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(state: &ProgressState, expected_secs: f64, elapsed_secs: f64) -> MuxProgress {
    let progress = if expected_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    MuxProgress {
        progress: if state.complete { 1.0 } else { progress },
        out_time_secs: state.out_time_secs,
        eta_secs,
        stage: if state.complete {
            MuxStage::Finalizing
        } else {
            MuxStage::Encoding
        },
    }
}
