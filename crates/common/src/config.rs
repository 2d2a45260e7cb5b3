//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default overlay appearance.
    #[serde(default)]
    pub overlay: OverlayDefaults,

    /// External ffmpeg/ffprobe settings.
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default overlay parameters, overridable per run from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayDefaults {
    /// Multiplier applied to the base text size.
    pub font_scale: f64,

    /// Screen anchor (e.g., "bottom_right", "center").
    pub position: String,

    /// Displayed speed unit ("km/h", "mph", "m/s").
    pub unit: String,
}

/// ffmpeg invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegConfig {
    /// Path to the ffmpeg executable.
    pub ffmpeg_path: String,

    /// Path to ffprobe. Derived from `ffmpeg_path` when unset.
    #[serde(default)]
    pub ffprobe_path: Option<String>,

    /// x264 constant rate factor used when burning in.
    pub crf: u8,

    /// x264 preset used when burning in.
    pub preset: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "speedcue_timeline=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for OverlayDefaults {
    fn default() -> Self {
        Self {
            font_scale: 1.5,
            position: "bottom_right".to_string(),
            unit: "km/h".to_string(),
        }
    }
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: None,
            crf: 18,
            preset: "medium".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl FfmpegConfig {
    /// Resolve the ffprobe executable, defaulting to the binary that sits
    /// next to ffmpeg (`/opt/ff/bin/ffmpeg` -> `/opt/ff/bin/ffprobe`).
    pub fn ffprobe(&self) -> String {
        if let Some(path) = &self.ffprobe_path {
            return path.clone();
        }
        let ffmpeg = Path::new(&self.ffmpeg_path);
        match ffmpeg.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.contains("ffmpeg") => ffmpeg
                .with_file_name(name.replacen("ffmpeg", "ffprobe", 1))
                .to_string_lossy()
                .into_owned(),
            _ => "ffprobe".to_string(),
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config as pretty JSON, creating parent directories.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("speedcue").join("config.json")
}
