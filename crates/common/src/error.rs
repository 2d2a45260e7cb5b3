//! Error types shared across speedcue crates.

use std::path::PathBuf;

/// Top-level error type for speedcue operations.
#[derive(Debug, thiserror::Error)]
pub enum SpeedcueError {
    #[error("Track error: {message}")]
    Track { message: String },

    #[error("Video error: {message}")]
    Video { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Timeline error: {message}")]
    Timeline { message: String },

    #[error("Mux error: {message}")]
    Mux { message: String },

    #[error(
        "Track point {index} goes back in time ({current} is before previous point at {previous})"
    )]
    NonMonotonic {
        index: usize,
        previous: String,
        current: String,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SpeedcueError.
pub type SpeedcueResult<T> = Result<T, SpeedcueError>;

impl SpeedcueError {
    pub fn track(msg: impl Into<String>) -> Self {
        Self::Track {
            message: msg.into(),
        }
    }

    pub fn video(msg: impl Into<String>) -> Self {
        Self::Video {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline {
            message: msg.into(),
        }
    }

    pub fn mux(msg: impl Into<String>) -> Self {
        Self::Mux {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error was caused by bad user input (files or options)
    /// rather than by a downstream tool.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Track { .. }
                | Self::Video { .. }
                | Self::Config { .. }
                | Self::FileNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_failing_input() {
        let err = SpeedcueError::config("font scale must be positive, got -1");
        assert_eq!(
            err.to_string(),
            "Configuration error: font scale must be positive, got -1"
        );

        let err = SpeedcueError::FileNotFound {
            path: PathBuf::from("ride.gpx"),
        };
        assert_eq!(err.to_string(), "File not found: ride.gpx");
    }

    #[test]
    fn test_input_error_classification() {
        assert!(SpeedcueError::track("bad").is_input_error());
        assert!(SpeedcueError::config("bad").is_input_error());
        assert!(!SpeedcueError::mux("ffmpeg died").is_input_error());
        assert!(!SpeedcueError::NonMonotonic {
            index: 3,
            previous: "a".into(),
            current: "b".into(),
        }
        .is_input_error());
    }
}
