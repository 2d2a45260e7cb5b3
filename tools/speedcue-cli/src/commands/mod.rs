pub mod config;
pub mod cues;
pub mod info;
pub mod overlay;

use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Args;

use speedcue_common::config::OverlayDefaults;
use speedcue_common::error::SpeedcueError;
use speedcue_timeline::{
    AlignmentContext, OverlayConfig, ScreenPosition, SpeedUnit, TimelineSettings, WindowSmoother,
};
use speedcue_track_model::point::{parse_timestamp, TrackPoint};

/// Options shared by every command that generates cues.
#[derive(Args, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Time of the video's first frame, RFC 3339 or naive ISO taken as UTC
    /// (default: first track point)
    #[arg(long)]
    pub video_date: Option<String>,

    /// Seconds added to the video start time to correct camera clock drift
    #[arg(short = 't', long, default_value = "0", allow_negative_numbers = true)]
    pub time_delta: f64,

    /// Text size multiplier
    #[arg(short = 'f', long)]
    pub font_scale: Option<f64>,

    /// top_left, top_right, bottom_left, bottom_right or center
    #[arg(short = 'p', long)]
    pub position: Option<ScreenPosition>,

    /// km/h, mph or m/s
    #[arg(short = 'u', long)]
    pub unit: Option<SpeedUnit>,

    /// Average speeds over a trailing window of this many seconds
    #[arg(long)]
    pub smooth_secs: Option<f64>,
}

impl StyleArgs {
    /// Appearance from flags, falling back to the config file.
    pub fn overlay_config(&self, defaults: &OverlayDefaults) -> anyhow::Result<OverlayConfig> {
        let unit = match self.unit {
            Some(unit) => unit,
            None => defaults.unit.parse()?,
        };
        let position = match self.position {
            Some(position) => position,
            None => defaults.position.parse()?,
        };
        let font_scale = self.font_scale.unwrap_or(defaults.font_scale);
        Ok(OverlayConfig::new(unit, font_scale, position)?)
    }

    /// Wall-clock time of the first frame, before `time_delta` is applied.
    pub fn reference_time(&self, points: &[TrackPoint]) -> anyhow::Result<DateTime<Utc>> {
        if let Some(raw) = &self.video_date {
            return parse_timestamp(raw)
                .map_err(|e| SpeedcueError::config(format!("invalid --video-date: {e}")).into());
        }
        points.first().map(|p| p.time).ok_or_else(|| {
            SpeedcueError::track("track has no timestamped points; pass --video-date").into()
        })
    }

    pub fn settings(
        &self,
        defaults: &OverlayDefaults,
        points: &[TrackPoint],
        video_duration: Duration,
    ) -> anyhow::Result<TimelineSettings> {
        let alignment = AlignmentContext::new(self.reference_time(points)?, video_duration)
            .with_offset_secs(self.time_delta)?;
        let smoothing_window = self
            .smooth_secs
            .map(WindowSmoother::from_secs)
            .transpose()?
            .map(|s| s.window());

        Ok(TimelineSettings {
            alignment,
            overlay: self.overlay_config(defaults)?,
            smoothing_window,
        })
    }
}

/// Parse a user-supplied length in seconds.
pub fn duration_from_secs(secs: f64, what: &str) -> anyhow::Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        anyhow::bail!(SpeedcueError::config(format!(
            "{what} must be a positive number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| SpeedcueError::config(format!("{what} out of range: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn points() -> Vec<TrackPoint> {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap();
        vec![
            TrackPoint::new(t0, 47.26, 11.39),
            TrackPoint::new(t0 + TimeDelta::seconds(1), 47.2601, 11.39),
        ]
    }

    #[test]
    fn test_reference_defaults_to_first_point() {
        let pts = points();
        let args = StyleArgs::default();
        assert_eq!(args.reference_time(&pts).unwrap(), pts[0].time);
        assert!(args.reference_time(&[]).is_err());
    }

    #[test]
    fn test_video_date_and_time_delta() {
        let args = StyleArgs {
            video_date: Some("2024-06-15T08:29:58".to_string()),
            time_delta: 1.5,
            ..StyleArgs::default()
        };
        let settings = args
            .settings(&OverlayDefaults::default(), &points(), Duration::from_secs(10))
            .unwrap();
        assert_eq!(
            settings.alignment.video_reference_time,
            Utc.with_ymd_and_hms(2024, 6, 15, 8, 29, 59).unwrap() + TimeDelta::milliseconds(500)
        );
        assert_eq!(settings.smoothing_window, None);

        let bad = StyleArgs {
            video_date: Some("yesterday".to_string()),
            ..StyleArgs::default()
        };
        assert!(bad.reference_time(&points()).is_err());
    }

    #[test]
    fn test_flags_override_config_defaults() {
        let defaults = OverlayDefaults {
            font_scale: 2.0,
            position: "top_left".to_string(),
            unit: "mph".to_string(),
        };
        let from_config = StyleArgs::default().overlay_config(&defaults).unwrap();
        assert_eq!(from_config.unit(), SpeedUnit::MilesPerHour);
        assert_eq!(from_config.position(), ScreenPosition::TopLeft);
        assert_eq!(from_config.font_scale(), 2.0);

        let args = StyleArgs {
            unit: Some(SpeedUnit::MetersPerSecond),
            position: Some(ScreenPosition::Center),
            font_scale: Some(0.5),
            ..StyleArgs::default()
        };
        let from_flags = args.overlay_config(&defaults).unwrap();
        assert_eq!(from_flags.unit(), SpeedUnit::MetersPerSecond);
        assert_eq!(from_flags.position(), ScreenPosition::Center);
        assert_eq!(from_flags.font_scale(), 0.5);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let defaults = OverlayDefaults::default();
        let zero_scale = StyleArgs {
            font_scale: Some(0.0),
            ..StyleArgs::default()
        };
        assert!(zero_scale.overlay_config(&defaults).is_err());

        let zero_window = StyleArgs {
            smooth_secs: Some(0.0),
            ..StyleArgs::default()
        };
        assert!(zero_window
            .settings(&defaults, &points(), Duration::from_secs(5))
            .is_err());

        let huge_delta = StyleArgs {
            time_delta: 1e13,
            ..StyleArgs::default()
        };
        let err = huge_delta
            .settings(&defaults, &points(), Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpeedcueError>(),
            Some(SpeedcueError::Config { .. })
        ));

        assert!(duration_from_secs(-1.0, "--duration").is_err());
        assert_eq!(
            duration_from_secs(2.5, "--duration").unwrap(),
            Duration::from_millis(2_500)
        );
    }
}
