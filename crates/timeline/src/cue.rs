//! Overlay cue formatting.
//!
//! Speeds travel through the pipeline in meters per second. Conversion to
//! the display unit happens only here, when the text is rendered.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use speedcue_common::error::{SpeedcueError, SpeedcueResult};

use crate::align::VideoInterval;

/// Digits after the decimal point in rendered speeds.
pub const SPEED_DECIMALS: usize = 1;

/// Font size at `font_scale == 1.0`, in script pixels.
pub const BASE_FONT_SIZE: f64 = 48.0;

const METERS_PER_MILE: f64 = 1609.344;

/// Display unit for speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedUnit {
    #[default]
    KilometersPerHour,
    MilesPerHour,
    MetersPerSecond,
}

impl SpeedUnit {
    /// Multiplier from meters per second to this unit.
    pub fn factor(self) -> f64 {
        match self {
            Self::KilometersPerHour => 3.6,
            Self::MilesPerHour => 3600.0 / METERS_PER_MILE,
            Self::MetersPerSecond => 1.0,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::KilometersPerHour => "km/h",
            Self::MilesPerHour => "mph",
            Self::MetersPerSecond => "m/s",
        }
    }

    pub fn convert(self, mps: f64) -> f64 {
        mps * self.factor()
    }

    pub fn to_mps(self, value: f64) -> f64 {
        value / self.factor()
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for SpeedUnit {
    type Err = SpeedcueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "km/h" | "kmh" | "kph" => Ok(Self::KilometersPerHour),
            "mph" => Ok(Self::MilesPerHour),
            "m/s" | "mps" => Ok(Self::MetersPerSecond),
            _ => Err(SpeedcueError::config(format!(
                "Unknown speed unit: {s}. Use: km/h, mph, m/s"
            ))),
        }
    }
}

/// Fixed screen anchor for the readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl ScreenPosition {
    /// ASS numpad-style alignment code (`\an`).
    pub fn ass_alignment(self) -> u8 {
        match self {
            Self::BottomLeft => 1,
            Self::BottomRight => 3,
            Self::Center => 5,
            Self::TopLeft => 7,
            Self::TopRight => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top_left",
            Self::TopRight => "top_right",
            Self::BottomLeft => "bottom_left",
            Self::BottomRight => "bottom_right",
            Self::Center => "center",
        }
    }
}

impl fmt::Display for ScreenPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScreenPosition {
    type Err = SpeedcueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "top_left" => Ok(Self::TopLeft),
            "top_right" => Ok(Self::TopRight),
            "bottom_left" => Ok(Self::BottomLeft),
            "bottom_right" => Ok(Self::BottomRight),
            "center" | "centre" => Ok(Self::Center),
            _ => Err(SpeedcueError::config(format!(
                "Unknown position: {s}. Use: top_left, top_right, bottom_left, bottom_right, center"
            ))),
        }
    }
}

/// Immutable appearance settings for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayConfig {
    unit: SpeedUnit,
    font_scale: f64,
    position: ScreenPosition,
}

impl OverlayConfig {
    /// Validate and build an overlay configuration.
    pub fn new(unit: SpeedUnit, font_scale: f64, position: ScreenPosition) -> SpeedcueResult<Self> {
        if !font_scale.is_finite() || font_scale <= 0.0 {
            return Err(SpeedcueError::config(format!(
                "font scale must be a positive number, got {font_scale}"
            )));
        }
        Ok(Self {
            unit,
            font_scale,
            position,
        })
    }

    pub fn unit(&self) -> SpeedUnit {
        self.unit
    }

    pub fn font_scale(&self) -> f64 {
        self.font_scale
    }

    pub fn position(&self) -> ScreenPosition {
        self.position
    }

    /// Rendered font size in script pixels, never below 1.
    pub fn font_size(&self) -> u32 {
        (BASE_FONT_SIZE * self.font_scale).round().max(1.0) as u32
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            unit: SpeedUnit::default(),
            font_scale: 1.5,
            position: ScreenPosition::default(),
        }
    }
}

/// One styled, time-ranged line of overlay text.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayCue {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
    pub anchor: ScreenPosition,
    pub scale: f64,
}

impl OverlayCue {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Render a speed in the configured unit, e.g. `"36.0 km/h"`.
pub fn format_speed(speed_mps: f64, unit: SpeedUnit) -> String {
    format!(
        "{:.*} {}",
        SPEED_DECIMALS,
        unit.convert(speed_mps),
        unit.suffix()
    )
}

/// Build the cue for one aligned interval.
pub fn format_cue(interval: VideoInterval, speed_mps: f64, config: &OverlayConfig) -> OverlayCue {
    OverlayCue {
        start: interval.start,
        end: interval.end,
        text: format!("Speed: {}", format_speed(speed_mps, config.unit)),
        anchor: config.position,
        scale: config.font_scale,
    }
}
