//! Track point types.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use speedcue_common::error::{SpeedcueError, SpeedcueResult};

use crate::geo::haversine_distance_m;

/// A single GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// UTC time of the fix.
    pub time: DateTime<Utc>,

    /// Latitude in degrees.
    pub lat: f64,

    /// Longitude in degrees.
    pub lon: f64,

    /// Elevation in meters, when the receiver recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl TrackPoint {
    pub fn new(time: DateTime<Utc>, lat: f64, lon: f64) -> Self {
        Self {
            time,
            lat,
            lon,
            elevation: None,
        }
    }

    /// Horizontal great-circle distance to another point, in meters.
    /// Elevation is ignored.
    pub fn distance_to(&self, other: &TrackPoint) -> f64 {
        haversine_distance_m(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Aggregate facts about a loaded track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub points: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub distance_m: f64,
}

impl TrackSummary {
    pub fn from_points(points: &[TrackPoint]) -> Self {
        let distance_m = points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
        Self {
            points: points.len(),
            start: points.first().map(|p| p.time),
            end: points.last().map(|p| p.time),
            distance_m,
        }
    }

    /// Wall-clock span between the first and last point.
    pub fn duration(&self) -> TimeDelta {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end - start,
            _ => TimeDelta::zero(),
        }
    }
}

/// Parse a timestamp as written in GPX files or on the command line.
///
/// Accepts RFC 3339 (`2024-05-01T10:00:00Z`, `2024-05-01T12:00:00+02:00`)
/// and naive ISO 8601 without an offset, which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> SpeedcueResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(SpeedcueError::track(format!("invalid timestamp '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T10:00:00Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-05-01T12:00:00+02:00").unwrap(),
            expected
        );
        assert_eq!(parse_timestamp("2024-05-01T10:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp(" 2024-05-01 10:00:00 ").unwrap(), expected);
    }

    #[test]
    fn test_parse_timestamp_keeps_fraction() {
        let t = parse_timestamp("2024-05-01T10:00:00.250Z").unwrap();
        assert_eq!(t.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_summary() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let points = vec![
            TrackPoint::new(t0, 0.0, 0.0),
            TrackPoint::new(t0 + TimeDelta::seconds(30), 0.0, 0.001),
            TrackPoint::new(t0 + TimeDelta::seconds(60), 0.0, 0.002),
        ];
        let summary = TrackSummary::from_points(&points);
        assert_eq!(summary.points, 3);
        assert_eq!(summary.duration(), TimeDelta::seconds(60));
        assert!((summary.distance_m - 222.39).abs() < 0.01);
    }

    #[test]
    fn test_empty_summary() {
        let summary = TrackSummary::from_points(&[]);
        assert_eq!(summary.points, 0);
        assert_eq!(summary.duration(), TimeDelta::zero());
        assert_eq!(summary.distance_m, 0.0);
    }
}
