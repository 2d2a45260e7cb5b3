//! Per-interval speed estimation.
//!
//! Each adjacent pair of track points yields one sample: the horizontal
//! great-circle distance between them divided by the time between them.
//! No smoothing happens here; see [`crate::smoothing`] for that.

use std::time::Duration;

use chrono::{DateTime, Utc};

use speedcue_common::error::{SpeedcueError, SpeedcueResult};
use speedcue_track_model::point::TrackPoint;

/// Pairs closer together than this have no meaningful speed and are skipped.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Speed over one inter-point interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSample {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Horizontal distance covered in the interval, meters.
    pub distance_m: f64,
    /// Always finite and non-negative, meters per second.
    pub speed_mps: f64,
}

impl SpeedSample {
    /// Length of the interval in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        (self.end - self.start)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Outcome of pairing two consecutive points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairSpeed {
    Sample(SpeedSample),
    /// Timestamps too close to divide by.
    Degenerate,
    /// The second point is earlier than the first.
    Backwards,
}

/// Compute the speed between two consecutive fixes.
pub fn speed_between(from: &TrackPoint, to: &TrackPoint) -> PairSpeed {
    let Ok(elapsed) = (to.time - from.time).to_std() else {
        return PairSpeed::Backwards;
    };
    if elapsed < MIN_INTERVAL {
        return PairSpeed::Degenerate;
    }
    let distance_m = from.distance_to(to);
    PairSpeed::Sample(SpeedSample {
        start: from.time,
        end: to.time,
        distance_m,
        speed_mps: distance_m / elapsed.as_secs_f64(),
    })
}

/// Lazy speed estimator over a stream of track points.
///
/// Holds only the previous point. A point that goes back in time yields a
/// single `NonMonotonic` error, after which the iterator is exhausted.
#[derive(Debug)]
pub struct SpeedSamples<I> {
    points: I,
    previous: Option<TrackPoint>,
    index: usize,
    degenerate: usize,
    failed: bool,
}

impl<I> SpeedSamples<I> {
    /// Number of pairs skipped so far for having (near) identical timestamps.
    pub fn degenerate_pairs(&self) -> usize {
        self.degenerate
    }
}

impl<I: Iterator<Item = TrackPoint>> Iterator for SpeedSamples<I> {
    type Item = SpeedcueResult<SpeedSample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let point = self.points.next()?;
            let index = self.index;
            self.index += 1;

            let Some(previous) = self.previous.replace(point) else {
                continue;
            };

            match speed_between(&previous, &point) {
                PairSpeed::Sample(sample) => return Some(Ok(sample)),
                PairSpeed::Degenerate => {
                    self.degenerate += 1;
                    tracing::debug!(index, time = %point.time, "Skipping zero-length track interval");
                }
                PairSpeed::Backwards => {
                    self.failed = true;
                    return Some(Err(SpeedcueError::NonMonotonic {
                        index,
                        previous: previous.time.to_rfc3339(),
                        current: point.time.to_rfc3339(),
                    }));
                }
            }
        }
    }
}

impl<I> std::iter::FusedIterator for SpeedSamples<I> where
    I: std::iter::FusedIterator<Item = TrackPoint>
{
}

/// Estimate speeds for consecutive pairs of `points`.
///
/// Fewer than two points produce an empty sequence.
pub fn estimate_speeds<P>(points: P) -> SpeedSamples<P::IntoIter>
where
    P: IntoIterator<Item = TrackPoint>,
{
    SpeedSamples {
        points: points.into_iter(),
        previous: None,
        index: 0,
        degenerate: 0,
        failed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use speedcue_track_model::geo::EARTH_RADIUS_M;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    /// Degrees of latitude spanning `meters` along a meridian.
    fn lat_for_meters(meters: f64) -> f64 {
        (meters / EARTH_RADIUS_M).to_degrees()
    }

    fn point(secs: i64, lat: f64) -> TrackPoint {
        TrackPoint::new(t0() + TimeDelta::seconds(secs), lat, 16.37)
    }

    #[test]
    fn test_hundred_meters_in_ten_seconds() {
        let points = vec![point(0, 0.0), point(10, lat_for_meters(100.0))];
        let samples: Vec<_> = estimate_speeds(points)
            .collect::<SpeedcueResult<_>>()
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert!((samples[0].distance_m - 100.0).abs() < 1e-6);
        assert!((samples[0].speed_mps - 10.0).abs() < 1e-9);
        assert_eq!(samples[0].start, t0());
        assert_eq!(samples[0].end, t0() + TimeDelta::seconds(10));
        assert_eq!(samples[0].elapsed_secs(), 10.0);
    }

    #[test]
    fn test_fewer_than_two_points_is_empty() {
        assert_eq!(estimate_speeds(Vec::<TrackPoint>::new()).count(), 0);
        assert_eq!(estimate_speeds(vec![point(0, 0.0)]).count(), 0);
    }

    #[test]
    fn test_n_points_give_n_minus_one_samples() {
        let points: Vec<_> = (0..6).map(|i| point(i * 2, i as f64 * 0.0001)).collect();
        assert_eq!(estimate_speeds(points).count(), 5);
    }

    #[test]
    fn test_elevation_is_ignored() {
        let mut a = point(0, 0.0);
        let mut b = point(10, lat_for_meters(100.0));
        a.elevation = Some(0.0);
        b.elevation = Some(500.0);
        let sample = estimate_speeds(vec![a, b]).next().unwrap().unwrap();
        assert!((sample.speed_mps - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_timestamp_is_skipped() {
        let points = vec![
            point(0, 0.0),
            point(5, 0.001),
            point(5, 0.002),
            point(10, 0.003),
        ];
        let mut samples = estimate_speeds(points);
        let first = samples.next().unwrap().unwrap();
        let second = samples.next().unwrap().unwrap();
        assert!(samples.next().is_none());
        assert_eq!(samples.degenerate_pairs(), 1);
        // The interval after the duplicate starts where the first one ended.
        assert_eq!(first.end, second.start);
        assert!(second.speed_mps.is_finite());
    }

    #[test]
    fn test_sub_millisecond_gap_is_degenerate() {
        let a = point(0, 0.0);
        let mut b = point(0, 0.001);
        b.time += TimeDelta::microseconds(500);
        assert_eq!(speed_between(&a, &b), PairSpeed::Degenerate);
    }

    #[test]
    fn test_backwards_timestamp_is_reported_once() {
        let points = vec![point(0, 0.0), point(10, 0.001), point(5, 0.002), point(20, 0.003)];
        let results: Vec<_> = estimate_speeds(points).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(SpeedcueError::NonMonotonic { index, .. }) => assert_eq!(*index, 2),
            other => panic!("expected NonMonotonic, got {other:?}"),
        }
    }

    #[test]
    fn test_stationary_receiver_reads_zero() {
        let sample = estimate_speeds(vec![point(0, 1.0), point(3, 1.0)])
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(sample.speed_mps, 0.0);
    }

    proptest::proptest! {
        #[test]
        fn prop_speeds_are_finite_and_non_negative(
            steps in proptest::collection::vec((1i64..60_000, -0.001f64..0.001, -0.001f64..0.001), 1..64),
        ) {
            let mut time = t0();
            let mut lat = 45.0;
            let mut lon = 7.0;
            let mut points = vec![TrackPoint::new(time, lat, lon)];
            for (ms, dlat, dlon) in &steps {
                time += TimeDelta::milliseconds(*ms);
                lat += dlat;
                lon += dlon;
                points.push(TrackPoint::new(time, lat, lon));
            }
            let samples: Vec<_> = estimate_speeds(points.clone())
                .collect::<SpeedcueResult<_>>()
                .unwrap();
            proptest::prop_assert_eq!(samples.len(), points.len() - 1);
            for sample in samples {
                proptest::prop_assert!(sample.speed_mps.is_finite());
                proptest::prop_assert!(sample.speed_mps >= 0.0);
            }
        }
    }
}
