use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use speedcue_timeline::ass::AssHeader;
use speedcue_timeline::{
    cue_stream, write_overlay, AlignmentContext, OverlayConfig, ScreenPosition, SpeedUnit,
    TimelineSettings,
};
use speedcue_track_model::gpx::load_gpx;
use speedcue_track_model::point::TrackPoint;

fn load_fixture_points() -> Vec<TrackPoint> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample.gpx");

    load_gpx(&path).expect("fixture track should parse")
}

fn fixture_settings(points: &[TrackPoint]) -> TimelineSettings {
    let first = points.first().expect("fixture has points").time;
    TimelineSettings {
        alignment: AlignmentContext::new(first + TimeDelta::seconds(5), Duration::from_secs(60)),
        overlay: OverlayConfig::new(SpeedUnit::KilometersPerHour, 1.5, ScreenPosition::BottomRight)
            .expect("valid overlay config"),
        smoothing_window: None,
    }
}

/// Parse `H:MM:SS.cc` back into centiseconds.
fn parse_ass_time(raw: &str) -> u64 {
    let (hms, cs) = raw.split_once('.').expect("centiseconds");
    let mut parts = hms.split(':').map(|p| p.parse::<u64>().expect("numeric"));
    let (h, m, s) = (
        parts.next().unwrap(),
        parts.next().unwrap(),
        parts.next().unwrap(),
    );
    ((h * 60 + m) * 60 + s) * 100 + cs.parse::<u64>().unwrap()
}

#[test]
fn fixture_track_loads_with_duplicate_fix() {
    let points = load_fixture_points();
    assert_eq!(points.len(), 122);
    assert_eq!(points[0].elevation, Some(574.0));
    assert_eq!(points[40].time, points[41].time);
}

#[test]
fn fixture_overlay_matches_video_window() {
    let points = load_fixture_points();
    let settings = fixture_settings(&points);

    let mut out = Vec::new();
    let stats = write_overlay(points, &settings, &AssHeader::default(), &mut out)
        .expect("overlay should generate");
    let ass = String::from_utf8(out).expect("utf-8 output");

    assert_eq!(stats.degenerate_pairs, 1);
    assert_eq!(stats.before_video, 5);
    assert!(stats.reached_video_end);
    assert_eq!(stats.cues_written, 60);
    assert_eq!(stats.cues_filtered, 0);

    let events: Vec<&str> = ass.lines().filter(|l| l.starts_with("Dialogue:")).collect();
    assert_eq!(events.len(), 60);
    assert_eq!(
        events[0],
        "Dialogue: 0,0:00:00.00,0:00:01.00,Default,,0,0,0,,{\\an3\\fs72}Speed: 24.1 km/h"
    );
    assert!(events[1].ends_with("Speed: 24.9 km/h"));
    assert_eq!(
        events[59],
        "Dialogue: 0,0:00:59.00,0:01:00.00,Default,,0,0,0,,{\\an3\\fs72}Speed: 20.3 km/h"
    );

    let mut last_end = 0;
    for event in &events {
        let fields: Vec<&str> = event.splitn(10, ',').collect();
        let start = parse_ass_time(fields[1]);
        let end = parse_ass_time(fields[2]);
        assert!(start < end, "empty event: {event}");
        assert!(start >= last_end, "overlapping event: {event}");
        last_end = end;
    }
}

#[test]
fn fixture_overlay_is_idempotent() {
    let points = load_fixture_points();
    let settings = fixture_settings(&points);
    let header = AssHeader::for_video(3840, 2160, &settings.overlay);

    let mut first = Vec::new();
    let mut second = Vec::new();
    write_overlay(points.clone(), &settings, &header, &mut first).unwrap();
    write_overlay(points, &settings, &header, &mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn fixture_track_after_video_yields_nothing() {
    let points = load_fixture_points();
    let last = points.last().unwrap().time;
    let settings = TimelineSettings {
        alignment: AlignmentContext::new(last + TimeDelta::minutes(1), Duration::from_secs(600)),
        ..fixture_settings(&points)
    };

    let cues: Vec<_> = cue_stream(points, &settings)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(cues.is_empty());
}

#[test]
fn fixture_smoothing_keeps_cue_timing() {
    let points = load_fixture_points();
    let raw_settings = fixture_settings(&points);
    let smoothed_settings = TimelineSettings {
        smoothing_window: Some(Duration::from_secs(5)),
        ..raw_settings.clone()
    };

    let raw: Vec<_> = cue_stream(points.clone(), &raw_settings)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let smoothed: Vec<_> = cue_stream(points, &smoothed_settings)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(raw.len(), smoothed.len());
    for (a, b) in raw.iter().zip(&smoothed) {
        assert_eq!((a.start, a.end), (b.start, b.end));
    }
}
