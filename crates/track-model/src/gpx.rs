//! GPX track loading.
//!
//! Reads every `<trkpt>` from every `<trk>`/`<trkseg>` in document order.
//! Route points and waypoints are ignored. Element names are matched on
//! their local name so namespaced documents (`<gpx:trkpt>`) load too.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use speedcue_common::error::{SpeedcueError, SpeedcueResult};

use crate::point::{parse_timestamp, TrackPoint};

/// Which child of the current `<trkpt>` we are reading text for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Time,
    Elevation,
}

/// A `<trkpt>` under construction.
#[derive(Debug, Default)]
struct PendingPoint {
    lat: f64,
    lon: f64,
    time: Option<String>,
    elevation: Option<String>,
}

impl PendingPoint {
    /// Text and CDATA sections of one element are concatenated.
    fn push_text(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Time => &mut self.time,
            Field::Elevation => &mut self.elevation,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }
}

/// Load track points from a GPX file.
pub fn load_gpx(path: &Path) -> SpeedcueResult<Vec<TrackPoint>> {
    if !path.exists() {
        return Err(SpeedcueError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| SpeedcueError::track(format!("failed to read {}: {e}", path.display())))?;
    let points = parse_gpx_str(&content)?;
    tracing::info!(path = %path.display(), points = points.len(), "Loaded GPX track");
    Ok(points)
}

/// Parse track points from GPX document text.
pub fn parse_gpx_str(content: &str) -> SpeedcueResult<Vec<TrackPoint>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut pending: Option<PendingPoint> = None;
    let mut field: Option<Field> = None;
    let mut untimed = 0usize;
    let mut saw_root = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            SpeedcueError::track(format!(
                "malformed GPX at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"gpx" => saw_root = true,
                b"trkpt" => pending = Some(start_point(&e)?),
                b"time" if pending.is_some() => field = Some(Field::Time),
                b"ele" if pending.is_some() => field = Some(Field::Elevation),
                _ => field = None,
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"gpx" => saw_root = true,
                // A self-closing trkpt carries no <time> child.
                b"trkpt" => {
                    start_point(&e)?;
                    untimed += 1;
                }
                _ => {}
            },
            Event::Text(t) => {
                if let (Some(field), Some(point)) = (field, pending.as_mut()) {
                    let text = t
                        .unescape()
                        .map_err(|e| SpeedcueError::track(format!("bad text in GPX: {e}")))?;
                    point.push_text(field, &text);
                }
            }
            Event::CData(c) => {
                if let (Some(field), Some(point)) = (field, pending.as_mut()) {
                    let text = std::str::from_utf8(&c)
                        .map_err(|e| SpeedcueError::track(format!("bad CDATA in GPX: {e}")))?;
                    point.push_text(field, text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"trkpt" => {
                    field = None;
                    if let Some(point) = pending.take() {
                        match finish_point(point)? {
                            Some(p) => points.push(p),
                            None => untimed += 1,
                        }
                    }
                }
                b"time" | b"ele" => field = None,
                _ => {}
            },
            _ => {}
        }
    }

    if !saw_root {
        return Err(SpeedcueError::track("document has no <gpx> root element"));
    }
    if untimed > 0 {
        tracing::debug!(skipped = untimed, "Skipped track points without timestamps");
    }

    Ok(points)
}

fn start_point(e: &BytesStart<'_>) -> SpeedcueResult<PendingPoint> {
    let mut lat = None;
    let mut lon = None;
    for attr in e.attributes() {
        let attr = attr.map_err(|err| SpeedcueError::track(format!("bad trkpt attribute: {err}")))?;
        let value = attr
            .unescape_value()
            .map_err(|err| SpeedcueError::track(format!("bad trkpt attribute: {err}")))?;
        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_coordinate("lat", &value, 90.0)?),
            b"lon" => lon = Some(parse_coordinate("lon", &value, 180.0)?),
            _ => {}
        }
    }
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(PendingPoint {
            lat,
            lon,
            ..Default::default()
        }),
        _ => Err(SpeedcueError::track("trkpt is missing lat or lon")),
    }
}

fn parse_coordinate(name: &str, raw: &str, limit: f64) -> SpeedcueResult<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| SpeedcueError::track(format!("trkpt {name}='{raw}' is not a number")))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(SpeedcueError::track(format!(
            "trkpt {name}={value} is out of range"
        )));
    }
    Ok(value)
}

fn finish_point(point: PendingPoint) -> SpeedcueResult<Option<TrackPoint>> {
    let Some(raw_time) = point.time else {
        return Ok(None);
    };
    let time = parse_timestamp(&raw_time)?;
    // Elevation is informational only; a garbled value is dropped, not fatal.
    let elevation = point.elevation.and_then(|raw| raw.trim().parse::<f64>().ok());
    Ok(Some(TrackPoint {
        time,
        lat: point.lat,
        lon: point.lon,
        elevation,
    }))
}
