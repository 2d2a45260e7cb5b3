//! Advanced SubStation Alpha (ASS v4.00+) output.
//!
//! Each cue becomes one `Dialogue` event. Anchor and size are written as
//! override tags on every event (`{\an3\fs72}`), so the track renders the
//! same way regardless of which style a player falls back to.

use std::io::Write;
use std::time::Duration;

use speedcue_common::error::{SpeedcueError, SpeedcueResult};

use crate::cue::{OverlayConfig, OverlayCue, BASE_FONT_SIZE};

const NANOS_PER_CENTISECOND: u128 = 10_000_000;

/// Script-level settings written once at the top of the file.
#[derive(Debug, Clone, PartialEq)]
pub struct AssHeader {
    pub title: String,
    /// Script resolution; should match the video so sizes map 1:1 to pixels.
    pub play_res_x: u32,
    pub play_res_y: u32,
    pub font_name: String,
    pub font_size: u32,
    pub alignment: u8,
}

impl Default for AssHeader {
    fn default() -> Self {
        Self {
            title: "Speed Overlay".to_string(),
            play_res_x: 1920,
            play_res_y: 1080,
            font_name: "Arial".to_string(),
            font_size: BASE_FONT_SIZE as u32,
            alignment: 3,
        }
    }
}

impl AssHeader {
    /// Header for a video of the given size, styled after `config`.
    pub fn for_video(width: u32, height: u32, config: &OverlayConfig) -> Self {
        Self {
            play_res_x: width.max(1),
            play_res_y: height.max(1),
            font_size: config.font_size(),
            alignment: config.position().ass_alignment(),
            ..Self::default()
        }
    }

    fn render(&self) -> String {
        format!(
            "[Script Info]\n\
             Title: {title}\n\
             ScriptType: v4.00+\n\
             WrapStyle: 2\n\
             ScaledBorderAndShadow: yes\n\
             PlayResX: {x}\n\
             PlayResY: {y}\n\
             \n\
             [V4+ Styles]\n\
             Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
             Style: Default,{font},{size},&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,0,{align},10,10,10,1\n\
             \n\
             [Events]\n\
             Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
            title = self.title,
            x = self.play_res_x,
            y = self.play_res_y,
            font = self.font_name,
            size = self.font_size,
            align = self.alignment,
        )
    }
}

/// Streaming ASS writer.
///
/// Events must arrive ordered by start time and must not overlap once
/// rounded to the format's centisecond resolution. Cues that collapse to
/// zero length after rounding are dropped.
pub struct AssWriter<W: Write> {
    out: W,
    last_end_cs: u64,
    written: usize,
    filtered: usize,
}

impl<W: Write> AssWriter<W> {
    /// Write the script header and return a writer ready for events.
    pub fn new(mut out: W, header: &AssHeader) -> SpeedcueResult<Self> {
        out.write_all(header.render().as_bytes())?;
        Ok(Self {
            out,
            last_end_cs: 0,
            written: 0,
            filtered: 0,
        })
    }

    /// Append one cue. Returns `false` if it was too short to emit.
    pub fn write_cue(&mut self, cue: &OverlayCue) -> SpeedcueResult<bool> {
        let start_cs = to_centiseconds(cue.start);
        let end_cs = to_centiseconds(cue.end);

        if start_cs >= end_cs {
            self.filtered += 1;
            return Ok(false);
        }
        if start_cs < self.last_end_cs {
            return Err(SpeedcueError::timeline(format!(
                "cue at {} starts before the previous cue ends at {}",
                format_ass_time_cs(start_cs),
                format_ass_time_cs(self.last_end_cs)
            )));
        }

        writeln!(
            self.out,
            "Dialogue: 0,{},{},Default,,0,0,0,,{}{}",
            format_ass_time_cs(start_cs),
            format_ass_time_cs(end_cs),
            override_tags(cue),
            escape_text(&cue.text),
        )?;
        self.last_end_cs = end_cs;
        self.written += 1;
        Ok(true)
    }

    /// Number of events written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Number of zero-length cues dropped so far.
    pub fn filtered(&self) -> usize {
        self.filtered
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> SpeedcueResult<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Render a complete ASS document from already-built cues.
pub fn generate_ass(cues: &[OverlayCue], header: &AssHeader) -> SpeedcueResult<String> {
    let mut writer = AssWriter::new(Vec::new(), header)?;
    for cue in cues {
        writer.write_cue(cue)?;
    }
    let bytes = writer.finish()?;
    String::from_utf8(bytes).map_err(|e| SpeedcueError::timeline(e.to_string()))
}

fn override_tags(cue: &OverlayCue) -> String {
    let size = (BASE_FONT_SIZE * cue.scale).round().max(1.0) as u32;
    format!("{{\\an{}\\fs{}}}", cue.anchor.ass_alignment(), size)
}

/// Braces open override blocks and raw newlines end the event line.
fn escape_text(text: &str) -> String {
    text.replace('{', "(")
        .replace('}', ")")
        .replace("\r\n", "\\N")
        .replace('\n', "\\N")
}

/// Round a duration to the nearest centisecond.
fn to_centiseconds(d: Duration) -> u64 {
    ((d.as_nanos() + NANOS_PER_CENTISECOND / 2) / NANOS_PER_CENTISECOND) as u64
}

/// Format centiseconds as an ASS timestamp: H:MM:SS.cc
fn format_ass_time_cs(total_cs: u64) -> String {
    let hours = total_cs / 360_000;
    let minutes = (total_cs % 360_000) / 6_000;
    let seconds = (total_cs % 6_000) / 100;
    let centis = total_cs % 100;
    format!("{hours}:{minutes:02}:{seconds:02}.{centis:02}")
}

/// Format a duration as an ASS timestamp: H:MM:SS.cc
pub fn format_ass_time(d: Duration) -> String {
    format_ass_time_cs(to_centiseconds(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::ScreenPosition;

    fn cue(start_ms: u64, end_ms: u64, text: &str) -> OverlayCue {
        OverlayCue {
            start: Duration::from_millis(start_ms),
            end: Duration::from_millis(end_ms),
            text: text.to_string(),
            anchor: ScreenPosition::BottomRight,
            scale: 1.5,
        }
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_ass_time(Duration::ZERO), "0:00:00.00");
        assert_eq!(format_ass_time(Duration::from_millis(3_661_500)), "1:01:01.50");
        assert_eq!(format_ass_time(Duration::from_millis(59_994)), "0:00:59.99");
        // Rounds to nearest, carrying into the next second.
        assert_eq!(format_ass_time(Duration::from_millis(59_996)), "0:01:00.00");
    }

    #[test]
    fn test_header_and_events() {
        let cues = vec![
            cue(0, 1_000, "Speed: 36.0 km/h"),
            cue(1_000, 2_500, "Speed: 40.2 km/h"),
        ];
        let ass = generate_ass(&cues, &AssHeader::default()).unwrap();
        assert!(ass.starts_with("[Script Info]\nTitle: Speed Overlay\nScriptType: v4.00+\n"));
        assert!(ass.contains("PlayResX: 1920\nPlayResY: 1080\n"));
        assert!(ass.contains("Style: Default,Arial,48,"));
        assert!(ass.contains(
            "Dialogue: 0,0:00:00.00,0:00:01.00,Default,,0,0,0,,{\\an3\\fs72}Speed: 36.0 km/h\n"
        ));
        assert!(ass.contains(
            "Dialogue: 0,0:00:01.00,0:00:02.50,Default,,0,0,0,,{\\an3\\fs72}Speed: 40.2 km/h\n"
        ));
        assert_eq!(ass.matches("Dialogue:").count(), 2);
    }

    #[test]
    fn test_header_for_video() {
        let config = OverlayConfig::new(
            crate::cue::SpeedUnit::MilesPerHour,
            2.0,
            ScreenPosition::TopLeft,
        )
        .unwrap();
        let header = AssHeader::for_video(1280, 720, &config);
        assert_eq!(header.font_size, 96);
        assert_eq!(header.alignment, 7);
        let text = header.render();
        assert!(text.contains("PlayResX: 1280\nPlayResY: 720\n"));
        assert!(text.contains(",1,2,0,7,10,10,10,1\n"));
    }

    #[test]
    fn test_zero_length_cues_are_filtered() {
        let mut writer = AssWriter::new(Vec::new(), &AssHeader::default()).unwrap();
        assert!(!writer.write_cue(&cue(1_000, 1_000, "a")).unwrap());
        // 4 ms rounds to the same centisecond as its start.
        assert!(!writer.write_cue(&cue(2_001, 2_004, "b")).unwrap());
        assert!(writer.write_cue(&cue(3_000, 4_000, "c")).unwrap());
        assert_eq!(writer.written(), 1);
        assert_eq!(writer.filtered(), 2);
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(out.matches("Dialogue:").count(), 1);
    }

    #[test]
    fn test_overlapping_cue_is_rejected() {
        let mut writer = AssWriter::new(Vec::new(), &AssHeader::default()).unwrap();
        writer.write_cue(&cue(0, 2_000, "a")).unwrap();
        let err = writer.write_cue(&cue(1_000, 3_000, "b")).unwrap_err();
        assert!(matches!(err, SpeedcueError::Timeline { .. }));
    }

    #[test]
    fn test_touching_cues_are_allowed() {
        let cues = vec![cue(0, 1_234, "a"), cue(1_234, 2_000, "b")];
        assert!(generate_ass(&cues, &AssHeader::default()).is_ok());
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(escape_text("a{b}\nc"), "a(b)\\Nc");
    }
}
