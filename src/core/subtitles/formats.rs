//! Subtitle Format Exporters
//!
//! Renders a list of segments as:
//! - SRT (SubRip)
//! - ASS (Advanced SubStation Alpha)
//! - plain text (one line per segment)

use super::Segment;

// =============================================================================
// SRT Format
// =============================================================================

/// Exports segments to SRT format
///
/// ```text
/// 1
/// 00:00:01,000 --> 00:00:04,000
/// First subtitle text
/// ```
pub fn export_srt(segments: &[Segment]) -> String {
    let mut output = String::new();

    for (index, segment) in segments.iter().enumerate() {
        output.push_str(&format!("{}\n", index + 1));

        let start = format_srt_timestamp(segment.start_sec);
        let end = format_srt_timestamp(segment.end_sec);
        output.push_str(&format!("{} --> {}\n", start, end));

        output.push_str(&segment.text);
        output.push_str("\n\n");
    }

    output.trim_end().to_string()
}

/// Formats seconds as SRT timestamp (00:00:00,000)
fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

// =============================================================================
// ASS Format
// =============================================================================

const ASS_HEADER: &str = "\
[Script Info]
ScriptType: v4.00+
WrapStyle: 0
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,48,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,0,0,0,0,100,100,0,0,1,2,1,2,10,10,10,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, Effect, Text
";

/// Exports segments to ASS format with a standard default style
pub fn export_ass(segments: &[Segment]) -> String {
    let mut output = String::from(ASS_HEADER);

    for segment in segments {
        let start = format_ass_timestamp(segment.start_sec);
        let end = format_ass_timestamp(segment.end_sec);
        // ASS dialogue text is single-line; embedded newlines become \N
        let text = segment.text.replace('\n', "\\N");
        output.push_str(&format!(
            "Dialogue: 0,{},{},Default,,0,0,0,,{}\n",
            start, end, text
        ));
    }

    output
}

/// Formats seconds as ASS timestamp (0:00:00.00, centisecond precision)
fn format_ass_timestamp(seconds: f64) -> String {
    let total_cs = (seconds * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{}:{:02}:{:02}.{:02}", hours, mins, secs, cs)
}

// =============================================================================
// Plain Text
// =============================================================================

/// Exports segments as plain text, one segment per line
pub fn export_txt(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Segment> {
        vec![
            Segment::new(1.0, 4.0, "First subtitle"),
            Segment::new(5.5, 8.0, "Second subtitle"),
        ]
    }

    #[test]
    fn test_export_srt() {
        let srt = export_srt(&sample());
        let expected = "1\n00:00:01,000 --> 00:00:04,000\nFirst subtitle\n\n\
                        2\n00:00:05,500 --> 00:00:08,000\nSecond subtitle";
        assert_eq!(srt, expected);
    }

    #[test]
    fn test_srt_timestamp_rounding() {
        assert_eq!(format_srt_timestamp(3661.2345), "01:01:01,235");
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
    }

    #[test]
    fn test_export_ass_structure() {
        let ass = export_ass(&sample());
        assert!(ass.starts_with("[Script Info]"));
        assert!(ass.contains("[V4+ Styles]"));
        assert!(ass.contains("Dialogue: 0,0:00:01.00,0:00:04.00,Default,,0,0,0,,First subtitle"));
        assert!(ass.contains("Dialogue: 0,0:00:05.50,0:00:08.00,Default,,0,0,0,,Second subtitle"));
    }

    #[test]
    fn test_ass_escapes_newlines() {
        let ass = export_ass(&[Segment::new(0.0, 1.0, "two\nlines")]);
        assert!(ass.contains("two\\Nlines"));
    }

    #[test]
    fn test_export_txt() {
        assert_eq!(export_txt(&sample()), "First subtitle\nSecond subtitle");
        assert_eq!(export_txt(&[]), "");
    }
}
