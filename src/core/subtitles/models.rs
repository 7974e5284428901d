//! Transcript Data Models

use serde::{Deserialize, Serialize};

use super::{formats, ExportFormat};
use crate::core::TimeSec;

/// One timestamped utterance of a transcript
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Start time in seconds
    pub start_sec: TimeSec,
    /// End time in seconds
    pub end_sec: TimeSec,
    /// Utterance text
    pub text: String,
}

impl Segment {
    pub fn new(start_sec: TimeSec, end_sec: TimeSec, text: &str) -> Self {
        Self {
            start_sec,
            end_sec,
            text: text.to_string(),
        }
    }

    /// Builds a segment from millisecond timestamps, the unit the cloud
    /// ASR services report.
    pub fn from_millis(start_ms: u64, end_ms: u64, text: &str) -> Self {
        Self::new(start_ms as f64 / 1000.0, end_ms as f64 / 1000.0, text)
    }
}

/// ASR output: an ordered list of segments renderable as SRT, ASS or
/// plain text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn to_srt(&self) -> String {
        formats::export_srt(&self.segments)
    }

    pub fn to_ass(&self) -> String {
        formats::export_ass(&self.segments)
    }

    pub fn to_txt(&self) -> String {
        formats::export_txt(&self.segments)
    }

    /// Renders the transcript in the requested export format
    pub fn render(&self, format: ExportFormat) -> String {
        match format {
            ExportFormat::Srt => self.to_srt(),
            ExportFormat::Txt => self.to_txt(),
            ExportFormat::Ass => self.to_ass(),
        }
    }
}
