//! Subtitle Module
//!
//! Provides transcript data models and subtitle export:
//! - `Transcript` / `Segment` (timestamped text from an ASR engine)
//! - SRT, ASS and plain-text rendering
//! - `ExportFormat` selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::CoreError;

mod formats;
mod models;

pub use formats::{export_ass, export_srt, export_txt};
pub use models::{Segment, Transcript};

/// Subtitle export format selected once per processing run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Srt,
    Txt,
    Ass,
}

impl ExportFormat {
    /// File extension of the sidecar subtitle file
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Txt => "txt",
            Self::Ass => "ass",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "txt" => Ok(Self::Txt),
            "ass" => Ok(Self::Ass),
            other => Err(CoreError::ValidationError(format!(
                "Unknown subtitle format: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_parse() {
        assert_eq!("SRT".parse::<ExportFormat>().unwrap(), ExportFormat::Srt);
        assert_eq!("ass".parse::<ExportFormat>().unwrap(), ExportFormat::Ass);
        assert!("vtt".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_format_extension() {
        assert_eq!(ExportFormat::Txt.extension(), "txt");
        assert_eq!(ExportFormat::Srt.to_string(), "srt");
    }
}
