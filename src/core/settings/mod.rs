//! Settings Persistence
//!
//! Persistent application settings with atomic file writes
//! (temp file + rename) and value clamping so a corrupted or
//! hand-edited config never bricks the app.
//!
//! Storage location: {config_dir}/mediascribe/settings.json

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::asr::EngineKind;
use crate::core::subtitles::ExportFormat;
use crate::core::{CoreResult, Resolution};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Upper bound for the worker pool size: one core is left free
pub fn concurrency_bound() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

// =============================================================================
// Persisted Settings
// =============================================================================

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Selected ASR engine
    #[serde(default)]
    pub engine: EngineKind,

    /// Subtitle export format
    #[serde(default)]
    pub export_format: ExportFormat,

    /// Worker pool size; 0 means auto (half the cores)
    #[serde(default)]
    pub max_concurrent_jobs: usize,

    /// Video synthesis settings
    #[serde(default)]
    pub video: VideoSettings,
}

/// Image-to-video synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSettings {
    /// Whether to compose a video next to the subtitle file
    #[serde(default)]
    pub enabled: bool,

    /// Explicit background image; falls back to a same-basename image,
    /// then to the bundled placeholder
    #[serde(default)]
    pub image: Option<PathBuf>,

    /// Output frame rate (1-60)
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Output resolution
    #[serde(default)]
    pub resolution: Resolution,

    /// Height percentage reserved for subtitles above and below (0-30)
    #[serde(default = "default_padding_percent")]
    pub padding_percent: u32,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_frame_rate() -> u32 {
    30
}

fn default_padding_percent() -> u32 {
    12
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            image: None,
            frame_rate: default_frame_rate(),
            resolution: Resolution::default(),
            padding_percent: default_padding_percent(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            engine: EngineKind::default(),
            export_format: ExportFormat::default(),
            max_concurrent_jobs: 0,
            video: VideoSettings::default(),
        }
    }
}

impl AppSettings {
    /// Normalizes and clamps settings so persisted state is always valid
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;
        self.max_concurrent_jobs = self.max_concurrent_jobs.min(concurrency_bound());
        self.video.frame_rate = self.video.frame_rate.clamp(1, 60);
        self.video.padding_percent = self.video.padding_percent.min(30);
        if self.video.resolution.width == 0 || self.video.resolution.height == 0 {
            self.video.resolution = Resolution::default();
        }
    }

    /// Worker pool size actually used for a run, within `[1, cpus-1]`
    pub fn effective_concurrency(&self) -> usize {
        let bound = concurrency_bound();
        if self.max_concurrent_jobs == 0 {
            num_cpus::get().div_ceil(2).clamp(1, bound)
        } else {
            self.max_concurrent_jobs.clamp(1, bound)
        }
    }

    /// Snapshot for one processing run
    pub fn processing_config(&self) -> ProcessingConfig {
        ProcessingConfig {
            engine: self.engine,
            format: self.export_format,
            video: self.video.enabled.then(|| VideoConfig {
                image: self.video.image.clone(),
                frame_rate: self.video.frame_rate,
                resolution: self.video.resolution,
                padding: f64::from(self.video.padding_percent) / 100.0,
            }),
        }
    }

    /// Loads settings from `dir`, falling back to defaults on a
    /// missing or unreadable file
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(SETTINGS_FILE);
        let mut settings = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Self>(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Settings file corrupted ({e}), using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };
        settings.normalize();
        settings
    }

    /// Saves settings to `dir` atomically (temp file + rename)
    pub fn save(&self, dir: &Path) -> CoreResult<()> {
        fs::create_dir_all(dir)?;
        let path = dir.join(SETTINGS_FILE);
        let tmp_path = dir.join(format!("{SETTINGS_FILE}.tmp"));

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

/// Default settings directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mediascribe")
}

// =============================================================================
// Per-run Configuration
// =============================================================================

/// Configuration selected once per processing run, shared by every
/// job dispatched in that run
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessingConfig {
    pub engine: EngineKind,
    pub format: ExportFormat,
    pub video: Option<VideoConfig>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        AppSettings::default().processing_config()
    }
}

/// Video synthesis parameters for one run
#[derive(Clone, Debug, PartialEq)]
pub struct VideoConfig {
    pub image: Option<PathBuf>,
    pub frame_rate: u32,
    pub resolution: Resolution,
    /// Fraction of the height reserved for subtitles (0.0-0.3)
    pub padding: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clamps() {
        let mut settings = AppSettings {
            max_concurrent_jobs: 10_000,
            ..Default::default()
        };
        settings.video.frame_rate = 500;
        settings.video.padding_percent = 90;
        settings.video.resolution = Resolution::new(0, 720);

        settings.normalize();

        assert!(settings.max_concurrent_jobs <= concurrency_bound());
        assert_eq!(settings.video.frame_rate, 60);
        assert_eq!(settings.video.padding_percent, 30);
        assert_eq!(settings.video.resolution, Resolution::default());
    }

    #[test]
    fn test_effective_concurrency_bounds() {
        let auto = AppSettings::default();
        let n = auto.effective_concurrency();
        assert!(n >= 1 && n <= concurrency_bound());

        let fixed = AppSettings {
            max_concurrent_jobs: 1,
            ..Default::default()
        };
        assert_eq!(fixed.effective_concurrency(), 1);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = AppSettings::default();
        settings.engine = EngineKind::KuaiShou;
        settings.export_format = ExportFormat::Ass;
        settings.video.enabled = true;
        settings.video.frame_rate = 24;

        settings.save(dir.path()).unwrap();
        let loaded = AppSettings::load(dir.path());
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_corrupt_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        assert_eq!(AppSettings::load(dir.path()), AppSettings::default());
    }

    #[test]
    fn test_processing_config_video_gate() {
        let mut settings = AppSettings::default();
        assert!(settings.processing_config().video.is_none());

        settings.video.enabled = true;
        settings.video.padding_percent = 12;
        let config = settings.processing_config();
        let video = config.video.unwrap();
        assert!((video.padding - 0.12).abs() < f64::EPSILON);
    }
}
