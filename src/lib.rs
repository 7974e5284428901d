//! MediaScribe
//!
//! Batch audio/video to subtitle conversion driven by cloud ASR
//! services. Inputs are normalized to audio with FFmpeg, transcribed
//! by a selectable engine and written back as SRT/ASS/plain-text
//! sidecar files; an optional step composes a background video for
//! audio-only inputs.

pub mod core;

pub use crate::core::asr::{CloudEngines, EngineKind};
pub use crate::core::ffmpeg::{detect_system_ffmpeg, FfmpegRunner};
pub use crate::core::jobs::{Coordinator, Job, JobEvent, JobState, ProcessingService};
pub use crate::core::settings::{AppSettings, ProcessingConfig};
pub use crate::core::subtitles::ExportFormat;
pub use crate::core::{CoreError, CoreResult, Resolution};
