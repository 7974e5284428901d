//! FFmpeg Integration Module
//!
//! Wraps the external `ffmpeg` tool behind the `Transcoder` trait the
//! job pipeline depends on:
//! - audio normalization (any container to mono MP3)
//! - background frame preparation (scale, blur, padded overlay)
//! - image + audio video composition
//!
//! Only system-installed FFmpeg is supported; detection searches PATH
//! and common install locations.

mod detection;
mod runner;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use detection::{detect_system_ffmpeg, FfmpegInfo};
pub use runner::FfmpegRunner;

use crate::core::{CoreResult, Resolution};

/// Transcoding collaborator contract used by the worker pipeline.
///
/// Implemented by `FfmpegRunner` for production and by mocks in tests.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Converts any media container to a mono MP3 at `output`
    async fn to_audio(&self, input: &Path, output: &Path) -> CoreResult<()>;

    /// Renders a background frame at the target resolution: the image
    /// scaled to cover and blurred, with a sharp copy overlaid in the
    /// center leaving `padding` (fraction of height) free above and
    /// below for subtitles. Returns the path of the generated frame.
    async fn prepare_background(
        &self,
        image: &Path,
        resolution: Resolution,
        padding: f64,
    ) -> CoreResult<PathBuf>;

    /// Composes a still image and an audio track into an MP4 named
    /// `<base>_rate<R>_scale<WxH>.mp4`. Returns the output path.
    async fn compose_video(
        &self,
        image: &Path,
        audio: &Path,
        resolution: Resolution,
        frame_rate: u32,
        output_base: &Path,
    ) -> CoreResult<PathBuf>;
}
