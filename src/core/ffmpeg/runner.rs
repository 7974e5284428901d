//! FFmpeg Runner
//!
//! Builds argument lists and executes ffmpeg as a subprocess via
//! `tokio::process::Command`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{FfmpegInfo, Transcoder};
use crate::core::{media, CoreError, CoreResult, Resolution};

/// Gaussian blur strength for the background frame
const BACKGROUND_BLUR_SIGMA: u32 = 15;

#[derive(Clone)]
pub struct FfmpegRunner {
    info: Arc<FfmpegInfo>,
}

impl FfmpegRunner {
    pub fn new(info: FfmpegInfo) -> Self {
        Self {
            info: Arc::new(info),
        }
    }

    pub fn info(&self) -> &FfmpegInfo {
        &self.info
    }

    /// Runs ffmpeg with the given arguments; nonzero exit becomes an
    /// error built by `fail` from the tail of stderr.
    async fn run(
        &self,
        args: &[String],
        fail: impl FnOnce(String) -> CoreError,
    ) -> CoreResult<()> {
        debug!("ffmpeg {}", args.join(" "));
        let output = tokio::process::Command::new(&self.info.ffmpeg_path)
            .args(args)
            .output()
            .await
            .map_err(|e| CoreError::TranscodeFailure(format!("Cannot launch ffmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(stderr_tail(&stderr)));
        }
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegRunner {
    async fn to_audio(&self, input: &Path, output: &Path) -> CoreResult<()> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let args = vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-f".to_string(),
            "mp3".to_string(),
            "-af".to_string(),
            "aresample=async=1".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];

        self.run(&args, CoreError::TranscodeFailure).await?;

        if !output.is_file() {
            return Err(CoreError::TranscodeFailure(format!(
                "No audio produced at {}",
                output.display()
            )));
        }
        info!("Extracted audio: {} -> {}", input.display(), output.display());
        Ok(())
    }

    async fn prepare_background(
        &self,
        image: &Path,
        resolution: Resolution,
        padding: f64,
    ) -> CoreResult<PathBuf> {
        let Resolution { width, height } = resolution;
        // The sharp foreground copy leaves `padding` of the height free
        // both above and below for subtitles.
        let fg_height = ((height as f64) * (1.0 - 2.0 * padding)).round().max(2.0) as u32;

        let filter = format!(
            "[0:v]scale={width}:{height}:force_original_aspect_ratio=increase,\
             crop={width}:{height},gblur=sigma={BACKGROUND_BLUR_SIGMA}[bg];\
             [0:v]scale={width}:{fg_height}:force_original_aspect_ratio=decrease[fg];\
             [bg][fg]overlay=(W-w)/2:(H-h)/2"
        );

        let output = media::unique_sibling_path(image, "png");
        let args = vec![
            "-i".to_string(),
            image.to_string_lossy().to_string(),
            "-filter_complex".to_string(),
            filter,
            "-frames:v".to_string(),
            "1".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];

        self.run(&args, CoreError::VideoCompositionFailure).await?;

        if !output.is_file() {
            return Err(CoreError::VideoCompositionFailure(format!(
                "No background frame produced at {}",
                output.display()
            )));
        }
        Ok(output)
    }

    async fn compose_video(
        &self,
        image: &Path,
        audio: &Path,
        resolution: Resolution,
        frame_rate: u32,
        output_base: &Path,
    ) -> CoreResult<PathBuf> {
        let output = composed_video_path(output_base, frame_rate, resolution);
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let args = vec![
            "-loop".to_string(),
            "1".to_string(),
            "-i".to_string(),
            image.to_string_lossy().to_string(),
            "-i".to_string(),
            audio.to_string_lossy().to_string(),
            "-r".to_string(),
            frame_rate.to_string(),
            "-s".to_string(),
            resolution.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
            "-shortest".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];

        self.run(&args, CoreError::VideoCompositionFailure).await?;

        if !output.is_file() {
            return Err(CoreError::VideoCompositionFailure(format!(
                "No video produced at {}",
                output.display()
            )));
        }
        info!("Composed video: {}", output.display());
        Ok(output)
    }
}

/// Output naming scheme: `<base>_rate<R>_scale<WxH>.mp4`
pub fn composed_video_path(base: &Path, frame_rate: u32, resolution: Resolution) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    base.with_file_name(format!("{stem}_rate{frame_rate}_scale{resolution}.mp4"))
}

/// Last lines of ffmpeg stderr, enough to identify the failure
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail = lines.len().saturating_sub(4);
    lines[tail..].join(" | ")
}
