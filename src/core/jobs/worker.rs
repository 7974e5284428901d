//! Job Worker Pipeline
//!
//! The per-file pipeline one worker runs end to end:
//! 1. resolve the ASR engine (fails fast before any file is touched)
//! 2. normalize the input to mono MP3 unless it already is audio
//! 3. submit the audio to the engine
//! 4. render the transcript and write the subtitle sidecar
//! 5. optionally compose a background video for the audio

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::asr::EngineFactory;
use crate::core::ffmpeg::Transcoder;
use crate::core::media;
use crate::core::settings::{ProcessingConfig, VideoConfig};
use crate::core::CoreResult;

/// RAII guard that deletes a temporary artifact when dropped
struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.path.is_file() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                debug!("Failed to remove temp file {}: {e}", self.path.display());
            }
        }
    }
}

/// Runs the full pipeline for one file and returns the rendered
/// subtitle text.
///
/// Temporary artifacts (extracted audio, prepared background frame)
/// are removed on every exit path; the subtitle sidecar and the
/// composed video stay next to the input.
pub async fn run_job(
    path: &Path,
    config: &ProcessingConfig,
    transcoder: &Arc<dyn Transcoder>,
    engines: &Arc<dyn EngineFactory>,
) -> CoreResult<String> {
    let engine = engines.engine(config.engine)?;

    // Normalize to audio. The temp file must outlive video composition,
    // which reuses it as the soundtrack.
    let (audio_path, _audio_guard) = if media::is_audio_file(path) {
        (path.to_path_buf(), None)
    } else {
        let audio = media::unique_sibling_path(path, "mp3");
        transcoder.to_audio(path, &audio).await?;
        (audio.clone(), Some(TempFileGuard::new(audio)))
    };

    let transcript = engine.submit(&audio_path).await?;
    info!(
        "Transcribed {} ({} segments)",
        path.display(),
        transcript.segments.len()
    );

    let text = transcript.render(config.format);
    let subtitle_path = path.with_extension(config.format.extension());
    tokio::fs::write(&subtitle_path, &text).await?;
    info!("Wrote subtitle: {}", subtitle_path.display());

    if let Some(video) = &config.video {
        compose_for(path, &audio_path, video, transcoder).await?;
    }

    Ok(text)
}

async fn compose_for(
    path: &Path,
    audio_path: &Path,
    video: &VideoConfig,
    transcoder: &Arc<dyn Transcoder>,
) -> CoreResult<()> {
    let background = resolve_background(path, video)?;
    let frame = transcoder
        .prepare_background(&background, video.resolution, video.padding)
        .await?;
    let _frame_guard = TempFileGuard::new(frame.clone());

    transcoder
        .compose_video(
            &frame,
            audio_path,
            video.resolution,
            video.frame_rate,
            &path.with_extension("mp4"),
        )
        .await?;
    Ok(())
}

/// Picks the background image: explicit setting, then an image sharing
/// the input's basename, then the bundled placeholder.
fn resolve_background(path: &Path, video: &VideoConfig) -> CoreResult<PathBuf> {
    if let Some(image) = &video.image {
        return Ok(image.clone());
    }
    if let Some(image) = media::sibling_image(path) {
        debug!("Using sibling image: {}", image.display());
        return Ok(image);
    }
    media::placeholder_image()
}
