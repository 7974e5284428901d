//! MediaScribe CLI
//!
//! Headless batch driver: expands the input arguments into media
//! files, runs the job pipeline over them with a bounded worker pool
//! and reports per-file progress on stdout.

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mediascribe::core::asr::{CloudEngines, EngineKind};
use mediascribe::core::ffmpeg::{detect_system_ffmpeg, FfmpegRunner, Transcoder};
use mediascribe::core::jobs::{Coordinator, JobEvent, JobState, ProcessingService};
use mediascribe::core::media;
use mediascribe::core::settings::{default_config_dir, AppSettings};
use mediascribe::core::subtitles::ExportFormat;
use mediascribe::core::Resolution;

#[derive(Parser, Debug)]
#[command(
    name = "mediascribe",
    version,
    about = "Batch audio/video to subtitle conversion via cloud speech recognition"
)]
struct Cli {
    /// Media files or directories (directories are walked recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Speech recognition engine: bcut, jianying, kuaishou
    #[arg(short, long, value_parser = EngineKind::from_str)]
    engine: Option<EngineKind>,

    /// Subtitle format: srt, txt, ass
    #[arg(short, long, value_parser = ExportFormat::from_str)]
    format: Option<ExportFormat>,

    /// Worker pool size (default: half the cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Compose a background video next to each subtitle
    #[arg(long)]
    video: bool,

    /// Background image for video composition
    #[arg(long)]
    image: Option<PathBuf>,

    /// Video frame rate (1-60)
    #[arg(long)]
    fps: Option<u32>,

    /// Video resolution, e.g. 1280x720
    #[arg(long, value_parser = Resolution::from_str)]
    resolution: Option<Resolution>,

    /// Subtitle padding as a percentage of the height (0-30)
    #[arg(long)]
    padding: Option<u32>,

    /// Settings directory (default: the platform config dir)
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

fn apply_overrides(settings: &mut AppSettings, cli: &Cli) {
    if let Some(engine) = cli.engine {
        settings.engine = engine;
    }
    if let Some(format) = cli.format {
        settings.export_format = format;
    }
    if let Some(jobs) = cli.jobs {
        settings.max_concurrent_jobs = jobs;
    }
    if cli.video {
        settings.video.enabled = true;
    }
    if let Some(image) = &cli.image {
        settings.video.image = Some(image.clone());
    }
    if let Some(fps) = cli.fps {
        settings.video.frame_rate = fps;
    }
    if let Some(resolution) = cli.resolution {
        settings.video.resolution = resolution;
    }
    if let Some(padding) = cli.padding {
        settings.video.padding_percent = padding;
    }
    settings.normalize();
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(default_config_dir);
    let mut settings = AppSettings::load(&config_dir);
    apply_overrides(&mut settings, &cli);

    let files: Vec<PathBuf> = cli
        .inputs
        .iter()
        .flat_map(|input| media::collect_media_files(input))
        .collect();
    anyhow::ensure!(!files.is_empty(), "No media files found in the given inputs");

    let ffmpeg = detect_system_ffmpeg().context(
        "FFmpeg is required; install it or add it to PATH",
    )?;
    info!("Using ffmpeg {} at {}", ffmpeg.version, ffmpeg.ffmpeg_path.display());

    let concurrency = settings.effective_concurrency();
    info!("Processing {} file(s) with {} worker(s)", files.len(), concurrency);

    let transcoder: Arc<dyn Transcoder> = Arc::new(FfmpegRunner::new(ffmpeg));
    let service = ProcessingService::new(
        Coordinator::new(concurrency),
        transcoder,
        Arc::new(CloudEngines),
    );
    let mut events = service
        .take_event_receiver()
        .context("Event stream already taken")?;

    for file in files {
        if let Err(e) = service.enqueue(file) {
            warn!("{e}");
        }
    }
    service.start(settings.processing_config());

    forward_events(&mut events, || service.is_drained(), |event| match event {
        JobEvent::StateChanged {
            path,
            state: JobState::Processing,
        } => {
            println!("processing  {}", path.display());
        }
        JobEvent::Completed { path, .. } => {
            println!("done        {}", path.display());
        }
        JobEvent::Failed { path, error } => {
            eprintln!("error       {}: {error}", path.display());
        }
        _ => {}
    })
    .await;

    let jobs = service.jobs();
    let done = jobs.iter().filter(|j| j.state == JobState::Done).count();
    let failed = jobs.iter().filter(|j| j.state == JobState::Error).count();
    println!("{done} done, {failed} failed");

    Ok(failed == 0)
}

/// Reports job events until the pool is drained. Jobs can finish
/// faster than this loop runs, so once drained the events already
/// queued in the channel are still flushed before returning.
async fn forward_events(
    events: &mut tokio::sync::mpsc::UnboundedReceiver<JobEvent>,
    drained: impl Fn() -> bool,
    mut report: impl FnMut(&JobEvent),
) {
    while let Some(event) = events.recv().await {
        report(&event);
        if drained() {
            while let Ok(event) = events.try_recv() {
                report(&event);
            }
            break;
        }
    }
}


#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let ok = run(cli).await?;
    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
