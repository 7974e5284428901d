//! Error Definitions
//!
//! Defines error types used throughout the project.
//! Worker pipeline stages convert these into per-job failure messages;
//! they never escape the worker boundary as panics.

use std::path::PathBuf;

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Worker Pipeline Errors
    // =========================================================================
    #[error("Audio transcode failed: {0}")]
    TranscodeFailure(String),

    #[error("Unknown ASR engine: {0}")]
    UnknownEngine(String),

    #[error("ASR engine not implemented: {0}")]
    UnimplementedEngine(String),

    #[error("ASR request failed: {0}")]
    AsrFailure(String),

    #[error("Video composition failed: {0}")]
    VideoCompositionFailure(String),

    #[error("FFmpeg not found. Please install FFmpeg and ensure it is on PATH.")]
    FfmpegNotFound,

    // =========================================================================
    // Job Table Errors
    // =========================================================================
    #[error("File already added: {}", .0.display())]
    DuplicateJob(PathBuf),

    #[error("No job for file: {}", .0.display())]
    JobNotFound(PathBuf),

    #[error("Job is currently processing: {}", .0.display())]
    JobProcessing(PathBuf),

    #[error("No processing configuration set; start processing first")]
    ConfigMissing,

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;
