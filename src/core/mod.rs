//! Mediascribe Core Engine
//!
//! Handles job coordination, the per-file processing pipeline,
//! ASR engine clients, subtitle export and FFmpeg invocation.

pub mod asr;
pub mod ffmpeg;
pub mod jobs;
pub mod media;
pub mod settings;
pub mod subtitles;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
