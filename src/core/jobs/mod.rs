//! Job System Module
//!
//! The coordinator owns the job table, the FIFO pending queue and the
//! concurrency-slot accounting; workers run the per-file pipeline and
//! report back a single completion message. The presentation layer
//! observes state through the `JobEvent` stream instead of owning it.

mod coordinator;
mod service;
mod worker;

pub use coordinator::{Coordinator, Dispatch};
pub use service::ProcessingService;
pub use worker::run_job;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// =============================================================================
// Job Model
// =============================================================================

/// Job lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    /// Added but not yet queued for processing
    #[default]
    Unprocessed,
    /// Waiting in the pending queue
    Queued,
    /// A worker is running the pipeline for this file
    Processing,
    /// Pipeline finished, subtitle written
    Done,
    /// Pipeline failed
    Error,
}

impl JobState {
    /// Whether the job reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unprocessed => "unprocessed",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// One user-submitted file, keyed by its absolute path
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique key: the submitted file path
    pub path: PathBuf,
    /// Current lifecycle state
    pub state: JobState,
    /// Rendered subtitle text, populated only in `Done`
    pub result_text: Option<String>,
    /// Failure message, populated only in `Error`
    pub error_message: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

impl Job {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: JobState::Unprocessed,
            result_text: None,
            error_message: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Job state notifications consumed by the presentation layer
#[derive(Clone, Debug)]
pub enum JobEvent {
    /// Job state changed (added, queued, processing, reprocessing)
    StateChanged { path: PathBuf, state: JobState },
    /// Job completed with the rendered subtitle text
    Completed { path: PathBuf, text: String },
    /// Job failed with a human-readable message
    Failed { path: PathBuf, error: String },
    /// Job removed from the table
    Removed { path: PathBuf },
}
