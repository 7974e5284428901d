//! ASR Engine Abstraction
//!
//! The job pipeline only depends on the `AsrEngine` trait; concrete
//! cloud clients live in the leaf modules and are resolved through an
//! `EngineFactory` so tests can inject mocks.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::subtitles::Transcript;
use crate::core::{CoreError, CoreResult};

mod bcut;
mod jianying;
mod kuaishou;

pub use bcut::BcutAsr;
pub use jianying::JianYingAsr;
pub use kuaishou::KuaiShouAsr;

/// Speech recognition collaborator: submits an audio file, returns a
/// transcript renderable as SRT/ASS/plain text.
#[async_trait]
pub trait AsrEngine: Send + Sync {
    async fn submit(&self, audio: &Path) -> CoreResult<Transcript>;
}

/// Selectable ASR engines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Bilibili BCut recognition service
    #[default]
    Bcut,
    /// JianYing (CapCut) recognition service
    JianYing,
    /// KuaiShou recognition service
    KuaiShou,
    /// Local Whisper transcription (not implemented)
    Whisper,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bcut => "bcut",
            Self::JianYing => "jianying",
            Self::KuaiShou => "kuaishou",
            Self::Whisper => "whisper",
        };
        f.write_str(name)
    }
}

impl FromStr for EngineKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bcut" | "b" => Ok(Self::Bcut),
            "jianying" | "j" => Ok(Self::JianYing),
            "kuaishou" | "k" => Ok(Self::KuaiShou),
            "whisper" => Ok(Self::Whisper),
            other => Err(CoreError::UnknownEngine(other.to_string())),
        }
    }
}

/// Resolves an engine selection into a usable client.
///
/// Resolution happens before any other pipeline stage so an
/// unimplemented selection fails the job without touching the
/// transcoder or the filesystem.
pub trait EngineFactory: Send + Sync {
    fn engine(&self, kind: EngineKind) -> CoreResult<Arc<dyn AsrEngine>>;
}

/// Default factory backed by the cloud clients
#[derive(Default)]
pub struct CloudEngines;

impl EngineFactory for CloudEngines {
    fn engine(&self, kind: EngineKind) -> CoreResult<Arc<dyn AsrEngine>> {
        match kind {
            EngineKind::Bcut => Ok(Arc::new(BcutAsr::new())),
            EngineKind::JianYing => Ok(Arc::new(JianYingAsr::new())),
            EngineKind::KuaiShou => Ok(Arc::new(KuaiShouAsr::new())),
            EngineKind::Whisper => {
                Err(CoreError::UnimplementedEngine("Whisper".to_string()))
            }
        }
    }
}

/// Reads the audio file a client is about to upload
pub(crate) async fn read_audio(audio: &Path) -> CoreResult<Vec<u8>> {
    tokio::fs::read(audio)
        .await
        .map_err(|e| CoreError::AsrFailure(format!("Cannot read audio {}: {e}", audio.display())))
}
