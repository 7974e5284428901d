//! KuaiShou Recognition Client
//!
//! Single-shot API: one multipart POST with the audio file, the
//! response carries the timestamped text directly.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{read_audio, AsrEngine};
use crate::core::subtitles::{Segment, Transcript};
use crate::core::{CoreError, CoreResult};

const SUBTITLE_URL: &str = "https://ai.kuaishou.com/api/effects/subtitle_generate";

#[derive(Deserialize)]
struct SubtitleResponse {
    data: SubtitleData,
}

#[derive(Deserialize)]
struct SubtitleData {
    text: Vec<SubtitleLine>,
}

#[derive(Deserialize)]
struct SubtitleLine {
    start_time: f64,
    end_time: f64,
    text: String,
}

pub struct KuaiShouAsr {
    http: reqwest::Client,
}

impl KuaiShouAsr {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for KuaiShouAsr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsrEngine for KuaiShouAsr {
    async fn submit(&self, audio: &Path) -> CoreResult<Transcript> {
        let data = read_audio(audio).await?;
        let name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        info!("KuaiShou subtitle request for {}", audio.display());

        let form = reqwest::multipart::Form::new()
            .text("typeId", "1")
            .part("file", reqwest::multipart::Part::bytes(data).file_name(name));

        let resp = self
            .http
            .post(format!("{SUBTITLE_URL}?format=mp3"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| CoreError::AsrFailure(format!("KuaiShou request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(CoreError::AsrFailure(format!(
                "KuaiShou request rejected: HTTP {}",
                resp.status()
            )));
        }

        let parsed: SubtitleResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::AsrFailure(format!("KuaiShou response malformed: {e}")))?;

        // Timestamps arrive in seconds for this API
        let segments = parsed
            .data
            .text
            .into_iter()
            .map(|line| Segment::new(line.start_time, line.end_time, &line.text))
            .collect();

        Ok(Transcript::new(segments))
    }
}
