//! BCut Recognition Client
//!
//! Upload flow: create a resource, upload the audio in parts, commit
//! the upload, create a recognition task, then poll for the result.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{read_audio, AsrEngine};
use crate::core::subtitles::{Segment, Transcript};
use crate::core::{CoreError, CoreResult};

const API_BASE: &str = "https://member.bilibili.com/x/bcut/rubick-interface";
const MODEL_ID: &str = "8";

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_POLLS: u32 = 300;

/// Task state reported by the result endpoint
const STATE_ERROR: i64 = 3;
const STATE_COMPLETE: i64 = 4;

#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct ResourceCreated {
    in_boss_key: String,
    resource_id: String,
    upload_id: String,
    upload_urls: Vec<String>,
    per_size: u64,
}

#[derive(Deserialize)]
struct ResourceCompleted {
    download_url: String,
}

#[derive(Deserialize)]
struct TaskCreated {
    task_id: String,
}

#[derive(Deserialize)]
struct TaskResult {
    state: i64,
    remark: Option<String>,
    result: Option<String>,
}

#[derive(Deserialize)]
struct RecognitionResult {
    utterances: Vec<Utterance>,
}

#[derive(Deserialize)]
struct Utterance {
    start_time: u64,
    end_time: u64,
    transcript: String,
}

pub struct BcutAsr {
    http: reqwest::Client,
}

impl BcutAsr {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> CoreResult<T> {
        let url = format!("{API_BASE}{endpoint}");
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::AsrFailure(format!("BCut request {endpoint} failed: {e}")))?;
        unwrap_envelope(resp.json().await.map_err(|e| {
            CoreError::AsrFailure(format!("BCut response {endpoint} malformed: {e}"))
        })?)
    }

    /// Uploads the audio in `per_size` chunks, returning one etag per part
    async fn upload_parts(&self, audio: &[u8], created: &ResourceCreated) -> CoreResult<Vec<String>> {
        let per_size = validate_upload_plan(audio.len(), created)?;
        let mut etags = Vec::with_capacity(created.upload_urls.len());

        let parts = created.upload_urls.iter().zip(audio.chunks(per_size));
        for (index, (url, chunk)) in parts.enumerate() {
            let resp = self
                .http
                .put(url)
                .body(chunk.to_vec())
                .send()
                .await
                .map_err(|e| {
                    CoreError::AsrFailure(format!("BCut part {index} upload failed: {e}"))
                })?;
            let etag = resp
                .headers()
                .get("Etag")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            etags.push(etag);
        }

        Ok(etags)
    }

    async fn poll_result(&self, task_id: &str) -> CoreResult<RecognitionResult> {
        for _ in 0..MAX_POLLS {
            let url = format!("{API_BASE}/task/result?model_id={MODEL_ID}&task_id={task_id}");
            let resp = self.http.get(&url).send().await.map_err(|e| {
                CoreError::AsrFailure(format!("BCut result query failed: {e}"))
            })?;
            let result: TaskResult = unwrap_envelope(resp.json().await.map_err(|e| {
                CoreError::AsrFailure(format!("BCut result response malformed: {e}"))
            })?)?;

            match result.state {
                STATE_COMPLETE => {
                    let raw = result.result.unwrap_or_default();
                    return serde_json::from_str(&raw).map_err(|e| {
                        CoreError::AsrFailure(format!("BCut recognition result malformed: {e}"))
                    });
                }
                STATE_ERROR => {
                    return Err(CoreError::AsrFailure(format!(
                        "BCut task failed: {}",
                        result.remark.unwrap_or_else(|| "unknown".to_string())
                    )));
                }
                state => debug!("BCut task {task_id} state {state}, polling"),
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }

        Err(CoreError::AsrFailure(
            "BCut task did not complete in time".to_string(),
        ))
    }
}

impl Default for BcutAsr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsrEngine for BcutAsr {
    async fn submit(&self, audio: &Path) -> CoreResult<Transcript> {
        let data = read_audio(audio).await?;
        let name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3");

        let created: ResourceCreated = self
            .post_json(
                "/resource/create",
                serde_json::json!({
                    "type": 2,
                    "name": name,
                    "size": data.len(),
                    "ResourceFileType": "mp3",
                    "model_id": MODEL_ID,
                }),
            )
            .await?;

        let etags = self.upload_parts(&data, &created).await?;

        let completed: ResourceCompleted = self
            .post_json(
                "/resource/create/complete",
                serde_json::json!({
                    "InBossKey": created.in_boss_key,
                    "ResourceId": created.resource_id,
                    "Etags": etags.join(","),
                    "UploadId": created.upload_id,
                    "model_id": MODEL_ID,
                }),
            )
            .await?;

        let task: TaskCreated = self
            .post_json(
                "/task",
                serde_json::json!({
                    "resource": completed.download_url,
                    "model_id": MODEL_ID,
                }),
            )
            .await?;
        info!("BCut task {} created for {}", task.task_id, audio.display());

        let result = self.poll_result(&task.task_id).await?;
        let segments = result
            .utterances
            .into_iter()
            .map(|u| Segment::from_millis(u.start_time, u.end_time, &u.transcript))
            .collect();

        Ok(Transcript::new(segments))
    }
}

/// Checks the server's upload plan against the audio size before any
/// chunk is sliced; `per_size` and the URL list are server-controlled
/// and must not be trusted to match.
fn validate_upload_plan(audio_len: usize, created: &ResourceCreated) -> CoreResult<usize> {
    let per_size = created.per_size.max(1) as usize;
    let expected_parts = audio_len.div_ceil(per_size).max(1);
    if created.upload_urls.len() != expected_parts {
        return Err(CoreError::AsrFailure(format!(
            "BCut upload plan inconsistent: {} urls for {} bytes at {} per part",
            created.upload_urls.len(),
            audio_len,
            per_size
        )));
    }
    Ok(per_size)
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> CoreResult<T> {
    if envelope.code != 0 {
        return Err(CoreError::AsrFailure(format!(
            "BCut API error {}: {}",
            envelope.code,
            envelope.message.unwrap_or_default()
        )));
    }
    envelope
        .data
        .ok_or_else(|| CoreError::AsrFailure("BCut API returned empty data".to_string()))
}
