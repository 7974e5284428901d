//! JianYing Recognition Client
//!
//! Flow: request an upload authorization, PUT the audio to the signed
//! URL, submit a subtitle task for the stored object, poll the query
//! endpoint until utterances are available.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{read_audio, AsrEngine};
use crate::core::subtitles::{Segment, Transcript};
use crate::core::{CoreError, CoreResult};

const API_BASE: &str = "https://lv-pc-api.ulikecam.com/lv/v1";

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_POLLS: u32 = 300;

#[derive(Deserialize)]
struct Envelope<T> {
    ret: String,
    errmsg: Option<String>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct UploadSign {
    upload_url: String,
    sign: String,
    store_uri: String,
}

#[derive(Deserialize)]
struct Submitted {
    id: String,
}

#[derive(Deserialize)]
struct QueryResult {
    utterances: Option<Vec<Utterance>>,
}

#[derive(Deserialize)]
struct Utterance {
    start_time: u64,
    end_time: u64,
    text: String,
}

pub struct JianYingAsr {
    http: reqwest::Client,
}

impl JianYingAsr {
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
        let resp = self.http.post(&url).json(&body).send().await.map_err(|e| {
            CoreError::AsrFailure(format!("JianYing request {endpoint} failed: {e}"))
        })?;
        unwrap_envelope(resp.json().await.map_err(|e| {
            CoreError::AsrFailure(format!("JianYing response {endpoint} malformed: {e}"))
        })?)
    }

    async fn upload(&self, audio: &[u8]) -> CoreResult<String> {
        let sign: UploadSign = self
            .post_json(
                "/upload_sign",
                serde_json::json!({ "biz": "pc-recognition" }),
            )
            .await?;

        let resp = self
            .http
            .put(&sign.upload_url)
            .header("Authorization", &sign.sign)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| CoreError::AsrFailure(format!("JianYing upload failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(CoreError::AsrFailure(format!(
                "JianYing upload rejected: HTTP {}",
                resp.status()
            )));
        }

        Ok(sign.store_uri)
    }

    async fn poll_query(&self, id: &str) -> CoreResult<Vec<Utterance>> {
        for _ in 0..MAX_POLLS {
            let result: QueryResult = self
                .post_json(
                    "/audio_subtitle/query",
                    serde_json::json!({ "id": id, "pack_options": { "need_attribute": true } }),
                )
                .await?;

            if let Some(utterances) = result.utterances {
                return Ok(utterances);
            }
            debug!("JianYing task {id} still pending");
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        Err(CoreError::AsrFailure(
            "JianYing task did not complete in time".to_string(),
        ))
    }
}

impl Default for JianYingAsr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsrEngine for JianYingAsr {
    async fn submit(&self, audio: &Path) -> CoreResult<Transcript> {
        let data = read_audio(audio).await?;
        let store_uri = self.upload(&data).await?;

        let submitted: Submitted = self
            .post_json(
                "/audio_subtitle/submit",
                serde_json::json!({
                    "adjust_endtime": 200,
                    "audio": store_uri,
                    "caption_type": 2,
                    "client_request_id": uuid::Uuid::new_v4().to_string(),
                    "max_lines": 1,
                    "words_per_line": 16,
                }),
            )
            .await?;
        info!(
            "JianYing task {} submitted for {}",
            submitted.id,
            audio.display()
        );

        let utterances = self.poll_query(&submitted.id).await?;
        let segments = utterances
            .into_iter()
            .map(|u| Segment::from_millis(u.start_time, u.end_time, &u.text))
            .collect();

        Ok(Transcript::new(segments))
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> CoreResult<T> {
    if envelope.ret != "0" {
        return Err(CoreError::AsrFailure(format!(
            "JianYing API error {}: {}",
            envelope.ret,
            envelope.errmsg.unwrap_or_default()
        )));
    }
    envelope
        .data
        .ok_or_else(|| CoreError::AsrFailure("JianYing API returned empty data".to_string()))
}
