//! Client for the backend video API.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, Response, multipart};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::media::AudioFile;

/// Server-assigned identifier of an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Video resource created by an upload. Fields other than the id are
/// informational and may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedVideo {
    pub id: VideoId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    video: UploadedVideo,
}

/// The backend expects `prompt` on every request, empty when none was given.
#[derive(Debug, Serialize)]
struct TranscriptionRequest<'a> {
    prompt: &'a str,
}

/// Remote operations the form depends on.
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// Upload extracted audio, creating a video resource.
    async fn upload(&self, audio: AudioFile) -> Result<UploadedVideo>;

    /// Ask the server to transcribe a previously uploaded video.
    async fn request_transcription(&self, id: &VideoId, prompt: Option<&str>) -> Result<()>;
}

/// [`VideoApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpVideoApi {
    client: Client,
    base_url: String,
}

impl HttpVideoApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn videos_url(&self) -> String {
        format!("{}/videos", self.base_url)
    }

    fn transcription_url(&self, id: &VideoId) -> String {
        format!("{}/videos/{}/transcription", self.base_url, id)
    }
}

/// Turn a non-2xx response into an error carrying the body text.
async fn check_status(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("{action} failed: HTTP {status}: {body}");
}

#[async_trait]
impl VideoApi for HttpVideoApi {
    async fn upload(&self, audio: AudioFile) -> Result<UploadedVideo> {
        let url = self.videos_url();
        let size = audio.len();

        let part = multipart::Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(&audio.mime_type)
            .context("Invalid audio MIME type")?;
        let form = multipart::Form::new().part("file", part);

        info!(url = %url, size, "Uploading audio");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Failed to upload audio to {url}"))?;
        let response = check_status(response, "Upload").await?;

        let body: UploadResponse = response
            .json()
            .await
            .context("Failed to parse upload response")?;

        info!(video_id = %body.video.id, "Audio uploaded");

        Ok(body.video)
    }

    async fn request_transcription(&self, id: &VideoId, prompt: Option<&str>) -> Result<()> {
        let url = self.transcription_url(id);

        debug!(url = %url, prompt = ?prompt, "Requesting transcription");

        let response = self
            .client
            .post(&url)
            .json(&TranscriptionRequest {
                prompt: prompt.unwrap_or_default(),
            })
            .send()
            .await
            .with_context(|| format!("Failed to request transcription at {url}"))?;
        check_status(response, "Transcription request").await?;

        info!(video_id = %id, "Transcription requested");

        Ok(())
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
