//! Form controller: owns the selection, prompt and status, and sequences
//! transcode -> upload -> transcription request.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::api::{VideoApi, VideoId};
use crate::error::SubmitError;
use crate::media::{Preview, VideoFile};
use crate::status::{Stage, Status};
use crate::transcode::Transcoder;

/// Called once with the new video id after a successful submission.
pub type VideoUploadedCallback = Box<dyn Fn(&VideoId) + Send + Sync>;

/// Status change sender type.
pub type StatusSender = broadcast::Sender<Status>;

const STATUS_CHANNEL_CAPACITY: usize = 16;

/// Result of a submit that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing selected; no external call was made.
    NoVideoSelected,
    /// Submit is disabled in the current status; nothing happened.
    Disabled(Status),
    /// The audio was uploaded and its transcription requested.
    Uploaded(VideoId),
}

#[derive(Debug, Clone)]
struct Selection {
    video: VideoFile,
    preview: Preview,
}

/// Controller behind the video input form.
pub struct FormController {
    transcoder: Arc<dyn Transcoder>,
    api: Arc<dyn VideoApi>,
    on_video_uploaded: VideoUploadedCallback,
    selection: RwLock<Option<Selection>>,
    prompt: RwLock<Option<String>>,
    status: RwLock<Status>,
    status_tx: StatusSender,
}

impl FormController {
    /// Create a controller in the `Waiting` status with nothing selected.
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        api: Arc<dyn VideoApi>,
        on_video_uploaded: impl Fn(&VideoId) + Send + Sync + 'static,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            transcoder,
            api,
            on_video_uploaded: Box::new(on_video_uploaded),
            selection: RwLock::new(None),
            prompt: RwLock::new(None),
            status: RwLock::new(Status::Waiting),
            status_tx,
        }
    }

    /// Get the current status.
    pub async fn status(&self) -> Status {
        self.status.read().await.clone()
    }

    /// Whether the submit control is enabled.
    pub async fn can_submit(&self) -> bool {
        self.status.read().await.accepts_input()
    }

    /// Subscribe to every subsequent status change, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<Status> {
        self.status_tx.subscribe()
    }

    pub async fn selected_video(&self) -> Option<VideoFile> {
        self.selection.read().await.as_ref().map(|s| s.video.clone())
    }

    pub async fn preview(&self) -> Option<Preview> {
        self.selection.read().await.as_ref().map(|s| s.preview.clone())
    }

    pub async fn prompt(&self) -> Option<String> {
        self.prompt.read().await.clone()
    }

    /// Handle a file-selection event.
    ///
    /// The first entry replaces the current selection and gets a fresh
    /// preview. An empty selection is a no-op and returns `None`. If the
    /// first entry cannot be opened the previous selection is kept.
    pub async fn select_file<I, P>(&self, files: I) -> Result<Option<Preview>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let Some(first) = files.into_iter().next() else {
            debug!("Empty file selection ignored");
            return Ok(None);
        };

        let video = VideoFile::open(first).await?;
        let preview = Preview::for_video(&video)?;

        info!(
            video = %video.path().display(),
            size = video.size_bytes(),
            "Video selected"
        );

        *self.selection.write().await = Some(Selection {
            video,
            preview: preview.clone(),
        });

        Ok(Some(preview))
    }

    /// Replace the transcription prompt. Ignored unless `Waiting`.
    ///
    /// Returns whether the prompt was accepted.
    pub async fn set_prompt(&self, prompt: Option<String>) -> bool {
        let status = self.status.read().await;
        if !status.accepts_input() {
            debug!(status = ?*status, "Prompt is read-only");
            return false;
        }
        *self.prompt.write().await = prompt;
        true
    }

    /// Run the submission: transcode, upload, request transcription.
    ///
    /// Each step is awaited in order. A failing step moves the status to
    /// `Failed` and is returned as a [`SubmitError`]; the callback only runs
    /// after every step succeeded.
    pub async fn submit(&self) -> Result<SubmitOutcome, SubmitError> {
        let (video, prompt) = {
            let mut status = self.status.write().await;
            if !status.accepts_input() {
                debug!(status = ?*status, "Submit is disabled");
                return Ok(SubmitOutcome::Disabled(status.clone()));
            }

            let Some(video) = self.selected_video().await else {
                debug!("Submit without a selected video ignored");
                return Ok(SubmitOutcome::NoVideoSelected);
            };
            let prompt = self.prompt.read().await.clone();

            *status = Status::Converting;
            self.broadcast_status(Status::Converting);
            (video, prompt)
        };

        info!(video = %video.path().display(), "Submitting video");

        let audio = self
            .stage(Stage::Converting, self.transcoder.transcode(&video))
            .await?;

        self.advance(Status::Uploading).await;
        let uploaded = self
            .stage(Stage::Uploading, self.api.upload(audio))
            .await?;

        self.advance(Status::Generating).await;
        self.stage(
            Stage::Generating,
            self.api.request_transcription(&uploaded.id, prompt.as_deref()),
        )
        .await?;

        self.advance(Status::Success).await;
        info!(video_id = %uploaded.id, "Video uploaded and transcription requested");

        (self.on_video_uploaded)(&uploaded.id);

        Ok(SubmitOutcome::Uploaded(uploaded.id))
    }

    /// Await one external call, failing the submission if it errors.
    async fn stage<T>(
        &self,
        stage: Stage,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T, SubmitError> {
        match call.await {
            Ok(value) => Ok(value),
            Err(source) => {
                let error = SubmitError::new(stage, source);
                warn!(stage = %stage, reason = %error.reason(), "Submission failed");
                self.advance(Status::Failed {
                    stage,
                    reason: error.reason(),
                })
                .await;
                Err(error)
            }
        }
    }

    /// Move to the next status and notify subscribers.
    async fn advance(&self, next: Status) {
        let mut status = self.status.write().await;
        debug_assert!(
            status.can_transition_to(&next),
            "illegal status transition {:?} -> {:?}",
            *status,
            next
        );
        debug!(from = ?*status, to = ?next, "Status change");
        *status = next.clone();
        self.broadcast_status(next);
    }

    fn broadcast_status(&self, status: Status) {
        // Ignore send errors (no subscribers)
        let _ = self.status_tx.send(status);
    }
}

#[cfg(test)]
#[path = "form_test.rs"]
mod tests;
