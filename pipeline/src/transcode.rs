//! Audio extraction.
//!
//! This module provides a trait abstraction for the transcoding backend and
//! an implementation that drives an external `ffmpeg` binary.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::TranscodeConfig;
use crate::media::{AudioFile, VideoFile};

/// Turns a video into an uploadable audio file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, video: &VideoFile) -> Result<AudioFile>;
}

/// Audio bitrate passed to the encoder.
pub const AUDIO_BITRATE: &str = "20k";
/// Encoder producing MP3 output.
pub const AUDIO_CODEC: &str = "libmp3lame";

const OUTPUT_FILE_NAME: &str = "output.mp3";
const STDERR_TAIL_LINES: usize = 20;

/// Transcoder backed by the ffmpeg command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    pub fn from_config(config: &TranscodeConfig) -> Self {
        Self::new(&config.ffmpeg_path)
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    /// Arguments extracting the first audio stream as low-bitrate MP3.
    ///
    /// Machine-readable progress goes to stdout, diagnostics to stderr.
    pub fn args(input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        args.extend(
            [
                "-map",
                "0:a",
                "-b:a",
                AUDIO_BITRATE,
                "-acodec",
                AUDIO_CODEC,
                "-progress",
                "pipe:1",
                "-nostats",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<()> {
        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(Self::args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = ?command, "Spawning ffmpeg");

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!(
                    "ffmpeg not found at '{}'. Install ffmpeg or set transcode.ffmpeg_path",
                    self.ffmpeg_path.display()
                )
            } else {
                anyhow::Error::new(e).context("Failed to spawn ffmpeg")
            }
        })?;

        let stdout = child.stdout.take().context("ffmpeg stdout not captured")?;
        let stderr = child.stderr.take().context("ffmpeg stderr not captured")?;
        let mut stdout = BufReader::new(stdout).lines();
        let mut stderr = BufReader::new(stderr).lines();

        let mut progress = ProgressTracker::default();
        let mut stderr_tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut stdout_done = false;
        let mut stderr_done = false;

        // Both pipes must be drained or ffmpeg can block on a full buffer.
        while !(stdout_done && stderr_done) {
            tokio::select! {
                line = stdout.next_line(), if !stdout_done => {
                    match line.context("Failed to read ffmpeg progress")? {
                        Some(line) => {
                            if let Some(percent) = progress.observe_progress(&line) {
                                debug!(percent, "Convert progress");
                            }
                        }
                        None => stdout_done = true,
                    }
                }
                line = stderr.next_line(), if !stderr_done => {
                    match line.context("Failed to read ffmpeg output")? {
                        Some(line) => {
                            progress.observe_diagnostics(&line);
                            if stderr_tail.len() == STDERR_TAIL_LINES {
                                stderr_tail.pop_front();
                            }
                            stderr_tail.push_back(line);
                        }
                        None => stderr_done = true,
                    }
                }
            }
        }

        let status = child.wait().await.context("Failed to wait for ffmpeg")?;
        if !status.success() {
            let tail = Vec::from(stderr_tail).join("\n");
            error!(status = %status, stderr = %tail, "ffmpeg conversion failed");
            bail!("ffmpeg exited with {status}:\n{tail}");
        }

        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, video: &VideoFile) -> Result<AudioFile> {
        let workdir = tempfile::Builder::new()
            .prefix("upload-ai-")
            .tempdir()
            .context("Failed to create temporary directory for transcoding")?;
        let output = workdir.path().join(OUTPUT_FILE_NAME);

        info!(
            input = %video.path().display(),
            size = video.size_bytes(),
            "Extracting audio"
        );

        self.run(video.path(), &output).await?;

        let bytes = tokio::fs::read(&output)
            .await
            .context("ffmpeg did not produce an output file")?;
        if bytes.is_empty() {
            bail!("ffmpeg produced an empty output file. The input may contain no audio");
        }

        info!(size = bytes.len(), "Audio extracted");

        Ok(AudioFile::mp3(bytes))
    }
}

/// Derives a completion percentage from ffmpeg's output.
///
/// The input duration comes from the `Duration:` diagnostics line, the
/// position from `-progress` key/value lines.
#[derive(Debug, Default)]
pub(crate) struct ProgressTracker {
    duration_us: Option<u64>,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    /// Feed a stderr line. Only the first input duration is kept.
    pub(crate) fn observe_diagnostics(&mut self, line: &str) {
        if self.duration_us.is_some() {
            return;
        }
        let Some(rest) = line.trim_start().strip_prefix("Duration:") else {
            return;
        };
        let timestamp = rest.split(',').next().unwrap_or_default().trim();
        self.duration_us = parse_timestamp_us(timestamp);
    }

    /// Feed a stdout progress line. Returns the percentage when it changed.
    pub(crate) fn observe_progress(&mut self, line: &str) -> Option<u8> {
        let (key, value) = line.trim().split_once('=')?;
        let percent = match key {
            // out_time_ms is reported in microseconds as well.
            "out_time_us" | "out_time_ms" => {
                let position: u64 = value.parse().ok()?;
                let duration = self.duration_us.filter(|d| *d > 0)?;
                (position.saturating_mul(100) / duration).min(100) as u8
            }
            "progress" if value == "end" => 100,
            _ => return None,
        };

        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);
        Some(percent)
    }
}

/// Parse `HH:MM:SS.fraction` into microseconds.
fn parse_timestamp_us(timestamp: &str) -> Option<u64> {
    let mut parts = timestamp.splitn(3, ':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let whole = (hours * 3600 + minutes * 60) * 1_000_000;
    Some(whole + (seconds * 1_000_000.0).round() as u64)
}

#[cfg(test)]
#[path = "transcode_test.rs"]
mod tests;
