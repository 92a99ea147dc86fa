//! Files flowing through the form: the selected video, its preview and the
//! extracted audio.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;
use uuid::Uuid;

/// A video picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    path: PathBuf,
    name: String,
    size_bytes: u64,
}

impl VideoFile {
    /// Open a handle to a video on disk.
    ///
    /// The path is made absolute and must point at a regular file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve video path: {}", path.display()))?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("Failed to read video file: {}", path.display()))?;
        if !metadata.is_file() {
            bail!("Not a regular file: {}", path.display());
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let video = Self {
            path,
            name,
            size_bytes: metadata.len(),
        };
        if !video.is_mp4() {
            warn!(path = %video.path.display(), "Selected file is not an .mp4 video");
        }
        Ok(video)
    }

    /// Whether the file carries the `.mp4` extension the form asks for.
    pub fn is_mp4(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Temporary local reference to the selected video.
///
/// Every selection gets a fresh token, so re-selecting the same file still
/// produces a distinct preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    url: Url,
    token: Uuid,
}

impl Preview {
    pub fn for_video(video: &VideoFile) -> Result<Self> {
        let url = Url::from_file_path(video.path()).map_err(|()| {
            anyhow::anyhow!("Cannot build preview URL for {}", video.path().display())
        })?;
        Ok(Self {
            url,
            token: Uuid::new_v4(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn token(&self) -> Uuid {
        self.token
    }
}

pub const AUDIO_FILE_NAME: &str = "audio.mp3";
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Audio extracted from a video, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioFile {
    /// Wrap MP3 bytes under the name and type the backend expects.
    pub fn mp3(bytes: Vec<u8>) -> Self {
        Self {
            file_name: AUDIO_FILE_NAME.to_string(),
            mime_type: AUDIO_MIME_TYPE.to_string(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_video_reads_metadata() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("talk.mp4");
        std::fs::write(&path, b"not really a video").unwrap();

        let video = VideoFile::open(&path).await.unwrap();

        assert_eq!(video.name(), "talk.mp4");
        assert_eq!(video.size_bytes(), 18);
        assert!(video.path().is_absolute());
        assert!(video.is_mp4());
    }

    #[tokio::test]
    async fn test_other_extensions_are_accepted_but_not_mp4() {
        let temp = TempDir::new().unwrap();
        let upper = temp.path().join("TALK.MP4");
        let mkv = temp.path().join("talk.mkv");
        std::fs::write(&upper, b"x").unwrap();
        std::fs::write(&mkv, b"x").unwrap();

        assert!(VideoFile::open(&upper).await.unwrap().is_mp4());
        let other = VideoFile::open(&mkv).await.unwrap();
        assert!(!other.is_mp4());
        assert_eq!(other.name(), "talk.mkv");
    }

    #[tokio::test]
    async fn test_open_missing_video_fails() {
        let temp = TempDir::new().unwrap();
        let result = VideoFile::open(temp.path().join("missing.mp4")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_open_directory_fails() {
        let temp = TempDir::new().unwrap();
        let err = VideoFile::open(temp.path()).await.unwrap_err();
        assert!(err.to_string().contains("Not a regular file"));
    }

    #[tokio::test]
    async fn test_preview_is_file_url_with_fresh_token() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();
        let video = VideoFile::open(&path).await.unwrap();

        let first = Preview::for_video(&video).unwrap();
        let second = Preview::for_video(&video).unwrap();

        assert_eq!(first.url().scheme(), "file");
        assert!(first.url().path().ends_with("clip.mp4"));
        assert_eq!(first.url(), second.url());
        assert_ne!(first.token(), second.token());
        assert_ne!(first, second);
    }

    #[test]
    fn test_mp3_audio_file() {
        let audio = AudioFile::mp3(vec![1, 2, 3]);
        assert_eq!(audio.file_name, "audio.mp3");
        assert_eq!(audio.mime_type, "audio/mpeg");
        assert_eq!(audio.len(), 3);
        assert!(!audio.is_empty());
    }
}
