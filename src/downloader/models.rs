// Common data models for downloader

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Video platforms the normalizer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Youku,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Youku => "youku",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A video address in the single form accepted by the extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedUrl {
    pub platform: Platform,
    pub canonical_url: String,
}

/// What the user wants out of the video
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Best audio stream, transcoded to MP3 at 192 kbps
    #[default]
    Audio,
    /// Best video with its audio, muxed into MP4
    Video,
}

impl Mode {
    /// Container extension of the artifact produced for this mode.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Audio => "mp3",
            Self::Video => "mp4",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Audio => "Audio only (MP3)",
            Self::Video => "Video (MP4)",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// One form submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub mode: Mode,
}

/// Network and cookie knobs passed through to the extractor
#[derive(Debug, Clone, Default)]
pub struct NetworkConfig {
    /// Proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Browser whose cookies yt-dlp should load (e.g., "firefox")
    pub cookies_from_browser: Option<String>,

    /// Wipe the yt-dlp cache before each run
    pub clear_cache: bool,
}

/// Everything one extractor run needs to know
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub mode: Mode,
    /// Request-scoped directory the artifact must be written into
    pub output_dir: PathBuf,
    /// Resolved ffmpeg binary handed to the extractor for post-processing
    pub ffmpeg_location: PathBuf,
    pub network: NetworkConfig,
    /// Correlates log lines of one job
    pub job_token: Uuid,
}

/// A finished output file for a single request
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub token: Uuid,
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub size_bytes: u64,
    pub mode: Mode,
}

impl Artifact {
    /// Relative link under which the web layer serves this artifact.
    pub fn href(&self) -> String {
        format!(
            "/artifacts/{}/{}",
            self.token,
            urlencoding::encode(&self.file_name)
        )
    }

    pub fn size_label(&self) -> String {
        let mb = self.size_bytes as f64 / 1_048_576.0;
        if mb >= 1024.0 {
            format!("{:.2} GB", mb / 1024.0)
        } else {
            format!("{:.2} MB", mb)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Success,
    Failure,
}

/// Outcome of one request as seen by the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub status: DownloadStatus,
    pub artifact: Option<Artifact>,
    pub error_message: Option<String>,
}

impl DownloadResult {
    pub fn success(artifact: Artifact) -> Self {
        Self {
            status: DownloadStatus::Success,
            artifact: Some(artifact),
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: DownloadStatus::Failure,
            artifact: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DownloadStatus::Success
    }
}

/// Progress line parsed from the extractor's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub percent: f32,
    pub status: String,
}
