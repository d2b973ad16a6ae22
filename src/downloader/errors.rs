// Error types for normalization, dispatch and the extraction collaborator

use std::io;

use thiserror::Error;

use super::diagnostics::{diagnose, FailureKind};

/// Longest URL accepted by the normalizer, in characters.
pub const MAX_URL_LENGTH: usize = 2048;

/// Why a raw input could not be turned into a canonical video URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// Nothing was entered
    #[error("Enter a YouTube or Youku URL.")]
    Empty,

    /// Input is longer than any real video address
    #[error("URL is too long ({len} characters; the limit is {max}).")]
    TooLong { len: usize, max: usize },

    /// Input matches no known YouTube or Youku shape
    #[error("URL not recognized; check the format.")]
    UnrecognizedUrl,
}

/// Classified failure of a download job. Display output is shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Video is private, deleted or never existed
    #[error("Video not found: it may be private, deleted, or never existed.")]
    NotFound,

    /// The platform refuses to serve this video to our region
    #[error("This video is not available from the server's region.")]
    RegionRestricted,

    /// Transient connectivity failure
    #[error("Network error while contacting the video platform; try again later.")]
    NetworkError,

    /// A required external binary is not on the search path
    #[error("Required tool `{tool}` was not found on PATH.")]
    TranscodeToolMissing { tool: String },

    /// Anything else; the collaborator's message is passed through
    #[error("Download failed: {0}")]
    UnknownExtractionFailure(String),
}

impl DispatchError {
    /// Short machine-readable label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::RegionRestricted => "region_restricted",
            Self::NetworkError => "network_error",
            Self::TranscodeToolMissing { .. } => "transcode_tool_missing",
            Self::UnknownExtractionFailure(_) => "unknown_extraction_failure",
        }
    }

    /// Classify a raw collaborator message.
    pub fn from_message(message: &str) -> Self {
        match diagnose(message) {
            FailureKind::NotFound => Self::NotFound,
            FailureKind::RegionRestricted => Self::RegionRestricted,
            FailureKind::Network => Self::NetworkError,
            FailureKind::FfmpegMissing => Self::TranscodeToolMissing {
                tool: "ffmpeg".to_string(),
            },
            FailureKind::Unknown => Self::UnknownExtractionFailure(summarize(message)),
        }
    }
}

/// Failure reported by an extraction collaborator
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The collaborator's executable could not be started
    #[error("{tool} could not be started: executable not found")]
    ToolMissing { tool: String },

    /// The collaborator ran and reported a failure (stderr verbatim)
    #[error("{message}")]
    Failed { message: String },

    /// The collaborator exceeded its time budget and was killed
    #[error("timed out after {secs}s")]
    TimedOut { secs: u64 },

    #[error("I/O error while running the extractor: {0}")]
    Io(#[from] io::Error),
}

impl From<ExtractionError> for DispatchError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::ToolMissing { tool } => Self::TranscodeToolMissing { tool },
            ExtractionError::TimedOut { .. } => Self::NetworkError,
            ExtractionError::Failed { message } => Self::from_message(&message),
            ExtractionError::Io(e) => Self::UnknownExtractionFailure(e.to_string()),
        }
    }
}

/// Keep the most useful line of a collaborator's stderr.
fn summarize(message: &str) -> String {
    let lines: Vec<&str> = message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|line| line.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| "the extractor gave no details".to_string())
}
