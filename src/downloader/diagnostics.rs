// Failure diagnostics - maps yt-dlp / ffmpeg error text onto failure kinds
//
// Patterns are checked from most to least specific. A message that mentions
// both a removed video and a timeout is reported as not found, since retrying
// the network cannot bring a deleted video back.

use serde::Serialize;

/// Broad failure categories recognised in collaborator output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Private, deleted, removed or nonexistent video
    NotFound,
    /// Geographic restriction
    RegionRestricted,
    /// Timeouts, DNS failures, refused or reset connections, 5xx
    Network,
    /// Post-processing needs ffmpeg/ffprobe and they are absent
    FfmpegMissing,
    Unknown,
}

const FFMPEG_PATTERNS: &[&str] = &[
    "ffmpeg not found",
    "ffprobe and ffmpeg not found",
    "ffmpeg is not installed",
    "ffprobe not found",
];

const NOT_FOUND_PATTERNS: &[&str] = &[
    "private video",
    "video is private",
    "video unavailable",
    "video is unavailable",
    "video has been removed",
    "this video is no longer available",
    "has been deleted",
    "does not exist",
    "http error 404",
    "404: not found",
    "该视频已经不存在",
    "视频不存在",
];

const REGION_PATTERNS: &[&str] = &[
    "available in your country",
    "blocked in your country",
    "available in your region",
    "from your location",
    "geo restrict",
    "geo-restrict",
    "geographic restriction",
    "available in china only",
    "mainland china",
    "此视频暂无版权",
    "因版权原因无法观看",
];

const NETWORK_PATTERNS: &[&str] = &[
    "timed out",
    "timeout",
    "connection refused",
    "connection reset",
    "network is unreachable",
    "network unreachable",
    "name or service not known",
    "temporary failure in name resolution",
    "failed to resolve",
    "getaddrinfo failed",
    "unable to download webpage",
    "remote end closed connection",
    "http error 500",
    "http error 502",
    "http error 503",
    "http error 504",
];

/// Analyze a collaborator message and return its failure kind
pub fn diagnose(message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

    if matches(FFMPEG_PATTERNS) {
        return FailureKind::FfmpegMissing;
    }
    if matches(NOT_FOUND_PATTERNS) {
        return FailureKind::NotFound;
    }
    if matches(REGION_PATTERNS) {
        return FailureKind::RegionRestricted;
    }
    if matches(NETWORK_PATTERNS) {
        return FailureKind::Network;
    }
    FailureKind::Unknown
}
