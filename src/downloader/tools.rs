// External tool discovery (yt-dlp, ffmpeg)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

/// Locates the external binaries the downloader depends on.
///
/// An explicit override (from the command line) wins when it points at an
/// existing file or names a binary found on `PATH`; otherwise the default
/// binary name is looked up on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    ytdlp_override: Option<PathBuf>,
    ffmpeg_override: Option<PathBuf>,
}

impl ToolManager {
    pub fn new(ytdlp_override: Option<PathBuf>, ffmpeg_override: Option<PathBuf>) -> Self {
        Self {
            ytdlp_override,
            ffmpeg_override,
        }
    }

    /// Resolve a tool to an executable path, if it can be found.
    pub fn locate(&self, tool_type: ToolType) -> Option<PathBuf> {
        let requested = match tool_type {
            ToolType::YtDlp => self.ytdlp_override.as_deref(),
            ToolType::Ffmpeg => self.ffmpeg_override.as_deref(),
        };

        match requested {
            Some(path) => resolve_program(path),
            None => find_in_path(tool_type.as_str()),
        }
    }

    pub async fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.locate(tool_type);
        let version = match &path {
            Some(p) => get_version(p, tool_type).await,
            None => None,
        };

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            is_available: path.is_some(),
            path: path.map(|p| p.to_string_lossy().to_string()),
        }
    }

    pub async fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp).await,
            self.get_tool_info(ToolType::Ffmpeg).await,
        ]
    }
}

/// Resolve a user-supplied program: a path must point at an executable,
/// a bare name is searched on `PATH`.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    which::which(program).ok()
}

pub fn find_in_path(binary_name: &str) -> Option<PathBuf> {
    which::which(binary_name).ok()
}

async fn get_version(path: &Path, tool_type: ToolType) -> Option<String> {
    let output = timeout(
        VERSION_TIMEOUT,
        Command::new(path).arg(tool_type.version_arg()).output(),
    )
    .await
    .ok()?
    .ok()?;

    if !output.status.success() {
        debug!(tool = tool_type.as_str(), "version probe exited with {}", output.status);
        return None;
    }

    // ffmpeg prints a long banner; the first line carries the version
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::write(path, "#!/bin/sh\necho 1.0\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_program_skips_non_executables() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("ffmpeg");
        fs::write(&plain, "not executable").unwrap();
        assert_eq!(resolve_program(&plain), None);

        let runnable = dir.path().join("yt-dlp");
        make_executable(&runnable);
        assert!(resolve_program(&runnable).is_some());
    }

    #[test]
    fn test_find_in_path_missing() {
        assert_eq!(find_in_path("video-downloader-no-such-tool"), None);
    }

    #[test]
    fn test_resolve_program_with_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_program(&dir.path().join("nope")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_override_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = dir.path().join("ffmpeg");
        make_executable(&ffmpeg);

        let manager = ToolManager::new(None, Some(ffmpeg.clone()));
        let located = manager.locate(ToolType::Ffmpeg).unwrap();
        assert_eq!(located.file_name(), ffmpeg.file_name());
    }

    #[tokio::test]
    async fn test_missing_override_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ToolManager::new(Some(dir.path().join("yt-dlp")), None);
        assert_eq!(manager.locate(ToolType::YtDlp), None);

        let info = manager.get_tool_info(ToolType::YtDlp).await;
        assert!(!info.is_available);
        assert_eq!(info.name, "yt-dlp");
        assert!(info.version.is_none());
    }
}
