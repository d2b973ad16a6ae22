// Helper functions for backends and the dispatcher

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::errors::ExtractionError;

/// Suffixes yt-dlp uses for unfinished downloads
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp", ".tmp"];

/// Collected result of a finished child process
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout_lines: Vec<String>,
    pub stderr: String,
}

/// Run a command with a timeout, handing every stdout line to `on_line`
/// as it arrives. The child is killed if the timeout expires or the
/// returned future is dropped.
pub async fn run_streaming<F>(
    program: &Path,
    args: &[String],
    timeout_secs: u64,
    mut on_line: F,
) -> Result<ProcessOutput, ExtractionError>
where
    F: FnMut(&str),
{
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ExtractionError::ToolMissing {
                tool: program_name(program),
            },
            _ => ExtractionError::Io(e),
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout was not captured"))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stderr was not captured"))?;

    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let run = async {
        let mut lines = BufReader::new(stdout).lines();
        let mut collected = Vec::new();
        while let Some(line) = lines.next_line().await? {
            on_line(&line);
            collected.push(line);
        }
        let status = child.wait().await?;
        Ok::<_, io::Error>((status, collected))
    };
    let waited = timeout(Duration::from_secs(timeout_secs), run).await;

    match waited {
        Ok(result) => {
            let (status, stdout_lines) = result?;
            let stderr = stderr_task
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
            Ok(ProcessOutput {
                status,
                stdout_lines,
                stderr: String::from_utf8_lossy(&stderr).to_string(),
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stderr_task.abort();
            Err(ExtractionError::TimedOut { secs: timeout_secs })
        }
    }
}

fn program_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}

/// True for files yt-dlp leaves behind while a download is in flight.
pub fn is_partial_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Find the finished file with the given extension inside `dir`.
pub async fn find_finished_file(dir: &Path, extension: &str) -> io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches_ext = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(extension));
        if matches_ext && !is_partial_file(&path) && entry.file_type().await?.is_file() {
            found.push(path);
        }
    }

    found.sort();
    Ok(found.into_iter().next())
}

/// Remove a job directory and everything in it.
pub async fn remove_job_dir(job_dir: &Path) {
    if let Err(error) = tokio::fs::remove_dir_all(job_dir).await {
        if error.kind() != io::ErrorKind::NotFound {
            warn!(dir = %job_dir.display(), "could not remove job directory: {}", error);
        }
    }
}

/// Remove a job directory once `retention` has passed.
pub fn schedule_removal(job_dir: PathBuf, retention: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(retention).await;
        debug!(dir = %job_dir.display(), "artifact retention expired");
        remove_job_dir(&job_dir).await;
    });
}

/// Removes a job directory when dropped, unless disarmed first. Covers
/// dispatch futures that are dropped before they finish.
pub struct JobDirGuard {
    dir: Option<PathBuf>,
}

impl JobDirGuard {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    /// The job finished; its directory is now someone else's concern.
    pub fn disarm(mut self) {
        self.dir = None;
    }
}

impl Drop for JobDirGuard {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        info!(dir = %dir.display(), "job abandoned; removing its directory");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { remove_job_dir(&dir).await });
            }
            Err(_) => {
                if let Err(error) = std::fs::remove_dir_all(&dir) {
                    warn!(dir = %dir.display(), "could not remove job directory: {}", error);
                }
            }
        }
    }
}

/// Delete job directories under `root` last modified more than
/// `older_than` ago. Returns how many were removed.
pub async fn sweep_stale_jobs(root: &Path, older_than: Duration) -> usize {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(error) => {
            if error.kind() != io::ErrorKind::NotFound {
                warn!(dir = %root.display(), "could not scan output directory: {}", error);
            }
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }
        // Only our own job directories (named by UUID) are touched
        let is_job_dir = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| uuid::Uuid::parse_str(n).is_ok());
        if !is_job_dir {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age >= older_than {
            remove_job_dir(&path).await;
            removed += 1;
        }
    }

    if removed > 0 {
        info!(count = removed, "removed stale job directories");
    }
    removed
}
