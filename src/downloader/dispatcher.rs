// Download job dispatcher
//
// One call is one job: a fresh directory named by the job token, one
// extractor run, and at most one artifact handed back.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use super::errors::DispatchError;
use super::models::{Artifact, DownloadResult, ExtractOptions, Mode, NetworkConfig, NormalizedUrl};
use super::traits::{Extractor, Transcoder};
use super::utils::{
    find_finished_file, is_partial_file, remove_job_dir, schedule_removal, JobDirGuard,
};

pub struct Dispatcher {
    extractor: Arc<dyn Extractor>,
    transcoder: Arc<dyn Transcoder>,
    output_root: PathBuf,
    network: NetworkConfig,
    retention: Option<Duration>,
}

impl Dispatcher {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        transcoder: Arc<dyn Transcoder>,
        output_root: PathBuf,
    ) -> Self {
        Self {
            extractor,
            transcoder,
            output_root,
            network: NetworkConfig::default(),
            retention: None,
        }
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Delete each successful job's directory after `retention`.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }

    /// Directory holding the artifact of job `token`.
    pub fn job_dir(&self, token: Uuid) -> PathBuf {
        self.output_root.join(token.to_string())
    }

    /// Run one download job.
    pub async fn dispatch(
        &self,
        url: &NormalizedUrl,
        mode: Mode,
    ) -> Result<DownloadResult, DispatchError> {
        // Fail fast before touching the network or the disk
        let ffmpeg = self
            .transcoder
            .locate()
            .ok_or_else(|| DispatchError::TranscodeToolMissing {
                tool: self.transcoder.name().to_string(),
            })?;

        let token = Uuid::new_v4();
        let job_dir = self.job_dir(token);
        tokio::fs::create_dir_all(&job_dir).await.map_err(|e| {
            DispatchError::UnknownExtractionFailure(format!(
                "could not create output directory: {}",
                e
            ))
        })?;
        let guard = JobDirGuard::new(job_dir.clone());

        info!(
            job = %token,
            platform = %url.platform,
            mode = %mode,
            "dispatching {}",
            url.canonical_url
        );

        let options = ExtractOptions {
            mode,
            output_dir: job_dir.clone(),
            ffmpeg_location: ffmpeg,
            network: self.network.clone(),
            job_token: token,
        };

        let outcome = match self.extractor.extract(&url.canonical_url, &options).await {
            Ok(reported) => match resolve_artifact(&job_dir, &reported, mode).await {
                Ok(path) => build_artifact(token, path, mode).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(DispatchError::from(e)),
        };

        match outcome {
            Ok(artifact) => {
                info!(
                    job = %token,
                    file = %artifact.file_name,
                    size = artifact.size_bytes,
                    "download finished"
                );
                guard.disarm();
                if let Some(retention) = self.retention {
                    schedule_removal(job_dir, retention);
                }
                Ok(DownloadResult::success(artifact))
            }
            Err(e) => {
                warn!(job = %token, kind = e.kind(), "download failed: {}", e);
                remove_job_dir(&job_dir).await;
                guard.disarm();
                Err(e)
            }
        }
    }
}

/// Accept the extractor's reported file only if it is a finished file with
/// the mode's extension inside `job_dir`; otherwise scan the directory.
async fn resolve_artifact(
    job_dir: &Path,
    reported: &Path,
    mode: Mode,
) -> Result<PathBuf, DispatchError> {
    let extension = mode.extension();
    let root = tokio::fs::canonicalize(job_dir)
        .await
        .map_err(|e| DispatchError::UnknownExtractionFailure(e.to_string()))?;

    if let Ok(candidate) = tokio::fs::canonicalize(reported).await {
        let has_extension = candidate
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(extension));
        if candidate.starts_with(&root)
            && candidate.is_file()
            && has_extension
            && !is_partial_file(&candidate)
        {
            return Ok(candidate);
        }
        warn!(
            reported = %reported.display(),
            "extractor reported an unusable file; scanning the job directory"
        );
    }

    find_finished_file(&root, extension)
        .await
        .map_err(|e| DispatchError::UnknownExtractionFailure(e.to_string()))?
        .ok_or_else(|| {
            DispatchError::UnknownExtractionFailure(format!(
                "no finished .{} file was produced",
                extension
            ))
        })
}

async fn build_artifact(token: Uuid, path: PathBuf, mode: Mode) -> Result<Artifact, DispatchError> {
    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| DispatchError::UnknownExtractionFailure(e.to_string()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("download.{}", mode.extension()));

    Ok(Artifact {
        token,
        file_name,
        path,
        size_bytes: metadata.len(),
        mode,
    })
}
