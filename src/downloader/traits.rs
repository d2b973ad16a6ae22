// Collaborator traits for the dispatcher

use std::path::PathBuf;

use async_trait::async_trait;

use super::errors::ExtractionError;
use super::models::ExtractOptions;

/// Locates and retrieves media for a canonical URL.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Download `url` into `options.output_dir` and return the produced file.
    async fn extract(&self, url: &str, options: &ExtractOptions)
        -> Result<PathBuf, ExtractionError>;
}

/// Converts and muxes raw streams; the dispatcher only needs to find it.
pub trait Transcoder: Send + Sync {
    /// Name of the binary (for error messages)
    fn name(&self) -> &'static str;

    /// Path of the transcoding binary, or `None` if it is not installed.
    fn locate(&self) -> Option<PathBuf>;
}
