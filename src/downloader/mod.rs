// Downloader module - URL normalization, job dispatch and the yt-dlp/ffmpeg collaborators

pub mod backends;
pub mod diagnostics;
pub mod dispatcher;
pub mod errors;
pub mod models;
pub mod normalizer;
pub mod progress;
pub mod tools;
pub mod traits;
pub mod utils;

pub use dispatcher::Dispatcher;
pub use errors::{DispatchError, ExtractionError, NormalizationError};
pub use models::{
    Artifact, DownloadProgress, DownloadRequest, DownloadResult, Mode, NetworkConfig,
    NormalizedUrl, Platform,
};
pub use normalizer::normalize;
pub use tools::{ToolInfo, ToolManager, ToolType};
pub use traits::{Extractor, Transcoder};
