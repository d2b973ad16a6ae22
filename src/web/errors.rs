// HTTP mapping of request failures

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::downloader::{DispatchError, NormalizationError};

/// Anything that stops a form submission from producing an artifact
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The form body could not be decoded (e.g. an unknown mode)
    #[error("Invalid form submission: {0}")]
    InvalidForm(String),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl SubmitError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidForm(_) | Self::Normalization(_) => StatusCode::BAD_REQUEST,
            // A missing binary is a problem with this server, not upstream
            Self::Dispatch(DispatchError::TranscodeToolMissing { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Dispatch(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// True when an unclassified extractor failure reports HTTP 403.
    pub fn is_forbidden(&self) -> bool {
        match self {
            Self::Dispatch(DispatchError::UnknownExtractionFailure(message)) => {
                message.contains("403") || message.to_lowercase().contains("forbidden")
            }
            _ => false,
        }
    }
}

/// Failures of the artifact download route
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("file not found")]
    NotFound,

    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ArtifactError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
