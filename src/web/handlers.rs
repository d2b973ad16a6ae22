// Request handlers

use std::path::Path;

use axum::body::Body;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path as UrlPath, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use tokio_util::io::ReaderStream;
use tracing::info;
use uuid::Uuid;

use super::errors::{ArtifactError, SubmitError};
use super::page::{self, Hint, Outcome};
use super::router::AppState;
use crate::downloader::utils::is_partial_file;
use crate::downloader::{
    normalize, DispatchError, DownloadRequest, DownloadResult, Platform, ToolInfo,
};

pub async fn index() -> Html<String> {
    Html(page::index_page())
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn tools(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    Json(state.tools.get_all_tools().await)
}

/// Form submission: normalize, dispatch, render the outcome.
pub async fn submit_download(
    State(state): State<AppState>,
    form: Result<Form<DownloadRequest>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            let e = SubmitError::InvalidForm(rejection.body_text());
            info!("rejected form: {}", e);
            return failure_page(&DownloadRequest::default(), None, &e);
        }
    };

    let url = match normalize(&request.url) {
        Ok(url) => url,
        Err(inner) => {
            info!("rejected input: {}", inner);
            return failure_page(&request, None, &SubmitError::from(inner));
        }
    };

    let result = match state.dispatcher.dispatch(&url, request.mode).await {
        Ok(result) if result.is_success() && result.artifact.is_some() => result,
        Ok(result) => {
            let message = result
                .error_message
                .unwrap_or_else(|| "no artifact was produced".to_string());
            let e = SubmitError::from(DispatchError::UnknownExtractionFailure(message));
            return failure_page(&request, Some(url.platform), &e);
        }
        Err(e) => return failure_page(&request, Some(url.platform), &SubmitError::from(e)),
    };

    (
        StatusCode::OK,
        Html(page::render(
            &request.url,
            request.mode,
            Outcome::Finished {
                result: &result,
                platform: Some(url.platform),
                hints: &[],
            },
        )),
    )
}

fn failure_page(
    request: &DownloadRequest,
    platform: Option<Platform>,
    error: &SubmitError,
) -> (StatusCode, Html<String>) {
    let result = DownloadResult::failure(error.to_string());
    let hints = failure_hints(platform, error);
    (
        error.status(),
        Html(page::render(
            &request.url,
            request.mode,
            Outcome::Finished {
                result: &result,
                platform,
                hints: &hints,
            },
        )),
    )
}

fn failure_hints(platform: Option<Platform>, error: &SubmitError) -> Vec<Hint> {
    let mut hints = Vec::new();
    if error.is_forbidden() {
        hints.push(Hint::Forbidden);
    }
    if platform == Some(Platform::Youku) {
        hints.push(Hint::Youku);
    }
    hints
}

/// Stream a finished artifact back to the browser.
pub async fn download_artifact(
    State(state): State<AppState>,
    UrlPath((token, file_name)): UrlPath<(String, String)>,
) -> Result<Response, ArtifactError> {
    let token = Uuid::parse_str(&token).map_err(|_| ArtifactError::NotFound)?;
    if !is_bare_file_name(&file_name) {
        return Err(ArtifactError::NotFound);
    }

    let path = state.dispatcher.job_dir(token).join(&file_name);
    if is_partial_file(&path) {
        return Err(ArtifactError::NotFound);
    }

    let file = tokio::fs::File::open(&path).await?;
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(ArtifactError::NotFound);
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(content_type_for_filename(&file_name)),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(metadata.len()));
    if let Ok(value) = HeaderValue::from_str(&build_content_disposition(&file_name)) {
        headers.insert(CONTENT_DISPOSITION, value);
    }

    info!(job = %token, file = %file_name, "serving artifact");
    let body = Body::from_stream(ReaderStream::new(file));
    Ok((headers, body).into_response())
}

/// True if `name` is a single path component that cannot escape the job dir.
fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
        && Path::new(name).file_name().map_or(false, |n| n == name)
}

fn content_type_for_filename(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

fn build_content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitize_ascii_filename(filename),
        urlencoding::encode(filename)
    )
}

fn sanitize_ascii_filename(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let compact = sanitized.trim();
    if compact.is_empty() {
        "download".to_string()
    } else {
        compact.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_file_names() {
        assert!(is_bare_file_name("downloaded_file.mp3"));
        assert!(!is_bare_file_name(""));
        assert!(!is_bare_file_name(".."));
        assert!(!is_bare_file_name("../secret.mp3"));
        assert!(!is_bare_file_name("a/b.mp3"));
        assert!(!is_bare_file_name("a\\b.mp3"));
    }

    #[test]
    fn test_failure_hints() {
        let forbidden = SubmitError::from(DispatchError::UnknownExtractionFailure(
            "HTTP Error 403: Forbidden".to_string(),
        ));
        assert_eq!(
            failure_hints(Some(Platform::Youku), &forbidden),
            vec![Hint::Forbidden, Hint::Youku]
        );
        assert_eq!(
            failure_hints(Some(Platform::YouTube), &SubmitError::from(DispatchError::NotFound)),
            Vec::<Hint>::new()
        );
        assert_eq!(
            failure_hints(Some(Platform::Youku), &SubmitError::from(DispatchError::RegionRestricted)),
            vec![Hint::Youku]
        );
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type_for_filename("x.MP3"), "audio/mpeg");
        assert_eq!(content_type_for_filename("x.mp4"), "video/mp4");
        assert_eq!(content_type_for_filename("x"), "application/octet-stream");
    }

    #[test]
    fn test_content_disposition_keeps_unicode_in_extended_form() {
        let value = build_content_disposition("歌 1.mp3");
        assert!(value.starts_with("attachment; filename=\"_ 1.mp3\""));
        assert!(value.contains("filename*=UTF-8''%E6%AD%8C%201.mp3"));
    }
}
