// Router and shared state

use std::sync::Arc;
use std::time::Duration;

use axum::http::Request;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers;
use crate::downloader::{Dispatcher, ToolManager};

/// Immutable state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub tools: ToolManager,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, tools: ToolManager) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            tools,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                route = %request.uri().path(),
                status_code = tracing::field::Empty,
                latency_ms = tracing::field::Empty
            )
        })
        .on_response(|response: &Response, latency: Duration, span: &Span| {
            span.record("status_code", response.status().as_u16());
            span.record(
                "latency_ms",
                u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            );
            tracing::debug!(parent: span, "request finished");
        });

    Router::new()
        .route("/", get(handlers::index))
        .route("/download", post(handlers::submit_download))
        .route("/artifacts/{token}/{file}", get(handlers::download_artifact))
        .route("/api/health", get(handlers::health))
        .route("/api/tools", get(handlers::tools))
        .with_state(state)
        .layer(trace_layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::{ExtractionError, Extractor, Transcoder};
    use crate::downloader::models::ExtractOptions;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::StatusCode;
    use std::path::{Path, PathBuf};
    use tower::ServiceExt;

    enum Behavior {
        Write(&'static str),
        Fail(&'static str),
    }

    struct StubExtractor(Behavior);

    #[async_trait]
    impl Extractor for StubExtractor {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn extract(
            &self,
            _url: &str,
            options: &ExtractOptions,
        ) -> Result<PathBuf, ExtractionError> {
            match self.0 {
                Behavior::Write(name) => {
                    let path = options.output_dir.join(name);
                    tokio::fs::write(&path, b"ID3 fake audio").await?;
                    Ok(path)
                }
                Behavior::Fail(stderr) => Err(ExtractionError::Failed {
                    message: stderr.to_string(),
                }),
            }
        }
    }

    struct StubTranscoder(bool);

    impl Transcoder for StubTranscoder {
        fn name(&self) -> &'static str {
            "ffmpeg"
        }

        fn locate(&self) -> Option<PathBuf> {
            self.0.then(|| PathBuf::from("/usr/bin/ffmpeg"))
        }
    }

    fn app(behavior: Behavior, has_ffmpeg: bool, root: &Path) -> Router {
        let dispatcher = Dispatcher::new(
            Arc::new(StubExtractor(behavior)),
            Arc::new(StubTranscoder(has_ffmpeg)),
            root.to_path_buf(),
        );
        let tools = ToolManager::new(
            Some(root.join("missing-yt-dlp")),
            Some(root.join("missing-ffmpeg")),
        );
        build_router(AppState::new(dispatcher, tools))
    }

    fn form(url: &str, mode: &str) -> Request<Body> {
        let body = format!("url={}&mode={}", urlencoding::encode(url), mode);
        Request::builder()
            .method("POST")
            .uri("/download")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn artifact_href(html: &str) -> String {
        let start = html.find("/artifacts/").unwrap();
        let end = start + html[start..].find('"').unwrap();
        html[start..end].to_string()
    }

    #[tokio::test]
    async fn test_index_renders_form() {
        let root = tempfile::tempdir().unwrap();
        let response = app(Behavior::Write("downloaded_file.mp3"), true, root.path())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("name=\"url\""));
    }

    #[tokio::test]
    async fn test_audio_download_links_artifact() {
        let root = tempfile::tempdir().unwrap();
        let app = app(Behavior::Write("downloaded_file.mp3"), true, root.path());

        let response = app
            .clone()
            .oneshot(form("https://youtu.be/abc123", "audio"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("artifact-link"));

        let href = artifact_href(&html);
        assert!(href.ends_with("/downloaded_file.mp3"));

        let response = app
            .oneshot(Request::get(href.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "audio/mpeg");
        assert!(response.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .starts_with("attachment;"));
        assert_eq!(body_text(response).await, "ID3 fake audio");
    }

    #[tokio::test]
    async fn test_unrecognized_url_shows_message_without_link() {
        let root = tempfile::tempdir().unwrap();
        let response = app(Behavior::Write("downloaded_file.mp3"), true, root.path())
            .oneshot(form("not a url", "video"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("URL not recognized; check the format."));
        assert!(!html.contains("artifact-link"));
    }

    #[tokio::test]
    async fn test_not_found_shows_message_without_link() {
        let root = tempfile::tempdir().unwrap();
        let response = app(
            Behavior::Fail("ERROR: [youtube] abc123: Private video. Sign in if you've been granted access"),
            true,
            root.path(),
        )
        .oneshot(form("https://youtu.be/abc123", "audio"))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = body_text(response).await;
        assert!(html.contains("Video not found"));
        assert!(!html.contains("/artifacts/"));
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_server_error() {
        let root = tempfile::tempdir().unwrap();
        let response = app(Behavior::Write("downloaded_file.mp3"), false, root.path())
            .oneshot(form("https://youtu.be/abc123", "audio"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("ffmpeg"));
    }

    #[tokio::test]
    async fn test_youku_failure_adds_platform_note() {
        let root = tempfile::tempdir().unwrap();
        let response = app(
            Behavior::Fail("ERROR: [youku] XNDU1NjAxMzQ4: Youku said: Sorry, this video is available in China only"),
            true,
            root.path(),
        )
        .oneshot(form("https://v.youku.com/v_show/id_XNDU1NjAxMzQ4.html", "video"))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = body_text(response).await;
        assert!(html.contains("not available from the server&#39;s region"));
        assert!(html.contains("Downloading from Youku:"));
        assert!(html.contains("mainland China"));
        assert!(!html.contains("HTTP 403 Forbidden"));
        assert!(!html.contains("/artifacts/"));
    }

    #[tokio::test]
    async fn test_forbidden_failure_adds_recovery_steps() {
        let root = tempfile::tempdir().unwrap();
        let response = app(
            Behavior::Fail("ERROR: unable to download video data: HTTP Error 403: Forbidden"),
            true,
            root.path(),
        )
        .oneshot(form("https://youtu.be/abc123", "audio"))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = body_text(response).await;
        assert!(html.contains("HTTP Error 403: Forbidden"));
        assert!(html.contains("The platform answered HTTP 403 Forbidden."));
        assert!(html.contains("Update yt-dlp"));
        assert!(html.contains("--cookies-from-browser"));
        assert!(html.contains("--clear-cache"));
        assert!(!html.contains("Downloading from Youku:"));
    }

    #[tokio::test]
    async fn test_unknown_mode_renders_form_error() {
        let root = tempfile::tempdir().unwrap();
        let response = app(Behavior::Write("downloaded_file.mp3"), true, root.path())
            .oneshot(form("https://youtu.be/abc123", "AUDIO"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let html = body_text(response).await;
        assert!(html.contains("Invalid form submission"));
        assert!(html.contains(r#"action="/download""#));
        assert!(!html.contains("artifact-link"));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_artifact_route_rejects_bad_paths() {
        let root = tempfile::tempdir().unwrap();
        let app = app(Behavior::Write("downloaded_file.mp3"), true, root.path());

        for uri in [
            "/artifacts/not-a-uuid/downloaded_file.mp3",
            "/artifacts/00000000-0000-0000-0000-000000000000/downloaded_file.mp3",
            "/artifacts/00000000-0000-0000-0000-000000000000/..%2Fsecret",
        ] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_health_and_tools() {
        let root = tempfile::tempdir().unwrap();
        let app = app(Behavior::Write("downloaded_file.mp3"), true, root.path());

        let response = app
            .clone()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_text(response).await, r#"{"status":"ok"}"#);

        let response = app
            .oneshot(Request::get("/api/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let tools: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(tools[0]["name"], "yt-dlp");
        assert_eq!(tools[1]["is_available"], false);
    }
}
