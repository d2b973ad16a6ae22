// yt-dlp extractor - runs the native binary or `python -m yt_dlp`
//
// Both invocations accept the same options; the Python module form is useful
// where yt-dlp is installed with pip and no launcher script is on PATH.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::downloader::errors::ExtractionError;
use crate::downloader::models::{ExtractOptions, Mode};
use crate::downloader::progress::ProgressEmitter;
use crate::downloader::traits::Extractor;
use crate::downloader::utils::{find_finished_file, run_streaming};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const OUTPUT_TEMPLATE: &str = "downloaded_file.%(ext)s";
const CACHE_CLEAR_TIMEOUT_SECS: u64 = 60;

/// How yt-dlp is started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Native `yt-dlp` executable
    Binary(PathBuf),
    /// `<interpreter> -m yt_dlp`
    PythonModule(PathBuf),
}

pub struct YtDlpExtractor {
    invocation: Invocation,
    timeout_secs: u64,
}

impl YtDlpExtractor {
    pub fn new(invocation: Invocation, timeout_secs: u64) -> Self {
        Self {
            invocation,
            timeout_secs,
        }
    }

    fn program(&self) -> &Path {
        match &self.invocation {
            Invocation::Binary(path) | Invocation::PythonModule(path) => path,
        }
    }

    /// Arguments placed before yt-dlp's own options
    fn prefix_args(&self) -> Vec<String> {
        match self.invocation {
            Invocation::Binary(_) => Vec::new(),
            Invocation::PythonModule(_) => vec!["-m".to_string(), "yt_dlp".to_string()],
        }
    }

    /// Build the full argument list for one download.
    pub fn build_args(&self, url: &str, options: &ExtractOptions) -> Vec<String> {
        let mut args = self.prefix_args();

        args.extend(
            [
                "--no-playlist",
                "--newline",
                "--progress",
                "--extractor-retries",
                "5",
                "--fragment-retries",
                "5",
                "--sleep-interval",
                "2",
                "--max-sleep-interval",
                "5",
                "--user-agent",
                USER_AGENT,
                "--add-header",
                "Accept-Language:en-US,en;q=0.5",
                "--geo-bypass-country",
                "US",
                "--no-check-certificates",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        args.push("--ffmpeg-location".to_string());
        args.push(options.ffmpeg_location.to_string_lossy().to_string());
        args.push("-P".to_string());
        args.push(options.output_dir.to_string_lossy().to_string());
        args.push("-o".to_string());
        args.push(OUTPUT_TEMPLATE.to_string());
        args.push("--print".to_string());
        args.push("after_move:filepath".to_string());

        match options.mode {
            Mode::Audio => args.extend(
                [
                    "-f",
                    "bestaudio/best",
                    "-x",
                    "--audio-format",
                    "mp3",
                    "--audio-quality",
                    "192K",
                ]
                .iter()
                .map(|s| s.to_string()),
            ),
            Mode::Video => args.extend(
                [
                    "-f",
                    "bv*+ba/best[ext=mp4]/best",
                    "--merge-output-format",
                    "mp4",
                    "--remux-video",
                    "mp4",
                ]
                .iter()
                .map(|s| s.to_string()),
            ),
        }

        if let Some(proxy) = &options.network.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        if let Some(browser) = &options.network.cookies_from_browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.clone());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Remove yt-dlp's filesystem cache. Failures are only logged.
    async fn clear_cache(&self) {
        let mut args = self.prefix_args();
        args.push("--rm-cache-dir".to_string());

        match run_streaming(self.program(), &args, CACHE_CLEAR_TIMEOUT_SECS, |line| {
            debug!("[yt-dlp] {}", line)
        })
        .await
        {
            Ok(out) if out.status.success() => info!("yt-dlp cache cleared"),
            Ok(out) => warn!("yt-dlp cache clear failed: {}", out.stderr.trim()),
            Err(e) => warn!("yt-dlp cache clear failed: {}", e),
        }
    }
}

/// The path printed by `--print after_move:filepath` is the last stdout
/// line that is not yt-dlp's own bracketed status output.
fn printed_path(stdout_lines: &[String]) -> Option<PathBuf> {
    stdout_lines
        .iter()
        .rev()
        .map(|line| line.trim())
        .find(|line| !line.is_empty() && !line.starts_with('['))
        .map(PathBuf::from)
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        match self.invocation {
            Invocation::Binary(_) => "yt-dlp",
            Invocation::PythonModule(_) => "python-yt-dlp",
        }
    }

    async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<PathBuf, ExtractionError> {
        if options.network.clear_cache {
            self.clear_cache().await;
        }

        let args = self.build_args(url, options);
        info!(
            job = %options.job_token,
            extractor = self.name(),
            mode = %options.mode,
            "starting extraction of {}",
            url
        );
        debug!("{} {}", self.program().display(), args.join(" "));

        let mut emitter = ProgressEmitter::new(options.job_token);
        let output = run_streaming(self.program(), &args, self.timeout_secs, |line| {
            emitter.observe(line);
        })
        .await?;

        if !output.status.success() {
            let message = if output.stderr.trim().is_empty() {
                output.stdout_lines.join("\n")
            } else {
                output.stderr
            };
            return Err(ExtractionError::Failed { message });
        }

        if let Some(path) = printed_path(&output.stdout_lines) {
            return Ok(path);
        }

        find_finished_file(&options.output_dir, options.mode.extension())
            .await?
            .ok_or_else(|| ExtractionError::Failed {
                message: "yt-dlp finished without producing a file".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::NetworkConfig;
    use uuid::Uuid;

    fn options(mode: Mode, network: NetworkConfig) -> ExtractOptions {
        ExtractOptions {
            mode,
            output_dir: PathBuf::from("/tmp/jobs/1"),
            ffmpeg_location: PathBuf::from("/usr/bin/ffmpeg"),
            network,
            job_token: Uuid::nil(),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_audio_args() {
        let extractor = YtDlpExtractor::new(Invocation::Binary(PathBuf::from("yt-dlp")), 60);
        let args = extractor.build_args(
            "https://youtu.be/abc123",
            &options(Mode::Audio, NetworkConfig::default()),
        );

        assert_eq!(value_after(&args, "-f"), Some("bestaudio/best"));
        assert!(args.contains(&"-x".to_string()));
        assert_eq!(value_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("192K"));
        assert_eq!(value_after(&args, "--ffmpeg-location"), Some("/usr/bin/ffmpeg"));
        assert_eq!(value_after(&args, "-P"), Some("/tmp/jobs/1"));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc123"));
        assert!(!args.contains(&"--proxy".to_string()));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn test_video_args() {
        let extractor = YtDlpExtractor::new(Invocation::Binary(PathBuf::from("yt-dlp")), 60);
        let args = extractor.build_args(
            "https://v.youku.com/v_show/id_XNDU1NjAxMzQ4.html",
            &options(Mode::Video, NetworkConfig::default()),
        );

        assert_eq!(value_after(&args, "--merge-output-format"), Some("mp4"));
        assert_eq!(value_after(&args, "--remux-video"), Some("mp4"));
        assert!(!args.contains(&"-x".to_string()));
    }

    #[test]
    fn test_network_args() {
        let extractor = YtDlpExtractor::new(Invocation::Binary(PathBuf::from("yt-dlp")), 60);
        let network = NetworkConfig {
            proxy: Some("socks5://127.0.0.1:1080".to_string()),
            cookies_from_browser: Some("firefox".to_string()),
            clear_cache: false,
        };
        let args = extractor.build_args("https://youtu.be/abc123", &options(Mode::Audio, network));

        assert_eq!(value_after(&args, "--proxy"), Some("socks5://127.0.0.1:1080"));
        assert_eq!(value_after(&args, "--cookies-from-browser"), Some("firefox"));
    }

    #[test]
    fn test_python_module_prefix() {
        let extractor =
            YtDlpExtractor::new(Invocation::PythonModule(PathBuf::from("python3")), 60);
        let args = extractor.build_args(
            "https://youtu.be/abc123",
            &options(Mode::Audio, NetworkConfig::default()),
        );

        assert_eq!(&args[..2], &["-m".to_string(), "yt_dlp".to_string()]);
        assert_eq!(extractor.name(), "python-yt-dlp");
        assert_eq!(extractor.program(), Path::new("python3"));
    }

    #[test]
    fn test_printed_path_skips_status_lines() {
        let lines = vec![
            "[youtube] abc123: Downloading webpage".to_string(),
            "[download] 100% of 3.27MiB".to_string(),
            "/tmp/jobs/1/downloaded_file.mp3".to_string(),
            "".to_string(),
        ];
        assert_eq!(
            printed_path(&lines),
            Some(PathBuf::from("/tmp/jobs/1/downloaded_file.mp3"))
        );
        assert_eq!(printed_path(&["[download] 5%".to_string()]), None);
    }

    #[tokio::test]
    async fn test_missing_binary_reports_tool_missing() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = YtDlpExtractor::new(
            Invocation::Binary(PathBuf::from("definitely-not-yt-dlp-xyz")),
            5,
        );
        let mut opts = options(Mode::Audio, NetworkConfig::default());
        opts.output_dir = dir.path().to_path_buf();

        let result = extractor.extract("https://youtu.be/abc123", &opts).await;
        assert!(matches!(result, Err(ExtractionError::ToolMissing { .. })));
    }
}
