// Command line and environment configuration

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::downloader::NetworkConfig;

pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_TIMEOUT_SECS: u64 = 900;
pub const DEFAULT_RETENTION_SECS: u64 = 1800;

const PROXY_SCHEMES: &[&str] = &["http", "https", "socks4", "socks4a", "socks5", "socks5h"];

/// Browsers yt-dlp can read cookies from
const COOKIE_BROWSERS: &[&str] = &[
    "brave", "chrome", "chromium", "edge", "firefox", "opera", "safari", "vivaldi", "whale",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--timeout-secs must be greater than zero")]
    ZeroTimeout,

    #[error("invalid proxy `{0}`: expected a URL such as socks5://127.0.0.1:1080")]
    InvalidProxy(String),

    #[error("unsupported browser `{0}` for --cookies-from-browser")]
    UnsupportedBrowser(String),
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "video-downloader",
    version,
    about = "Local web UI that downloads YouTube and Youku videos as MP3 or MP4"
)]
pub struct Config {
    /// Address the web server listens on
    #[arg(long, env = "VIDEO_DOWNLOADER_BIND", default_value = "127.0.0.1")]
    pub bind: IpAddr,

    #[arg(long, env = "VIDEO_DOWNLOADER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding per-job output directories
    #[arg(long, env = "VIDEO_DOWNLOADER_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not open a browser window on start
    #[arg(long, env = "VIDEO_DOWNLOADER_NO_BROWSER")]
    pub no_browser: bool,

    /// yt-dlp executable (name on PATH or full path)
    #[arg(long = "yt-dlp", env = "VIDEO_DOWNLOADER_YT_DLP", default_value = "yt-dlp")]
    pub yt_dlp: PathBuf,

    /// Run `<PYTHON> -m yt_dlp` instead of the yt-dlp executable
    #[arg(long, env = "VIDEO_DOWNLOADER_PYTHON")]
    pub python: Option<PathBuf>,

    /// ffmpeg executable; looked up on PATH when omitted
    #[arg(long, env = "VIDEO_DOWNLOADER_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Proxy handed to yt-dlp (http, https or socks)
    #[arg(long, env = "VIDEO_DOWNLOADER_PROXY")]
    pub proxy: Option<String>,

    /// Load cookies from this browser (e.g. firefox)
    #[arg(long, env = "VIDEO_DOWNLOADER_COOKIES_FROM_BROWSER")]
    pub cookies_from_browser: Option<String>,

    /// Clear the yt-dlp cache before every download
    #[arg(long, env = "VIDEO_DOWNLOADER_CLEAR_CACHE")]
    pub clear_cache: bool,

    /// Per-download time limit
    #[arg(long, env = "VIDEO_DOWNLOADER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// How long finished artifacts stay downloadable; 0 keeps them
    #[arg(long, env = "VIDEO_DOWNLOADER_RETENTION_SECS", default_value_t = DEFAULT_RETENTION_SECS)]
    pub retention_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "VIDEO_DOWNLOADER_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if let Some(proxy) = &self.proxy {
            let valid = url::Url::parse(proxy)
                .map(|u| PROXY_SCHEMES.contains(&u.scheme()) && u.host_str().is_some())
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::InvalidProxy(proxy.clone()));
            }
        }

        if let Some(value) = &self.cookies_from_browser {
            // yt-dlp accepts BROWSER[+KEYRING][:PROFILE][::CONTAINER]
            let browser = value
                .split(|c: char| c == '+' || c == ':')
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            if !COOKIE_BROWSERS.contains(&browser.as_str()) {
                return Err(ConfigError::UnsupportedBrowser(value.clone()));
            }
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Root of all job directories.
    pub fn output_root(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("video-downloader")
        })
    }

    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            proxy: self.proxy.clone(),
            cookies_from_browser: self.cookies_from_browser.clone(),
            clear_cache: self.clear_cache,
        }
    }

    pub fn retention(&self) -> Option<Duration> {
        (self.retention_secs > 0).then(|| Duration::from_secs(self.retention_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["video-downloader"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8501");
        assert_eq!(config.yt_dlp, PathBuf::from("yt-dlp"));
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.retention(), Some(Duration::from_secs(1800)));
        assert!(config.output_root().ends_with("video-downloader"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_network_flags() {
        let config = parse(&[
            "--proxy",
            "socks5://127.0.0.1:1080",
            "--cookies-from-browser",
            "firefox:default-release",
            "--clear-cache",
        ]);
        assert!(config.validate().is_ok());

        let network = config.network();
        assert_eq!(network.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(
            network.cookies_from_browser.as_deref(),
            Some("firefox:default-release")
        );
        assert!(network.clear_cache);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            parse(&["--timeout-secs", "0"]).validate(),
            Err(ConfigError::ZeroTimeout)
        );
        assert_eq!(
            parse(&["--proxy", "ftp://example.com"]).validate(),
            Err(ConfigError::InvalidProxy("ftp://example.com".to_string()))
        );
        assert_eq!(
            parse(&["--cookies-from-browser", "netscape"]).validate(),
            Err(ConfigError::UnsupportedBrowser("netscape".to_string()))
        );
    }

    #[test]
    fn test_zero_retention_keeps_artifacts() {
        assert_eq!(parse(&["--retention-secs", "0"]).retention(), None);
    }

    #[test]
    fn test_explicit_output_dir() {
        let config = parse(&["--output-dir", "/srv/media"]);
        assert_eq!(config.output_root(), PathBuf::from("/srv/media"));
    }
}
