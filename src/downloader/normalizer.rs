// URL normalizer - detects the platform and produces the canonical URL
//
// YouTube URLs are passed through unchanged (yt-dlp accepts every shape we
// recognise). Youku URLs come in several historical shapes; all of them are
// rewritten to https://v.youku.com/v_show/id_<ID>.html.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use super::errors::{NormalizationError, MAX_URL_LENGTH};
use super::models::{NormalizedUrl, Platform};

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];
const YOUTUBE_SHORT_HOSTS: &[&str] = &["youtu.be", "www.youtu.be"];

lazy_static! {
    static ref YOUTUBE_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
    static ref YOUTUBE_PATH_RE: Regex =
        Regex::new(r"^/(?:shorts|embed)/([A-Za-z0-9_-]+)/?$").unwrap();
    static ref YOUKU_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9]+={0,2}$").unwrap();
    static ref YOUKU_PATH_RE: Regex = Regex::new(
        r"^/(?:v_show/id_|(?:alipay_)?video/id_|player\.php/sid/|embed/)([A-Za-z0-9]+={0,2})(?:\.html|/v\.swf)?/?$"
    )
    .unwrap();
}

/// Turn arbitrary user input into a canonical, platform-tagged URL.
pub fn normalize(raw: &str) -> Result<NormalizedUrl, NormalizationError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(NormalizationError::Empty);
    }

    let len = input.chars().count();
    if len > MAX_URL_LENGTH {
        return Err(NormalizationError::TooLong {
            len,
            max: MAX_URL_LENGTH,
        });
    }

    let parsed = Url::parse(input).map_err(|_| NormalizationError::UnrecognizedUrl)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(NormalizationError::UnrecognizedUrl);
    }
    let host = parsed
        .host_str()
        .ok_or(NormalizationError::UnrecognizedUrl)?
        .to_ascii_lowercase();

    if is_youtube_video(&parsed, &host) {
        return Ok(NormalizedUrl {
            platform: Platform::YouTube,
            canonical_url: input.to_string(),
        });
    }

    if host == "youku.com" || host.ends_with(".youku.com") {
        if let Some(id) = youku_id(&parsed) {
            return Ok(NormalizedUrl {
                platform: Platform::Youku,
                canonical_url: youku_canonical(&id),
            });
        }
    }

    Err(NormalizationError::UnrecognizedUrl)
}

/// Canonical Youku watch-page URL for a content identifier.
pub fn youku_canonical(id: &str) -> String {
    format!("https://v.youku.com/v_show/id_{}.html", id)
}

fn is_youtube_video(url: &Url, host: &str) -> bool {
    if YOUTUBE_SHORT_HOSTS.contains(&host) {
        let id = url.path().trim_matches('/');
        return !id.is_empty() && YOUTUBE_ID_RE.is_match(id);
    }

    if !YOUTUBE_HOSTS.contains(&host) {
        return false;
    }

    if url.path() == "/watch" {
        return url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map_or(false, |(_, id)| YOUTUBE_ID_RE.is_match(&id));
    }

    YOUTUBE_PATH_RE.is_match(url.path())
}

fn youku_id(url: &Url) -> Option<String> {
    if let Some(caps) = YOUKU_PATH_RE.captures(url.path()) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }

    url.query_pairs()
        .find(|(key, _)| key == "vid")
        .map(|(_, id)| id.into_owned())
        .filter(|id| YOUKU_ID_RE.is_match(id))
}
