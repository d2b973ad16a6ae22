// HTML rendering for the single-page UI

use crate::downloader::{DownloadResult, Mode, Platform};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 42rem; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { font-size: 1.6rem; }
form { display: grid; gap: 0.8rem; }
input[type=url] { padding: 0.5rem; font-size: 1rem; }
fieldset { border: 1px solid #ccc; border-radius: 4px; }
button { padding: 0.6rem 1rem; font-size: 1rem; cursor: pointer; }
.notice { padding: 0.8rem 1rem; border-radius: 4px; margin: 1rem 0; }
.success { background: #e7f6e7; border: 1px solid #7bc47b; }
.error { background: #fdeaea; border: 1px solid #e08a8a; }
.hint { background: #fff8e1; border: 1px solid #e0c36a; }
.progress { background: #eef3fb; border: 1px solid #8aa9e0; display: none; }
footer { margin-top: 2rem; font-size: 0.8rem; color: #666; }
"#;

const SUBMIT_SCRIPT: &str = r#"
document.getElementById('download-form').addEventListener('submit', function () {
  var button = document.getElementById('submit');
  button.disabled = true;
  button.textContent = 'Downloading...';
  document.getElementById('progress').style.display = 'block';
});
"#;

/// Escape text for use in HTML bodies and double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Extra guidance shown under a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// The platform answered 403 Forbidden
    Forbidden,
    Youku,
}

impl Hint {
    fn title(&self) -> &'static str {
        match self {
            Hint::Forbidden => "The platform answered HTTP 403 Forbidden.",
            Hint::Youku => "Downloading from Youku:",
        }
    }

    fn steps(&self) -> &'static [&'static str] {
        match self {
            Hint::Forbidden => &[
                "Update yt-dlp to the latest release.",
                "Restart with --cookies-from-browser (e.g. firefox) to send browser cookies.",
                "Restart with --clear-cache to drop stale yt-dlp cache entries.",
                "Wait a while before retrying; the video may also be region-restricted.",
            ],
            Hint::Youku => &[
                "Check that yt-dlp is up to date; Youku site changes often break older releases.",
                "Youku may restrict videos by region.",
                "Some videos can only be fetched from mainland China.",
            ],
        }
    }
}

/// What to show below the form
pub enum Outcome<'a> {
    Empty,
    Finished {
        result: &'a DownloadResult,
        platform: Option<Platform>,
        hints: &'a [Hint],
    },
}

pub fn index_page() -> String {
    render("", Mode::default(), Outcome::Empty)
}

/// Render the whole page, keeping the submitted URL and mode in the form.
pub fn render(raw_url: &str, mode: Mode, outcome: Outcome<'_>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>YouTube &amp; Youku Downloader</title>
<style>{style}</style>
</head>
<body>
<h1>YouTube &amp; Youku Downloader</h1>
<form id="download-form" method="post" action="/download">
<label for="url">YouTube or Youku URL</label>
<input type="url" id="url" name="url" required value="{url}" placeholder="https://www.youtube.com/watch?v=... or https://v.youku.com/...">
<fieldset>
<legend>Mode</legend>
{radios}
</fieldset>
<button type="submit" id="submit">Download</button>
</form>
<div id="progress" class="notice progress">Downloading and converting; large videos can take several minutes.</div>
{outcome}
<footer>Respect copyright law and each platform's terms of service. For personal use only.</footer>
<script>{script}</script>
</body>
</html>
"#,
        style = STYLE,
        url = escape_html(raw_url),
        radios = mode_radios(mode),
        outcome = render_outcome(outcome),
        script = SUBMIT_SCRIPT,
    )
}

fn mode_radios(selected: Mode) -> String {
    [Mode::Audio, Mode::Video]
        .iter()
        .map(|mode| {
            format!(
                r#"<label><input type="radio" name="mode" value="{value}"{checked}> {label}</label>"#,
                value = mode,
                checked = if *mode == selected { " checked" } else { "" },
                label = escape_html(mode.label()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_outcome(outcome: Outcome<'_>) -> String {
    let (result, platform, hints) = match outcome {
        Outcome::Empty => return String::new(),
        Outcome::Finished {
            result,
            platform,
            hints,
        } => (result, platform, hints),
    };

    match result.artifact.as_ref().filter(|_| result.is_success()) {
        Some(artifact) => format!(
            r#"<div class="notice success">
<p>Download finished.</p>
<p>Source: {platform}<br>File: {file}<br>Size: {size}</p>
<p><a id="artifact-link" href="{href}" download>Save file</a></p>
</div>"#,
            platform = platform.map(|p| p.as_str()).unwrap_or("unknown"),
            file = escape_html(&artifact.file_name),
            size = artifact.size_label(),
            href = escape_html(&artifact.href()),
        ),
        None => {
            let message = result
                .error_message
                .as_deref()
                .unwrap_or("Download failed.");
            let mut html = format!(
                r#"<div class="notice error"><p>{}</p></div>"#,
                escape_html(message)
            );
            for hint in hints {
                html.push_str(&render_hint(*hint));
            }
            html
        }
    }
}

fn render_hint(hint: Hint) -> String {
    let steps: String = hint
        .steps()
        .iter()
        .map(|step| format!("<li>{}</li>", escape_html(step)))
        .collect();
    format!(
        r#"<div class="notice hint"><p>{}</p><ol>{}</ol></div>"#,
        escape_html(hint.title()),
        steps
    )
}
