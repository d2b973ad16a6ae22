// yt-dlp progress parsing and reporting

use regex::Regex;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::DownloadProgress;

/// Parse yt-dlp progress line like:
/// [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)
pub fn parse_ytdlp_progress(line: &str) -> Option<DownloadProgress> {
    lazy_static::lazy_static! {
        static ref PROGRESS_RE: Regex = Regex::new(
            r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)(?:\s+at\s+(\S+(?:\s*\w+/s)?))?(?:\s+ETA\s+(\S+))?"
        ).unwrap();
        static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
        static ref MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
        static ref AUDIO_RE: Regex = Regex::new(r"\[ExtractAudio\]\s+Destination").unwrap();
        static ref REMUX_RE: Regex = Regex::new(r"\[VideoRemuxer\]").unwrap();
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2).map(|m| m.as_str()).unwrap_or("?");
        let status = match (caps.get(3), caps.get(4)) {
            (Some(speed), Some(eta)) => format!(
                "{:.1}% of {} at {} ETA {}",
                percent,
                size,
                speed.as_str(),
                eta.as_str()
            ),
            (Some(speed), None) => format!("{:.1}% of {} at {}", percent, size, speed.as_str()),
            _ => format!("{:.1}% of {}", percent, size),
        };
        return Some(DownloadProgress { percent, status });
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = caps.get(1).map(|m| m.as_str()).unwrap_or("file");
        let short_name: String = filename
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(filename)
            .chars()
            .take(50)
            .collect();
        return Some(DownloadProgress {
            percent: 0.0,
            status: format!("Starting: {}", short_name),
        });
    }

    if MERGE_RE.is_match(line) {
        return Some(DownloadProgress {
            percent: 99.0,
            status: "Merging video and audio".to_string(),
        });
    }

    if AUDIO_RE.is_match(line) {
        return Some(DownloadProgress {
            percent: 99.0,
            status: "Converting audio to MP3".to_string(),
        });
    }

    if REMUX_RE.is_match(line) {
        return Some(DownloadProgress {
            percent: 99.0,
            status: "Remuxing into MP4".to_string(),
        });
    }

    None
}

/// Reports progress of one job to the log, throttled to steps of
/// `step` percent.
pub struct ProgressEmitter {
    job_token: Uuid,
    step: f32,
    last_reported: Option<f32>,
}

impl ProgressEmitter {
    pub fn new(job_token: Uuid) -> Self {
        Self {
            job_token,
            step: 10.0,
            last_reported: None,
        }
    }

    /// Feed one stdout line; returns the progress if it was reported.
    pub fn observe(&mut self, line: &str) -> Option<DownloadProgress> {
        let progress = parse_ytdlp_progress(line)?;
        if !self.should_report(progress.percent) {
            return None;
        }
        self.emit(&progress);
        Some(progress)
    }

    fn should_report(&mut self, percent: f32) -> bool {
        let report = match self.last_reported {
            None => true,
            Some(last) => percent >= 99.0 || percent < last || percent - last >= self.step,
        };
        if report {
            self.last_reported = Some(percent);
        }
        report
    }

    pub fn emit(&self, progress: &DownloadProgress) {
        if progress.percent >= 99.0 {
            info!(job = %self.job_token, "{}", progress.status);
        } else {
            debug!(job = %self.job_token, percent = progress.percent, "{}", progress.status);
        }
    }
}
