// Open the UI in the user's default browser

use tokio::process::Command;
use tracing::{debug, warn};

#[cfg(target_os = "windows")]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", url]);
    cmd
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}

/// Ask the desktop to open `url`. Failures are logged, never fatal.
pub async fn open_browser(url: &str) {
    match opener_command(url).output().await {
        Ok(output) if output.status.success() => debug!("opened browser at {}", url),
        Ok(output) => warn!(
            "could not open a browser ({}); visit {} manually",
            String::from_utf8_lossy(&output.stderr).trim(),
            url
        ),
        Err(e) => warn!("could not open a browser ({}); visit {} manually", e, url),
    }
}
