use anyhow::Context;
use clap::Parser;

use video_downloader_lib::config::Config;
use video_downloader_lib::telemetry::{init_logging, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(LogFormat::from_flag(config.log_json)).context("failed to initialise logging")?;

    video_downloader_lib::run(config)
        .await
        .context("video-downloader failed to start")
}
