pub mod browser;
pub mod config;
pub mod downloader;
pub mod telemetry;
pub mod web;

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use config::{Config, ConfigError};
use downloader::backends::ytdlp::Invocation;
use downloader::backends::{FfmpegTranscoder, YtDlpExtractor};
use downloader::utils::sweep_stale_jobs;
use downloader::{Dispatcher, ToolManager, ToolType};
use web::{build_router, AppState};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not create output directory {path}: {source}")]
    OutputDir { path: PathBuf, source: io::Error },

    #[error("could not listen on {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("HTTP server error: {0}")]
    Serve(#[source] io::Error),
}

/// Start the web UI and serve until Ctrl-C or SIGTERM.
pub async fn run(config: Config) -> Result<(), ServerError> {
    config.validate()?;

    let output_root = config.output_root();
    tokio::fs::create_dir_all(&output_root)
        .await
        .map_err(|source| ServerError::OutputDir {
            path: output_root.clone(),
            source,
        })?;

    let retention = config.retention();
    if let Some(retention) = retention {
        sweep_stale_jobs(&output_root, retention).await;
    }

    let tools = ToolManager::new(Some(config.yt_dlp.clone()), config.ffmpeg.clone());
    let dispatcher = Dispatcher::new(
        build_extractor(&config, &tools),
        Arc::new(FfmpegTranscoder::new(tools.clone())),
        output_root.clone(),
    )
    .with_network(config.network());
    let dispatcher = match retention {
        Some(retention) => dispatcher.with_retention(retention),
        None => dispatcher,
    };

    for tool in tools.get_all_tools().await {
        if tool.is_available {
            info!(
                tool = %tool.name,
                version = tool.version.as_deref().unwrap_or("unknown"),
                "found {}",
                tool.path.as_deref().unwrap_or_default()
            );
        } else if tool.tool_type == ToolType::YtDlp && config.python.is_some() {
            info!("using the yt_dlp Python module");
        } else {
            warn!(tool = %tool.name, "not found; downloads will fail until it is installed");
        }
    }

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local = listener.local_addr().unwrap_or(addr);
    let url = format!("http://{}/", local);
    info!(output = %output_root.display(), "listening on {}", url);

    if !config.no_browser {
        tokio::spawn(async move { browser::open_browser(&url).await });
    }

    let app = build_router(AppState::new(dispatcher, tools));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("server stopped");
    Ok(())
}

fn build_extractor(config: &Config, tools: &ToolManager) -> Arc<YtDlpExtractor> {
    let invocation = match &config.python {
        Some(python) => Invocation::PythonModule(python.clone()),
        // An unresolved name is still tried so the failure surfaces per request
        None => Invocation::Binary(
            tools
                .locate(ToolType::YtDlp)
                .unwrap_or_else(|| config.yt_dlp.clone()),
        ),
    };
    Arc::new(YtDlpExtractor::new(invocation, config.timeout_secs))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}
