mod push;
mod source;

use std::path::PathBuf;
use std::time::Duration;

use push::FramePusher;
use shape_stream_common::config::Config;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP connection failed: {0}")]
    HttpConnect(reqwest::Error),
    #[error("HTTP stream error: {0}")]
    HttpStream(reqwest::Error),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("failed to push frame: {0}")]
    Push(reqwest::Error),
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let client = &config.client;
    info!(
        source = client.source_url,
        server = client.server_url,
        mode = client.mode,
        mirror = client.mirror,
        "starting shape-stream client"
    );

    let pusher = match FramePusher::new(&client.server_url, client.mirror, client.quality) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "failed to create HTTP client");
            std::process::exit(1);
        }
    };

    match client.mode.as_str() {
        "mjpeg" => source::run_mjpeg_source(&client.source_url, &pusher).await,
        "polling" => {
            let interval = Duration::from_secs_f64(1.0 / client.fps);
            source::run_polling_source(&client.source_url, &pusher, interval).await;
        }
        other => {
            error!(mode = other, "unknown source mode, expected 'mjpeg' or 'polling'");
            std::process::exit(1);
        }
    }
}
