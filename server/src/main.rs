mod annotate;
mod matcher;
mod routes;
mod slot;
mod stream;
mod template;
mod vision;

use std::path::PathBuf;
use std::sync::Arc;

use annotate::AnnotationPipeline;
use routes::AppState;
use shape_stream_common::config::Config;
use slot::FrameSlot;
use stream::StreamProducer;
use template::ReferenceTemplate;
use tracing::{error, info};

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

    info!(
        addr = config.bind_addr(),
        template = config.template.path,
        algorithm = config.matcher.algorithm.as_str(),
        span = config.matcher.span,
        comp_factor = config.matcher.comp_factor,
        "starting shape-stream server"
    );

    let template = match ReferenceTemplate::load(
        &config.template.path,
        config.template.reload_each_frame,
    ) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            error!(error = %e, "failed to load reference template");
            std::process::exit(1);
        }
    };

    let slot = FrameSlot::new();
    let pipeline = AnnotationPipeline::new(
        matcher::from_config(&config.matcher),
        config.server.jpeg_quality,
    );
    let producer = Arc::new(StreamProducer::new(slot.clone(), template, pipeline));
    let state = Arc::new(AppState::new(slot, producer, config.template.path.clone()));
    let app = routes::router(state);

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, addr, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(addr, "listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server terminated");
        std::process::exit(1);
    }
}
