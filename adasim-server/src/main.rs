use std::{net::SocketAddr, sync::Arc, time::Duration};

use adasim_core::{
    IngestOrchestrator, Notifier,
    detector::HttpDetectorClient,
    store::{PostgresRunStore, RunStore},
};
use adasim_server::{AppState, infra::config::Config, routes};
use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "adasim-server")]
#[command(
    about = "Detection-result ingestion and streaming server for the adasim platform"
)]
struct Cli {
    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Detector service base URL (overrides config)
    #[arg(long, env = "DETECTOR_URL")]
    detector_url: Option<url::Url>,

    /// Detector request timeout in seconds (overrides config)
    #[arg(long, env = "DETECTOR_TIMEOUT_SECS")]
    detector_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.detector_url {
        config.detector.url = url;
    }
    if let Some(secs) = cli.detector_timeout_secs {
        config.detector.timeout = Duration::from_secs(secs);
    }
    config.ensure_directories()?;

    let store = PostgresRunStore::connect(&config.database.url)
        .await
        .context("connecting to database")?;
    store
        .initialize_schema()
        .await
        .context("running migrations")?;
    let store: Arc<dyn RunStore> = Arc::new(store);

    let detector = Arc::new(HttpDetectorClient::new(
        config.detector.url.clone(),
        config.detector.timeout,
    )?);

    let notifier = Notifier::new();
    let orchestrator = Arc::new(IngestOrchestrator::new(
        Arc::clone(&store),
        detector,
        notifier.clone(),
    ));

    let state = AppState {
        store,
        orchestrator,
        notifier: notifier.clone(),
        config: Arc::new(config.clone()),
    };

    let app = routes::create_app(state);

    let addr: SocketAddr =
        format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .context("invalid server address")?;

    info!("Starting adasim server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(notifier))
        .await?;

    Ok(())
}

/// Wait for ctrl-c, then close all notification channels so connected
/// event sessions terminate cleanly.
async fn shutdown_signal(notifier: Notifier) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received, closing event channels");
    notifier.shutdown().await;
}
