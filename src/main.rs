// gemgate - Multi-protocol LLM API gateway for Google Gemini

use anyhow::Result;
use clap::Parser;
use gemgate::balancer::KeySelector;
use gemgate::cli::Args;
use gemgate::config::AppConfig;
use gemgate::server::{create_router, AppState};
use gemgate::storage::{SharedStore, TracingStore};
use gemgate::upstream::UpstreamClient;
use gemgate::utils::logging;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

fn main() -> Result<()> {
    // Phase 1: Parse CLI arguments and load configuration
    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting gemgate v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the runtime with the configured worker count
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers)
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: AppConfig) -> Result<()> {
    // Phase 4: Construct shared services
    let upstream = Arc::new(UpstreamClient::new(&config.upstream)?);
    let selector = Arc::new(KeySelector::new(config.balancer.clone()));
    let store: SharedStore = Arc::new(TracingStore);

    info!("Upstream base URL: {}", upstream.base_url());

    // Phase 5: Background sweep of idle credential metrics
    let prune_selector = selector.clone();
    let prune_interval = Duration::from_secs(config.balancer.performance_window_seconds.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(prune_interval);
        loop {
            ticker.tick().await;
            prune_selector.prune();
        }
    });

    // Phase 6: Build and start the HTTP server
    let state = AppState {
        config: config.clone(),
        upstream,
        selector,
        store,
    };
    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 7: Run with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
