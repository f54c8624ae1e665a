use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use shortgen_api::config::ServerConfig;
use shortgen_api::registry::JobRegistry;
use shortgen_api::router::build_app_router;
use shortgen_api::sink::OutputSink;
use shortgen_api::state::AppState;
use shortgen_core::catalog::ModelCatalog;
use shortgen_replicate::ReplicateApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shortgen_api=debug,shortgen_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] shortgen_api::config::ConfigError),

    #[error("Failed to build provider client: {0}")]
    Provider(#[from] shortgen_replicate::ReplicateApiError),

    #[error("Invalid HOST address '{0}'")]
    Host(String),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

async fn run() -> Result<(), StartupError> {
    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        provider = %config.provider.base_url,
        output_dir = ?config.output_dir,
        "Loaded server configuration",
    );

    // --- Provider ---
    let api = ReplicateApi::new(config.provider.clone())?;

    // --- Output sink ---
    let sink = config.output_dir.as_ref().map(|dir| {
        let sink = OutputSink::new(dir.clone());
        let sink = if config.download_outputs {
            sink.with_downloads(api.clone())
        } else {
            sink
        };
        Arc::new(sink)
    });

    // --- App state ---
    let jobs = Arc::new(JobRegistry::default());
    let state = AppState {
        config: Arc::new(config.clone()),
        adapter: Arc::new(api),
        catalog: Arc::new(ModelCatalog::default()),
        jobs: Arc::clone(&jobs),
        sink,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .map_err(|_| StartupError::Host(config.host.clone()))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    jobs.abort_all().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
