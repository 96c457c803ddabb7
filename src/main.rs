//! Ollama Gateway - authenticated HTTP gateway in front of a local Ollama server.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ollama_gateway::supervisor::BackendProcess;
use ollama_gateway::{api, lifecycle, logging, tunnel, AppState, Config, ProxyClient};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("ollama-gateway {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Make sure config.toml exists or set the GATEWAY__AUTH__TOKEN environment variable.",
            e
        )
    })?;

    let mode = args.get(1).map(String::as_str).unwrap_or("proxy");
    match mode {
        "proxy" => run_proxy(config).await,
        "tunnel" => run_tunnel(config).await,
        other => Err(format!("unknown mode '{}', expected 'proxy' or 'tunnel'", other).into()),
    }
}

/// Serve the authenticated forwarding gateway.
async fn run_proxy(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting gateway in proxy mode");

    // Start the backend and block until it is healthy.
    let gateway = lifecycle::initialize(&config).await?;

    let proxy = ProxyClient::new(
        &config.backend.base_url(),
        Duration::from_secs(config.backend.request_timeout_secs),
    )?;
    let state = Arc::new(AppState::new(config.clone(), proxy));

    // Build router
    let app = Router::new()
        .merge(api::router())
        .layer(middleware::from_fn(logging::request_logger))
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.api.host, config.api.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    let shutdown = shutdown_signal(gateway.backend.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    gateway.shutdown().await;
    Ok(())
}

/// Export the backend port through the tunnel client and idle.
async fn run_tunnel(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting gateway in tunnel mode");

    let gateway = lifecycle::initialize(&config).await?;

    let result = tunnel::export_and_serve(&config, &gateway.backend).await;
    gateway.shutdown().await;

    result.map_err(Into::into)
}

/// Resolves on SIGINT or when the supervised backend exits unexpectedly.
async fn shutdown_signal(backend: Arc<BackendProcess>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        _ = watch_backend(backend) => {
            tracing::error!("Backend exited unexpectedly, stopping gateway");
        }
    }
}

async fn watch_backend(backend: Arc<BackendProcess>) {
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if !backend.is_alive().await {
            return;
        }
    }
}
