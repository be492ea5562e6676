//! Activity trail server binary.
//!
//! Usage: `trail-server [CONFIG_PATH]`. Without an argument the path comes
//! from `TRAIL_CONFIG_PATH`, then `config.toml`.

use std::net::SocketAddr;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use trail_server::config::{self, Config, LoggingConfig};
use trail_server::{app, build_engine, AppState};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Picks the config file and reports where the choice came from.
fn config_path() -> (String, &'static str) {
    let non_blank = |value: &String| !value.trim().is_empty();

    if let Some(path) = std::env::args().nth(1).filter(non_blank) {
        (path, "cli-arg")
    } else if let Some(path) = std::env::var("TRAIL_CONFIG_PATH").ok().filter(non_blank) {
        (path, "env-var")
    } else {
        (DEFAULT_CONFIG_PATH.to_string(), "default")
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        fmt.json().init();
    } else {
        fmt.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let (path, source) = config_path();
    let config = match config::load_config(Some(&path)) {
        Ok(config) => config,
        Err(e) => {
            // Tracing is configured from this file, so report directly.
            eprintln!("trail-server: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging);
    tracing::info!(source, path = %path, "resolved startup configuration path");

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "trail server failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> std::io::Result<()> {
    let (engine, page) = build_engine(&config);
    let state = AppState::new(engine, page, config.bridge.namespace.clone());
    tracing::info!(namespace = %state.bridge_namespace, "published trail on bridge");

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "trail server listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("trail server shut down");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT, shutting down"),
                    _ = terminate.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => tracing::warn!(error = %e, "SIGTERM handler unavailable; waiting for SIGINT"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for SIGINT; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("received SIGINT, shutting down");
}
