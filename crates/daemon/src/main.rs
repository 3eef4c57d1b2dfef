// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sdd: the Stampede coordinator daemon.

use std::process::ExitCode;

use sd_daemon::env;
use sd_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sdd: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("sdd: failed to open log in {}: {e}", config.state_dir.display());
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "daemon failed");
            eprintln!("sdd: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(
    config: &Config,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(&config.state_dir)?;
    let file = tracing_appender::rolling::never(&config.state_dir, "daemon.log");
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = env::log_filter()
        .and_then(|f| EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(guard)
}

async fn run(config: Config) -> Result<(), LifecycleError> {
    info!(state_dir = %config.state_dir.display(), version = sd_wire::PROTOCOL_VERSION, "starting sdd");
    let StartupResult { mut daemon, listener, shutdown } = lifecycle::startup(&config).await?;

    let cancel = CancellationToken::new();
    let checkpoints = daemon.spawn_checkpoints(cancel.clone());
    let listening = tokio::spawn(listener.run(cancel.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received Ctrl+C, shutting down"),
        _ = sigterm() => info!("received SIGTERM, shutting down"),
        _ = shutdown.notified() => info!("shutdown requested"),
    }

    cancel.cancel();
    if let Err(e) = listening.await {
        warn!(error = %e, "listener task failed");
    }
    if let Err(e) = checkpoints.await {
        warn!(error = %e, "checkpoint task failed");
    }
    daemon.shutdown()
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "failed to register SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
