// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use sd_core::{Clock, SystemClock};
use sd_storage::{load_snapshot, Checkpointer, MemoryStore};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::info;

use super::{Config, DaemonState, LifecycleError, StartupResult};
use crate::listener::{ListenCtx, Listener};
use crate::service::{Services, TcpTelemetrySink, TelemetryForwarder};

/// Start the daemon on the system clock
pub async fn startup(config: &Config) -> Result<StartupResult<SystemClock>, LifecycleError> {
    startup_with_clock(config, SystemClock).await
}

pub async fn startup_with_clock<C: Clock>(
    config: &Config,
    clock: C,
) -> Result<StartupResult<C>, LifecycleError> {
    match startup_inner(config, clock).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock;
            // that PID file belongs to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner<C: Clock>(
    config: &Config,
    clock: C,
) -> Result<StartupResult<C>, LifecycleError> {
    // 1. State directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Lock file FIRST. Open without truncating so a running daemon's PID
    //    survives a failed attempt.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Recover the store
    let store = match load_snapshot(&config.snapshot_path)? {
        Some(snapshot) => {
            info!(
                builds = snapshot.state.build_count(),
                runs = snapshot.state.run_count(),
                created_at = %snapshot.created_at,
                "loaded snapshot"
            );
            MemoryStore::from_state(snapshot.state)
        }
        None => {
            info!("no snapshot found, starting with empty state");
            MemoryStore::new()
        }
    };

    // 4. Services
    let settings = &config.settings;
    let telemetry = match &settings.telemetry_addr {
        Some(addr) => {
            info!(%addr, "forwarding telemetry");
            TelemetryForwarder::new(Arc::new(TcpTelemetrySink::new(addr.clone())), settings.telemetry_timeout())
        }
        None => TelemetryForwarder::disabled(),
    };
    let services = Services::new(Arc::new(store.clone()), clock, &settings.limits, telemetry);

    // 5. Bind (LAST - only after all validation passes)
    let tcp = TcpListener::bind(&settings.listen_addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(settings.listen_addr.clone(), e))?;

    let start_time = Instant::now();
    let shutdown = Arc::new(Notify::new());
    let ctx = Arc::new(ListenCtx {
        services,
        start_time,
        shutdown: Arc::clone(&shutdown),
        ipc_timeout: settings.ipc_timeout(),
        build_retention: settings.build_retention(),
    });
    let listener = Listener::new(tcp, ctx);
    info!(addr = %listener.local_addr()?, "daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            store,
            checkpointer: Checkpointer::new(config.snapshot_path.clone()),
            start_time,
        },
        listener,
        shutdown,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
