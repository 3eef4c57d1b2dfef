// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, checkpoints, shutdown.

mod startup;
pub use startup::{startup, startup_with_clock};

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use sd_core::Clock;
use sd_storage::{Checkpointer, MemoryStore, SnapshotError};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, DaemonSettings};
use crate::listener::Listener;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/stampede)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the store snapshot
    pub snapshot_path: PathBuf,
    pub settings: DaemonSettings,
}

impl Config {
    /// Resolve the state directory from the environment and load settings.
    pub fn load() -> Result<Self, LifecycleError> {
        Self::for_state_dir(crate::env::state_dir()?)
    }

    pub fn for_state_dir(state_dir: PathBuf) -> Result<Self, LifecycleError> {
        let settings = DaemonSettings::load(&state_dir)?;
        Ok(Self::with_settings(state_dir, settings))
    }

    pub fn with_settings(state_dir: PathBuf, settings: DaemonSettings) -> Self {
        Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            snapshot_path: state_dir.join("snapshot.json.zst"),
            state_dir,
            settings,
        }
    }
}

/// Daemon state during operation.
///
/// The listener is returned separately from startup to be spawned as a task.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Shared with the services; clones see the same data
    pub store: MemoryStore,
    checkpointer: Checkpointer,
    pub start_time: Instant,
}

/// Result of daemon startup.
pub struct StartupResult<C: Clock> {
    pub daemon: DaemonState,
    /// Bound listener, ready to run
    pub listener: Listener<C>,
    /// Notified when a client requests shutdown
    pub shutdown: Arc<Notify>,
}

impl DaemonState {
    /// Write a snapshot of the store now. Returns the compressed size.
    pub fn checkpoint(&self) -> Result<u64, SnapshotError> {
        self.checkpointer.checkpoint(self.store.to_state())
    }

    /// Checkpoint every `checkpoint_interval` until cancelled.
    pub fn spawn_checkpoints(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let store = self.store.clone();
        let checkpointer = self.checkpointer.clone();
        let period = self.config.settings.checkpoint_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = interval.tick() => {}
                }
                let state = store.to_state();
                let checkpointer = checkpointer.clone();
                match tokio::task::spawn_blocking(move || checkpointer.checkpoint(state)).await {
                    Ok(Ok(size_bytes)) => debug!(size_bytes, "periodic checkpoint"),
                    Ok(Err(e)) => warn!(error = %e, "periodic checkpoint failed"),
                    Err(e) => warn!(error = %e, "checkpoint task failed"),
                }
            }
        })
    }

    /// Write a final snapshot and remove the PID file.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        let state = self.store.to_state();
        let builds = state.build_count();
        match self.checkpointer.checkpoint(state) {
            Ok(size_bytes) => info!(builds, size_bytes, "saved final shutdown snapshot"),
            Err(e) => warn!(error = %e, "failed to save shutdown snapshot"),
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!(error = %e, "failed to remove PID file");
            }
        }

        // Lock file is released when self.lock_file is dropped
        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
