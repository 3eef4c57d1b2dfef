// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the end-to-end specs.

use std::sync::Arc;
use std::time::Duration;

use sd_core::FakeClock;
use sd_daemon::config::DaemonSettings;
use sd_daemon::lifecycle::{startup_with_clock, Config, DaemonState, StartupResult};
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use sd_core::test_support::{
    build_config, coordinator_finished_event, numbered_events, rule_started_event,
};
pub use sd_core::{BuildSlaveRunId, BuildStatus, ErrorCode, StampedeId};
pub use sd_wire::{Client, LogBatchRequest};

/// Upper bound for anything a scenario waits on.
pub const SPEC_WAIT_MAX_MS: u64 = 2_000;

/// A daemon running in this process on an ephemeral port.
pub struct Daemon {
    dir: TempDir,
    addr: String,
    pub clock: FakeClock,
    pub shutdown: Arc<Notify>,
    state: DaemonState,
    cancel: CancellationToken,
    listening: JoinHandle<()>,
}

pub fn test_settings() -> DaemonSettings {
    DaemonSettings { listen_addr: "127.0.0.1:0".to_string(), ..DaemonSettings::default() }
}

impl Daemon {
    pub async fn start() -> Self {
        Self::start_in(TempDir::new().unwrap(), test_settings()).await
    }

    pub async fn start_with(settings: DaemonSettings) -> Self {
        Self::start_in(TempDir::new().unwrap(), settings).await
    }

    /// Start on an existing state directory, recovering whatever it holds.
    pub async fn start_in(dir: TempDir, settings: DaemonSettings) -> Self {
        let config = Config::with_settings(dir.path().to_path_buf(), settings);
        let clock = FakeClock::new();
        let StartupResult { daemon, listener, shutdown } =
            startup_with_clock(&config, clock.clone()).await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let cancel = CancellationToken::new();
        let listening = tokio::spawn(listener.run(cancel.clone()));
        Self { dir, addr, clock, shutdown, state: daemon, cancel, listening }
    }

    pub fn client(&self) -> Client {
        Client::new(self.addr.clone())
            .with_timeout(Duration::from_millis(SPEC_WAIT_MAX_MS))
            .with_retries(0, Duration::ZERO)
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Stop gracefully and hand back the state directory.
    pub async fn stop(self) -> TempDir {
        let Self { dir, mut state, cancel, listening, .. } = self;
        cancel.cancel();
        listening.await.unwrap();
        state.shutdown().unwrap();
        dir
    }
}

/// Poll `condition` until it holds or `max_ms` elapses.
pub async fn wait_for<F, Fut>(max_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(max_ms);
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Payloads of `events`, as text.
pub fn payloads(events: &[sd_core::SequencedEvent]) -> Vec<String> {
    events.iter().map(|e| String::from_utf8_lossy(&e.event.payload).into_owned()).collect()
}
