// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.
//!
//! Getters return `None` when a variable is unset or does not parse, so the
//! config file value (or the built-in default) stays in effect.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: SD_STATE_DIR > XDG_STATE_HOME/stampede > ~/.local/state/stampede
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("SD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("stampede"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/stampede"))
}

/// Explicit config file path
pub fn config_path() -> Option<PathBuf> {
    non_empty("SD_CONFIG").map(PathBuf::from)
}

/// Address the listener binds, e.g. `0.0.0.0:9813`
pub fn listen_addr() -> Option<String> {
    non_empty("SD_LISTEN_ADDR")
}

/// Timeout for reading one request off a connection
pub fn ipc_timeout() -> Option<Duration> {
    millis("SD_IPC_TIMEOUT_MS")
}

pub fn max_lines_per_stream() -> Option<usize> {
    parsed("SD_MAX_LINES_PER_STREAM")
}

pub fn max_response_bytes() -> Option<usize> {
    parsed("SD_MAX_RESPONSE_BYTES")
}

pub fn max_streams_per_request() -> Option<usize> {
    parsed("SD_MAX_STREAMS_PER_REQUEST")
}

pub fn max_event_batch() -> Option<usize> {
    parsed("SD_MAX_EVENT_BATCH")
}

pub fn max_event_batch_bytes() -> Option<usize> {
    parsed("SD_MAX_EVENT_BATCH_BYTES")
}

/// Telemetry collector address. Unset disables forwarding.
pub fn telemetry_addr() -> Option<String> {
    non_empty("SD_TELEMETRY_ADDR")
}

pub fn telemetry_timeout() -> Option<Duration> {
    millis("SD_TELEMETRY_TIMEOUT_MS")
}

/// How often the store is checkpointed to disk
pub fn checkpoint_interval() -> Option<Duration> {
    millis("SD_CHECKPOINT_INTERVAL_MS")
}

/// Default retention for `PruneBuilds` without an explicit window
pub fn build_retention() -> Option<Duration> {
    millis("SD_BUILD_RETENTION_MS")
}

/// Log filter directive; falls back to RUST_LOG, then `info`
pub fn log_filter() -> Option<String> {
    non_empty("SD_LOG").or_else(|| non_empty("RUST_LOG"))
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}

fn millis(name: &str) -> Option<Duration> {
    parsed::<u64>(name).map(Duration::from_millis)
}
