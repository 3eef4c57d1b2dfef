// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon settings: built-in defaults, overlaid by an optional TOML file,
//! overlaid by environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// Caps on request sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Lines returned per stream in one `MultiGetRealTimeLogs`
    pub max_lines_per_stream: usize,
    /// Line text bytes in one `MultiGetRealTimeLogs` response
    pub max_response_bytes: usize,
    pub max_streams_per_request: usize,
    /// Events in one `AppendBuildSlaveEvents`
    pub max_event_batch_len: usize,
    /// Event payload bytes in one `AppendBuildSlaveEvents`
    pub max_event_batch_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_lines_per_stream: 1000,
            max_response_bytes: 1024 * 1024,
            max_streams_per_request: 256,
            max_event_batch_len: 1000,
            max_event_batch_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Limits {
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env::max_lines_per_stream() {
            self.max_lines_per_stream = v;
        }
        if let Some(v) = env::max_response_bytes() {
            self.max_response_bytes = v;
        }
        if let Some(v) = env::max_streams_per_request() {
            self.max_streams_per_request = v;
        }
        if let Some(v) = env::max_event_batch() {
            self.max_event_batch_len = v;
        }
        if let Some(v) = env::max_event_batch_bytes() {
            self.max_event_batch_bytes = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub listen_addr: String,
    pub ipc_timeout_ms: u64,
    pub checkpoint_interval_ms: u64,
    pub build_retention_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telemetry_addr: Option<String>,
    pub telemetry_timeout_ms: u64,
    pub limits: Limits,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:9813".to_string(),
            ipc_timeout_ms: 5_000,
            checkpoint_interval_ms: 30_000,
            build_retention_ms: 7 * 24 * 60 * 60 * 1000,
            telemetry_addr: None,
            telemetry_timeout_ms: 2_000,
            limits: Limits::default(),
        }
    }
}

impl DaemonSettings {
    /// Read `SD_CONFIG`, else `<state_dir>/config.toml` if it exists, then
    /// apply environment overrides.
    pub fn load(state_dir: &Path) -> Result<Self, ConfigError> {
        let mut settings = match env::config_path() {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = state_dir.join("config.toml");
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(addr) = env::listen_addr() {
            self.listen_addr = addr;
        }
        if let Some(d) = env::ipc_timeout() {
            self.ipc_timeout_ms = d.as_millis() as u64;
        }
        if let Some(d) = env::checkpoint_interval() {
            self.checkpoint_interval_ms = d.as_millis() as u64;
        }
        if let Some(d) = env::build_retention() {
            self.build_retention_ms = d.as_millis() as u64;
        }
        if let Some(addr) = env::telemetry_addr() {
            self.telemetry_addr = Some(addr);
        }
        if let Some(d) = env::telemetry_timeout() {
            self.telemetry_timeout_ms = d.as_millis() as u64;
        }
        self.limits.apply_env_overrides();
    }

    pub fn ipc_timeout(&self) -> Duration {
        Duration::from_millis(self.ipc_timeout_ms)
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_millis(self.checkpoint_interval_ms)
    }

    pub fn build_retention(&self) -> Duration {
        Duration::from_millis(self.build_retention_ms)
    }

    pub fn telemetry_timeout(&self) -> Duration {
        Duration::from_millis(self.telemetry_timeout_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
