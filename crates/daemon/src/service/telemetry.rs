// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort forwarding of free-form telemetry lines.
//!
//! Callers never wait on the sink and never see its failures: each record is
//! handed to a spawned task that writes it with a timeout and logs a warning
//! if that fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::warn;

/// Category used for build status transitions.
pub const BUILD_STATUS_CATEGORY: &str = "build_status";

/// One telemetry submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub category: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Destination for telemetry records.
#[async_trait]
pub trait TelemetrySink: Send + Sync + 'static {
    async fn send(&self, record: &TelemetryRecord) -> Result<(), TelemetryError>;
}

/// Discards everything. Used when no telemetry address is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetrySink;

#[async_trait]
impl TelemetrySink for NullTelemetrySink {
    async fn send(&self, _record: &TelemetryRecord) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Writes each record as one line of JSON to a TCP collector.
#[derive(Debug, Clone)]
pub struct TcpTelemetrySink {
    addr: String,
}

impl TcpTelemetrySink {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl TelemetrySink for TcpTelemetrySink {
    async fn send(&self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.write_all(&line).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

/// Hands records to a [`TelemetrySink`] without blocking the caller.
#[derive(Clone)]
pub struct TelemetryForwarder {
    sink: Arc<dyn TelemetrySink>,
    timeout: Duration,
}

impl TelemetryForwarder {
    pub fn new(sink: Arc<dyn TelemetrySink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    /// A forwarder that drops everything.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullTelemetrySink), Duration::from_secs(1))
    }

    /// Forward `lines` under `category`. Never fails; empty line lists are ignored.
    pub fn send(&self, category: &str, lines: Vec<String>) {
        if lines.is_empty() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(category, "no runtime, dropping telemetry");
            return;
        };
        let record = TelemetryRecord { category: category.to_string(), lines };
        let sink = Arc::clone(&self.sink);
        let timeout = self.timeout;
        handle.spawn(async move {
            let result = match tokio::time::timeout(timeout, sink.send(&record)).await {
                Ok(result) => result,
                Err(_) => Err(TelemetryError::Timeout(timeout)),
            };
            if let Err(e) = result {
                warn!(category = %record.category, lines = record.lines.len(), error = %e, "telemetry dropped");
            }
        });
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
