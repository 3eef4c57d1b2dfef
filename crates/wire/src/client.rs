// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP client for the coordinator daemon.

use std::ops::RangeInclusive;
use std::time::Duration;

use sd_core::{
    Build, BuildConfig, BuildSlaveEvent, BuildSlaveFinishedStats, BuildSlaveRunId,
    BuildSlaveStatus, BuildStatus, CoordinatorAssignment, ErrorCode, SequencedEvent, StampedeId,
};
use thiserror::Error;
use tokio::net::TcpStream;

use crate::wire::{read_response, write_request};
use crate::{LogBatchRequest, LogBatchResult, ProtocolError, Request, Response, RunFinishedStats};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

/// Errors from [`Client`] calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connect { addr: String, source: std::io::Error },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The daemon answered with an error response.
    #[error("{code}: {message}")]
    Service { code: ErrorCode, message: String },

    #[error("unexpected response to {request}: {response}")]
    UnexpectedResponse { request: String, response: String },
}

impl ClientError {
    /// Worth retrying: the request may not have been applied.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Connect { .. } => true,
            ClientError::Protocol(e) => matches!(
                e,
                ProtocolError::Io(_) | ProtocolError::Timeout | ProtocolError::ConnectionClosed
            ),
            ClientError::Service { code, .. } => code.is_transient(),
            ClientError::UnexpectedResponse { .. } => false,
        }
    }

    /// Wire error code, when the daemon answered with one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Service { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Where an appended event batch landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendedEvents {
    pub first_sequence: u64,
    pub last_sequence: u64,
    pub next_sequence: u64,
    pub deduplicated: bool,
}

/// Daemon client. Each call opens a connection, sends one request and reads
/// one response.
///
/// Idempotent requests are retried with exponential backoff on transient
/// failures.
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

fn unexpected(request: &str, response: Response) -> ClientError {
    ClientError::UnexpectedResponse { request: request.to_string(), response: format!("{response:?}") }
}

impl Client {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry idempotent requests up to `max_retries` times, starting at `backoff`
    /// and doubling after each attempt.
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send a request and return the daemon's response.
    ///
    /// `Response::Error` is returned as `ClientError::Service`.
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let retries = if request.is_idempotent() { self.max_retries } else { 0 };
        let mut delay = self.backoff;
        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Err(e) if attempt < retries && e.is_transient() => {
                    attempt += 1;
                    tracing::debug!(request = %request, attempt, error = %e, "retrying request");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                result => return result,
            }
        }
    }

    async fn send_once(&self, request: &Request) -> Result<Response, ClientError> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ProtocolError::Timeout)?
            .map_err(|source| ClientError::Connect { addr: self.addr.clone(), source })?;
        let (mut reader, mut writer) = stream.into_split();
        write_request(&mut writer, request, self.timeout).await?;
        match read_response(&mut reader, self.timeout).await? {
            Response::Error { code, message } => Err(ClientError::Service { code, message }),
            response => Ok(response),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected("Ping", other)),
        }
    }

    /// Exchange protocol versions; returns the daemon's.
    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello { version: crate::PROTOCOL_VERSION.to_string() };
        match self.send(request).await? {
            Response::Hello { version } => Ok(version),
            other => Err(unexpected("Hello", other)),
        }
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            other => Err(unexpected("Shutdown", other)),
        }
    }

    pub async fn create_build(&self, config: &BuildConfig) -> Result<StampedeId, ClientError> {
        let request = Request::CreateBuild {
            create_timestamp_ms: config.created_at_ms,
            build_mode: config.build_mode,
            number_of_minions: i64::from(config.requested_minion_count),
            repository: config.repository.clone(),
            tenant_id: config.tenant_id.clone(),
            build_uuid: config.client_build_uuid.clone(),
            username: config.username.clone(),
        };
        match self.send(request).await? {
            Response::BuildCreated { stampede_id } => Ok(stampede_id),
            other => Err(unexpected("CreateBuild", other)),
        }
    }

    /// Record this host as the build's coordinator. Returns the new epoch.
    pub async fn set_coordinator(
        &self,
        stampede_id: &StampedeId,
        hostname: &str,
        port: u16,
        expected_epoch: Option<u64>,
    ) -> Result<u64, ClientError> {
        let request = Request::SetCoordinator {
            stampede_id: stampede_id.clone(),
            coordinator_hostname: hostname.to_string(),
            coordinator_port: i64::from(port),
            expected_epoch,
        };
        match self.send(request).await? {
            Response::CoordinatorSet { epoch } => Ok(epoch),
            other => Err(unexpected("SetCoordinator", other)),
        }
    }

    pub async fn get_coordinator(
        &self,
        stampede_id: &StampedeId,
    ) -> Result<Option<CoordinatorAssignment>, ClientError> {
        match self.send(Request::GetCoordinator { stampede_id: stampede_id.clone() }).await? {
            Response::Coordinator { assignment } => Ok(assignment),
            other => Err(unexpected("GetCoordinator", other)),
        }
    }

    /// Append events under a fresh idempotency key, so the batch is safe to retry.
    pub async fn append_events(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        events: Vec<BuildSlaveEvent>,
    ) -> Result<AppendedEvents, ClientError> {
        let key = uuid::Uuid::new_v4().to_string();
        self.append_events_with_key(stampede_id, run_id, events, Some(key)).await
    }

    pub async fn append_events_with_key(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        events: Vec<BuildSlaveEvent>,
        idempotency_key: Option<String>,
    ) -> Result<AppendedEvents, ClientError> {
        let request = Request::AppendBuildSlaveEvents {
            stampede_id: stampede_id.clone(),
            run_id: run_id.clone(),
            events,
            idempotency_key,
        };
        match self.send(request).await? {
            Response::EventsAppended { first_sequence, last_sequence, next_sequence, deduplicated } => {
                Ok(AppendedEvents { first_sequence, last_sequence, next_sequence, deduplicated })
            }
            other => Err(unexpected("AppendBuildSlaveEvents", other)),
        }
    }

    pub async fn list_events(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        since_sequence: u64,
    ) -> Result<Vec<SequencedEvent>, ClientError> {
        let request = Request::ListBuildSlaveEvents {
            stampede_id: stampede_id.clone(),
            run_id: run_id.clone(),
            since_sequence,
        };
        match self.send(request).await? {
            Response::BuildSlaveEvents { events } => Ok(events),
            other => Err(unexpected("ListBuildSlaveEvents", other)),
        }
    }

    /// Returns the offsets assigned to the lines.
    pub async fn append_log_lines(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        stream: &str,
        lines: Vec<String>,
    ) -> Result<RangeInclusive<u64>, ClientError> {
        let request = Request::AppendLogLines {
            stampede_id: stampede_id.clone(),
            run_id: run_id.clone(),
            stream: stream.to_string(),
            lines,
        };
        match self.send(request).await? {
            Response::LogLinesAppended { first_offset, last_offset } => Ok(first_offset..=last_offset),
            other => Err(unexpected("AppendLogLines", other)),
        }
    }

    pub async fn multi_get_real_time_logs(
        &self,
        stampede_id: &StampedeId,
        batches: Vec<LogBatchRequest>,
    ) -> Result<Vec<LogBatchResult>, ClientError> {
        let request = Request::MultiGetRealTimeLogs { stampede_id: stampede_id.clone(), batches };
        match self.send(request).await? {
            Response::RealTimeLogs { results } => Ok(results),
            other => Err(unexpected("MultiGetRealTimeLogs", other)),
        }
    }

    pub async fn send_telemetry(&self, category: &str, lines: Vec<String>) -> Result<(), ClientError> {
        match self.send(Request::SendTelemetry { category: category.to_string(), lines }).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected("SendTelemetry", other)),
        }
    }

    pub async fn get_build(&self, stampede_id: &StampedeId) -> Result<Build, ClientError> {
        match self.send(Request::GetBuild { stampede_id: stampede_id.clone() }).await? {
            Response::Build { build } => Ok(*build),
            other => Err(unexpected("GetBuild", other)),
        }
    }

    pub async fn list_builds(&self, active_only: bool) -> Result<Vec<Build>, ClientError> {
        match self.send(Request::ListBuilds { active_only }).await? {
            Response::Builds { builds } => Ok(builds),
            other => Err(unexpected("ListBuilds", other)),
        }
    }

    pub async fn set_final_status(
        &self,
        stampede_id: &StampedeId,
        status: BuildStatus,
        message: Option<String>,
    ) -> Result<Build, ClientError> {
        let request =
            Request::SetFinalBuildStatus { stampede_id: stampede_id.clone(), status, message };
        match self.send(request).await? {
            Response::Build { build } => Ok(*build),
            other => Err(unexpected("SetFinalBuildStatus", other)),
        }
    }

    pub async fn update_slave_status(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        status: BuildSlaveStatus,
    ) -> Result<(), ClientError> {
        let request = Request::UpdateBuildSlaveStatus {
            stampede_id: stampede_id.clone(),
            run_id: run_id.clone(),
            status,
        };
        match self.send(request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected("UpdateBuildSlaveStatus", other)),
        }
    }

    pub async fn fetch_slave_status(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
    ) -> Result<BuildSlaveStatus, ClientError> {
        let request =
            Request::FetchBuildSlaveStatus { stampede_id: stampede_id.clone(), run_id: run_id.clone() };
        match self.send(request).await? {
            Response::BuildSlaveStatus { status } => Ok(status),
            other => Err(unexpected("FetchBuildSlaveStatus", other)),
        }
    }

    pub async fn store_finished_stats(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        stats: BuildSlaveFinishedStats,
    ) -> Result<(), ClientError> {
        let request = Request::StoreBuildSlaveFinishedStats {
            stampede_id: stampede_id.clone(),
            run_id: run_id.clone(),
            stats,
        };
        match self.send(request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected("StoreBuildSlaveFinishedStats", other)),
        }
    }

    pub async fn fetch_finished_stats(
        &self,
        stampede_id: &StampedeId,
        run_ids: Vec<BuildSlaveRunId>,
    ) -> Result<Vec<RunFinishedStats>, ClientError> {
        let request =
            Request::FetchBuildSlaveFinishedStats { stampede_id: stampede_id.clone(), run_ids };
        match self.send(request).await? {
            Response::BuildSlaveFinishedStats { stats } => Ok(stats),
            other => Err(unexpected("FetchBuildSlaveFinishedStats", other)),
        }
    }

    pub async fn list_slave_runs(
        &self,
        stampede_id: &StampedeId,
    ) -> Result<Vec<BuildSlaveRunId>, ClientError> {
        match self.send(Request::ListBuildSlaveRuns { stampede_id: stampede_id.clone() }).await? {
            Response::BuildSlaveRuns { run_ids } => Ok(run_ids),
            other => Err(unexpected("ListBuildSlaveRuns", other)),
        }
    }

    pub async fn prune_builds(
        &self,
        retention: Option<Duration>,
        dry_run: bool,
    ) -> Result<Vec<StampedeId>, ClientError> {
        let retention_ms = retention.map(|d| d.as_millis() as u64);
        match self.send(Request::PruneBuilds { retention_ms, dry_run }).await? {
            Response::BuildsPruned { pruned, .. } => Ok(pruned),
            other => Err(unexpected("PruneBuilds", other)),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
