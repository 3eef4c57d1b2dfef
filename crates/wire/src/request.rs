// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use sd_core::{
    BuildMode, BuildSlaveEvent, BuildSlaveFinishedStats, BuildSlaveRunId, BuildSlaveStatus,
    BuildStatus, StampedeId,
};
use serde::{Deserialize, Serialize};

use crate::LogBatchRequest;

/// Request from a client, coordinator, or minion to the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Get daemon status
    Status,

    /// Request daemon shutdown
    Shutdown,

    /// Register a new build
    CreateBuild {
        /// Client-side creation time; the daemon clock is used when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        create_timestamp_ms: Option<u64>,
        build_mode: BuildMode,
        /// Signed so a negative count reaches validation instead of failing decode
        number_of_minions: i64,
        repository: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tenant_id: Option<String>,
        build_uuid: String,
        username: String,
    },

    /// Record the host coordinating a build
    SetCoordinator {
        stampede_id: StampedeId,
        coordinator_hostname: String,
        coordinator_port: i64,
        /// Reject the write unless the current epoch matches (0 = none yet)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_epoch: Option<u64>,
    },

    GetCoordinator { stampede_id: StampedeId },

    AppendBuildSlaveEvents {
        stampede_id: StampedeId,
        run_id: BuildSlaveRunId,
        events: Vec<BuildSlaveEvent>,
        /// Retried batches carrying the same key are applied once
        #[serde(default, skip_serializing_if = "Option::is_none")]
        idempotency_key: Option<String>,
    },

    ListBuildSlaveEvents {
        stampede_id: StampedeId,
        run_id: BuildSlaveRunId,
        #[serde(default)]
        since_sequence: u64,
    },

    AppendLogLines {
        stampede_id: StampedeId,
        run_id: BuildSlaveRunId,
        stream: String,
        lines: Vec<String>,
    },

    MultiGetRealTimeLogs { stampede_id: StampedeId, batches: Vec<LogBatchRequest> },

    /// Best-effort forwarding to the telemetry sink
    SendTelemetry { category: String, lines: Vec<String> },

    GetBuild { stampede_id: StampedeId },

    ListBuilds {
        /// Only builds that have not reached a terminal status
        #[serde(default)]
        active_only: bool,
    },

    /// Client-driven terminal transition (cancellation, external failure)
    SetFinalBuildStatus {
        stampede_id: StampedeId,
        status: BuildStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    UpdateBuildSlaveStatus {
        stampede_id: StampedeId,
        run_id: BuildSlaveRunId,
        status: BuildSlaveStatus,
    },

    FetchBuildSlaveStatus { stampede_id: StampedeId, run_id: BuildSlaveRunId },

    StoreBuildSlaveFinishedStats {
        stampede_id: StampedeId,
        run_id: BuildSlaveRunId,
        stats: BuildSlaveFinishedStats,
    },

    FetchBuildSlaveFinishedStats { stampede_id: StampedeId, run_ids: Vec<BuildSlaveRunId> },

    ListBuildSlaveRuns { stampede_id: StampedeId },

    /// Delete terminal builds older than the retention window
    PruneBuilds {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retention_ms: Option<u64>,
        #[serde(default)]
        dry_run: bool,
    },
}

impl Request {
    /// Whether sending this request twice has the same effect as sending it once.
    ///
    /// Only idempotent requests are retried by [`Client`](crate::Client).
    pub fn is_idempotent(&self) -> bool {
        match self {
            Request::AppendBuildSlaveEvents { idempotency_key, .. } => idempotency_key.is_some(),
            // A guarded replace would trip over its own first success
            Request::SetCoordinator { expected_epoch, .. } => expected_epoch.is_none(),
            Request::CreateBuild { .. }
            | Request::AppendLogLines { .. }
            | Request::SendTelemetry { .. }
            | Request::StoreBuildSlaveFinishedStats { .. }
            | Request::Shutdown => false,
            Request::Ping
            | Request::Hello { .. }
            | Request::Status
            | Request::GetCoordinator { .. }
            | Request::ListBuildSlaveEvents { .. }
            | Request::MultiGetRealTimeLogs { .. }
            | Request::GetBuild { .. }
            | Request::ListBuilds { .. }
            | Request::SetFinalBuildStatus { .. }
            | Request::UpdateBuildSlaveStatus { .. }
            | Request::FetchBuildSlaveStatus { .. }
            | Request::FetchBuildSlaveFinishedStats { .. }
            | Request::ListBuildSlaveRuns { .. }
            | Request::PruneBuilds { .. } => true,
        }
    }

    /// Polling requests, logged at debug rather than info.
    pub fn is_poll(&self) -> bool {
        matches!(
            self,
            Request::Ping
                | Request::Status
                | Request::GetCoordinator { .. }
                | Request::GetBuild { .. }
                | Request::MultiGetRealTimeLogs { .. }
                | Request::ListBuildSlaveEvents { .. }
                | Request::FetchBuildSlaveStatus { .. }
        )
    }

    /// Build the request addresses, if any.
    pub fn stampede_id(&self) -> Option<&StampedeId> {
        match self {
            Request::SetCoordinator { stampede_id, .. }
            | Request::GetCoordinator { stampede_id }
            | Request::AppendBuildSlaveEvents { stampede_id, .. }
            | Request::ListBuildSlaveEvents { stampede_id, .. }
            | Request::AppendLogLines { stampede_id, .. }
            | Request::MultiGetRealTimeLogs { stampede_id, .. }
            | Request::GetBuild { stampede_id }
            | Request::SetFinalBuildStatus { stampede_id, .. }
            | Request::UpdateBuildSlaveStatus { stampede_id, .. }
            | Request::FetchBuildSlaveStatus { stampede_id, .. }
            | Request::StoreBuildSlaveFinishedStats { stampede_id, .. }
            | Request::FetchBuildSlaveFinishedStats { stampede_id, .. }
            | Request::ListBuildSlaveRuns { stampede_id } => Some(stampede_id),
            Request::Ping
            | Request::Hello { .. }
            | Request::Status
            | Request::Shutdown
            | Request::CreateBuild { .. }
            | Request::SendTelemetry { .. }
            | Request::ListBuilds { .. }
            | Request::PruneBuilds { .. } => None,
        }
    }
}

sd_core::simple_display! {
    Request {
        Ping => "Ping",
        Hello { .. } => "Hello",
        Status => "Status",
        Shutdown => "Shutdown",
        CreateBuild { .. } => "CreateBuild",
        SetCoordinator { .. } => "SetCoordinator",
        GetCoordinator { .. } => "GetCoordinator",
        AppendBuildSlaveEvents { .. } => "AppendBuildSlaveEvents",
        ListBuildSlaveEvents { .. } => "ListBuildSlaveEvents",
        AppendLogLines { .. } => "AppendLogLines",
        MultiGetRealTimeLogs { .. } => "MultiGetRealTimeLogs",
        SendTelemetry { .. } => "SendTelemetry",
        GetBuild { .. } => "GetBuild",
        ListBuilds { .. } => "ListBuilds",
        SetFinalBuildStatus { .. } => "SetFinalBuildStatus",
        UpdateBuildSlaveStatus { .. } => "UpdateBuildSlaveStatus",
        FetchBuildSlaveStatus { .. } => "FetchBuildSlaveStatus",
        StoreBuildSlaveFinishedStats { .. } => "StoreBuildSlaveFinishedStats",
        FetchBuildSlaveFinishedStats { .. } => "FetchBuildSlaveFinishedStats",
        ListBuildSlaveRuns { .. } => "ListBuildSlaveRuns",
        PruneBuilds { .. } => "PruneBuilds",
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
