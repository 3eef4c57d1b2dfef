// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use sd_core::{
    Build, BuildSlaveRunId, BuildSlaveStatus, CoordinatorAssignment, ErrorCode, SequencedEvent,
    ServiceError, StampedeId,
};
use serde::{Deserialize, Serialize};

use crate::{LogBatchResult, RunFinishedStats};

/// Response from the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Daemon is shutting down
    ShuttingDown,

    /// Daemon status
    Status {
        uptime_secs: u64,
        builds_total: usize,
        #[serde(default)]
        builds_active: usize,
    },

    BuildCreated { stampede_id: StampedeId },

    CoordinatorSet { epoch: u64 },

    /// Absent assignment means the build exists but has no coordinator yet
    Coordinator {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assignment: Option<CoordinatorAssignment>,
    },

    EventsAppended {
        first_sequence: u64,
        last_sequence: u64,
        next_sequence: u64,
        #[serde(default)]
        deduplicated: bool,
    },

    BuildSlaveEvents { events: Vec<SequencedEvent> },

    LogLinesAppended { first_offset: u64, last_offset: u64 },

    RealTimeLogs { results: Vec<LogBatchResult> },

    Build { build: Box<Build> },

    Builds { builds: Vec<Build> },

    BuildSlaveStatus { status: BuildSlaveStatus },

    BuildSlaveFinishedStats { stats: Vec<RunFinishedStats> },

    BuildSlaveRuns { run_ids: Vec<BuildSlaveRunId> },

    BuildsPruned {
        pruned: Vec<StampedeId>,
        #[serde(default)]
        dry_run: bool,
    },

    /// Error response
    Error { code: ErrorCode, message: String },
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error { code, message: message.into() }
    }
}

impl From<ServiceError> for Response {
    fn from(e: ServiceError) -> Self {
        Response::Error { code: e.code(), message: e.to_string() }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
