// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured payloads shared by requests and responses.

use sd_core::{BuildSlaveFinishedStats, BuildSlaveRunId, LogLine};
use serde::{Deserialize, Serialize};

/// One stream to read in a `MultiGetRealTimeLogs` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBatchRequest {
    pub run_id: BuildSlaveRunId,
    pub stream: String,
    /// Offset of the last line already seen. Absent means nothing seen yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_offset_seen: Option<u64>,
}

impl LogBatchRequest {
    pub fn new(run_id: impl Into<BuildSlaveRunId>, stream: impl Into<String>) -> Self {
        Self { run_id: run_id.into(), stream: stream.into(), last_offset_seen: None }
    }

    pub fn after(mut self, offset: Option<u64>) -> Self {
        self.last_offset_seen = offset;
        self
    }
}

/// Lines returned for one [`LogBatchRequest`], in the same position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBatchResult {
    pub run_id: BuildSlaveRunId,
    pub stream: String,
    #[serde(default)]
    pub new_lines: Vec<LogLine>,
    /// Offset of the last returned line, or the request's offset echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_last_offset: Option<u64>,
}

impl LogBatchResult {
    /// The request to send next to continue where this result left off.
    pub fn continuation(&self) -> LogBatchRequest {
        LogBatchRequest {
            run_id: self.run_id.clone(),
            stream: self.stream.clone(),
            last_offset_seen: self.new_last_offset,
        }
    }
}

/// Final stats of one run, as returned by `FetchBuildSlaveFinishedStats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFinishedStats {
    pub run_id: BuildSlaveRunId,
    pub stats: BuildSlaveFinishedStats,
}
