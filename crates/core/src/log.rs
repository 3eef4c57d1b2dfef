// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keys and records for per-run event logs and log streams.

use crate::id::{BuildSlaveRunId, StampedeId};
use serde::{Deserialize, Serialize};

/// Identifies one minion run within one build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunKey {
    pub stampede_id: StampedeId,
    pub run_id: BuildSlaveRunId,
}

impl RunKey {
    pub fn new(stampede_id: StampedeId, run_id: BuildSlaveRunId) -> Self {
        Self { stampede_id, run_id }
    }

    pub fn stream(&self, stream: impl Into<String>) -> LogStreamKey {
        LogStreamKey { run: self.clone(), stream: stream.into() }
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.stampede_id, self.run_id)
    }
}

/// Identifies one named log stream ("stdout", "stderr", ...) of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogStreamKey {
    pub run: RunKey,
    pub stream: String,
}

impl std::fmt::Display for LogStreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.run, self.stream)
    }
}

/// A line of a log stream. Offsets are zero-based and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub offset: u64,
    pub text: String,
}
