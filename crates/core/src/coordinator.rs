// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator address assignment for a build.

use crate::id::StampedeId;
use serde::{Deserialize, Serialize};

/// The currently active coordinator of a build.
///
/// `epoch` starts at 1 and grows by one on every re-election, so a minion
/// holding an older assignment can tell it is stale by comparing epochs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorAssignment {
    pub stampede_id: StampedeId,
    pub hostname: String,
    pub port: u16,
    pub epoch: u64,
    pub assigned_at_ms: u64,
}

impl CoordinatorAssignment {
    /// The assignment that supersedes `previous` (if any).
    pub fn succeeding(
        previous: Option<&CoordinatorAssignment>,
        stampede_id: StampedeId,
        hostname: impl Into<String>,
        port: u16,
        now_ms: u64,
    ) -> Self {
        Self {
            stampede_id,
            hostname: hostname.into(),
            port,
            epoch: previous.map_or(1, |p| p.epoch + 1),
            assigned_at_ms: now_ms,
        }
    }

    /// `host:port` form for connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    pub fn same_address(&self, hostname: &str, port: u16) -> bool {
        self.hostname == hostname && self.port == port
    }
}
