// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress counters and final statistics reported by minion runs.

use crate::build::BuildMode;
use serde::{Deserialize, Serialize};

/// Latest progress snapshot of a minion run. Each report replaces the last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSlaveStatus {
    pub total_rules: u32,
    pub rules_started: u32,
    pub rules_finished: u32,
    pub rules_succeeded: u32,
    pub rules_failed: u32,
    pub cache_hits: u32,
    pub cache_misses: u32,
    pub files_materialized: u32,
    pub updated_at_ms: u64,
}

impl BuildSlaveStatus {
    /// Rules started but not yet finished.
    pub fn rules_in_flight(&self) -> u32 {
        self.rules_started.saturating_sub(self.rules_finished)
    }

    /// Cache hit ratio in percent, `None` before any cache lookup.
    pub fn cache_hit_percent(&self) -> Option<u32> {
        let total = self.cache_hits + self.cache_misses;
        (total > 0).then(|| self.cache_hits * 100 / total)
    }
}

/// Summary a minion stores once when its run completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSlaveFinishedStats {
    pub hostname: String,
    pub build_mode: BuildMode,
    pub exit_code: i32,
    #[serde(default)]
    pub status: BuildSlaveStatus,
    #[serde(default)]
    pub finished_at_ms: u64,
}
