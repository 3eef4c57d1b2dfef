// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{BuildConfig, BuildMode, BuildSlaveEvent, BuildSlaveEventKind};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core types.
pub mod strategies {
    use crate::build::BuildStatus;
    use crate::event::BuildSlaveEvent;
    use proptest::prelude::*;

    pub fn arb_build_status() -> impl Strategy<Value = BuildStatus> {
        prop_oneof![
            Just(BuildStatus::Created),
            Just(BuildStatus::CoordinatorAssigned),
            Just(BuildStatus::MinionsAttached),
            Just(BuildStatus::Running),
            Just(BuildStatus::FinishedSuccess),
            Just(BuildStatus::FinishedFailure),
            Just(BuildStatus::Cancelled),
        ]
    }

    pub fn arb_opaque_event() -> impl Strategy<Value = BuildSlaveEvent> {
        proptest::collection::vec(any::<u8>(), 0..64).prop_map(BuildSlaveEvent::opaque)
    }

    /// Log line text without newlines, as a minion would emit it.
    pub fn arb_log_line() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 :./_-]{0,80}"
    }
}

// ── Factory functions ───────────────────────────────────────────────────

/// The `CreateBuild` parameters used throughout the scenario tests.
pub fn build_config(minions: u32) -> BuildConfig {
    BuildConfig {
        build_mode: BuildMode::DistributedBuild,
        requested_minion_count: minions,
        repository: "repo".to_string(),
        tenant_id: Some("t1".to_string()),
        client_build_uuid: "u1".to_string(),
        username: "alice".to_string(),
        created_at_ms: None,
    }
}

/// Opaque events whose payloads are `"<prefix>0"`, `"<prefix>1"`, ...
pub fn numbered_events(prefix: &str, count: usize) -> Vec<BuildSlaveEvent> {
    (0..count).map(|i| BuildSlaveEvent::opaque(format!("{prefix}{i}").into_bytes())).collect()
}

pub fn rule_started_event(target: &str) -> BuildSlaveEvent {
    BuildSlaveEvent::with_kind(BuildSlaveEventKind::RuleStarted, target.as_bytes().to_vec())
}

pub fn coordinator_finished_event(exit_code: i32) -> BuildSlaveEvent {
    BuildSlaveEvent::with_kind(BuildSlaveEventKind::CoordinatorFinished { exit_code }, Vec::new())
}
