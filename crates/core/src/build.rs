// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed build record and lifecycle state machine.

use crate::clock::Clock;
use crate::id::StampedeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the client asked the build to be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildMode {
    RemoteBuild,
    DistributedBuild,
    DistributedBuildWithLocalCoordinator,
    DistributedBuildWithRemoteCoordinator,
    /// Mode sent by a newer client that this build of the service does not know.
    #[serde(other)]
    Unknown,
}

crate::simple_display! {
    BuildMode {
        RemoteBuild => "REMOTE_BUILD",
        DistributedBuild => "DISTRIBUTED_BUILD",
        DistributedBuildWithLocalCoordinator => "DISTRIBUTED_BUILD_WITH_LOCAL_COORDINATOR",
        DistributedBuildWithRemoteCoordinator => "DISTRIBUTED_BUILD_WITH_REMOTE_COORDINATOR",
        Unknown => "UNKNOWN",
    }
}

/// Lifecycle state of a build.
///
/// ```text
/// CREATED -> COORDINATOR_ASSIGNED -> MINIONS_ATTACHED -> RUNNING
///                                                          |
///                    FINISHED_SUCCESS | FINISHED_FAILURE | CANCELLED
/// ```
///
/// Forward skips are allowed (a minion may attach before the coordinator
/// registers); nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Created,
    CoordinatorAssigned,
    MinionsAttached,
    Running,
    FinishedSuccess,
    FinishedFailure,
    Cancelled,
}

impl BuildStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildStatus::FinishedSuccess | BuildStatus::FinishedFailure | BuildStatus::Cancelled
        )
    }

    /// Position along the non-terminal path. All terminal states share the last rank.
    fn rank(self) -> u8 {
        match self {
            BuildStatus::Created => 0,
            BuildStatus::CoordinatorAssigned => 1,
            BuildStatus::MinionsAttached => 2,
            BuildStatus::Running => 3,
            BuildStatus::FinishedSuccess | BuildStatus::FinishedFailure | BuildStatus::Cancelled => 4,
        }
    }

    /// Decide whether moving from `self` to `target` changes anything.
    pub fn transition_to(self, target: BuildStatus) -> Result<Transition, TransitionError> {
        if self == target {
            return Ok(Transition::Unchanged);
        }
        if self.is_terminal() || target == BuildStatus::Created {
            return Err(TransitionError { from: self, to: target });
        }
        if !target.is_terminal() && self.rank() >= target.rank() {
            return Ok(Transition::Unchanged);
        }
        Ok(Transition::Applied)
    }
}

crate::simple_display! {
    BuildStatus {
        Created => "CREATED",
        CoordinatorAssigned => "COORDINATOR_ASSIGNED",
        MinionsAttached => "MINIONS_ATTACHED",
        Running => "RUNNING",
        FinishedSuccess => "FINISHED_SUCCESS",
        FinishedFailure => "FINISHED_FAILURE",
        Cancelled => "CANCELLED",
    }
}

/// Outcome of a permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status moved forward.
    Applied,
    /// Already in or past the target; nothing to write.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move build from {from} to {to}")]
pub struct TransitionError {
    pub from: BuildStatus,
    pub to: BuildStatus,
}

/// Parameters for a new build, already validated by the caller.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub build_mode: BuildMode,
    pub requested_minion_count: u32,
    pub repository: String,
    pub tenant_id: Option<String>,
    pub client_build_uuid: String,
    pub username: String,
    /// Client-side creation time; the service clock is used when absent.
    pub created_at_ms: Option<u64>,
}

/// One distributed build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub stampede_id: StampedeId,
    pub build_mode: BuildMode,
    pub requested_minion_count: u32,
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub client_build_uuid: String,
    pub username: String,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub status: BuildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    /// Store generation, bumped on every write; used for compare-and-swap.
    #[serde(default)]
    pub version: u64,
}

impl Build {
    pub fn new(stampede_id: StampedeId, config: BuildConfig, clock: &impl Clock) -> Self {
        let now = clock.epoch_ms();
        Self {
            stampede_id,
            build_mode: config.build_mode,
            requested_minion_count: config.requested_minion_count,
            repository: config.repository,
            tenant_id: config.tenant_id,
            client_build_uuid: config.client_build_uuid,
            username: config.username,
            created_at_ms: config.created_at_ms.unwrap_or(now),
            updated_at_ms: now,
            status: BuildStatus::Created,
            status_message: None,
            finished_at_ms: None,
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `target`, stamping timestamps when the status actually changes.
    ///
    /// On error the build is left untouched.
    pub fn advance(
        &mut self,
        target: BuildStatus,
        message: Option<String>,
        clock: &impl Clock,
    ) -> Result<Transition, TransitionError> {
        let transition = self.status.transition_to(target)?;
        if transition == Transition::Applied {
            let now = clock.epoch_ms();
            self.status = target;
            self.updated_at_ms = now;
            if target.is_terminal() {
                self.finished_at_ms = Some(now);
            }
            if message.is_some() {
                self.status_message = message;
            }
        }
        Ok(transition)
    }

    /// Whether a terminal build finished before `cutoff_ms`.
    pub fn expired_before(&self, cutoff_ms: u64) -> bool {
        match self.finished_at_ms {
            Some(finished) => self.is_terminal() && finished < cutoff_ms,
            None => false,
        }
    }
}

crate::builder! {
    pub struct BuildBuilder => Build {
        into {
            stampede_id: StampedeId = "stm-test",
            repository: String = "repo",
            client_build_uuid: String = "uuid-1",
            username: String = "alice",
        }
        set {
            build_mode: BuildMode = BuildMode::DistributedBuild,
            requested_minion_count: u32 = 2,
            created_at_ms: u64 = 1_000_000,
            updated_at_ms: u64 = 1_000_000,
            status: BuildStatus = BuildStatus::Created,
            version: u64 = 0,
        }
        option {
            tenant_id: String = None,
            status_message: String = None,
            finished_at_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
