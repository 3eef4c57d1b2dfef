// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by the coordinator service and its clients.

use crate::build::{BuildStatus, TransitionError};
use crate::id::{BuildSlaveRunId, StampedeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a coordinator service operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Malformed, empty, or out-of-range input. Retrying without fixing it is pointless.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown build: {0}")]
    UnknownBuild(StampedeId),

    #[error("unknown run {run_id} in build {stampede_id}")]
    UnknownRun { stampede_id: StampedeId, run_id: BuildSlaveRunId },

    /// The build is left unchanged.
    #[error("build {stampede_id}: cannot move from {from} to {to}")]
    InvalidStateTransition { stampede_id: StampedeId, from: BuildStatus, to: BuildStatus },

    /// A fenced coordinator write named an epoch that is no longer current.
    #[error("build {stampede_id}: expected coordinator epoch {expected}, current is {current}")]
    StaleEpoch { stampede_id: StampedeId, expected: u64, current: u64 },

    /// Backing store or downstream unreachable. Safe to retry idempotent calls.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ServiceError::InvalidArgument(message.into())
    }

    pub fn transition(stampede_id: &StampedeId, err: TransitionError) -> Self {
        ServiceError::InvalidStateTransition {
            stampede_id: stampede_id.clone(),
            from: err.from,
            to: err.to,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ServiceError::UnknownBuild(_) => ErrorCode::UnknownBuild,
            ServiceError::UnknownRun { .. } => ErrorCode::UnknownRun,
            ServiceError::InvalidStateTransition { .. } => ErrorCode::InvalidStateTransition,
            ServiceError::StaleEpoch { .. } => ErrorCode::StaleEpoch,
            ServiceError::Unavailable(_) => ErrorCode::Unavailable,
        }
    }
}

/// Wire-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidArgument,
    UnknownBuild,
    UnknownRun,
    InvalidStateTransition,
    StaleEpoch,
    Unavailable,
    /// The request could not be decoded or was not understood.
    Protocol,
    /// Code sent by a newer service that this client does not know.
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    /// Whether a client may retry the same request after backing off.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorCode::Unavailable)
    }
}

crate::simple_display! {
    ErrorCode {
        InvalidArgument => "invalid_argument",
        UnknownBuild => "unknown_build",
        UnknownRun => "unknown_run",
        InvalidStateTransition => "invalid_state_transition",
        StaleEpoch => "stale_epoch",
        Unavailable => "unavailable",
        Protocol => "protocol",
        Unknown => "unknown",
    }
}
