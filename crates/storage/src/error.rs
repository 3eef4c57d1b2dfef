// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use sd_core::{RunKey, StampedeId};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the store traits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("build {0} already exists")]
    AlreadyExists(StampedeId),

    #[error("build {0} not found")]
    NotFound(StampedeId),

    /// A compare-and-swap write lost a race.
    #[error("version conflict on {key}: expected {expected}, found {actual}")]
    VersionConflict { key: String, expected: u64, actual: u64 },

    /// An event append named a next sequence the log has already moved past.
    #[error("sequence conflict on {run}: expected next {expected}, log is at {actual}")]
    SequenceConflict { run: RunKey, expected: u64, actual: u64 },
}

impl StoreError {
    /// Lost a compare-and-swap race; re-read and retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. } | StoreError::SequenceConflict { .. })
    }
}
