// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store traits: the seam between the coordinator services and durable storage.
//!
//! Every method is a single atomic operation against the store. Services
//! compose them with compare-and-swap so several coordinator replicas can
//! share one store.

use async_trait::async_trait;
use sd_core::{
    Build, BuildSlaveEvent, BuildSlaveFinishedStats, BuildSlaveRunId, BuildSlaveStatus,
    CoordinatorAssignment, LogLine, LogStreamKey, RunKey, SequencedEvent, StampedeId,
};
use serde::{Deserialize, Serialize};

use crate::StoreResult;

/// Build records and coordinator assignments, keyed by `StampedeId`.
#[async_trait]
pub trait BuildStore: Send + Sync + 'static {
    /// Insert a new build. Fails with `AlreadyExists` if the ID is taken.
    async fn insert_build(&self, build: Build) -> StoreResult<()>;

    async fn get_build(&self, id: &StampedeId) -> StoreResult<Option<Build>>;

    /// Replace the build if the stored `version` equals `build.version`.
    ///
    /// Returns the stored record, whose version is one higher. Fails with
    /// `VersionConflict` if another writer got there first.
    async fn update_build(&self, build: Build) -> StoreResult<Build>;

    async fn list_builds(&self) -> StoreResult<Vec<Build>>;

    /// Remove a build and its coordinator assignment. Returns whether it existed.
    async fn delete_build(&self, id: &StampedeId) -> StoreResult<bool>;

    async fn get_coordinator(&self, id: &StampedeId) -> StoreResult<Option<CoordinatorAssignment>>;

    /// Atomically upsert an assignment whose epoch is exactly one past the
    /// stored epoch (0 when none). Fails with `VersionConflict` otherwise.
    async fn put_coordinator(&self, assignment: CoordinatorAssignment) -> StoreResult<()>;
}

/// A batch of events to append to one run's log.
#[derive(Debug, Clone)]
pub struct EventAppend {
    /// Sequence the first event must receive; mismatch is `SequenceConflict`.
    pub expected_next: u64,
    pub idempotency_key: Option<String>,
    pub timestamp_ms: u64,
    pub events: Vec<BuildSlaveEvent>,
}

/// Where an appended batch landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendOutcome {
    pub first_sequence: u64,
    pub last_sequence: u64,
    /// True when the idempotency key matched an earlier batch and nothing was written.
    #[serde(default)]
    pub deduplicated: bool,
}

impl AppendOutcome {
    pub fn next_sequence(&self) -> u64 {
        self.last_sequence + 1
    }
}

/// Append-only per-run event logs.
#[async_trait]
pub trait EventLogStore: Send + Sync + 'static {
    /// Sequence number the next appended event will receive.
    async fn next_sequence(&self, run: &RunKey) -> StoreResult<u64>;

    /// Append a non-empty batch atomically.
    ///
    /// A batch whose idempotency key was already recorded for the run returns
    /// the recorded outcome with `deduplicated` set, regardless of `expected_next`.
    async fn append_events(&self, run: &RunKey, append: EventAppend) -> StoreResult<AppendOutcome>;

    /// Events with `sequence >= since`, in order.
    async fn read_events(&self, run: &RunKey, since: u64) -> StoreResult<Vec<SequencedEvent>>;

    /// Runs of a build that have at least one event.
    async fn list_runs(&self, id: &StampedeId) -> StoreResult<Vec<BuildSlaveRunId>>;

    async fn delete_events(&self, id: &StampedeId) -> StoreResult<()>;
}

/// Offsets assigned to an appended group of lines (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub first_offset: u64,
    pub last_offset: u64,
}

/// Append-only per-stream log lines with stable offsets.
#[async_trait]
pub trait LogLineStore: Send + Sync + 'static {
    /// Append non-empty `lines` atomically; offsets continue from the stream's end.
    async fn append_lines(&self, stream: &LogStreamKey, lines: Vec<String>) -> StoreResult<LineRange>;

    /// Up to `max_lines` lines starting at `from_offset`. Unknown streams read as empty.
    async fn read_lines(
        &self,
        stream: &LogStreamKey,
        from_offset: u64,
        max_lines: usize,
    ) -> StoreResult<Vec<LogLine>>;

    /// Stream names a run has written to.
    async fn list_streams(&self, run: &RunKey) -> StoreResult<Vec<String>>;

    async fn delete_lines(&self, id: &StampedeId) -> StoreResult<()>;
}

/// Minion progress reports and final statistics.
#[async_trait]
pub trait SlaveStatusStore: Send + Sync + 'static {
    async fn put_status(&self, run: &RunKey, status: BuildSlaveStatus) -> StoreResult<()>;

    async fn get_status(&self, run: &RunKey) -> StoreResult<Option<BuildSlaveStatus>>;

    /// Store final stats once. Returns false (and keeps the original) if already stored.
    async fn put_finished_stats(
        &self,
        run: &RunKey,
        stats: BuildSlaveFinishedStats,
    ) -> StoreResult<bool>;

    async fn get_finished_stats(&self, run: &RunKey) -> StoreResult<Option<BuildSlaveFinishedStats>>;

    /// Runs of a build that reported status or stats.
    async fn list_reporting_runs(&self, id: &StampedeId) -> StoreResult<Vec<BuildSlaveRunId>>;

    async fn delete_statuses(&self, id: &StampedeId) -> StoreResult<()>;
}
