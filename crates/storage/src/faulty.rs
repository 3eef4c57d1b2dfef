// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fault-injecting store wrapper for tests.

use async_trait::async_trait;
use sd_core::{
    Build, BuildSlaveFinishedStats, BuildSlaveRunId, BuildSlaveStatus, CoordinatorAssignment,
    LogLine, LogStreamKey, RunKey, SequencedEvent, StampedeId,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::{
    AppendOutcome, BuildStore, EventAppend, EventLogStore, LineRange, LogLineStore, MemoryStore,
    SlaveStatusStore, StoreError, StoreResult,
};

#[derive(Default)]
struct Faults {
    unavailable: AtomicBool,
    conflicts: AtomicU32,
    build_conflicts: AtomicU32,
}

/// Wraps a [`MemoryStore`] and fails calls on demand.
///
/// While unavailable, every call fails with `StoreError::Unavailable`.
/// Injected conflicts make the next N compare-and-swap writes lose their race
/// without touching the data. Build conflicts hit `update_build` only.
#[derive(Clone, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    faults: Arc<Faults>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner, faults: Arc::default() }
    }

    /// The wrapped store, bypassing fault injection.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn inject_conflicts(&self, count: u32) {
        self.faults.conflicts.store(count, Ordering::SeqCst);
    }

    pub fn inject_build_conflicts(&self, count: u32) {
        self.faults.build_conflicts.store(count, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected fault".to_string()));
        }
        Ok(())
    }

    fn take_conflict(&self) -> bool {
        take(&self.faults.conflicts)
    }

    fn take_build_conflict(&self) -> bool {
        take(&self.faults.build_conflicts) || self.take_conflict()
    }
}

fn take(counter: &AtomicU32) -> bool {
    counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

#[async_trait]
impl BuildStore for FaultyStore {
    async fn insert_build(&self, build: Build) -> StoreResult<()> {
        self.check()?;
        self.inner.insert_build(build).await
    }

    async fn get_build(&self, id: &StampedeId) -> StoreResult<Option<Build>> {
        self.check()?;
        self.inner.get_build(id).await
    }

    async fn update_build(&self, build: Build) -> StoreResult<Build> {
        self.check()?;
        if self.take_build_conflict() {
            return Err(StoreError::VersionConflict {
                key: build.stampede_id.to_string(),
                expected: build.version,
                actual: build.version + 1,
            });
        }
        self.inner.update_build(build).await
    }

    async fn list_builds(&self) -> StoreResult<Vec<Build>> {
        self.check()?;
        self.inner.list_builds().await
    }

    async fn delete_build(&self, id: &StampedeId) -> StoreResult<bool> {
        self.check()?;
        self.inner.delete_build(id).await
    }

    async fn get_coordinator(&self, id: &StampedeId) -> StoreResult<Option<CoordinatorAssignment>> {
        self.check()?;
        self.inner.get_coordinator(id).await
    }

    async fn put_coordinator(&self, assignment: CoordinatorAssignment) -> StoreResult<()> {
        self.check()?;
        if self.take_conflict() {
            return Err(StoreError::VersionConflict {
                key: format!("{}/coordinator", assignment.stampede_id),
                expected: assignment.epoch.saturating_sub(1),
                actual: assignment.epoch,
            });
        }
        self.inner.put_coordinator(assignment).await
    }
}

#[async_trait]
impl EventLogStore for FaultyStore {
    async fn next_sequence(&self, run: &RunKey) -> StoreResult<u64> {
        self.check()?;
        self.inner.next_sequence(run).await
    }

    async fn append_events(&self, run: &RunKey, append: EventAppend) -> StoreResult<AppendOutcome> {
        self.check()?;
        if self.take_conflict() {
            return Err(StoreError::SequenceConflict {
                run: run.clone(),
                expected: append.expected_next,
                actual: append.expected_next + 1,
            });
        }
        self.inner.append_events(run, append).await
    }

    async fn read_events(&self, run: &RunKey, since: u64) -> StoreResult<Vec<SequencedEvent>> {
        self.check()?;
        self.inner.read_events(run, since).await
    }

    async fn list_runs(&self, id: &StampedeId) -> StoreResult<Vec<BuildSlaveRunId>> {
        self.check()?;
        self.inner.list_runs(id).await
    }

    async fn delete_events(&self, id: &StampedeId) -> StoreResult<()> {
        self.check()?;
        self.inner.delete_events(id).await
    }
}

#[async_trait]
impl LogLineStore for FaultyStore {
    async fn append_lines(&self, stream: &LogStreamKey, lines: Vec<String>) -> StoreResult<LineRange> {
        self.check()?;
        self.inner.append_lines(stream, lines).await
    }

    async fn read_lines(
        &self,
        stream: &LogStreamKey,
        from_offset: u64,
        max_lines: usize,
    ) -> StoreResult<Vec<LogLine>> {
        self.check()?;
        self.inner.read_lines(stream, from_offset, max_lines).await
    }

    async fn list_streams(&self, run: &RunKey) -> StoreResult<Vec<String>> {
        self.check()?;
        self.inner.list_streams(run).await
    }

    async fn delete_lines(&self, id: &StampedeId) -> StoreResult<()> {
        self.check()?;
        self.inner.delete_lines(id).await
    }
}

#[async_trait]
impl SlaveStatusStore for FaultyStore {
    async fn put_status(&self, run: &RunKey, status: BuildSlaveStatus) -> StoreResult<()> {
        self.check()?;
        self.inner.put_status(run, status).await
    }

    async fn get_status(&self, run: &RunKey) -> StoreResult<Option<BuildSlaveStatus>> {
        self.check()?;
        self.inner.get_status(run).await
    }

    async fn put_finished_stats(
        &self,
        run: &RunKey,
        stats: BuildSlaveFinishedStats,
    ) -> StoreResult<bool> {
        self.check()?;
        self.inner.put_finished_stats(run, stats).await
    }

    async fn get_finished_stats(&self, run: &RunKey) -> StoreResult<Option<BuildSlaveFinishedStats>> {
        self.check()?;
        self.inner.get_finished_stats(run).await
    }

    async fn list_reporting_runs(&self, id: &StampedeId) -> StoreResult<Vec<BuildSlaveRunId>> {
        self.check()?;
        self.inner.list_reporting_runs(id).await
    }

    async fn delete_statuses(&self, id: &StampedeId) -> StoreResult<()> {
        self.check()?;
        self.inner.delete_statuses(id).await
    }
}

#[cfg(test)]
#[path = "faulty_tests.rs"]
mod tests;
