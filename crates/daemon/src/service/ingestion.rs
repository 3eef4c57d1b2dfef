// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event ingestion: ordered, gap-free appends to per-run event logs.
//!
//! Within one daemon a per-run async mutex serializes batches. Across daemons
//! sharing a store the append is a compare-and-swap on the expected next
//! sequence, retried a few times on conflict.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sd_core::{
    BuildSlaveEvent, BuildSlaveEventKind, BuildSlaveRunId, BuildStatus, Clock, RunKey,
    SequencedEvent, ServiceError, StampedeId,
};
use sd_storage::{AppendOutcome, EventAppend, EventLogStore};
use tracing::{debug, warn};

use super::lifecycle::BuildLifecycle;
use super::store_error;
use crate::config::Limits;

const MAX_CONFLICT_RETRIES: u32 = 3;

type RunLock = Arc<tokio::sync::Mutex<()>>;

/// Per-run write locks. An entry lives only while someone holds or awaits it.
#[derive(Default)]
struct RunLocks {
    locks: Mutex<HashMap<RunKey, RunLock>>,
}

impl RunLocks {
    fn acquire(&self, run: &RunKey) -> RunLock {
        Arc::clone(self.locks.lock().entry(run.clone()).or_default())
    }

    fn release(&self, run: &RunKey, lock: RunLock) {
        let mut locks = self.locks.lock();
        drop(lock);
        if locks.get(run).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(run);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

pub struct EventIngestion<C: Clock> {
    events: Arc<dyn EventLogStore>,
    lifecycle: Arc<BuildLifecycle<C>>,
    locks: RunLocks,
    max_batch_len: usize,
    max_batch_bytes: usize,
}

impl<C: Clock> EventIngestion<C> {
    pub fn new(
        events: Arc<dyn EventLogStore>,
        lifecycle: Arc<BuildLifecycle<C>>,
        limits: &Limits,
    ) -> Self {
        Self {
            events,
            lifecycle,
            locks: RunLocks::default(),
            max_batch_len: limits.max_event_batch_len,
            max_batch_bytes: limits.max_event_batch_bytes,
        }
    }

    /// Append `events` in order to the run's log.
    ///
    /// A batch whose `idempotency_key` was already applied to this run is not
    /// written again; the original outcome comes back with `deduplicated` set.
    pub async fn append_events(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        events: Vec<BuildSlaveEvent>,
        idempotency_key: Option<String>,
    ) -> Result<AppendOutcome, ServiceError> {
        self.validate(&events)?;
        let status_before = self.lifecycle.get_build(stampede_id).await?.status;

        let run = RunKey::new(stampede_id.clone(), run_id.clone());
        let kinds: Vec<BuildSlaveEventKind> = events.iter().filter_map(|e| e.kind).collect();

        let lock = self.locks.acquire(&run);
        let outcome = {
            let _guard = lock.lock().await;
            self.append_locked(&run, events, idempotency_key).await
        };
        self.locks.release(&run, lock);
        let outcome = outcome?;

        debug!(
            run = %run,
            first = outcome.first_sequence,
            last = outcome.last_sequence,
            deduplicated = outcome.deduplicated,
            "events appended"
        );
        if !outcome.deduplicated {
            self.apply_lifecycle_effects(&run, status_before, &kinds).await;
        }
        Ok(outcome)
    }

    /// Every event with `sequence >= since_sequence`. Unknown runs read as empty.
    pub async fn list_events(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        since_sequence: u64,
    ) -> Result<Vec<SequencedEvent>, ServiceError> {
        self.lifecycle.get_build(stampede_id).await?;
        let run = RunKey::new(stampede_id.clone(), run_id.clone());
        self.events.read_events(&run, since_sequence).await.map_err(store_error)
    }

    fn validate(&self, events: &[BuildSlaveEvent]) -> Result<(), ServiceError> {
        if events.is_empty() {
            return Err(ServiceError::invalid_argument("event batch is empty"));
        }
        if events.len() > self.max_batch_len {
            return Err(ServiceError::invalid_argument(format!(
                "event batch of {} exceeds limit of {}",
                events.len(),
                self.max_batch_len
            )));
        }
        let bytes: usize = events.iter().map(|e| e.payload.len()).sum();
        if bytes > self.max_batch_bytes {
            return Err(ServiceError::invalid_argument(format!(
                "event batch payload of {bytes} bytes exceeds limit of {}",
                self.max_batch_bytes
            )));
        }
        Ok(())
    }

    async fn append_locked(
        &self,
        run: &RunKey,
        events: Vec<BuildSlaveEvent>,
        idempotency_key: Option<String>,
    ) -> Result<AppendOutcome, ServiceError> {
        let timestamp_ms = self.lifecycle.clock().epoch_ms();
        for attempt in 0..=MAX_CONFLICT_RETRIES {
            let expected_next = self.events.next_sequence(run).await.map_err(store_error)?;
            let append = EventAppend {
                expected_next,
                idempotency_key: idempotency_key.clone(),
                timestamp_ms,
                events: events.clone(),
            };
            match self.events.append_events(run, append).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_conflict() => {
                    debug!(run = %run, attempt, error = %e, "event append lost a race");
                }
                Err(e) => return Err(store_error(e)),
            }
        }
        Err(ServiceError::Unavailable(format!("run {run}: event append kept conflicting")))
    }

    /// Advance the build as the events imply. Appends are accepted even when
    /// the build can no longer move, so refused transitions are only logged.
    ///
    /// Any write means a minion is attached. The attach is tried on every
    /// batch while the build was still waiting for one, so a transition lost
    /// to a store failure is picked up by the next batch.
    async fn apply_lifecycle_effects(
        &self,
        run: &RunKey,
        status_before: BuildStatus,
        kinds: &[BuildSlaveEventKind],
    ) {
        let id = &run.stampede_id;
        if matches!(status_before, BuildStatus::Created | BuildStatus::CoordinatorAssigned) {
            log_effect(run, self.lifecycle.mark_minion_attached(id).await);
        }
        if kinds.contains(&BuildSlaveEventKind::RuleStarted) {
            log_effect(run, self.lifecycle.mark_running(id).await);
        }
        let exit_code = kinds.iter().find_map(|k| match k {
            BuildSlaveEventKind::CoordinatorFinished { exit_code } => Some(*exit_code),
            _ => None,
        });
        if let Some(exit_code) = exit_code {
            let status = if exit_code == 0 {
                BuildStatus::FinishedSuccess
            } else {
                BuildStatus::FinishedFailure
            };
            let message = Some(format!("coordinator exited with code {exit_code}"));
            log_effect(run, self.lifecycle.mark_terminal(id, status, message).await);
        }
    }
}

fn log_effect<T>(run: &RunKey, result: Result<T, ServiceError>) {
    match result {
        Ok(_) => {}
        Err(e @ ServiceError::InvalidStateTransition { .. }) => {
            debug!(run = %run, error = %e, "event did not move build");
        }
        Err(e) => warn!(run = %run, error = %e, "failed to apply event to build status"),
    }
}

#[cfg(test)]
#[path = "ingestion_tests.rs"]
mod tests;
