// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run event logs.

use async_trait::async_trait;
use sd_core::{BuildSlaveRunId, RunKey, SequencedEvent, StampedeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use super::MemoryStore;
use crate::{AppendOutcome, EventAppend, EventLogStore, StoreError, StoreResult};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct EventTable {
    pub(crate) runs: BTreeMap<StampedeId, BTreeMap<BuildSlaveRunId, RunEvents>>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RunEvents {
    pub(crate) events: Vec<SequencedEvent>,
    /// idempotency key -> outcome of the batch that first used it
    #[serde(default)]
    pub(crate) batches: BTreeMap<String, AppendOutcome>,
    /// keys of `batches`, oldest first
    #[serde(default)]
    pub(crate) key_order: VecDeque<String>,
}

/// Idempotency keys remembered per run. Retries land within a few batches of
/// the original, so only the newest keys are kept.
pub(crate) const MAX_IDEMPOTENCY_KEYS: usize = 1024;

impl RunEvents {
    fn remember(&mut self, key: String, outcome: AppendOutcome) {
        self.key_order.push_back(key.clone());
        self.batches.insert(key, outcome);
        while self.key_order.len() > MAX_IDEMPOTENCY_KEYS {
            if let Some(oldest) = self.key_order.pop_front() {
                self.batches.remove(&oldest);
            }
        }
    }
}

impl EventTable {
    fn run(&self, run: &RunKey) -> Option<&RunEvents> {
        self.runs.get(&run.stampede_id).and_then(|runs| runs.get(&run.run_id))
    }
}

#[async_trait]
impl EventLogStore for MemoryStore {
    async fn next_sequence(&self, run: &RunKey) -> StoreResult<u64> {
        Ok(self.events.read().run(run).map_or(0, |r| r.events.len() as u64))
    }

    async fn append_events(&self, run: &RunKey, append: EventAppend) -> StoreResult<AppendOutcome> {
        if append.events.is_empty() {
            return Err(StoreError::Unavailable(format!("empty append to {run}")));
        }
        let mut table = self.events.write();
        let log = table
            .runs
            .entry(run.stampede_id.clone())
            .or_default()
            .entry(run.run_id.clone())
            .or_default();

        if let Some(key) = &append.idempotency_key {
            if let Some(outcome) = log.batches.get(key) {
                return Ok(AppendOutcome { deduplicated: true, ..*outcome });
            }
        }

        let next = log.events.len() as u64;
        if append.expected_next != next {
            return Err(StoreError::SequenceConflict {
                run: run.clone(),
                expected: append.expected_next,
                actual: next,
            });
        }
        let count = append.events.len() as u64;
        log.events.extend(append.events.into_iter().enumerate().map(|(i, event)| {
            SequencedEvent { sequence: next + i as u64, timestamp_ms: append.timestamp_ms, event }
        }));
        let outcome =
            AppendOutcome { first_sequence: next, last_sequence: next + count - 1, deduplicated: false };
        if let Some(key) = append.idempotency_key {
            log.remember(key, outcome);
        }
        Ok(outcome)
    }

    async fn read_events(&self, run: &RunKey, since: u64) -> StoreResult<Vec<SequencedEvent>> {
        let table = self.events.read();
        let Some(log) = table.run(run) else {
            return Ok(Vec::new());
        };
        let start = usize::try_from(since).unwrap_or(usize::MAX).min(log.events.len());
        Ok(log.events[start..].to_vec())
    }

    async fn list_runs(&self, id: &StampedeId) -> StoreResult<Vec<BuildSlaveRunId>> {
        Ok(self
            .events
            .read()
            .runs
            .get(id)
            .map(|runs| runs.iter().filter(|(_, r)| !r.events.is_empty()).map(|(k, _)| k.clone()).collect())
            .unwrap_or_default())
    }

    async fn delete_events(&self, id: &StampedeId) -> StoreResult<()> {
        self.events.write().runs.remove(id);
        Ok(())
    }
}
