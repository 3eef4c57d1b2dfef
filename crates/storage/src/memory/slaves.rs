// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use sd_core::{BuildSlaveFinishedStats, BuildSlaveRunId, BuildSlaveStatus, RunKey, StampedeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::MemoryStore;
use crate::{SlaveStatusStore, StoreResult};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SlaveTable {
    pub(crate) runs: BTreeMap<StampedeId, BTreeMap<BuildSlaveRunId, SlaveRecord>>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SlaveRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) status: Option<BuildSlaveStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) finished: Option<BuildSlaveFinishedStats>,
}

impl SlaveTable {
    fn record(&self, run: &RunKey) -> Option<&SlaveRecord> {
        self.runs.get(&run.stampede_id).and_then(|runs| runs.get(&run.run_id))
    }

    fn record_mut(&mut self, run: &RunKey) -> &mut SlaveRecord {
        self.runs
            .entry(run.stampede_id.clone())
            .or_default()
            .entry(run.run_id.clone())
            .or_default()
    }
}

#[async_trait]
impl SlaveStatusStore for MemoryStore {
    async fn put_status(&self, run: &RunKey, status: BuildSlaveStatus) -> StoreResult<()> {
        self.slaves.write().record_mut(run).status = Some(status);
        Ok(())
    }

    async fn get_status(&self, run: &RunKey) -> StoreResult<Option<BuildSlaveStatus>> {
        Ok(self.slaves.read().record(run).and_then(|r| r.status.clone()))
    }

    async fn put_finished_stats(
        &self,
        run: &RunKey,
        stats: BuildSlaveFinishedStats,
    ) -> StoreResult<bool> {
        let mut table = self.slaves.write();
        let record = table.record_mut(run);
        if record.finished.is_some() {
            return Ok(false);
        }
        record.finished = Some(stats);
        Ok(true)
    }

    async fn get_finished_stats(&self, run: &RunKey) -> StoreResult<Option<BuildSlaveFinishedStats>> {
        Ok(self.slaves.read().record(run).and_then(|r| r.finished.clone()))
    }

    async fn list_reporting_runs(&self, id: &StampedeId) -> StoreResult<Vec<BuildSlaveRunId>> {
        Ok(self
            .slaves
            .read()
            .runs
            .get(id)
            .map(|runs| runs.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_statuses(&self, id: &StampedeId) -> StoreResult<()> {
        self.slaves.write().runs.remove(id);
        Ok(())
    }
}
