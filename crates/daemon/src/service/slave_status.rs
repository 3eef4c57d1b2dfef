// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minion progress reports and final statistics.

use std::collections::BTreeSet;
use std::sync::Arc;

use sd_core::{
    BuildSlaveFinishedStats, BuildSlaveRunId, BuildSlaveStatus, Clock, RunKey, ServiceError,
    StampedeId,
};
use sd_storage::{EventLogStore, SlaveStatusStore};
use sd_wire::RunFinishedStats;
use tracing::{debug, info};

use super::lifecycle::BuildLifecycle;
use super::{store_error, Store};

pub struct SlaveStatusTracker<C: Clock> {
    store: Arc<dyn Store>,
    lifecycle: Arc<BuildLifecycle<C>>,
}

impl<C: Clock> SlaveStatusTracker<C> {
    pub fn new<S: Store>(store: Arc<S>, lifecycle: Arc<BuildLifecycle<C>>) -> Self {
        Self { store, lifecycle }
    }

    /// Replace the run's latest status report.
    pub async fn update_slave_status(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        status: BuildSlaveStatus,
    ) -> Result<(), ServiceError> {
        self.lifecycle.get_build(stampede_id).await?;
        let run = RunKey::new(stampede_id.clone(), run_id.clone());
        debug!(run = %run, finished = status.rules_finished, total = status.total_rules, "minion status");
        self.store.put_status(&run, status).await.map_err(store_error)
    }

    pub async fn fetch_slave_status(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
    ) -> Result<BuildSlaveStatus, ServiceError> {
        self.lifecycle.get_build(stampede_id).await?;
        let run = RunKey::new(stampede_id.clone(), run_id.clone());
        self.store.get_status(&run).await.map_err(store_error)?.ok_or_else(|| {
            ServiceError::UnknownRun { stampede_id: stampede_id.clone(), run_id: run_id.clone() }
        })
    }

    /// Record the run's final stats. A run finishes once.
    pub async fn store_finished_stats(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        stats: BuildSlaveFinishedStats,
    ) -> Result<(), ServiceError> {
        self.lifecycle.get_build(stampede_id).await?;
        let run = RunKey::new(stampede_id.clone(), run_id.clone());
        let exit_code = stats.exit_code;
        if !self.store.put_finished_stats(&run, stats).await.map_err(store_error)? {
            return Err(ServiceError::invalid_argument(format!(
                "run {run} already has finished stats"
            )));
        }
        info!(run = %run, exit_code, "minion finished");
        Ok(())
    }

    /// Stats of each listed run that has them, in request order.
    pub async fn fetch_finished_stats(
        &self,
        stampede_id: &StampedeId,
        run_ids: &[BuildSlaveRunId],
    ) -> Result<Vec<RunFinishedStats>, ServiceError> {
        self.lifecycle.get_build(stampede_id).await?;
        let mut found = Vec::new();
        for run_id in run_ids {
            let run = RunKey::new(stampede_id.clone(), run_id.clone());
            if let Some(stats) = self.store.get_finished_stats(&run).await.map_err(store_error)? {
                found.push(RunFinishedStats { run_id: run_id.clone(), stats });
            }
        }
        Ok(found)
    }

    /// Every run that reported status or wrote events, sorted.
    pub async fn list_runs(&self, stampede_id: &StampedeId) -> Result<Vec<BuildSlaveRunId>, ServiceError> {
        self.lifecycle.get_build(stampede_id).await?;
        let mut runs: BTreeSet<BuildSlaveRunId> =
            self.store.list_reporting_runs(stampede_id).await.map_err(store_error)?.into_iter().collect();
        runs.extend(self.store.list_runs(stampede_id).await.map_err(store_error)?);
        Ok(runs.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "slave_status_tests.rs"]
mod tests;
