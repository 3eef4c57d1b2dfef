// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator registry: the current coordinator address of each build.
//!
//! Writes are last-write-wins upserts. Each one stores `epoch = previous + 1`
//! through the store's compare-and-swap, so concurrent writers never produce
//! a torn or duplicated epoch.

use std::sync::Arc;

use sd_core::{CoordinatorAssignment, ServiceError, StampedeId};
use sd_storage::BuildStore;
use tracing::debug;

use super::store_error;

const MAX_CAS_ATTEMPTS: u32 = 8;

#[derive(Clone)]
pub struct CoordinatorRegistry {
    store: Arc<dyn BuildStore>,
}

impl CoordinatorRegistry {
    pub fn new(store: Arc<dyn BuildStore>) -> Self {
        Self { store }
    }

    /// Replace the assignment of `stampede_id`.
    ///
    /// With `expected_epoch`, the write only happens if the current epoch
    /// (0 when unassigned) matches; otherwise `StaleEpoch`.
    pub async fn assign(
        &self,
        stampede_id: &StampedeId,
        hostname: &str,
        port: u16,
        expected_epoch: Option<u64>,
        now_ms: u64,
    ) -> Result<CoordinatorAssignment, ServiceError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self.lookup(stampede_id).await?;
            let current_epoch = current.as_ref().map_or(0, |a| a.epoch);
            if let Some(expected) = expected_epoch {
                if expected != current_epoch {
                    return Err(ServiceError::StaleEpoch {
                        stampede_id: stampede_id.clone(),
                        expected,
                        current: current_epoch,
                    });
                }
            }

            let next = CoordinatorAssignment::succeeding(
                current.as_ref(),
                stampede_id.clone(),
                hostname,
                port,
                now_ms,
            );
            match self.store.put_coordinator(next.clone()).await {
                Ok(()) => return Ok(next),
                Err(e) if e.is_conflict() => {
                    debug!(stampede_id = %stampede_id, attempt, "coordinator write lost a race, retrying");
                }
                Err(e) => return Err(store_error(e)),
            }
        }
        Err(ServiceError::Unavailable(format!(
            "build {stampede_id}: coordinator write kept conflicting"
        )))
    }

    pub async fn lookup(
        &self,
        stampede_id: &StampedeId,
    ) -> Result<Option<CoordinatorAssignment>, ServiceError> {
        self.store.get_coordinator(stampede_id).await.map_err(store_error)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
