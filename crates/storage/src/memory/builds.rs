// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build records and coordinator assignments.

use async_trait::async_trait;
use sd_core::{Build, CoordinatorAssignment, StampedeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::MemoryStore;
use crate::{BuildStore, StoreError, StoreResult};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct BuildTable {
    pub(crate) builds: BTreeMap<StampedeId, Build>,
    #[serde(default)]
    pub(crate) coordinators: BTreeMap<StampedeId, CoordinatorAssignment>,
}

#[async_trait]
impl BuildStore for MemoryStore {
    async fn insert_build(&self, build: Build) -> StoreResult<()> {
        let mut table = self.builds.write();
        if table.builds.contains_key(&build.stampede_id) {
            return Err(StoreError::AlreadyExists(build.stampede_id));
        }
        table.builds.insert(build.stampede_id.clone(), build);
        Ok(())
    }

    async fn get_build(&self, id: &StampedeId) -> StoreResult<Option<Build>> {
        Ok(self.builds.read().builds.get(id).cloned())
    }

    async fn update_build(&self, mut build: Build) -> StoreResult<Build> {
        let mut table = self.builds.write();
        let stored = table
            .builds
            .get_mut(&build.stampede_id)
            .ok_or_else(|| StoreError::NotFound(build.stampede_id.clone()))?;
        if stored.version != build.version {
            return Err(StoreError::VersionConflict {
                key: build.stampede_id.to_string(),
                expected: build.version,
                actual: stored.version,
            });
        }
        build.version += 1;
        *stored = build.clone();
        Ok(build)
    }

    async fn list_builds(&self) -> StoreResult<Vec<Build>> {
        Ok(self.builds.read().builds.values().cloned().collect())
    }

    async fn delete_build(&self, id: &StampedeId) -> StoreResult<bool> {
        let mut table = self.builds.write();
        table.coordinators.remove(id);
        Ok(table.builds.remove(id).is_some())
    }

    async fn get_coordinator(&self, id: &StampedeId) -> StoreResult<Option<CoordinatorAssignment>> {
        Ok(self.builds.read().coordinators.get(id).cloned())
    }

    async fn put_coordinator(&self, assignment: CoordinatorAssignment) -> StoreResult<()> {
        let mut table = self.builds.write();
        let current = table.coordinators.get(&assignment.stampede_id).map_or(0, |a| a.epoch);
        if assignment.epoch != current + 1 {
            return Err(StoreError::VersionConflict {
                key: format!("{}/coordinator", assignment.stampede_id),
                expected: assignment.epoch.saturating_sub(1),
                actual: current,
            });
        }
        table.coordinators.insert(assignment.stampede_id.clone(), assignment);
        Ok(())
    }
}
