// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build lifecycle manager: the only writer of build records and
//! coordinator assignments.
//!
//! Every status change is a read-modify-write of the build guarded by the
//! store's compare-and-swap on `Build::version`.

use std::sync::Arc;
use std::time::Duration;

use sd_core::{
    Build, BuildConfig, BuildStatus, Clock, CoordinatorAssignment, ServiceError, StampedeId,
    Transition,
};
use sd_storage::{BuildStore, EventLogStore, LogLineStore, SlaveStatusStore, StoreError};
use tracing::{debug, info};

use super::registry::CoordinatorRegistry;
use super::telemetry::{TelemetryForwarder, BUILD_STATUS_CATEGORY};
use super::{store_error, Store};

pub(super) const MAX_CAS_ATTEMPTS: u32 = 8;

pub struct BuildLifecycle<C: Clock> {
    store: Arc<dyn Store>,
    registry: CoordinatorRegistry,
    telemetry: TelemetryForwarder,
    clock: C,
}

impl<C: Clock> BuildLifecycle<C> {
    pub fn new<S: Store>(store: Arc<S>, telemetry: TelemetryForwarder, clock: C) -> Self {
        let builds: Arc<dyn BuildStore> = store.clone();
        Self { registry: CoordinatorRegistry::new(builds), store, telemetry, clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Validate a wire-supplied minion count.
    pub fn requested_minions(count: i64) -> Result<u32, ServiceError> {
        u32::try_from(count).map_err(|_| {
            ServiceError::invalid_argument(format!("number_of_minions must be >= 0, got {count}"))
        })
    }

    /// Register a new build in `CREATED`.
    pub async fn create_build(&self, config: BuildConfig) -> Result<StampedeId, ServiceError> {
        let build = Build::new(StampedeId::new(), config, &self.clock);
        let id = build.stampede_id.clone();
        match self.store.insert_build(build).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(id)) => {
                return Err(ServiceError::Unavailable(format!("generated duplicate id {id}")))
            }
            Err(e) => return Err(store_error(e)),
        }
        info!(stampede_id = %id, "build created");
        Ok(id)
    }

    pub async fn get_build(&self, id: &StampedeId) -> Result<Build, ServiceError> {
        self.store
            .get_build(id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| ServiceError::UnknownBuild(id.clone()))
    }

    /// All builds, oldest first.
    pub async fn list_builds(&self, active_only: bool) -> Result<Vec<Build>, ServiceError> {
        let mut builds = self.store.list_builds().await.map_err(store_error)?;
        if active_only {
            builds.retain(|b| !b.is_terminal());
        }
        builds.sort_by(|a, b| {
            (a.created_at_ms, &a.stampede_id).cmp(&(b.created_at_ms, &b.stampede_id))
        });
        Ok(builds)
    }

    /// Record the build's coordinator, replacing any earlier one.
    ///
    /// The first assignment moves the build to `COORDINATOR_ASSIGNED`; later
    /// ones (re-election) leave the status alone.
    pub async fn set_coordinator(
        &self,
        id: &StampedeId,
        hostname: &str,
        port: i64,
        expected_epoch: Option<u64>,
    ) -> Result<CoordinatorAssignment, ServiceError> {
        if hostname.trim().is_empty() {
            return Err(ServiceError::invalid_argument("coordinator hostname is empty"));
        }
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| ServiceError::invalid_argument(format!("port {port} out of range")))?;

        let build = self.get_build(id).await?;
        if build.is_terminal() {
            return Err(ServiceError::InvalidStateTransition {
                stampede_id: id.clone(),
                from: build.status,
                to: BuildStatus::CoordinatorAssigned,
            });
        }

        let assignment =
            self.registry.assign(id, hostname, port, expected_epoch, self.clock.epoch_ms()).await?;
        info!(
            stampede_id = %id,
            address = %assignment.address(),
            epoch = assignment.epoch,
            "coordinator assigned"
        );

        match self.advance(id, BuildStatus::CoordinatorAssigned, None).await {
            Ok(_) => Ok(assignment),
            // Finished concurrently; the assignment stands but the status does not move.
            Err(e @ ServiceError::InvalidStateTransition { .. }) => {
                debug!(stampede_id = %id, error = %e, "build finished while assigning coordinator");
                Ok(assignment)
            }
            Err(e) => Err(e),
        }
    }

    /// `Ok(None)` when the build exists but has no coordinator yet.
    pub async fn get_coordinator(
        &self,
        id: &StampedeId,
    ) -> Result<Option<CoordinatorAssignment>, ServiceError> {
        self.get_build(id).await?;
        self.registry.lookup(id).await
    }

    pub async fn mark_minion_attached(&self, id: &StampedeId) -> Result<Build, ServiceError> {
        self.advance(id, BuildStatus::MinionsAttached, None).await
    }

    pub async fn mark_running(&self, id: &StampedeId) -> Result<Build, ServiceError> {
        self.advance(id, BuildStatus::Running, None).await
    }

    /// Move to a terminal status. Repeating the same terminal status is a no-op.
    pub async fn mark_terminal(
        &self,
        id: &StampedeId,
        status: BuildStatus,
        message: Option<String>,
    ) -> Result<Build, ServiceError> {
        if !status.is_terminal() {
            return Err(ServiceError::invalid_argument(format!("{status} is not a terminal status")));
        }
        self.advance(id, status, message).await
    }

    /// Client-driven terminal transition.
    pub async fn set_final_status(
        &self,
        id: &StampedeId,
        status: BuildStatus,
        message: Option<String>,
    ) -> Result<Build, ServiceError> {
        self.mark_terminal(id, status, message).await
    }

    async fn advance(
        &self,
        id: &StampedeId,
        target: BuildStatus,
        message: Option<String>,
    ) -> Result<Build, ServiceError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut build = self.get_build(id).await?;
            let from = build.status;
            let transition = build
                .advance(target, message.clone(), &self.clock)
                .map_err(|e| ServiceError::transition(id, e))?;
            if transition == Transition::Unchanged {
                return Ok(build);
            }

            match self.store.update_build(build).await {
                Ok(stored) => {
                    info!(stampede_id = %id, from = %from, to = %stored.status, "build status changed");
                    self.telemetry
                        .send(BUILD_STATUS_CATEGORY, vec![format!("{id} {from} -> {}", stored.status)]);
                    return Ok(stored);
                }
                Err(e) if e.is_conflict() => {
                    debug!(stampede_id = %id, attempt, "build update lost a race, retrying");
                }
                Err(StoreError::NotFound(id)) => return Err(ServiceError::UnknownBuild(id)),
                Err(e) => return Err(store_error(e)),
            }
        }
        Err(ServiceError::Unavailable(format!("build {id}: update kept conflicting")))
    }

    /// Delete terminal builds that finished more than `retention` ago, along
    /// with everything recorded for them. Returns the affected ids.
    pub async fn prune(
        &self,
        retention: Duration,
        dry_run: bool,
    ) -> Result<Vec<StampedeId>, ServiceError> {
        let cutoff = self.clock.epoch_ms().saturating_sub(retention.as_millis() as u64);
        let expired: Vec<StampedeId> = self
            .store
            .list_builds()
            .await
            .map_err(store_error)?
            .into_iter()
            .filter(|b| b.expired_before(cutoff))
            .map(|b| b.stampede_id)
            .collect();
        if dry_run || expired.is_empty() {
            return Ok(expired);
        }

        for id in &expired {
            // Build record last, so an interrupted prune is picked up next time.
            self.store.delete_events(id).await.map_err(store_error)?;
            self.store.delete_lines(id).await.map_err(store_error)?;
            self.store.delete_statuses(id).await.map_err(store_error)?;
            self.store.delete_build(id).await.map_err(store_error)?;
        }
        info!(count = expired.len(), "pruned expired builds");
        Ok(expired)
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
