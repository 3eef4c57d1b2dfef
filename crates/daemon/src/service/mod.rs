// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator services.
//!
//! All authoritative state lives in the injected store; the services keep
//! only the per-run append locks.

mod ingestion;
mod lifecycle;
mod logs;
mod registry;
mod slave_status;
mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use ingestion::EventIngestion;
pub use lifecycle::BuildLifecycle;
pub use logs::LogMultiplexer;
pub use registry::CoordinatorRegistry;
pub use slave_status::SlaveStatusTracker;
pub use telemetry::{
    NullTelemetrySink, TcpTelemetrySink, TelemetryError, TelemetryForwarder, TelemetryRecord,
    TelemetrySink, BUILD_STATUS_CATEGORY,
};

use std::sync::Arc;

use sd_core::{Clock, ServiceError};
use sd_storage::{BuildStore, EventLogStore, LogLineStore, SlaveStatusStore, StoreError};

use crate::config::Limits;

/// Everything the services need from storage.
pub trait Store: BuildStore + EventLogStore + LogLineStore + SlaveStatusStore {}

impl<T> Store for T where T: BuildStore + EventLogStore + LogLineStore + SlaveStatusStore {}

/// Store failures reach callers as `Unavailable`.
pub(crate) fn store_error(e: StoreError) -> ServiceError {
    ServiceError::Unavailable(e.to_string())
}

/// The wired-up service set handed to the listener.
pub struct Services<C: Clock> {
    pub lifecycle: Arc<BuildLifecycle<C>>,
    pub ingestion: EventIngestion<C>,
    pub logs: LogMultiplexer<C>,
    pub slaves: SlaveStatusTracker<C>,
    pub telemetry: TelemetryForwarder,
}

impl<C: Clock> Services<C> {
    pub fn new<S: Store>(
        store: Arc<S>,
        clock: C,
        limits: &Limits,
        telemetry: TelemetryForwarder,
    ) -> Self {
        let lifecycle = Arc::new(BuildLifecycle::new(Arc::clone(&store), telemetry.clone(), clock));
        let events: Arc<dyn EventLogStore> = store.clone();
        let lines: Arc<dyn LogLineStore> = store.clone();
        Self {
            ingestion: EventIngestion::new(events, Arc::clone(&lifecycle), limits),
            logs: LogMultiplexer::new(lines, Arc::clone(&lifecycle), limits),
            slaves: SlaveStatusTracker::new(store, Arc::clone(&lifecycle)),
            lifecycle,
            telemetry,
        }
    }
}
