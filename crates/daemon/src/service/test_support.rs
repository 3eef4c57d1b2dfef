// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service fixtures shared by the service tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sd_core::FakeClock;
use sd_storage::{FaultyStore, MemoryStore};

use super::{Services, TelemetryError, TelemetryForwarder, TelemetryRecord, TelemetrySink};
use crate::config::Limits;

/// Sink that keeps every record it receives.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    records: Arc<Mutex<Vec<TelemetryRecord>>>,
}

impl RecordingSink {
    pub(crate) fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }

    /// Wait for spawned sends to land.
    pub(crate) async fn wait_for(&self, count: usize) -> Vec<TelemetryRecord> {
        for _ in 0..100 {
            if self.records.lock().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.records()
    }
}

#[async_trait]
impl TelemetrySink for RecordingSink {
    async fn send(&self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

pub(crate) struct Fixture {
    pub services: Services<FakeClock>,
    pub store: Arc<FaultyStore>,
    pub clock: FakeClock,
    pub sink: RecordingSink,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub(crate) fn with_limits(limits: Limits) -> Self {
        let store = Arc::new(FaultyStore::new(MemoryStore::new()));
        let clock = FakeClock::new();
        let sink = RecordingSink::default();
        let telemetry = TelemetryForwarder::new(Arc::new(sink.clone()), Duration::from_secs(1));
        let services = Services::new(Arc::clone(&store), clock.clone(), &limits, telemetry);
        Self { services, store, clock, sink }
    }
}
