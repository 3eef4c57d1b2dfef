// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process implementation of every store trait.
//!
//! Each concern has its own lock so event appends, log appends, and log reads
//! never wait on one another. Locks are held only for the map operation
//! itself, never across an await point.

mod builds;
mod events;
mod logs;
mod slaves;

pub(crate) use builds::BuildTable;
pub(crate) use events::EventTable;
pub(crate) use logs::LogTable;
pub(crate) use slaves::SlaveTable;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Serializable contents of a [`MemoryStore`], used for snapshots.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub(crate) builds: BuildTable,
    #[serde(default)]
    pub(crate) events: EventTable,
    #[serde(default)]
    pub(crate) logs: LogTable,
    #[serde(default)]
    pub(crate) slaves: SlaveTable,
}

impl StoreState {
    pub fn build_count(&self) -> usize {
        self.builds.builds.len()
    }

    pub fn run_count(&self) -> usize {
        self.events.runs.values().map(|runs| runs.len()).sum()
    }
}

/// Thread-safe in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    builds: Arc<RwLock<BuildTable>>,
    events: Arc<RwLock<EventTable>>,
    logs: Arc<RwLock<LogTable>>,
    slaves: Arc<RwLock<SlaveTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot.
    pub fn from_state(state: StoreState) -> Self {
        Self {
            builds: Arc::new(RwLock::new(state.builds)),
            events: Arc::new(RwLock::new(state.events)),
            logs: Arc::new(RwLock::new(state.logs)),
            slaves: Arc::new(RwLock::new(state.slaves)),
        }
    }

    /// Copy out the current contents.
    ///
    /// Tables are copied one at a time, so a snapshot taken during writes may
    /// hold an event log slightly newer than its build record. Every table is
    /// individually consistent.
    pub fn to_state(&self) -> StoreState {
        StoreState {
            builds: self.builds.read().clone(),
            events: self.events.read().clone(),
            logs: self.logs.read().clone(),
            slaves: self.slaves.read().clone(),
        }
    }
}

#[cfg(test)]
#[path = "../memory_tests/mod.rs"]
mod tests;
