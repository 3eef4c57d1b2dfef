// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the Stampede coordinator service.
//!
//! The traits in [`store`] are the boundary to the durable build, event log,
//! log line, and minion status stores. [`MemoryStore`] implements all of them
//! in-process and is checkpointed to disk with [`Checkpointer`].

mod checkpoint;
mod error;
mod memory;
mod snapshot;
mod store;

#[cfg(any(test, feature = "test-support"))]
mod faulty;

pub use checkpoint::{load_snapshot, Checkpointer};
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, StoreState};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use store::{
    AppendOutcome, BuildStore, EventAppend, EventLogStore, LineRange, LogLineStore,
    SlaveStatusStore,
};

#[cfg(any(test, feature = "test-support"))]
pub use faulty::FaultyStore;
