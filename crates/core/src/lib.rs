// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sd-core: domain types for the Stampede distributed build coordinator

pub mod macros;

pub mod build;
pub mod clock;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod id;
pub mod log;
pub mod slave;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(any(test, feature = "test-support"))]
pub use build::BuildBuilder;
pub use build::{Build, BuildConfig, BuildMode, BuildStatus, Transition, TransitionError};
pub use clock::{Clock, FakeClock, SystemClock};
pub use coordinator::CoordinatorAssignment;
pub use error::{ErrorCode, ServiceError};
pub use event::{BuildSlaveEvent, BuildSlaveEventKind, SequencedEvent};
pub use id::{short, BuildSlaveRunId, StampedeId};
pub use log::{LogLine, LogStreamKey, RunKey};
pub use slave::{BuildSlaveFinishedStats, BuildSlaveStatus};
