// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for the Stampede coordinator service.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod request;
mod response;
mod types;
mod wire;

pub use client::{AppendedEvents, Client, ClientError};
pub use request::Request;
pub use response::Response;
pub use types::{LogBatchRequest, LogBatchResult, RunFinishedStats};
pub use wire::{decode, encode, read_message, write_message, ProtocolError, MAX_FRAME_BYTES};
pub use wire::{read_request, read_response, write_request, write_response};

/// Protocol version (from Cargo.toml), exchanged in `Hello`.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
