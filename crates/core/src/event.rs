// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minion status events.
//!
//! Payloads are opaque to the coordinator service; only the optional
//! [`BuildSlaveEventKind`] hint is interpreted, to drive lifecycle transitions.

use serde::{Deserialize, Serialize};

/// Coarse class of a minion event.
///
/// Serializes as `{"type": "rule_started"}`. Unknown tags from newer minions
/// deserialize to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildSlaveEventKind {
    Console,
    RuleStarted,
    RuleFinished,
    AllRulesFinished,
    /// Emitted by the coordinator run when the whole build is done.
    CoordinatorFinished {
        exit_code: i32,
    },
    #[serde(other)]
    Unknown,
}

crate::simple_display! {
    BuildSlaveEventKind {
        Console => "console",
        RuleStarted => "rule_started",
        RuleFinished => "rule_finished",
        AllRulesFinished => "all_rules_finished",
        CoordinatorFinished { .. } => "coordinator_finished",
        Unknown => "unknown",
    }
}

/// One event as submitted by a minion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSlaveEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<BuildSlaveEventKind>,
    #[serde(with = "payload_base64")]
    pub payload: Vec<u8>,
}

impl BuildSlaveEvent {
    pub fn opaque(payload: impl Into<Vec<u8>>) -> Self {
        Self { kind: None, payload: payload.into() }
    }

    pub fn with_kind(kind: BuildSlaveEventKind, payload: impl Into<Vec<u8>>) -> Self {
        Self { kind: Some(kind), payload: payload.into() }
    }
}

/// An event after it was appended to a run's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// Zero-based, gap-free position within the run's event log.
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub event: BuildSlaveEvent,
}

/// Byte payloads travel as standard base64 strings in JSON.
mod payload_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
