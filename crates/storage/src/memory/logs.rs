// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-stream log lines. A line's offset is its index in the stream.

use async_trait::async_trait;
use sd_core::{BuildSlaveRunId, LogLine, LogStreamKey, RunKey, StampedeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::MemoryStore;
use crate::{LineRange, LogLineStore, StoreError, StoreResult};

type Streams = BTreeMap<String, Vec<String>>;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LogTable {
    pub(crate) runs: BTreeMap<StampedeId, BTreeMap<BuildSlaveRunId, Streams>>,
}

impl LogTable {
    fn stream(&self, key: &LogStreamKey) -> Option<&Vec<String>> {
        self.runs
            .get(&key.run.stampede_id)
            .and_then(|runs| runs.get(&key.run.run_id))
            .and_then(|streams| streams.get(&key.stream))
    }
}

#[async_trait]
impl LogLineStore for MemoryStore {
    async fn append_lines(&self, stream: &LogStreamKey, lines: Vec<String>) -> StoreResult<LineRange> {
        if lines.is_empty() {
            return Err(StoreError::Unavailable(format!("empty append to {stream}")));
        }
        let mut table = self.logs.write();
        let buffer = table
            .runs
            .entry(stream.run.stampede_id.clone())
            .or_default()
            .entry(stream.run.run_id.clone())
            .or_default()
            .entry(stream.stream.clone())
            .or_default();
        let first_offset = buffer.len() as u64;
        buffer.extend(lines);
        Ok(LineRange { first_offset, last_offset: buffer.len() as u64 - 1 })
    }

    async fn read_lines(
        &self,
        stream: &LogStreamKey,
        from_offset: u64,
        max_lines: usize,
    ) -> StoreResult<Vec<LogLine>> {
        let table = self.logs.read();
        let Some(buffer) = table.stream(stream) else {
            return Ok(Vec::new());
        };
        let start = usize::try_from(from_offset).unwrap_or(usize::MAX).min(buffer.len());
        Ok(buffer[start..]
            .iter()
            .take(max_lines)
            .zip(from_offset..)
            .map(|(text, offset)| LogLine { offset, text: text.clone() })
            .collect())
    }

    async fn list_streams(&self, run: &RunKey) -> StoreResult<Vec<String>> {
        Ok(self
            .logs
            .read()
            .runs
            .get(&run.stampede_id)
            .and_then(|runs| runs.get(&run.run_id))
            .map(|streams| streams.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_lines(&self, id: &StampedeId) -> StoreResult<()> {
        self.logs.write().runs.remove(id);
        Ok(())
    }
}
