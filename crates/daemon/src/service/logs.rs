// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time log multiplexer.
//!
//! Minions append lines to named streams; clients poll many streams in one
//! call, each with the offset they last saw, and get back only newer lines.
//! Reads never block appends.

use std::sync::Arc;

use sd_core::{BuildSlaveRunId, Clock, LogLine, RunKey, ServiceError, StampedeId};
use sd_storage::{LineRange, LogLineStore};
use sd_wire::{LogBatchRequest, LogBatchResult};
use tracing::debug;

use super::lifecycle::BuildLifecycle;
use super::store_error;
use crate::config::Limits;

pub struct LogMultiplexer<C: Clock> {
    lines: Arc<dyn LogLineStore>,
    lifecycle: Arc<BuildLifecycle<C>>,
    max_lines_per_stream: usize,
    max_response_bytes: usize,
    max_streams_per_request: usize,
}

impl<C: Clock> LogMultiplexer<C> {
    pub fn new(
        lines: Arc<dyn LogLineStore>,
        lifecycle: Arc<BuildLifecycle<C>>,
        limits: &Limits,
    ) -> Self {
        Self {
            lines,
            lifecycle,
            max_lines_per_stream: limits.max_lines_per_stream,
            max_response_bytes: limits.max_response_bytes,
            max_streams_per_request: limits.max_streams_per_request,
        }
    }

    /// Append lines to a stream. Readers see them as soon as this returns.
    pub async fn append_log_lines(
        &self,
        stampede_id: &StampedeId,
        run_id: &BuildSlaveRunId,
        stream: &str,
        lines: Vec<String>,
    ) -> Result<LineRange, ServiceError> {
        if stream.is_empty() {
            return Err(ServiceError::invalid_argument("stream name is empty"));
        }
        if lines.is_empty() {
            return Err(ServiceError::invalid_argument("no log lines to append"));
        }
        self.lifecycle.get_build(stampede_id).await?;

        let key = RunKey::new(stampede_id.clone(), run_id.clone()).stream(stream);
        let range = self.lines.append_lines(&key, lines).await.map_err(store_error)?;
        debug!(stream = %key, first = range.first_offset, last = range.last_offset, "log lines appended");
        Ok(range)
    }

    /// Read newer lines for each batch. Results line up with `batches`.
    ///
    /// One byte budget covers the whole response; once it runs out the
    /// remaining batches come back empty with their offset unchanged. The
    /// first line of a response is always included so polling makes progress.
    pub async fn multi_get_real_time_logs(
        &self,
        stampede_id: &StampedeId,
        batches: Vec<LogBatchRequest>,
    ) -> Result<Vec<LogBatchResult>, ServiceError> {
        if batches.len() > self.max_streams_per_request {
            return Err(ServiceError::invalid_argument(format!(
                "{} streams requested, limit is {}",
                batches.len(),
                self.max_streams_per_request
            )));
        }
        self.lifecycle.get_build(stampede_id).await?;

        let mut budget = ByteBudget::new(self.max_response_bytes);
        let mut results = Vec::with_capacity(batches.len());
        for batch in batches {
            if budget.exhausted {
                results.push(unchanged(batch));
                continue;
            }
            let key = RunKey::new(stampede_id.clone(), batch.run_id.clone()).stream(&batch.stream);
            let Some(from) = batch.last_offset_seen.map_or(Some(0), |seen| seen.checked_add(1))
            else {
                results.push(unchanged(batch));
                continue;
            };
            let read = self
                .lines
                .read_lines(&key, from, self.max_lines_per_stream)
                .await
                .map_err(store_error)?;
            let new_lines = budget.take(read);
            let new_last_offset =
                new_lines.last().map(|l| l.offset).or(batch.last_offset_seen);
            results.push(LogBatchResult {
                run_id: batch.run_id,
                stream: batch.stream,
                new_lines,
                new_last_offset,
            });
        }
        Ok(results)
    }
}

fn unchanged(batch: LogBatchRequest) -> LogBatchResult {
    LogBatchResult {
        run_id: batch.run_id,
        stream: batch.stream,
        new_lines: Vec::new(),
        new_last_offset: batch.last_offset_seen,
    }
}

struct ByteBudget {
    remaining: usize,
    taken_any: bool,
    exhausted: bool,
}

impl ByteBudget {
    fn new(max: usize) -> Self {
        Self { remaining: max, taken_any: false, exhausted: false }
    }

    /// Longest prefix of `lines` that fits in what is left.
    fn take(&mut self, lines: Vec<LogLine>) -> Vec<LogLine> {
        let mut taken = Vec::with_capacity(lines.len());
        for line in lines {
            let size = line.text.len();
            if size > self.remaining && self.taken_any {
                self.exhausted = true;
                break;
            }
            self.remaining = self.remaining.saturating_sub(size);
            self.taken_any = true;
            taken.push(line);
        }
        taken
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
