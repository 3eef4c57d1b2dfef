// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::SlaveStatusStore;
use sd_core::{BuildMode, BuildSlaveFinishedStats, BuildSlaveStatus};

fn stats(exit_code: i32) -> BuildSlaveFinishedStats {
    BuildSlaveFinishedStats {
        hostname: "minion-1".to_string(),
        build_mode: BuildMode::DistributedBuild,
        exit_code,
        status: BuildSlaveStatus::default(),
        finished_at_ms: 0,
    }
}

#[tokio::test]
async fn status_is_last_write_wins() {
    let store = MemoryStore::new();
    let key = run("stm-1", "run-a");

    store.put_status(&key, BuildSlaveStatus { rules_started: 1, ..Default::default() }).await.unwrap();
    store.put_status(&key, BuildSlaveStatus { rules_started: 7, ..Default::default() }).await.unwrap();

    assert_eq!(store.get_status(&key).await.unwrap().map(|s| s.rules_started), Some(7));
}

#[tokio::test]
async fn finished_stats_are_write_once() {
    let store = MemoryStore::new();
    let key = run("stm-1", "run-a");

    assert!(store.put_finished_stats(&key, stats(0)).await.unwrap());
    assert!(!store.put_finished_stats(&key, stats(1)).await.unwrap());
    assert_eq!(store.get_finished_stats(&key).await.unwrap(), Some(stats(0)));
}

#[tokio::test]
async fn reporting_runs_cover_status_and_stats() {
    let store = MemoryStore::new();
    store.put_status(&run("stm-1", "run-a"), BuildSlaveStatus::default()).await.unwrap();
    store.put_finished_stats(&run("stm-1", "run-b"), stats(0)).await.unwrap();

    let runs = store.list_reporting_runs(&"stm-1".into()).await.unwrap();
    assert_eq!(runs.len(), 2);

    store.delete_statuses(&"stm-1".into()).await.unwrap();
    assert!(store.list_reporting_runs(&"stm-1".into()).await.unwrap().is_empty());
    assert_eq!(store.get_status(&run("stm-1", "run-a")).await.unwrap(), None);
}
