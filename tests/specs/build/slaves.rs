// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minion status specs

use sd_core::{BuildMode, BuildSlaveFinishedStats, BuildSlaveStatus};

use crate::prelude::*;

fn progress(started: u32, finished: u32) -> BuildSlaveStatus {
    BuildSlaveStatus {
        total_rules: 10,
        rules_started: started,
        rules_finished: finished,
        rules_succeeded: finished,
        ..BuildSlaveStatus::default()
    }
}

fn finished(exit_code: i32) -> BuildSlaveFinishedStats {
    BuildSlaveFinishedStats {
        hostname: "minion-1".into(),
        build_mode: BuildMode::DistributedBuild,
        exit_code,
        status: progress(10, 10),
        finished_at_ms: 0,
    }
}

#[tokio::test]
async fn latest_status_report_wins() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();
    let run = BuildSlaveRunId::from("r1");

    let err = client.fetch_slave_status(&id, &run).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::UnknownRun));

    client.update_slave_status(&id, &run, progress(3, 1)).await.unwrap();
    client.update_slave_status(&id, &run, progress(6, 4)).await.unwrap();
    let status = client.fetch_slave_status(&id, &run).await.unwrap();
    assert_eq!((status.rules_started, status.rules_finished), (6, 4));
}

#[tokio::test]
async fn finished_stats_are_write_once() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(2)).await.unwrap();
    let (r1, r2) = (BuildSlaveRunId::from("r1"), BuildSlaveRunId::from("r2"));

    client.store_finished_stats(&id, &r1, finished(0)).await.unwrap();
    let err = client.store_finished_stats(&id, &r1, finished(1)).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidArgument));

    let stats = client.fetch_finished_stats(&id, vec![r1.clone(), r2]).await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].run_id, r1);
    assert_eq!(stats[0].stats.exit_code, 0);
}

#[tokio::test]
async fn runs_are_listed_once_whatever_they_reported() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(3)).await.unwrap();

    client.append_events(&id, &"r-events".into(), numbered_events("e", 1)).await.unwrap();
    client.update_slave_status(&id, &"r-status".into(), progress(1, 0)).await.unwrap();
    client.append_events(&id, &"r-both".into(), numbered_events("e", 1)).await.unwrap();
    client.store_finished_stats(&id, &"r-both".into(), finished(0)).await.unwrap();

    let runs: Vec<String> = client
        .list_slave_runs(&id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.as_str().to_string())
        .collect();
    assert_eq!(runs, vec!["r-both", "r-events", "r-status"]);
}
