// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::service::test_support::Fixture;
use sd_core::test_support::{build_config, numbered_events};
use sd_core::BuildMode;

async fn build(fx: &Fixture) -> StampedeId {
    fx.services.lifecycle.create_build(build_config(2)).await.unwrap()
}

fn status(finished: u32) -> BuildSlaveStatus {
    BuildSlaveStatus { total_rules: 10, rules_started: finished, rules_finished: finished, ..Default::default() }
}

fn stats(exit_code: i32) -> BuildSlaveFinishedStats {
    BuildSlaveFinishedStats {
        hostname: "minion-1".to_string(),
        build_mode: BuildMode::DistributedBuild,
        exit_code,
        status: status(10),
        finished_at_ms: 5,
    }
}

#[tokio::test]
async fn latest_status_wins() {
    let fx = Fixture::new();
    let id = build(&fx).await;
    let run = BuildSlaveRunId::from("r1");
    let slaves = &fx.services.slaves;

    slaves.update_slave_status(&id, &run, status(2)).await.unwrap();
    slaves.update_slave_status(&id, &run, status(7)).await.unwrap();

    assert_eq!(slaves.fetch_slave_status(&id, &run).await.unwrap(), status(7));
}

#[tokio::test]
async fn unreported_run_is_unknown() {
    let fx = Fixture::new();
    let id = build(&fx).await;
    let run = BuildSlaveRunId::from("r1");
    assert_eq!(
        fx.services.slaves.fetch_slave_status(&id, &run).await.unwrap_err(),
        ServiceError::UnknownRun { stampede_id: id.clone(), run_id: run }
    );
}

#[tokio::test]
async fn finished_stats_are_written_once() {
    let fx = Fixture::new();
    let id = build(&fx).await;
    let run = BuildSlaveRunId::from("r1");
    let slaves = &fx.services.slaves;

    slaves.store_finished_stats(&id, &run, stats(0)).await.unwrap();
    let err = slaves.store_finished_stats(&id, &run, stats(1)).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidArgument(_)), "{err}");

    let fetched = slaves.fetch_finished_stats(&id, &[run.clone()]).await.unwrap();
    assert_eq!(fetched, vec![RunFinishedStats { run_id: run, stats: stats(0) }]);
}

#[tokio::test]
async fn fetch_finished_stats_skips_runs_without_stats() {
    let fx = Fixture::new();
    let id = build(&fx).await;
    let slaves = &fx.services.slaves;
    slaves.store_finished_stats(&id, &"r2".into(), stats(3)).await.unwrap();
    slaves.store_finished_stats(&id, &"r1".into(), stats(0)).await.unwrap();

    let wanted: Vec<BuildSlaveRunId> = ["r1", "r-none", "r2"].into_iter().map(Into::into).collect();
    let fetched = slaves.fetch_finished_stats(&id, &wanted).await.unwrap();
    let runs: Vec<&str> = fetched.iter().map(|s| s.run_id.as_str()).collect();
    assert_eq!(runs, vec!["r1", "r2"]);
}

#[tokio::test]
async fn list_runs_merges_reports_and_event_logs() {
    let fx = Fixture::new();
    let id = build(&fx).await;
    let slaves = &fx.services.slaves;

    slaves.update_slave_status(&id, &"r-b".into(), status(1)).await.unwrap();
    fx.services
        .ingestion
        .append_events(&id, &"r-a".into(), numbered_events("e", 1), None)
        .await
        .unwrap();
    fx.services
        .ingestion
        .append_events(&id, &"r-b".into(), numbered_events("e", 1), None)
        .await
        .unwrap();

    let runs = slaves.list_runs(&id).await.unwrap();
    assert_eq!(runs, vec![BuildSlaveRunId::from("r-a"), BuildSlaveRunId::from("r-b")]);
}

#[tokio::test]
async fn every_operation_checks_the_build() {
    let fx = Fixture::new();
    let missing = StampedeId::from("stm-missing");
    let run = BuildSlaveRunId::from("r1");
    let slaves = &fx.services.slaves;

    let results = [
        slaves.update_slave_status(&missing, &run, status(1)).await.err(),
        slaves.fetch_slave_status(&missing, &run).await.err(),
        slaves.store_finished_stats(&missing, &run, stats(0)).await.err(),
        slaves.fetch_finished_stats(&missing, &[run.clone()]).await.err(),
        slaves.list_runs(&missing).await.err(),
    ];
    for err in results {
        assert_eq!(err, Some(ServiceError::UnknownBuild(missing.clone())));
    }
}
