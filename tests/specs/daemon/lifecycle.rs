// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle specs
//!
//! Verify startup, shutdown on request, and recovery from the snapshot.

use sd_daemon::lifecycle::{startup_with_clock, Config, LifecycleError};

use crate::prelude::*;

#[tokio::test]
async fn ping_hello_and_status() {
    let daemon = Daemon::start().await;
    let client = daemon.client();

    client.ping().await.unwrap();
    assert_eq!(client.hello().await.unwrap(), sd_wire::PROTOCOL_VERSION);
    client.create_build(&build_config(1)).await.unwrap();
    match client.send(sd_wire::Request::Status).await.unwrap() {
        sd_wire::Response::Status { builds_total, builds_active, .. } => {
            assert_eq!((builds_total, builds_active), (1, 1));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_request_notifies_daemon() {
    let daemon = Daemon::start().await;
    let notified = daemon.shutdown.notified();

    daemon.client().shutdown().await.unwrap();
    assert!(tokio::time::timeout(std::time::Duration::from_millis(SPEC_WAIT_MAX_MS), notified)
        .await
        .is_ok());
}

#[tokio::test]
async fn second_daemon_on_same_state_dir_is_refused() {
    let daemon = Daemon::start().await;
    let config = Config::with_settings(daemon.config().state_dir.clone(), test_settings());

    match startup_with_clock(&config, sd_core::FakeClock::new()).await {
        Err(LifecycleError::LockFailed(_)) => {}
        Err(e) => panic!("expected LockFailed, got: {e}"),
        Ok(_) => panic!("second daemon started"),
    }
    // The running daemon keeps serving and keeps its PID file
    daemon.client().ping().await.unwrap();
    assert!(daemon.config().lock_path.exists());
}

#[tokio::test]
async fn restart_recovers_builds_events_and_logs() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(2)).await.unwrap();
    client.set_coordinator(&id, "host1", 8080, None).await.unwrap();
    let run = BuildSlaveRunId::from("r1");
    client.append_events(&id, &run, numbered_events("e", 3)).await.unwrap();
    client.append_log_lines(&id, &run, "stdout", vec!["hello".into()]).await.unwrap();

    let lock_path = daemon.config().lock_path.clone();
    let snapshot_path = daemon.config().snapshot_path.clone();
    let dir = daemon.stop().await;
    assert!(!lock_path.exists());
    assert!(snapshot_path.exists());

    let daemon = Daemon::start_in(dir, test_settings()).await;
    let client = daemon.client();
    let build = client.get_build(&id).await.unwrap();
    assert_eq!(build.status, BuildStatus::MinionsAttached);
    assert_eq!(client.get_coordinator(&id).await.unwrap().unwrap().hostname, "host1");
    assert_eq!(payloads(&client.list_events(&id, &run, 0).await.unwrap()), vec!["e0", "e1", "e2"]);

    // Sequences continue where they left off
    let next = client.append_events(&id, &run, numbered_events("f", 1)).await.unwrap();
    assert_eq!(next.first_sequence, 3);

    let logs = client
        .multi_get_real_time_logs(&id, vec![LogBatchRequest::new("r1", "stdout")])
        .await
        .unwrap();
    assert_eq!(logs[0].new_lines[0].text, "hello");
}

#[tokio::test]
async fn corrupt_snapshot_fails_startup() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = Config::with_settings(dir.path().to_path_buf(), test_settings());
    std::fs::write(&config.snapshot_path, b"not a snapshot").unwrap();

    match startup_with_clock(&config, sd_core::FakeClock::new()).await {
        Err(LifecycleError::Snapshot(_)) => {}
        Err(e) => panic!("expected Snapshot error, got: {e}"),
        Ok(_) => panic!("daemon started on a corrupt snapshot"),
    }
    assert!(!config.lock_path.exists());
}
