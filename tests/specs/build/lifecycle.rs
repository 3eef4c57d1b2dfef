// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build lifecycle specs
//!
//! Create a build, assign its coordinator, and drive it to a terminal status.

use std::time::Duration;

use crate::prelude::*;

#[tokio::test]
async fn create_build_then_assign_coordinator() {
    let daemon = Daemon::start().await;
    let client = daemon.client();

    let id = client.create_build(&build_config(4)).await.unwrap();
    let epoch = client.set_coordinator(&id, "host1", 8080, None).await.unwrap();
    assert_eq!(epoch, 1);

    let assignment = client.get_coordinator(&id).await.unwrap().unwrap();
    assert_eq!((assignment.hostname.as_str(), assignment.port), ("host1", 8080));

    let build = client.get_build(&id).await.unwrap();
    assert_eq!(build.status, BuildStatus::CoordinatorAssigned);
    assert_eq!(build.requested_minion_count, 4);
    assert_eq!(build.repository, "repo");
    assert_eq!(build.tenant_id.as_deref(), Some("t1"));
    assert_eq!(build.client_build_uuid, "u1");
    assert_eq!(build.username, "alice");
}

#[tokio::test]
async fn reelected_coordinator_replaces_the_first() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(2)).await.unwrap();

    client.set_coordinator(&id, "host1", 8080, None).await.unwrap();
    let epoch = client.set_coordinator(&id, "host2", 9090, Some(1)).await.unwrap();

    let assignment = client.get_coordinator(&id).await.unwrap().unwrap();
    assert_eq!((assignment.hostname.as_str(), assignment.port, epoch), ("host2", 9090, 2));

    // A deposed coordinator fenced on the old epoch cannot take it back
    let err = client.set_coordinator(&id, "host1", 8080, Some(1)).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::StaleEpoch));
    let assignment = client.get_coordinator(&id).await.unwrap().unwrap();
    assert_eq!(assignment.hostname, "host2");
}

#[tokio::test]
async fn coordinator_absent_until_assigned() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();

    assert!(client.get_coordinator(&id).await.unwrap().is_none());

    let err = client.get_coordinator(&StampedeId::from("stm-nope")).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::UnknownBuild));
}

#[tokio::test]
async fn minion_events_drive_build_to_success() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();
    client.set_coordinator(&id, "host1", 8080, None).await.unwrap();
    let run = BuildSlaveRunId::from("r1");

    client.append_events(&id, &run, numbered_events("e", 1)).await.unwrap();
    assert_eq!(client.get_build(&id).await.unwrap().status, BuildStatus::MinionsAttached);

    client.append_events(&id, &run, vec![rule_started_event("//app:lib")]).await.unwrap();
    assert_eq!(client.get_build(&id).await.unwrap().status, BuildStatus::Running);

    client.append_events(&id, &run, vec![coordinator_finished_event(0)]).await.unwrap();
    let build = client.get_build(&id).await.unwrap();
    assert_eq!(build.status, BuildStatus::FinishedSuccess);
    assert!(build.finished_at_ms.is_some());
}

#[tokio::test]
async fn terminal_status_is_final() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();

    let build =
        client.set_final_status(&id, BuildStatus::Cancelled, Some("user abort".into())).await.unwrap();
    assert_eq!(build.status_message.as_deref(), Some("user abort"));

    // Later minion activity is recorded but the status does not move
    let run = BuildSlaveRunId::from("r1");
    client.append_events(&id, &run, vec![rule_started_event("//late")]).await.unwrap();
    let after = client.get_build(&id).await.unwrap();
    assert_eq!(after.status, BuildStatus::Cancelled);
    assert_eq!(after.version, build.version);

    let err = client.set_final_status(&id, BuildStatus::FinishedSuccess, None).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidStateTransition));

    let err = client.set_coordinator(&id, "host1", 8080, None).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidStateTransition));
}

#[tokio::test]
async fn list_builds_filters_active() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let first = client.create_build(&build_config(1)).await.unwrap();
    daemon.clock.advance(Duration::from_millis(5));
    let second = client.create_build(&build_config(1)).await.unwrap();
    client.set_final_status(&first, BuildStatus::FinishedFailure, None).await.unwrap();

    let all: Vec<_> =
        client.list_builds(false).await.unwrap().into_iter().map(|b| b.stampede_id).collect();
    assert_eq!(all, vec![first, second.clone()]);

    let active: Vec<_> =
        client.list_builds(true).await.unwrap().into_iter().map(|b| b.stampede_id).collect();
    assert_eq!(active, vec![second]);
}

#[tokio::test]
async fn prune_removes_expired_builds_and_their_data() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let old = client.create_build(&build_config(1)).await.unwrap();
    let live = client.create_build(&build_config(1)).await.unwrap();
    let run = BuildSlaveRunId::from("r1");
    client.append_events(&old, &run, numbered_events("e", 2)).await.unwrap();
    client.append_log_lines(&old, &run, "stdout", vec!["a".into()]).await.unwrap();
    client.set_final_status(&old, BuildStatus::Cancelled, None).await.unwrap();

    daemon.clock.advance(Duration::from_secs(3600));
    let retention = Some(Duration::from_secs(60));
    assert_eq!(client.prune_builds(retention, true).await.unwrap(), vec![old.clone()]);
    assert!(client.get_build(&old).await.is_ok());

    assert_eq!(client.prune_builds(retention, false).await.unwrap(), vec![old.clone()]);
    let err = client.get_build(&old).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::UnknownBuild));
    assert!(client.get_build(&live).await.is_ok());
    assert!(client.prune_builds(retention, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn negative_minion_count_is_rejected() {
    let daemon = Daemon::start().await;
    let request = sd_wire::Request::CreateBuild {
        create_timestamp_ms: Some(42),
        build_mode: sd_core::BuildMode::DistributedBuild,
        number_of_minions: -1,
        repository: "repo".into(),
        tenant_id: None,
        build_uuid: "u1".into(),
        username: "alice".into(),
    };
    let err = daemon.client().send(request).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidArgument));
    assert!(daemon.client().list_builds(false).await.unwrap().is_empty());
}
