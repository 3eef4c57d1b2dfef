// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event ingestion specs

use crate::prelude::*;

#[tokio::test]
async fn batches_append_in_order() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();
    let run = BuildSlaveRunId::from("r1");

    let first = client.append_events(&id, &run, numbered_events("e", 2)).await.unwrap();
    assert_eq!((first.first_sequence, first.last_sequence, first.next_sequence), (0, 1, 2));
    let second =
        client.append_events(&id, &run, vec![sd_core::BuildSlaveEvent::opaque("e2")]).await.unwrap();
    assert_eq!((second.first_sequence, second.last_sequence), (2, 2));

    let events = client.list_events(&id, &run, 0).await.unwrap();
    similar_asserts::assert_eq!(payloads(&events), vec!["e0", "e1", "e2"]);
    let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2]);

    let tail = client.list_events(&id, &run, 2).await.unwrap();
    assert_eq!(payloads(&tail), vec!["e2"]);
}

#[tokio::test]
async fn concurrent_minions_never_skip_or_repeat_sequences() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(8)).await.unwrap();
    let run = BuildSlaveRunId::from("shared");

    let mut tasks = Vec::new();
    for minion in 0..8 {
        let client = daemon.client();
        let (id, run) = (id.clone(), run.clone());
        tasks.push(tokio::spawn(async move {
            for batch in 0..5 {
                let events = numbered_events(&format!("m{minion}b{batch}-"), 3);
                client.append_events(&id, &run, events).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let events = client.list_events(&id, &run, 0).await.unwrap();
    assert_eq!(events.len(), 8 * 5 * 3);
    for (expected, event) in events.iter().enumerate() {
        assert_eq!(event.sequence, expected as u64);
    }
    // Each batch stays contiguous
    for chunk in events.chunks(3) {
        let names = payloads(chunk);
        let prefix = names[0].trim_end_matches('0');
        assert_eq!(names, vec![format!("{prefix}0"), format!("{prefix}1"), format!("{prefix}2")]);
    }
}

#[tokio::test]
async fn retried_batch_with_key_is_applied_once() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();
    let run = BuildSlaveRunId::from("r1");
    let key = Some("batch-1".to_string());

    let first = client
        .append_events_with_key(&id, &run, numbered_events("e", 2), key.clone())
        .await
        .unwrap();
    let retry =
        client.append_events_with_key(&id, &run, numbered_events("e", 2), key).await.unwrap();

    assert!(!first.deduplicated);
    assert!(retry.deduplicated);
    assert_eq!((retry.first_sequence, retry.last_sequence), (0, 1));
    assert_eq!(client.list_events(&id, &run, 0).await.unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_batches_are_rejected() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();
    let run = BuildSlaveRunId::from("r1");

    let err = client.append_events(&id, &run, Vec::new()).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidArgument));

    let missing = StampedeId::from("stm-missing");
    let err = client.append_events(&missing, &run, numbered_events("e", 1)).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::UnknownBuild));

    assert!(client.list_events(&id, &run, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn batch_cap_comes_from_settings() {
    let mut settings = test_settings();
    settings.limits.max_event_batch_len = 2;
    let daemon = Daemon::start_with(settings).await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();
    let run = BuildSlaveRunId::from("r1");

    client.append_events(&id, &run, numbered_events("e", 2)).await.unwrap();
    let err = client.append_events(&id, &run, numbered_events("f", 3)).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidArgument));
}
