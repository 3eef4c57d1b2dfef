// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time log specs
//!
//! Minions append lines per stream; clients poll with the last offset they saw.

use crate::prelude::*;

fn texts(result: &sd_wire::LogBatchResult) -> Vec<&str> {
    result.new_lines.iter().map(|l| l.text.as_str()).collect()
}

#[tokio::test]
async fn poll_returns_only_lines_after_offset() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();
    let run = BuildSlaveRunId::from("r1");

    let range = client
        .append_log_lines(&id, &run, "stdout", vec!["line0".into(), "line1".into()])
        .await
        .unwrap();
    assert_eq!(range, 0..=1);

    let results = client
        .multi_get_real_time_logs(&id, vec![LogBatchRequest::new("r1", "stdout").after(Some(0))])
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(texts(&results[0]), vec!["line1"]);
    assert_eq!(results[0].new_last_offset, Some(1));
}

#[tokio::test]
async fn empty_stream_echoes_offset() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();
    client
        .append_log_lines(&id, &BuildSlaveRunId::from("r1"), "stdout", vec!["x".into()])
        .await
        .unwrap();

    let results = client
        .multi_get_real_time_logs(&id, vec![LogBatchRequest::new("r1", "stderr").after(Some(0))])
        .await
        .unwrap();
    assert!(results[0].new_lines.is_empty());
    assert_eq!(results[0].new_last_offset, Some(0));
}

#[tokio::test]
async fn repeated_poll_is_idempotent() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();
    let lines: Vec<String> = (0..5).map(|i| format!("l{i}")).collect();
    client.append_log_lines(&id, &BuildSlaveRunId::from("r1"), "stdout", lines).await.unwrap();

    let request = vec![LogBatchRequest::new("r1", "stdout").after(Some(1))];
    let first = client.multi_get_real_time_logs(&id, request.clone()).await.unwrap();
    let second = client.multi_get_real_time_logs(&id, request).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(texts(&first[0]), vec!["l2", "l3", "l4"]);
}

#[tokio::test]
async fn continuation_reads_every_line_once_while_minion_writes() {
    let mut settings = test_settings();
    settings.limits.max_lines_per_stream = 7;
    let daemon = Daemon::start_with(settings).await;
    let client = daemon.client();
    let id = client.create_build(&build_config(1)).await.unwrap();
    let run = BuildSlaveRunId::from("r1");

    let writer = {
        let client = daemon.client();
        let (id, run) = (id.clone(), run.clone());
        tokio::spawn(async move {
            for chunk in 0..10 {
                let lines = (0..5).map(|i| format!("c{chunk}-{i}")).collect();
                client.append_log_lines(&id, &run, "stdout", lines).await.unwrap();
            }
        })
    };

    let mut seen = Vec::new();
    let mut request = LogBatchRequest::new("r1", "stdout");
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(SPEC_WAIT_MAX_MS);
    while seen.len() < 50 {
        assert!(tokio::time::Instant::now() < deadline, "only saw {} lines", seen.len());
        let results = client.multi_get_real_time_logs(&id, vec![request.clone()]).await.unwrap();
        let result = &results[0];
        assert!(result.new_lines.len() <= 7);
        seen.extend(result.new_lines.iter().map(|l| (l.offset, l.text.clone())));
        request = result.continuation();
        if result.new_lines.is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }
    writer.await.unwrap();

    let offsets: Vec<u64> = seen.iter().map(|(o, _)| *o).collect();
    assert_eq!(offsets, (0..50).collect::<Vec<u64>>());
    let expected: Vec<String> =
        (0..10).flat_map(|c| (0..5).map(move |i| format!("c{c}-{i}"))).collect();
    let texts: Vec<String> = seen.into_iter().map(|(_, t)| t).collect();
    similar_asserts::assert_eq!(texts, expected);
}

#[tokio::test]
async fn results_follow_request_order() {
    let daemon = Daemon::start().await;
    let client = daemon.client();
    let id = client.create_build(&build_config(2)).await.unwrap();
    for (run, stream, text) in [("r1", "stdout", "a"), ("r2", "stderr", "b"), ("r1", "stderr", "c")] {
        client
            .append_log_lines(&id, &BuildSlaveRunId::from(run), stream, vec![text.into()])
            .await
            .unwrap();
    }

    let results = client
        .multi_get_real_time_logs(
            &id,
            vec![
                LogBatchRequest::new("r1", "stderr"),
                LogBatchRequest::new("r3", "stdout"),
                LogBatchRequest::new("r2", "stderr"),
                LogBatchRequest::new("r1", "stdout"),
            ],
        )
        .await
        .unwrap();
    let got: Vec<(&str, &str, Vec<&str>)> = results
        .iter()
        .map(|r| (r.run_id.as_str(), r.stream.as_str(), texts(r)))
        .collect();
    assert_eq!(
        got,
        vec![
            ("r1", "stderr", vec!["c"]),
            ("r3", "stdout", vec![]),
            ("r2", "stderr", vec!["b"]),
            ("r1", "stdout", vec!["a"]),
        ]
    );
}

#[tokio::test]
async fn logs_for_unknown_build_fail() {
    let daemon = Daemon::start().await;
    let err = daemon
        .client()
        .multi_get_real_time_logs(
            &StampedeId::from("stm-missing"),
            vec![LogBatchRequest::new("r1", "stdout")],
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::UnknownBuild));
}
