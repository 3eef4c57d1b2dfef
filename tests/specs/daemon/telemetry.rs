// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry forwarding specs
//!
//! A collector on a loopback port receives one JSON line per record.

use sd_daemon::service::{TelemetryRecord, BUILD_STATUS_CATEGORY};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::prelude::*;

/// Accept connections and forward each decoded record.
async fn collector() -> (String, mpsc::UnboundedReceiver<TelemetryRecord>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = String::new();
            stream.read_to_string(&mut buf).await.unwrap();
            for line in buf.lines() {
                let _ = tx.send(serde_json::from_str(line).unwrap());
            }
        }
    });
    (addr, rx)
}

async fn next(rx: &mut mpsc::UnboundedReceiver<TelemetryRecord>) -> TelemetryRecord {
    let wait = std::time::Duration::from_millis(SPEC_WAIT_MAX_MS);
    tokio::time::timeout(wait, rx.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn client_telemetry_reaches_collector() {
    let (addr, mut rx) = collector().await;
    let mut settings = test_settings();
    settings.telemetry_addr = Some(addr);
    let daemon = Daemon::start_with(settings).await;

    daemon
        .client()
        .send_telemetry("cache", vec!["hit //a".into(), "miss //b".into()])
        .await
        .unwrap();

    let record = next(&mut rx).await;
    assert_eq!(record.category, "cache");
    assert_eq!(record.lines, vec!["hit //a", "miss //b"]);
}

#[tokio::test]
async fn status_changes_are_forwarded() {
    let (addr, mut rx) = collector().await;
    let mut settings = test_settings();
    settings.telemetry_addr = Some(addr);
    let daemon = Daemon::start_with(settings).await;

    let id = daemon.client().create_build(&build_config(1)).await.unwrap();
    daemon.client().set_final_status(&id, BuildStatus::Cancelled, None).await.unwrap();

    let record = next(&mut rx).await;
    assert_eq!(record.category, BUILD_STATUS_CATEGORY);
    assert_eq!(record.lines, vec![format!("{id} CREATED -> CANCELLED")]);
}

#[tokio::test]
async fn unreachable_collector_does_not_fail_requests() {
    let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = unused.local_addr().unwrap().to_string();
    drop(unused);

    let mut settings = test_settings();
    settings.telemetry_addr = Some(addr);
    let daemon = Daemon::start_with(settings).await;

    daemon.client().send_telemetry("cache", vec!["x".into()]).await.unwrap();
    let id = daemon.client().create_build(&build_config(1)).await.unwrap();
    daemon.client().set_final_status(&id, BuildStatus::Cancelled, None).await.unwrap();
}
