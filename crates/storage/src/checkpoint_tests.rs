// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{BuildStore, MemoryStore};
use sd_core::test_support::build_config;
use sd_core::{Build, FakeClock};
use tempfile::tempdir;

async fn populated_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .insert_build(Build::new("stm-1".into(), build_config(1), &FakeClock::new()))
        .await
        .unwrap();
    store
}

#[test]
fn missing_snapshot_loads_as_none() {
    let dir = tempdir().unwrap();
    assert!(load_snapshot(&dir.path().join("snapshot.json.zst")).unwrap().is_none());
}

#[tokio::test]
async fn checkpoint_then_load_restores_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("snapshot.json.zst");
    let store = populated_store().await;

    let bytes = Checkpointer::new(&path).checkpoint(store.to_state()).unwrap();
    assert!(bytes > 0);
    assert!(!path.with_extension("tmp").exists());

    let snapshot = load_snapshot(&path).unwrap().unwrap();
    assert_eq!(snapshot.version, CURRENT_SNAPSHOT_VERSION);
    assert_eq!(snapshot.state, store.to_state());
}

#[tokio::test]
async fn second_checkpoint_rotates_previous_into_backup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json.zst");
    let checkpointer = Checkpointer::new(&path);

    checkpointer.checkpoint(StoreState::default()).unwrap();
    checkpointer.checkpoint(populated_store().await.to_state()).unwrap();

    let backup = load_snapshot(&path.with_extension("bak")).unwrap().unwrap();
    assert_eq!(backup.state.build_count(), 0);
    assert_eq!(load_snapshot(&path).unwrap().unwrap().state.build_count(), 1);
}

#[tokio::test]
async fn corrupt_snapshot_falls_back_to_backup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json.zst");
    let checkpointer = Checkpointer::new(&path);

    checkpointer.checkpoint(populated_store().await.to_state()).unwrap();
    checkpointer.checkpoint(StoreState::default()).unwrap();
    fs::write(&path, b"not zstd").unwrap();

    let snapshot = load_snapshot(&path).unwrap().unwrap();
    assert_eq!(snapshot.state.build_count(), 1);
}

#[test]
fn corrupt_snapshot_without_backup_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json.zst");
    fs::write(&path, b"garbage").unwrap();
    assert!(load_snapshot(&path).is_err());
}

#[test]
fn newer_snapshot_version_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json.zst");
    let json = serde_json::json!({
        "v": CURRENT_SNAPSHOT_VERSION + 1,
        "state": {},
        "created_at": "2026-01-01T00:00:00Z",
    });
    let compressed = zstd::encode_all(json.to_string().as_bytes(), 3).unwrap();
    fs::write(&path, compressed).unwrap();

    let err = load_snapshot(&path).unwrap_err();
    assert!(matches!(err, SnapshotError::UnsupportedVersion { found } if found == CURRENT_SNAPSHOT_VERSION + 1));
}
