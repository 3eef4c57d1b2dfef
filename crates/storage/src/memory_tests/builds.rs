// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{BuildStore, StoreError};
use sd_core::{BuildStatus, CoordinatorAssignment};

#[tokio::test]
async fn insert_rejects_duplicate_id() {
    let store = MemoryStore::new();
    store.insert_build(build("stm-1")).await.unwrap();
    let err = store.insert_build(build("stm-1")).await.unwrap_err();
    assert_eq!(err, StoreError::AlreadyExists("stm-1".into()));
}

#[tokio::test]
async fn update_bumps_version() {
    let store = MemoryStore::new();
    store.insert_build(build("stm-1")).await.unwrap();

    let mut b = store.get_build(&"stm-1".into()).await.unwrap().unwrap();
    b.status = BuildStatus::Running;
    let stored = store.update_build(b).await.unwrap();

    assert_eq!(stored.version, 1);
    assert_eq!(store.get_build(&"stm-1".into()).await.unwrap(), Some(stored));
}

#[tokio::test]
async fn stale_update_conflicts() {
    let store = MemoryStore::new();
    store.insert_build(build("stm-1")).await.unwrap();
    let read = store.get_build(&"stm-1".into()).await.unwrap().unwrap();

    store.update_build(read.clone()).await.unwrap();
    let err = store.update_build(read).await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(
        err,
        StoreError::VersionConflict { key: "stm-1".to_string(), expected: 0, actual: 1 }
    );
}

#[tokio::test]
async fn update_of_missing_build_is_not_found() {
    let store = MemoryStore::new();
    let err = store.update_build(build("stm-x")).await.unwrap_err();
    assert_eq!(err, StoreError::NotFound("stm-x".into()));
}

#[tokio::test]
async fn coordinator_epochs_must_be_consecutive() {
    let store = MemoryStore::new();
    let id: StampedeId = "stm-1".into();

    let first = CoordinatorAssignment::succeeding(None, id.clone(), "h1", 1, 0);
    store.put_coordinator(first.clone()).await.unwrap();

    // A racing writer that read "no assignment" also computes epoch 1
    let racing = CoordinatorAssignment::succeeding(None, id.clone(), "h2", 2, 0);
    assert!(store.put_coordinator(racing).await.unwrap_err().is_conflict());

    let second = CoordinatorAssignment::succeeding(Some(&first), id.clone(), "h2", 2, 0);
    store.put_coordinator(second.clone()).await.unwrap();
    assert_eq!(store.get_coordinator(&id).await.unwrap(), Some(second));
}

#[tokio::test]
async fn delete_removes_coordinator() {
    let store = MemoryStore::new();
    let id: StampedeId = "stm-1".into();
    store.insert_build(build("stm-1")).await.unwrap();
    store
        .put_coordinator(CoordinatorAssignment::succeeding(None, id.clone(), "h", 1, 0))
        .await
        .unwrap();

    assert!(store.delete_build(&id).await.unwrap());
    assert!(!store.delete_build(&id).await.unwrap());
    assert_eq!(store.get_coordinator(&id).await.unwrap(), None);
    assert!(store.list_builds().await.unwrap().is_empty());
}
