// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::memory::events::MAX_IDEMPOTENCY_KEYS;
use crate::{EventAppend, EventLogStore, StoreError};
use proptest::prelude::*;
use sd_core::test_support::{numbered_events, strategies::arb_opaque_event};

fn batch(expected_next: u64, key: Option<&str>, count: usize) -> EventAppend {
    EventAppend {
        expected_next,
        idempotency_key: key.map(str::to_string),
        timestamp_ms: 100,
        events: numbered_events("e", count),
    }
}

#[tokio::test]
async fn sequences_continue_across_batches() {
    let store = MemoryStore::new();
    let key = run("stm-1", "run-a");

    let first = store.append_events(&key, batch(0, None, 2)).await.unwrap();
    let second = store.append_events(&key, batch(2, None, 3)).await.unwrap();

    assert_eq!((first.first_sequence, first.last_sequence), (0, 1));
    assert_eq!((second.first_sequence, second.last_sequence), (2, 4));
    assert_eq!(second.next_sequence(), 5);

    let sequences: Vec<u64> =
        store.read_events(&key, 0).await.unwrap().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn wrong_expected_next_conflicts_without_writing() {
    let store = MemoryStore::new();
    let key = run("stm-1", "run-a");
    store.append_events(&key, batch(0, None, 1)).await.unwrap();

    let err = store.append_events(&key, batch(0, None, 1)).await.unwrap_err();

    assert_eq!(err, StoreError::SequenceConflict { run: key.clone(), expected: 0, actual: 1 });
    assert_eq!(store.next_sequence(&key).await.unwrap(), 1);
}

#[tokio::test]
async fn repeated_idempotency_key_is_deduplicated() {
    let store = MemoryStore::new();
    let key = run("stm-1", "run-a");

    let first = store.append_events(&key, batch(0, Some("k"), 2)).await.unwrap();
    // Retried with a stale expected_next: still recognised as the same batch
    let retry = store.append_events(&key, batch(0, Some("k"), 2)).await.unwrap();

    assert!(!first.deduplicated);
    assert!(retry.deduplicated);
    assert_eq!((retry.first_sequence, retry.last_sequence), (0, 1));
    assert_eq!(store.next_sequence(&key).await.unwrap(), 2);
}

#[tokio::test]
async fn idempotency_keys_are_scoped_per_run() {
    let store = MemoryStore::new();
    store.append_events(&run("stm-1", "run-a"), batch(0, Some("k"), 1)).await.unwrap();
    let other = store.append_events(&run("stm-1", "run-b"), batch(0, Some("k"), 1)).await.unwrap();
    assert!(!other.deduplicated);
}

#[tokio::test]
async fn only_newest_idempotency_keys_are_remembered() {
    let store = MemoryStore::new();
    let key = run("stm-1", "run-a");
    let total = MAX_IDEMPOTENCY_KEYS as u64 + 1;
    for i in 0..total {
        store.append_events(&key, batch(i, Some(&format!("k{i}")), 1)).await.unwrap();
    }

    let newest = format!("k{}", total - 1);
    let retry = store.append_events(&key, batch(0, Some(&newest), 1)).await.unwrap();
    assert!(retry.deduplicated);

    // The oldest key was forgotten, so its batch is treated as new
    let stale = store.append_events(&key, batch(total, Some("k0"), 1)).await.unwrap();
    assert!(!stale.deduplicated);
    assert_eq!(stale.first_sequence, total);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let store = MemoryStore::new();
    let key = run("stm-1", "run-a");
    assert!(store.append_events(&key, batch(0, None, 0)).await.is_err());
    assert!(store.list_runs(&"stm-1".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn read_since_is_inclusive_and_tolerates_overshoot() {
    let store = MemoryStore::new();
    let key = run("stm-1", "run-a");
    store.append_events(&key, batch(0, None, 4)).await.unwrap();

    let tail = store.read_events(&key, 2).await.unwrap();
    assert_eq!(tail.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![2, 3]);
    assert!(store.read_events(&key, 99).await.unwrap().is_empty());
    assert!(store.read_events(&run("stm-1", "run-z"), 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_drops_every_run_of_the_build() {
    let store = MemoryStore::new();
    store.append_events(&run("stm-1", "run-a"), batch(0, None, 1)).await.unwrap();
    store.append_events(&run("stm-1", "run-b"), batch(0, None, 1)).await.unwrap();
    store.append_events(&run("stm-2", "run-a"), batch(0, None, 1)).await.unwrap();
    assert_eq!(store.list_runs(&"stm-1".into()).await.unwrap().len(), 2);

    store.delete_events(&"stm-1".into()).await.unwrap();

    assert!(store.list_runs(&"stm-1".into()).await.unwrap().is_empty());
    assert_eq!(store.list_runs(&"stm-2".into()).await.unwrap().len(), 1);
}

proptest! {
    #[test]
    fn any_batch_split_yields_gapless_sequences(
        batches in proptest::collection::vec(proptest::collection::vec(arb_opaque_event(), 1..5), 1..8)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = MemoryStore::new();
            let key = run("stm-1", "run-a");
            let mut expected = Vec::new();
            for events in batches {
                let next = store.next_sequence(&key).await.unwrap();
                expected.extend(events.iter().cloned());
                store
                    .append_events(&key, EventAppend { expected_next: next, idempotency_key: None, timestamp_ms: 0, events })
                    .await
                    .unwrap();
            }
            let read = store.read_events(&key, 0).await.unwrap();
            for (i, e) in read.iter().enumerate() {
                prop_assert_eq!(e.sequence, i as u64);
            }
            prop_assert_eq!(read.into_iter().map(|e| e.event).collect::<Vec<_>>(), expected);
            Ok(())
        })?;
    }
}
