// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sd_core::test_support::build_config;
use sd_core::{Build, FakeClock, RunKey, StampedeId};

mod builds;
mod events;
mod logs;
mod slaves;

fn build(id: &str) -> Build {
    Build::new(StampedeId::from_string(id), build_config(2), &FakeClock::new())
}

fn run(stampede: &str, run: &str) -> RunKey {
    RunKey::new(stampede.into(), run.into())
}

#[tokio::test]
async fn state_round_trips_through_from_state() {
    use crate::{BuildStore, EventAppend, EventLogStore, LogLineStore};

    let store = MemoryStore::new();
    store.insert_build(build("stm-1")).await.unwrap();
    let key = run("stm-1", "run-a");
    store
        .append_events(
            &key,
            EventAppend {
                expected_next: 0,
                idempotency_key: Some("k1".into()),
                timestamp_ms: 5,
                events: sd_core::test_support::numbered_events("e", 2),
            },
        )
        .await
        .unwrap();
    store.append_lines(&key.stream("stdout"), vec!["hello".into()]).await.unwrap();

    let state = store.to_state();
    assert_eq!(state.build_count(), 1);
    assert_eq!(state.run_count(), 1);

    let json = serde_json::to_string(&state).unwrap();
    let restored: StoreState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, state);

    let reloaded = MemoryStore::from_state(restored);
    assert_eq!(reloaded.next_sequence(&key).await.unwrap(), 2);
    assert_eq!(reloaded.read_lines(&key.stream("stdout"), 0, 10).await.unwrap().len(), 1);
}

#[test]
fn empty_object_deserializes_to_empty_state() {
    let state: StoreState = serde_json::from_str("{}").unwrap();
    assert_eq!(state, StoreState::default());
}

#[tokio::test]
async fn clones_share_data() {
    use crate::BuildStore;

    let store = MemoryStore::new();
    let other = store.clone();
    store.insert_build(build("stm-1")).await.unwrap();
    assert!(other.get_build(&"stm-1".into()).await.unwrap().is_some());
}
