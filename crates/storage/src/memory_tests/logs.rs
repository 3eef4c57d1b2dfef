// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{LineRange, LogLineStore};

fn lines(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn offsets_continue_per_stream() {
    let store = MemoryStore::new();
    let key = run("stm-1", "run-a");
    let stdout = key.stream("stdout");

    let a = store.append_lines(&stdout, lines(&["l1", "l2"])).await.unwrap();
    let b = store.append_lines(&stdout, lines(&["l3"])).await.unwrap();
    let e = store.append_lines(&key.stream("stderr"), lines(&["e1"])).await.unwrap();

    assert_eq!(a, LineRange { first_offset: 0, last_offset: 1 });
    assert_eq!(b, LineRange { first_offset: 2, last_offset: 2 });
    assert_eq!(e, LineRange { first_offset: 0, last_offset: 0 });
    assert_eq!(store.list_streams(&key).await.unwrap(), vec!["stderr", "stdout"]);
}

#[tokio::test]
async fn read_respects_offset_and_limit() {
    let store = MemoryStore::new();
    let stdout = run("stm-1", "run-a").stream("stdout");
    store.append_lines(&stdout, lines(&["a", "b", "c", "d"])).await.unwrap();

    let page = store.read_lines(&stdout, 1, 2).await.unwrap();
    assert_eq!(page.iter().map(|l| (l.offset, l.text.as_str())).collect::<Vec<_>>(), vec![(1, "b"), (2, "c")]);
    assert!(store.read_lines(&stdout, 4, 10).await.unwrap().is_empty());
    assert!(store.read_lines(&stdout, 0, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_stream_reads_empty() {
    let store = MemoryStore::new();
    let key = run("stm-1", "run-a");
    assert!(store.read_lines(&key.stream("stdout"), 0, 10).await.unwrap().is_empty());
    assert!(store.list_streams(&key).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_append_is_rejected() {
    let store = MemoryStore::new();
    assert!(store.append_lines(&run("stm-1", "run-a").stream("stdout"), Vec::new()).await.is_err());
}
