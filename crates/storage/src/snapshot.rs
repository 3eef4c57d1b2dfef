// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot format for crash recovery.
//!
//! A snapshot holds the complete contents of a [`MemoryStore`](crate::MemoryStore)
//! at a point in time. Recovery loads the newest readable snapshot and starts
//! serving from it.

use crate::StoreState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot version {found} is newer than supported version {CURRENT_SNAPSHOT_VERSION}")]
    UnsupportedVersion { found: u32 },
}

/// The store contents at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version
    #[serde(rename = "v")]
    pub version: u32,
    pub state: StoreState,
    /// When this snapshot was created
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(state: StoreState) -> Self {
        Self { version: CURRENT_SNAPSHOT_VERSION, state, created_at: Utc::now() }
    }
}

const MAX_BAK_FILES: u32 = 3;

fn bak_path(path: &Path, n: u32) -> PathBuf {
    if n == 1 {
        path.with_extension("bak")
    } else {
        path.with_extension(format!("bak.{n}"))
    }
}

/// Backups of `path`, newest first.
pub(crate) fn bak_paths(path: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    (1..=MAX_BAK_FILES).map(move |n| bak_path(path, n))
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let oldest = bak_path(path, MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak_path(path, n);
        if src.exists() {
            let _ = fs::rename(&src, bak_path(path, n + 1));
        }
    }

    bak_path(path, 1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
