// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writing and loading zstd-compressed JSON snapshots.

use crate::snapshot::{bak_paths, rotate_bak_path};
use crate::{Snapshot, SnapshotError, StoreState, CURRENT_SNAPSHOT_VERSION};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const ZSTD_LEVEL: i32 = 3;

/// Writes snapshots to a fixed path, keeping rotated backups of earlier ones.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    path: PathBuf,
}

impl Checkpointer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `state` as a new snapshot. Returns the compressed size in bytes.
    ///
    /// The snapshot is written to a temporary file and renamed into place, so
    /// a crash mid-write leaves the previous snapshot intact.
    pub fn checkpoint(&self, state: StoreState) -> Result<u64, SnapshotError> {
        let snapshot = Snapshot::new(state);
        let json = serde_json::to_vec(&snapshot)?;
        let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
        }
        if self.path.exists() {
            fs::rename(&self.path, rotate_bak_path(&self.path))?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            builds = snapshot.state.build_count(),
            runs = snapshot.state.run_count(),
            bytes = compressed.len(),
            "checkpoint written"
        );
        Ok(compressed.len() as u64)
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let compressed = fs::read(path)?;
    let json = zstd::decode_all(compressed.as_slice())?;
    let snapshot: Snapshot = serde_json::from_slice(&json)?;
    if snapshot.version > CURRENT_SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion { found: snapshot.version });
    }
    Ok(snapshot)
}

/// Load the snapshot at `path`, falling back to its backups if it is unreadable.
///
/// Returns `Ok(None)` when no snapshot or backup exists. When files exist but
/// none can be read, returns the error from the primary snapshot.
pub fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    let mut first_error = None;
    for candidate in std::iter::once(path.to_path_buf()).chain(bak_paths(path)) {
        if !candidate.exists() {
            continue;
        }
        match read_snapshot(&candidate) {
            Ok(snapshot) => {
                if first_error.is_some() {
                    tracing::warn!(path = %candidate.display(), "recovered from backup snapshot");
                }
                return Ok(Some(snapshot));
            }
            Err(e) => {
                tracing::warn!(path = %candidate.display(), error = %e, "unreadable snapshot");
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(None),
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
