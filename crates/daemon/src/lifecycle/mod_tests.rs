// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use sd_core::test_support::build_config;
use sd_core::{Build, FakeClock};
use sd_storage::{load_snapshot, BuildStore};
use serial_test::serial;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use super::*;

fn test_config(dir: &std::path::Path) -> Config {
    let settings = DaemonSettings {
        listen_addr: "127.0.0.1:0".to_string(),
        checkpoint_interval_ms: 20,
        ..DaemonSettings::default()
    };
    Config::with_settings(dir.to_path_buf(), settings)
}

#[test]
fn config_paths_live_under_state_dir() {
    let config = Config::with_settings(PathBuf::from("/tmp/sd"), DaemonSettings::default());
    assert_eq!(config.lock_path, PathBuf::from("/tmp/sd/daemon.pid"));
    assert_eq!(config.log_path, PathBuf::from("/tmp/sd/daemon.log"));
    assert_eq!(config.snapshot_path, PathBuf::from("/tmp/sd/snapshot.json.zst"));
}

#[test]
#[serial]
fn config_load_honours_state_dir_env() {
    let dir = tempdir().unwrap();
    std::env::set_var("SD_STATE_DIR", dir.path());
    let config = Config::load();
    std::env::remove_var("SD_STATE_DIR");
    assert_eq!(config.unwrap().state_dir, dir.path());
}

#[tokio::test]
async fn shutdown_writes_snapshot_and_removes_pid_file() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let StartupResult { mut daemon, .. } = startup(&config).await.unwrap();

    let build = Build::new("stm-1".into(), build_config(1), &FakeClock::new());
    daemon.store.insert_build(build).await.unwrap();
    daemon.shutdown().unwrap();

    assert!(!config.lock_path.exists());
    let snapshot = load_snapshot(&config.snapshot_path).unwrap().unwrap();
    assert_eq!(snapshot.state.build_count(), 1);
}

#[tokio::test]
async fn periodic_checkpoints_capture_new_builds() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let StartupResult { daemon, .. } = startup(&config).await.unwrap();

    let cancel = CancellationToken::new();
    let task = daemon.spawn_checkpoints(cancel.clone());
    let build = Build::new("stm-1".into(), build_config(1), &FakeClock::new());
    daemon.store.insert_build(build).await.unwrap();

    let mut saved = 0;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if let Ok(Some(snapshot)) = load_snapshot(&config.snapshot_path) {
            saved = snapshot.state.build_count();
            if saved == 1 {
                break;
            }
        }
    }
    cancel.cancel();
    task.await.unwrap();
    assert_eq!(saved, 1);
}
