use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use runwaiter::fs::mock::MockFileSystem;
use runwaiter::fs::FileSystem;
use runwaiter::joblogs::{
    LogDirectory, LogPathProvider, LogSweeper, RetentionSweeper, SweepRequest,
};
use runwaiter_test_utils::{init_tracing, wait_until};

const CUTOFF: i64 = 1_700_000_000;

#[tokio::test]
async fn sweeper_removes_logs_of_evicted_jobs() {
    init_tracing();
    let fs = MockFileSystem::new();
    let logs = LogDirectory::new("/logs", Arc::new(fs.clone()));
    for id in ["old", "kept", "newer"] {
        fs.add_file(logs.path_for(id), format!("log of {id}"));
        fs.set_modified(logs.path_for(id), CUTOFF - 100);
    }
    fs.add_file("/logs/leftover.tmp", "x");
    fs.set_modified("/logs/leftover.tmp", CUTOFF - 100);
    fs.add_file("/elsewhere/other.log", "x");

    let shutdown = CancellationToken::new();
    let (sweeper, handle) = LogSweeper::spawn(logs.clone(), Arc::new(fs.clone()), shutdown.clone());

    sweeper.request_delete(SweepRequest {
        keep: HashMap::from([("kept".to_string(), 1), ("newer".to_string(), 2)]),
        cutoff: CUTOFF,
    });

    let watched = fs.clone();
    wait_until(|| watched.files().len() == 4).await;
    assert_eq!(
        fs.files(),
        vec![
            PathBuf::from("/elsewhere/other.log"),
            logs.path_for("kept"),
            PathBuf::from("/logs/leftover.tmp"),
            logs.path_for("newer"),
        ]
    );

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn log_of_job_registered_after_eviction_is_kept() {
    init_tracing();
    let fs = MockFileSystem::new();
    let logs = LogDirectory::new("/logs", Arc::new(fs.clone()));
    fs.add_file(logs.path_for("evicted"), "x");
    fs.set_modified(logs.path_for("evicted"), CUTOFF - 1);
    // Written by a run that started after the survivor set was captured.
    fs.add_file(logs.path_for("fresh"), "x");
    fs.set_modified(logs.path_for("fresh"), CUTOFF + 5);

    let shutdown = CancellationToken::new();
    let (sweeper, handle) = LogSweeper::spawn(logs.clone(), Arc::new(fs.clone()), shutdown.clone());

    sweeper.request_delete(SweepRequest {
        keep: HashMap::new(),
        cutoff: CUTOFF,
    });

    let watched = fs.clone();
    let evicted = logs.path_for("evicted");
    wait_until(move || !watched.is_file(&evicted)).await;
    assert_eq!(fs.files(), vec![logs.path_for("fresh")]);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn requests_after_shutdown_are_dropped_quietly() {
    init_tracing();
    let fs = MockFileSystem::new();
    let logs = LogDirectory::new("/logs", Arc::new(fs.clone()));
    fs.add_file(logs.path_for("a"), "x");

    let shutdown = CancellationToken::new();
    let (sweeper, handle) = LogSweeper::spawn(logs.clone(), Arc::new(fs.clone()), shutdown.clone());
    shutdown.cancel();
    handle.await.unwrap();

    sweeper.request_delete(SweepRequest {
        keep: HashMap::new(),
        cutoff: i64::MAX,
    });
    assert!(fs.is_file(&logs.path_for("a")));
}
