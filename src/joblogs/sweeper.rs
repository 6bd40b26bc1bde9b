// src/joblogs/sweeper.rs

//! Removal of log files that no longer belong to a job in the ledger.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::fs::FileSystem;
use crate::joblogs::{LogDirectory, LogPathProvider};
use crate::types::JobId;

/// What the ledger still holds after an eviction pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SweepRequest {
    /// Surviving job ids with their registration time.
    pub keep: HashMap<JobId, i64>,
    /// Epoch at which `keep` was captured. Logs modified at or after it may
    /// belong to jobs registered since, and are left alone.
    pub cutoff: i64,
}

/// Receives the surviving job ids and discards any log outside them.
///
/// Implementations must not block the caller: the ledger fires this and moves
/// on.
pub trait RetentionSweeper: Send + Sync + Debug {
    fn request_delete(&self, request: SweepRequest);
}

/// Channel-backed sweeper. Requests are queued and processed by a background
/// worker spawned with [`LogSweeper::spawn`].
#[derive(Debug, Clone)]
pub struct LogSweeper {
    tx: mpsc::UnboundedSender<SweepRequest>,
}

impl LogSweeper {
    /// Spawn the sweep worker on the current Tokio runtime.
    ///
    /// The worker exits when `shutdown` is cancelled or every `LogSweeper`
    /// handle has been dropped.
    pub fn spawn(
        logs: LogDirectory,
        fs: Arc<dyn FileSystem>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SweepRequest>();

        let handle = tokio::spawn(async move {
            debug!(dir = %logs.dir().display(), "log sweeper started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    request = rx.recv() => match request {
                        Some(request) => clear_old_logs(&logs, fs.as_ref(), &request),
                        None => break,
                    },
                }
            }
            debug!("log sweeper finished");
        });

        (Self { tx }, handle)
    }
}

impl RetentionSweeper for LogSweeper {
    fn request_delete(&self, request: SweepRequest) {
        if self.tx.send(request).is_err() {
            warn!("log sweeper is not running; dropping delete request");
        }
    }
}

/// Delete every stale job log in the log directory that is not the log of a
/// kept job.
fn clear_old_logs(logs: &LogDirectory, fs: &dyn FileSystem, request: &SweepRequest) {
    let entries = match fs.read_dir(logs.dir()) {
        Ok(entries) => entries,
        Err(e) => {
            error!(error = %e, "failed to list log directory");
            return;
        }
    };

    let mut all_logs = Vec::with_capacity(entries.len());
    for path in entries.into_iter().filter(|p| fs.is_file(p)) {
        match fs.modified(&path) {
            Ok(mtime) => all_logs.push((path, mtime)),
            Err(e) => warn!(file = %path.display(), error = %e, "cannot read log mtime; keeping it"),
        }
    }

    for old_file in files_to_delete(logs, request, &all_logs) {
        match fs.remove_file(&old_file) {
            Ok(()) => info!(file = %old_file.display(), "deleted old job log"),
            Err(e) => warn!(file = %old_file.display(), error = %e, "failed to delete job log"),
        }
    }
}

/// Files from `all_logs` (path, mtime) to delete: `*.log` files that are not
/// `path_for(id)` for any kept id and were last modified before the cutoff.
pub fn files_to_delete(
    paths: &dyn LogPathProvider,
    request: &SweepRequest,
    all_logs: &[(PathBuf, i64)],
) -> Vec<PathBuf> {
    let kept: HashSet<PathBuf> = request.keep.keys().map(|id| paths.path_for(id)).collect();
    let old: Vec<PathBuf> = all_logs
        .iter()
        .filter(|(file, mtime)| {
            file.extension().is_some_and(|ext| ext == "log")
                && *mtime < request.cutoff
                && !kept.contains(file)
        })
        .map(|(file, _)| file.clone())
        .collect();
    debug!(?old, "log files to delete");
    old
}
