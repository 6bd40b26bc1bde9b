// src/ledger/snapshot.rs

//! Crash-safe persistence of the ledger.
//!
//! The whole [`LedgerState`] is encoded into one file and swapped in
//! atomically. On start the file is read back and linted: jobs that were
//! mid-flight when the previous process died can't be trusted, so
//! `running` becomes `unknown` and `registered` becomes `abandoned`.
//! Runtime settings then come from the current configuration, not the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{JobLedger, JobRecord, LedgerContext, LedgerState};
use crate::config::LedgerSettings;
use crate::errors::{Result, RunwaiterError};
use crate::fs::FileSystem;
use crate::types::JobId;

impl JobLedger {
    /// Restore the ledger from `snapshot_path`, or start empty if there is no
    /// usable snapshot.
    pub fn open(settings: &LedgerSettings, snapshot_path: PathBuf, ctx: LedgerContext) -> Self {
        match read_snapshot(ctx.fs.as_ref(), &snapshot_path) {
            Ok(mut state) => {
                lint_records(&mut state.records);
                state.apply_settings(settings);
                info!(
                    path = %snapshot_path.display(),
                    records = state.records.len(),
                    "restored job ledger from snapshot"
                );
                Self::from_state(state, snapshot_path, ctx)
            }
            Err(e) => {
                warn!(
                    path = %snapshot_path.display(),
                    error = %e,
                    "could not read ledger snapshot; starting with an empty ledger"
                );
                Self::new(settings, snapshot_path, ctx)
            }
        }
    }

    /// Write the current state to the snapshot file.
    ///
    /// Encoding happens under the shared lock so the snapshot is a
    /// consistent point-in-time copy; the file write happens after it is
    /// released.
    pub fn save_snapshot(&self) -> Result<()> {
        let bytes = {
            let state = self.state.read();
            serde_json::to_vec(&*state)?
        };
        self.context()
            .fs
            .write_atomic(&self.snapshot_path, &bytes)
            .map_err(RunwaiterError::Other)?;
        debug!(path = %self.snapshot_path.display(), bytes = bytes.len(), "saved ledger snapshot");
        Ok(())
    }
}

fn read_snapshot(fs: &dyn FileSystem, path: &Path) -> Result<LedgerState> {
    let bytes = fs.read(path).map_err(RunwaiterError::Other)?;
    let state: LedgerState = serde_json::from_slice(&bytes)?;
    Ok(state)
}

/// Reclassify jobs whose outcome was lost with the previous process.
pub(crate) fn lint_records(records: &mut BTreeMap<JobId, JobRecord>) {
    for (id, record) in records.iter_mut() {
        let linted = record.status.linted();
        if linted != record.status {
            debug!(job_id = %id, from = %record.status, to = %linted, "linted restored job");
            record.status = linted;
        }
    }
}

/// Spawn the persistence loop: snapshot every `period`, and once more when
/// `shutdown` is cancelled.
pub fn spawn_persistence_loop(
    ledger: Arc<JobLedger>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("writing final ledger snapshot");
                    persist(&ledger);
                    break;
                }
                _ = ticker.tick() => persist(&ledger),
            }
        }
        debug!("persistence loop finished");
    })
}

fn persist(ledger: &JobLedger) {
    if let Err(e) = ledger.save_snapshot() {
        error!(
            path = %ledger.snapshot_path().display(),
            error = %e,
            "failed to save ledger snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobStatus;

    #[test]
    fn lint_rewrites_only_in_flight_jobs() {
        let mut records = BTreeMap::new();
        for (id, status) in [
            ("run", JobStatus::Running),
            ("reg", JobStatus::Registered),
            ("done", JobStatus::Complete),
            ("bad", JobStatus::Failed),
        ] {
            let mut record = JobRecord::registered(true, false, "", 1);
            record.status = status;
            records.insert(id.to_string(), record);
        }

        lint_records(&mut records);

        assert_eq!(records["run"].status, JobStatus::Unknown);
        assert_eq!(records["reg"].status, JobStatus::Abandoned);
        assert_eq!(records["done"].status, JobStatus::Complete);
        assert_eq!(records["bad"].status, JobStatus::Failed);
    }
}
