// src/ledger/mod.rs

//! The job ledger: the single authoritative record of every run.
//!
//! - [`record`] holds the per-job data types.
//! - [`eviction`] trims old completed jobs and drives the retention loop.
//! - [`snapshot`] persists the ledger to disk and restores it on start.
//!
//! All state sits behind one readers-writer lock. Mutations take it
//! exclusively, reads share it, and nothing holds it across an `.await` or an
//! external command. Callers only ever receive copies.
//!
//! Other components get a capability view instead of the concrete type:
//! [`LedgerReader`] for status consumers, [`LedgerReadWriter`] for the
//! dispatcher and scheduler.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::LedgerSettings;
use crate::fs::FileSystem;
use crate::joblogs::RetentionSweeper;
use crate::types::{minutes_to_secs, JobId, JobStatus};

pub mod eviction;
pub mod record;
pub mod snapshot;

pub use eviction::{old_states, spawn_eviction_loop};
pub use record::{JobRecord, JobSummary};
pub use snapshot::spawn_persistence_loop;

/// Collaborators the ledger needs at runtime.
#[derive(Debug, Clone)]
pub struct LedgerContext {
    pub clock: Arc<dyn Clock>,
    pub fs: Arc<dyn FileSystem>,
    pub sweeper: Arc<dyn RetentionSweeper>,
}

/// Result of [`LedgerWriter::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// False when the request collapsed into an already-queued job.
    pub created: bool,
    pub id: JobId,
}

/// Serializable ledger contents. The lock around it is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LedgerState {
    pub(crate) records: BTreeMap<JobId, JobRecord>,
    pub(crate) last_periodic_start: i64,
    pub(crate) last_completed: Option<JobId>,
    pub(crate) interval_secs: i64,
    pub(crate) periodic_enabled: bool,
    pub(crate) max_records: usize,
    pub(crate) maintenance_end: i64,
    pub(crate) locked: bool,
}

impl LedgerState {
    fn with_settings(settings: &LedgerSettings) -> Self {
        Self {
            records: BTreeMap::new(),
            // Epoch zero: the first scheduler tick is always due.
            last_periodic_start: 0,
            last_completed: None,
            interval_secs: settings.interval_secs(),
            periodic_enabled: settings.periodic_enabled,
            max_records: settings.max_records,
            maintenance_end: 0,
            locked: false,
        }
    }

    /// Overwrite runtime settings with the current configuration.
    fn apply_settings(&mut self, settings: &LedgerSettings) {
        self.interval_secs = settings.interval_secs();
        self.periodic_enabled = settings.periodic_enabled;
        self.max_records = settings.max_records;
    }
}

/// Status view for the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub last_completed: Option<JobId>,
    pub in_maintenance: bool,
    pub maintenance_end: i64,
    pub locked: bool,
    pub periodic_enabled: bool,
    pub interval_minutes: i64,
    pub next_periodic_run: i64,
    pub records: usize,
}

/// Read-only view of the ledger.
pub trait LedgerReader: Send + Sync + Debug {
    fn read(&self, id: &str) -> Option<JobRecord>;
    fn read_all(&self) -> BTreeMap<JobId, JobRecord>;
    fn read_all_lite(&self) -> BTreeMap<JobId, JobSummary>;
    /// Job id -> registration time for every record.
    fn registration_times(&self) -> HashMap<JobId, i64>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn max_records(&self) -> usize;
    fn last_periodic_start(&self) -> i64;
    fn run_interval_secs(&self) -> i64;
    fn periodic_runs_enabled(&self) -> bool;
    fn last_completed(&self) -> Option<JobId>;
    fn maintenance_end(&self) -> i64;
    fn in_maintenance(&self) -> bool;
    fn run_lock(&self) -> bool;
    /// Epoch at which the next periodic run becomes due.
    fn next_periodic_run(&self) -> i64 {
        self.last_periodic_start()
            .saturating_add(self.run_interval_secs())
    }
    fn summary(&self) -> LedgerSummary;
}

/// Mutating view of the ledger.
pub trait LedgerWriter: Send + Sync + Debug {
    /// Register a run, or return the id of an identical run that is still
    /// waiting to start.
    fn register(&self, on_demand: bool, is_custom: bool, payload: &str) -> Registration;
    fn update_status(&self, id: &str, status: JobStatus);
    fn update_exit_code(&self, id: &str, code: i32);
    fn write_last_completed(&self, id: &str);
    /// Delete a record, but only if it is `Complete`.
    fn remove_state(&self, id: &str);
    fn update_last_periodic_start(&self, epoch: i64);
    /// Set the periodic interval in minutes.
    fn write_run_interval(&self, minutes: u64);
    fn write_periodic_runs(&self, enabled: bool);
    fn write_maintenance_end(&self, epoch: i64);
    /// Enter maintenance for `minutes` from now. Returns the end epoch.
    fn start_maintenance(&self, minutes: u64) -> i64;
    fn clear_maintenance(&self) {
        self.write_maintenance_end(0);
    }
    fn lock_runs(&self, lock: bool);
}

/// Both views, for components that drive jobs.
pub trait LedgerReadWriter: LedgerReader + LedgerWriter {}

impl<T: LedgerReader + LedgerWriter> LedgerReadWriter for T {}

/// The job ledger.
#[derive(Debug)]
pub struct JobLedger {
    state: RwLock<LedgerState>,
    snapshot_path: PathBuf,
    ctx: LedgerContext,
}

impl JobLedger {
    /// An empty ledger seeded from configuration.
    pub fn new(settings: &LedgerSettings, snapshot_path: PathBuf, ctx: LedgerContext) -> Self {
        debug!(path = %snapshot_path.display(), "creating empty job ledger");
        Self::from_state(LedgerState::with_settings(settings), snapshot_path, ctx)
    }

    pub(crate) fn from_state(state: LedgerState, snapshot_path: PathBuf, ctx: LedgerContext) -> Self {
        Self {
            state: RwLock::new(state),
            snapshot_path,
            ctx,
        }
    }

    pub fn snapshot_path(&self) -> &PathBuf {
        &self.snapshot_path
    }

    pub(crate) fn context(&self) -> &LedgerContext {
        &self.ctx
    }

    fn now(&self) -> i64 {
        self.ctx.clock.now()
    }

    fn with_record(&self, id: &str, op: &str, f: impl FnOnce(&mut JobRecord)) {
        let mut state = self.state.write();
        match state.records.get_mut(id) {
            Some(record) => f(record),
            None => warn!(job_id = %id, op, "job id not present in ledger; ignoring"),
        }
    }
}

impl LedgerReader for JobLedger {
    fn read(&self, id: &str) -> Option<JobRecord> {
        self.state.read().records.get(id).cloned()
    }

    fn read_all(&self) -> BTreeMap<JobId, JobRecord> {
        self.state.read().records.clone()
    }

    fn read_all_lite(&self) -> BTreeMap<JobId, JobSummary> {
        self.state
            .read()
            .records
            .iter()
            .map(|(id, record)| (id.clone(), JobSummary::from(record)))
            .collect()
    }

    fn registration_times(&self) -> HashMap<JobId, i64> {
        self.state
            .read()
            .records
            .iter()
            .map(|(id, record)| (id.clone(), record.registered_at))
            .collect()
    }

    fn len(&self) -> usize {
        self.state.read().records.len()
    }

    fn max_records(&self) -> usize {
        self.state.read().max_records
    }

    fn last_periodic_start(&self) -> i64 {
        self.state.read().last_periodic_start
    }

    fn run_interval_secs(&self) -> i64 {
        self.state.read().interval_secs
    }

    fn periodic_runs_enabled(&self) -> bool {
        self.state.read().periodic_enabled
    }

    fn last_completed(&self) -> Option<JobId> {
        self.state.read().last_completed.clone()
    }

    fn maintenance_end(&self) -> i64 {
        self.state.read().maintenance_end
    }

    fn in_maintenance(&self) -> bool {
        self.now() < self.maintenance_end()
    }

    fn run_lock(&self) -> bool {
        self.state.read().locked
    }

    fn summary(&self) -> LedgerSummary {
        let now = self.now();
        let state = self.state.read();
        LedgerSummary {
            last_completed: state.last_completed.clone(),
            in_maintenance: now < state.maintenance_end,
            maintenance_end: state.maintenance_end,
            locked: state.locked,
            periodic_enabled: state.periodic_enabled,
            interval_minutes: state.interval_secs / 60,
            next_periodic_run: state
                .last_periodic_start
                .saturating_add(state.interval_secs),
            records: state.records.len(),
        }
    }
}

impl LedgerWriter for JobLedger {
    fn register(&self, on_demand: bool, is_custom: bool, payload: &str) -> Registration {
        let now = self.now();
        // Scan and insert under one write guard so two callers can never both
        // create a record for the same request shape.
        let mut state = self.state.write();

        let queued = state
            .records
            .iter()
            .find(|(_, record)| record.is_queued_duplicate_of(on_demand, is_custom, payload))
            .map(|(id, _)| id.clone());

        if let Some(id) = queued {
            debug!(job_id = %id, on_demand, is_custom, "returning already queued job");
            return Registration { created: false, id };
        }

        let id = Uuid::new_v4().to_string();
        state.records.insert(
            id.clone(),
            JobRecord::registered(on_demand, is_custom, payload, now),
        );
        debug!(job_id = %id, on_demand, is_custom, "registered new job");
        Registration { created: true, id }
    }

    fn update_status(&self, id: &str, status: JobStatus) {
        debug!(job_id = %id, %status, "update status");
        self.with_record(id, "update_status", |record| record.status = status);
    }

    fn update_exit_code(&self, id: &str, code: i32) {
        debug!(job_id = %id, code, "update exit code");
        self.with_record(id, "update_exit_code", |record| record.exit_code = code);
    }

    fn write_last_completed(&self, id: &str) {
        self.state.write().last_completed = Some(id.to_string());
    }

    fn remove_state(&self, id: &str) {
        let mut state = self.state.write();
        let removable = state
            .records
            .get(id)
            .is_some_and(|record| record.status == JobStatus::Complete);
        if removable {
            state.records.remove(id);
            debug!(job_id = %id, "removed completed job from ledger");
        }
    }

    fn update_last_periodic_start(&self, epoch: i64) {
        self.state.write().last_periodic_start = epoch;
    }

    fn write_run_interval(&self, minutes: u64) {
        self.state.write().interval_secs = minutes_to_secs(minutes);
        info!(minutes, "periodic interval changed");
    }

    fn write_periodic_runs(&self, enabled: bool) {
        self.state.write().periodic_enabled = enabled;
        if enabled {
            info!("periodic runs enabled");
        } else {
            info!("periodic runs disabled");
        }
    }

    fn write_maintenance_end(&self, epoch: i64) {
        self.state.write().maintenance_end = epoch;
        debug!(epoch, "maintenance end updated");
    }

    fn start_maintenance(&self, minutes: u64) -> i64 {
        let end = self.now().saturating_add(minutes_to_secs(minutes));
        self.write_maintenance_end(end);
        info!(minutes, end, "maintenance window started");
        end
    }

    fn lock_runs(&self, lock: bool) {
        self.state.write().locked = lock;
        if lock {
            info!("runs locked; no new runs can be scheduled");
        } else {
            info!("runs unlocked; new runs can be scheduled");
        }
    }
}
