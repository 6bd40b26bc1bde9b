// src/dispatch/periodic.rs

//! Time-driven producer of periodic runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::ledger::LedgerReader;
use crate::types::JobId;

use super::intake::RunRequests;

/// Whether a periodic run is due at `now`.
///
/// True when the interval has elapsed since the last periodic start, the
/// operator lock is clear, and `now` is past the maintenance window.
pub fn time_to_run(ledger: &dyn LedgerReader, now: i64) -> bool {
    if ledger.run_lock() {
        return false;
    }
    let due = now >= ledger.next_periodic_run();
    let in_maintenance = now < ledger.maintenance_end();
    due && !in_maintenance
}

#[derive(Debug, Clone)]
pub struct PeriodicScheduler {
    ledger: Arc<dyn LedgerReader>,
    requests: RunRequests,
    clock: Arc<dyn Clock>,
}

impl PeriodicScheduler {
    pub fn new(ledger: Arc<dyn LedgerReader>, requests: RunRequests, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            requests,
            clock,
        }
    }

    pub fn time_to_run(&self) -> bool {
        time_to_run(self.ledger.as_ref(), self.clock.now())
    }

    /// One scheduler evaluation. Returns the id of a newly queued run.
    pub fn tick(&self) -> Option<JobId> {
        if !(self.time_to_run() && self.ledger.periodic_runs_enabled()) {
            return None;
        }
        match self.requests.periodic_run() {
            Ok(reg) if reg.created => Some(reg.id),
            Ok(reg) => {
                debug!(job_id = %reg.id, "periodic run already waiting; not re-queued");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to request periodic run");
                None
            }
        }
    }
}

/// Spawn the scheduler loop, evaluating every `period`.
pub fn spawn_periodic_scheduler(
    scheduler: PeriodicScheduler,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    scheduler.tick();
                }
            }
        }
        debug!("periodic scheduler finished");
    })
}
