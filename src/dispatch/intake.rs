// src/dispatch/intake.rs

//! Producer side of the dispatcher: the two intake queues and the
//! [`RunRequests`] facade that registers runs and feeds them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::CustomRunsSection;
use crate::errors::{Result, RunwaiterError};
use crate::ledger::{LedgerReadWriter, Registration};
use crate::types::JobId;

/// Sending halves of the intake queues.
#[derive(Debug, Clone)]
pub struct IntakeSenders {
    pub on_demand: mpsc::UnboundedSender<JobId>,
    pub periodic: mpsc::UnboundedSender<JobId>,
}

/// Receiving halves, owned by the dispatcher.
#[derive(Debug)]
pub struct IntakeReceivers {
    pub on_demand: mpsc::UnboundedReceiver<JobId>,
    pub periodic: mpsc::UnboundedReceiver<JobId>,
}

/// Create the on-demand and periodic intake queues.
pub fn intake_channels() -> (IntakeSenders, IntakeReceivers) {
    let (on_demand_tx, on_demand_rx) = mpsc::unbounded_channel();
    let (periodic_tx, periodic_rx) = mpsc::unbounded_channel();
    (
        IntakeSenders {
            on_demand: on_demand_tx,
            periodic: periodic_tx,
        },
        IntakeReceivers {
            on_demand: on_demand_rx,
            periodic: periodic_rx,
        },
    )
}

/// Entry point for anything that wants a client run: the HTTP layer for
/// on-demand and custom runs, the periodic scheduler for periodic ones.
///
/// The operator lock and the custom-run whitelist are enforced here. The
/// ledger itself registers whatever it is asked to.
#[derive(Debug, Clone)]
pub struct RunRequests {
    ledger: Arc<dyn LedgerReadWriter>,
    queues: IntakeSenders,
    custom_runs: CustomRunsSection,
    shutdown: CancellationToken,
}

impl RunRequests {
    pub fn new(
        ledger: Arc<dyn LedgerReadWriter>,
        queues: IntakeSenders,
        custom_runs: CustomRunsSection,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ledger,
            queues,
            custom_runs,
            shutdown,
        }
    }

    /// Request an on-demand run. Returns the id of the new run, or of the run
    /// already waiting in the queue.
    pub fn on_demand_run(&self) -> Result<JobId> {
        self.ensure_accepting()?;
        let reg = self.ledger.register(true, false, "");
        if reg.created {
            info!(job_id = %reg.id, "queued on demand run");
            self.queues
                .on_demand
                .send(reg.id.clone())
                .map_err(|_| RunwaiterError::QueueClosed)?;
        } else {
            debug!(job_id = %reg.id, "on demand run already queued");
        }
        Ok(reg.id)
    }

    /// Request a custom run carrying `payload` as the client override.
    pub fn custom_run(&self, payload: &str) -> Result<JobId> {
        self.ensure_accepting()?;
        if self.custom_runs.is_enforced() && !self.custom_runs.allowed.iter().any(|p| p == payload)
        {
            return Err(RunwaiterError::PayloadNotAllowed(payload.to_string()));
        }

        let reg = self.ledger.register(true, true, payload);
        if reg.created {
            info!(job_id = %reg.id, payload, "queued custom run");
            self.queues
                .on_demand
                .send(reg.id.clone())
                .map_err(|_| RunwaiterError::QueueClosed)?;
        } else {
            debug!(job_id = %reg.id, payload, "custom run already queued");
        }
        Ok(reg.id)
    }

    /// Request a periodic run. Only a newly created run is queued.
    ///
    /// Lock and maintenance gating is the scheduler's job, see
    /// [`time_to_run`](super::periodic::time_to_run).
    pub fn periodic_run(&self) -> Result<Registration> {
        if self.shutdown.is_cancelled() {
            return Err(RunwaiterError::ShuttingDown);
        }
        let reg = self.ledger.register(false, false, "");
        if reg.created {
            info!(job_id = %reg.id, "queued periodic run");
            self.queues
                .periodic
                .send(reg.id.clone())
                .map_err(|_| RunwaiterError::QueueClosed)?;
        } else {
            debug!(job_id = %reg.id, "periodic run already queued");
        }
        Ok(reg)
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(RunwaiterError::ShuttingDown);
        }
        if self.ledger.run_lock() {
            return Err(RunwaiterError::Locked);
        }
        Ok(())
    }
}
