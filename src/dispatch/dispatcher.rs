// src/dispatch/dispatcher.rs

//! Single consumer that runs queued jobs one at a time.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ClientSection;
use crate::exec::CommandExecutor;
use crate::joblogs::LogPathProvider;
use crate::ledger::{JobRecord, LedgerReadWriter};
use crate::telemetry::Telemetry;
use crate::types::{JobKind, JobStatus};

use super::intake::IntakeReceivers;

/// Pulls job ids from the intake queues and executes them via the
/// configured [`CommandExecutor`].
///
/// Exactly one job runs at a time. When both queues have work, the branch is
/// picked at random by `tokio::select!`, so neither queue can starve the
/// other.
pub struct Dispatcher {
    ledger: Arc<dyn LedgerReadWriter>,
    executor: Arc<dyn CommandExecutor>,
    log_paths: Arc<dyn LogPathProvider>,
    telemetry: Arc<dyn Telemetry>,
    clock: Arc<dyn Clock>,
    client: ClientSection,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        ledger: Arc<dyn LedgerReadWriter>,
        executor: Arc<dyn CommandExecutor>,
        log_paths: Arc<dyn LogPathProvider>,
        telemetry: Arc<dyn Telemetry>,
        clock: Arc<dyn Clock>,
        client: ClientSection,
    ) -> Self {
        Self {
            ledger,
            executor,
            log_paths,
            telemetry,
            clock,
            client,
        }
    }

    /// Main consumer loop.
    ///
    /// Stops pulling new work once `shutdown` is cancelled. A job that is
    /// already executing is always allowed to finish.
    pub async fn run(self, mut queues: IntakeReceivers, shutdown: CancellationToken) {
        info!("dispatcher started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(id) = queues.on_demand.recv() => self.execute(&id).await,
                Some(id) = queues.periodic.recv() => self.execute(&id).await,
            }
        }

        info!("dispatcher stopped");
    }

    /// Execute a single job and record its outcome.
    pub async fn execute(&self, id: &str) {
        let Some(record) = self.ledger.read(id) else {
            warn!(job_id = %id, "dequeued job is not in the ledger; skipping");
            return;
        };
        let kind = record.kind();
        let tags = [("type", kind.as_str())];

        self.telemetry.incr("run_starting", 1, &tags);
        let started = Instant::now();

        match record.override_payload() {
            Some(payload) => {
                info!(job_id = %id, kind = kind.as_str(), payload, "starting custom client run")
            }
            None => info!(job_id = %id, kind = kind.as_str(), "starting client run"),
        }

        self.ledger.update_status(id, JobStatus::Running);
        if kind == JobKind::Periodic {
            // Recorded before the command so a stalled run still counts as
            // the latest attempt.
            self.ledger.update_last_periodic_start(self.clock.now());
        }

        let args = self.client_arguments(id, &record);
        debug!(job_id = %id, program = %self.client.path, ?args, "invoking client");
        let output = self.executor.run(&self.client.path, &args).await;
        debug!(job_id = %id, stdout = %output.stdout, "client stdout");
        debug!(job_id = %id, stderr = %output.stderr, "client stderr");

        self.ledger.update_exit_code(id, output.exit_code);
        let status = if output.success() {
            JobStatus::Complete
        } else {
            JobStatus::Failed
        };
        self.ledger.update_status(id, status);
        self.ledger.write_last_completed(id);

        info!(
            job_id = %id,
            kind = kind.as_str(),
            exit_code = output.exit_code,
            %status,
            "finished client run"
        );

        let millis = started.elapsed().as_millis() as u64;
        self.telemetry.timing("run_time_ms", millis, &tags);
        self.telemetry.incr("run_finished", 1, &tags);
    }

    /// Arguments for the client: configured leading args, `-L <log path>`,
    /// and the override for custom runs.
    pub fn client_arguments(&self, id: &str, record: &JobRecord) -> Vec<String> {
        let mut args = self.client.args.clone();
        args.push("-L".to_string());
        args.push(self.log_paths.path_for(id).to_string_lossy().into_owned());
        if let Some(payload) = record.override_payload() {
            args.push(self.client.override_flag.clone());
            args.push(payload.to_string());
        }
        args
    }
}

/// Spawn the dispatcher loop on the current runtime.
pub fn spawn_dispatcher(
    dispatcher: Dispatcher,
    queues: IntakeReceivers,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(dispatcher.run(queues, shutdown))
}
