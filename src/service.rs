// src/service.rs

//! Wiring of every background component around one shared ledger.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ConfigFile;
use crate::dispatch::{
    intake_channels, spawn_dispatcher, spawn_periodic_scheduler, Dispatcher, PeriodicScheduler,
    RunRequests,
};
use crate::errors::{Result, RunwaiterError};
use crate::exec::{CommandExecutor, ProcessExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::joblogs::{LogDirectory, LogSweeper};
use crate::ledger::{spawn_eviction_loop, spawn_persistence_loop, JobLedger, LedgerContext};
use crate::status::{spawn_client_version_refresh, AppStatus, StatusReporter};
use crate::telemetry::{Telemetry, TracingTelemetry};

/// External collaborators the service is built from.
#[derive(Debug, Clone)]
pub struct ServiceDeps {
    pub executor: Arc<dyn CommandExecutor>,
    pub fs: Arc<dyn FileSystem>,
    pub clock: Arc<dyn Clock>,
    pub telemetry: Arc<dyn Telemetry>,
}

impl ServiceDeps {
    /// Real processes, real filesystem, system clock.
    pub fn production() -> Self {
        Self {
            executor: Arc::new(ProcessExecutor),
            fs: Arc::new(RealFileSystem),
            clock: Arc::new(SystemClock),
            telemetry: Arc::new(TracingTelemetry),
        }
    }
}

/// A running service: the ledger, the request facade, and the handles of
/// every background task.
#[derive(Debug)]
pub struct Service {
    ledger: Arc<JobLedger>,
    requests: RunRequests,
    logs: LogDirectory,
    status: Arc<StatusReporter>,
    shutdown: CancellationToken,
    dispatcher: JoinHandle<()>,
    background: Vec<JoinHandle<()>>,
}

impl Service {
    /// Create the working directories, restore the ledger and spawn the
    /// dispatcher along with the background loops.
    ///
    /// Failing to create the log or state directory is fatal.
    pub fn start(cfg: &ConfigFile, deps: ServiceDeps) -> Result<Self> {
        deps.fs.create_dir_all(&cfg.logs.dir).map_err(|e| {
            RunwaiterError::Other(e.context("failed to create the job log directory"))
        })?;
        deps.fs.create_dir_all(&cfg.ledger.state_dir).map_err(|e| {
            RunwaiterError::Other(e.context("failed to create the state directory"))
        })?;

        let shutdown = CancellationToken::new();
        let logs = LogDirectory::new(cfg.logs.dir.clone(), deps.fs.clone());
        let (sweeper, sweeper_handle) =
            LogSweeper::spawn(logs.clone(), deps.fs.clone(), shutdown.clone());

        let ctx = LedgerContext {
            clock: deps.clock.clone(),
            fs: deps.fs.clone(),
            sweeper: Arc::new(sweeper),
        };
        let ledger = Arc::new(JobLedger::open(
            &cfg.ledger_settings(),
            cfg.snapshot_path(),
            ctx,
        ));

        let (senders, receivers) = intake_channels();
        let requests = RunRequests::new(
            ledger.clone(),
            senders,
            cfg.custom_runs.clone(),
            shutdown.clone(),
        );

        let dispatcher = Dispatcher::new(
            ledger.clone(),
            deps.executor.clone(),
            Arc::new(logs.clone()),
            deps.telemetry.clone(),
            deps.clock.clone(),
            cfg.client.clone(),
        );
        let dispatcher = spawn_dispatcher(dispatcher, receivers, shutdown.clone());

        let scheduler = PeriodicScheduler::new(ledger.clone(), requests.clone(), deps.clock.clone());
        let status = Arc::new(StatusReporter::new(
            ledger.clone(),
            deps.executor.clone(),
            cfg.client.clone(),
            cfg.custom_runs.clone(),
            deps.clock.as_ref(),
        ));
        let background = vec![
            spawn_periodic_scheduler(
                scheduler,
                Duration::from_secs(cfg.timers.scheduler_secs),
                shutdown.clone(),
            ),
            spawn_eviction_loop(
                ledger.clone(),
                Duration::from_secs(cfg.timers.eviction_secs),
                shutdown.clone(),
            ),
            spawn_persistence_loop(
                ledger.clone(),
                Duration::from_secs(cfg.timers.persistence_secs),
                shutdown.clone(),
            ),
            spawn_client_version_refresh(
                status.clone(),
                Duration::from_secs(cfg.timers.client_version_secs),
                shutdown.clone(),
            ),
            sweeper_handle,
        ];

        info!(
            logs = %cfg.logs.dir.display(),
            snapshot = %cfg.snapshot_path().display(),
            "runwaiter service started"
        );

        Ok(Self {
            ledger,
            requests,
            logs,
            status,
            shutdown,
            dispatcher,
            background,
        })
    }

    pub fn ledger(&self) -> Arc<JobLedger> {
        self.ledger.clone()
    }

    /// Handle for registering runs, as used by the HTTP layer.
    pub fn requests(&self) -> RunRequests {
        self.requests.clone()
    }

    pub fn logs(&self) -> &LogDirectory {
        &self.logs
    }

    pub fn status(&self) -> AppStatus {
        self.status.status()
    }

    /// Stop accepting runs, write the final snapshot and wait for the
    /// background loops to finish.
    ///
    /// A client run that is in flight is left alone: the dispatcher task is
    /// detached rather than awaited or aborted.
    pub async fn shutdown(self) {
        info!("shutting down");
        self.shutdown.cancel();

        for handle in self.background {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }

        if !self.dispatcher.is_finished() {
            info!("a client run is still in progress; leaving it to finish on its own");
        }
    }
}

/// Resolve once SIGINT (Ctrl-C) or, on unix, SIGTERM arrives.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}
