#![allow(dead_code)]

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use runwaiter::config::ConfigFile;
use runwaiter::dispatch::{intake_channels, spawn_dispatcher, Dispatcher, RunRequests};
use runwaiter::joblogs::LogDirectory;
use runwaiter::ledger::LedgerReader;
use runwaiter::types::JobStatus;
use runwaiter_test_utils::builders::LedgerHarness;
use runwaiter_test_utils::fake_executor::FakeExecutor;
use runwaiter_test_utils::recorders::RecordingTelemetry;
use runwaiter_test_utils::wait_until;

pub const LOG_DIR: &str = "/logs";

/// A ledger, request facade and running dispatcher backed by fakes.
pub struct DispatchFixture {
    pub harness: LedgerHarness,
    pub requests: RunRequests,
    pub executor: FakeExecutor,
    pub telemetry: RecordingTelemetry,
    pub shutdown: CancellationToken,
    pub dispatcher: JoinHandle<()>,
}

impl DispatchFixture {
    pub fn start(cfg: &ConfigFile, executor: FakeExecutor) -> Self {
        let harness = LedgerHarness::new(cfg.ledger_settings());
        let telemetry = RecordingTelemetry::new();
        let shutdown = CancellationToken::new();

        let (senders, receivers) = intake_channels();
        let requests = RunRequests::new(
            harness.ledger.clone(),
            senders,
            cfg.custom_runs.clone(),
            shutdown.clone(),
        );
        let logs = LogDirectory::new(LOG_DIR, Arc::new(harness.fs.clone()));
        let dispatcher = Dispatcher::new(
            harness.ledger.clone(),
            Arc::new(executor.clone()),
            Arc::new(logs),
            Arc::new(telemetry.clone()),
            Arc::new(harness.clock.clone()),
            cfg.client.clone(),
        );
        let dispatcher = spawn_dispatcher(dispatcher, receivers, shutdown.clone());

        Self {
            harness,
            requests,
            executor,
            telemetry,
            shutdown,
            dispatcher,
        }
    }

    pub fn status(&self, id: &str) -> Option<JobStatus> {
        self.harness.ledger.read(id).map(|r| r.status)
    }

    /// Wait until job `id` reaches `status`.
    pub async fn wait_for_status(&self, id: &str, status: JobStatus) {
        let ledger = self.harness.ledger.clone();
        wait_until(|| ledger.read(id).map(|r| r.status) == Some(status)).await;
    }
}
