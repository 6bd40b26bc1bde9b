use std::sync::Arc;

use runwaiter::clock::Clock;
use runwaiter::fs::RealFileSystem;
use runwaiter::ledger::{JobLedger, LedgerContext, LedgerReader};
use runwaiter::service::{Service, ServiceDeps};
use runwaiter::telemetry::NoopTelemetry;
use runwaiter::types::JobStatus;
use runwaiter_test_utils::builders::{ConfigFileBuilder, START};
use runwaiter_test_utils::clock::ManualClock;
use runwaiter_test_utils::fake_executor::FakeExecutor;
use runwaiter_test_utils::recorders::RecordingSweeper;
use runwaiter_test_utils::{init_tracing, wait_until};

#[tokio::test]
async fn service_runs_jobs_and_persists_on_shutdown() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = ConfigFileBuilder::new()
        .state_dir(dir.path().join("state"))
        .logs_dir(dir.path().join("logs"))
        .periodic_enabled(false)
        .timers_secs(3600)
        .build();

    let executor = FakeExecutor::new().with_stdout("Chef Infra Client: 18.2.7\n");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(START));
    let deps = ServiceDeps {
        executor: Arc::new(executor.clone()),
        fs: Arc::new(RealFileSystem),
        clock: clock.clone(),
        telemetry: Arc::new(NoopTelemetry),
    };

    let service = Service::start(&cfg, deps).unwrap();
    assert!(dir.path().join("logs").is_dir());
    assert!(dir.path().join("state").is_dir());

    let id = service.requests().on_demand_run().unwrap();
    let ledger = service.ledger();
    wait_until(|| ledger.read(&id).map(|r| r.status) == Some(JobStatus::Complete)).await;

    let expected_log = dir.path().join("logs").join(format!("{id}.log"));
    assert_eq!(service.logs().dir(), &dir.path().join("logs"));
    let expected_arg = expected_log.to_string_lossy().into_owned();
    assert!(executor
        .calls()
        .iter()
        .any(|call| call.args.contains(&expected_arg)));

    assert!(service.logs().read_log(&id).is_err());
    std::fs::write(&expected_log, "Chef Client finished").unwrap();
    assert_eq!(service.logs().read_log(&id).unwrap(), "Chef Client finished");

    wait_until(|| {
        let status = service.status();
        status.healthy && status.last_run_id.is_some()
    })
    .await;
    let status = service.status();
    assert_eq!(status.client_version.as_deref(), Some("18.2.7"));
    assert_eq!(status.start_time, START);
    assert_eq!(status.last_run_id, Some(id.clone()));
    assert!(!status.locked);

    let requests = service.requests();
    service.shutdown().await;
    assert!(requests.on_demand_run().is_err());

    let snapshot = cfg.snapshot_path();
    assert!(snapshot.is_file());
    let ctx = LedgerContext {
        clock,
        fs: Arc::new(RealFileSystem),
        sweeper: Arc::new(RecordingSweeper::new()),
    };
    let restored = JobLedger::open(&cfg.ledger_settings(), snapshot, ctx);
    assert_eq!(restored.read(&id).unwrap().status, JobStatus::Complete);
    assert_eq!(restored.last_completed(), Some(id));
}
