mod common;

use std::time::Duration;

use common::{DispatchFixture, LOG_DIR};
use runwaiter::ledger::LedgerReader;
use runwaiter::types::JobStatus;
use runwaiter_test_utils::builders::{ConfigFileBuilder, START};
use runwaiter_test_utils::fake_executor::FakeExecutor;
use runwaiter_test_utils::{init_tracing, wait_until};

#[tokio::test]
async fn on_demand_run_invokes_client_with_log_path() {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let f = DispatchFixture::start(&cfg, FakeExecutor::new());

    let id = f.requests.on_demand_run().unwrap();
    f.wait_for_status(&id, JobStatus::Complete).await;

    let calls = f.executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "/usr/bin/chef-client");
    assert_eq!(
        calls[0].args,
        vec!["-L".to_string(), format!("{LOG_DIR}/{id}.log")]
    );

    let record = f.harness.ledger.read(&id).unwrap();
    assert_eq!(record.exit_code, 0);
    assert_eq!(f.harness.ledger.last_completed(), Some(id));
}

#[tokio::test]
async fn custom_run_passes_override_after_configured_args() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .client("/usr/bin/sudo", &["chef-client"])
        .build();
    let f = DispatchFixture::start(&cfg, FakeExecutor::new());

    let id = f.requests.custom_run("recipe[base]").unwrap();
    f.wait_for_status(&id, JobStatus::Complete).await;

    let calls = f.executor.calls();
    assert_eq!(calls[0].program, "/usr/bin/sudo");
    assert_eq!(
        calls[0].args,
        vec![
            "chef-client".to_string(),
            "-L".to_string(),
            format!("{LOG_DIR}/{id}.log"),
            "-o".to_string(),
            "recipe[base]".to_string(),
        ]
    );
}

#[tokio::test]
async fn non_zero_exit_marks_job_failed() {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let f = DispatchFixture::start(&cfg, FakeExecutor::with_exit_codes([3]));

    let id = f.requests.on_demand_run().unwrap();
    f.wait_for_status(&id, JobStatus::Failed).await;

    assert_eq!(f.harness.ledger.read(&id).unwrap().exit_code, 3);
    assert_eq!(f.harness.ledger.last_completed(), Some(id));
}

#[tokio::test]
async fn periodic_run_records_its_start_time() {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let f = DispatchFixture::start(&cfg, FakeExecutor::new());
    f.harness.clock.set(START + 42);

    let reg = f.requests.periodic_run().unwrap();
    f.wait_for_status(&reg.id, JobStatus::Complete).await;

    assert_eq!(f.harness.ledger.last_periodic_start(), START + 42);
}

#[tokio::test]
async fn on_demand_run_leaves_periodic_start_alone() {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let f = DispatchFixture::start(&cfg, FakeExecutor::new());

    let id = f.requests.on_demand_run().unwrap();
    f.wait_for_status(&id, JobStatus::Complete).await;

    assert_eq!(f.harness.ledger.last_periodic_start(), 0);
}

#[tokio::test]
async fn jobs_run_one_at_a_time() {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let (executor, gate) = FakeExecutor::gated();
    let f = DispatchFixture::start(&cfg, executor);

    let first = f.requests.on_demand_run().unwrap();
    f.wait_for_status(&first, JobStatus::Running).await;

    // The first job is running, so this is a new job rather than a duplicate.
    let second = f.requests.on_demand_run().unwrap();
    assert_ne!(first, second);
    let third = f.requests.on_demand_run().unwrap();
    assert_eq!(second, third);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(f.executor.call_count(), 1);
    assert_eq!(f.status(&second), Some(JobStatus::Registered));

    gate.add_permits(1);
    f.wait_for_status(&first, JobStatus::Complete).await;
    f.wait_for_status(&second, JobStatus::Running).await;

    gate.add_permits(1);
    f.wait_for_status(&second, JobStatus::Complete).await;
    assert_eq!(f.executor.call_count(), 2);
}

#[tokio::test]
async fn both_queues_are_drained() {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let (executor, gate) = FakeExecutor::gated();
    let f = DispatchFixture::start(&cfg, executor);

    let blocker = f.requests.on_demand_run().unwrap();
    f.wait_for_status(&blocker, JobStatus::Running).await;

    let periodic = f.requests.periodic_run().unwrap().id;
    let demand = f.requests.on_demand_run().unwrap();

    gate.add_permits(3);
    f.wait_for_status(&periodic, JobStatus::Complete).await;
    f.wait_for_status(&demand, JobStatus::Complete).await;
    assert_eq!(f.executor.call_count(), 3);
}

#[tokio::test]
async fn telemetry_is_tagged_with_run_type() {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let f = DispatchFixture::start(&cfg, FakeExecutor::new());

    let id = f.requests.on_demand_run().unwrap();
    f.wait_for_status(&id, JobStatus::Complete).await;
    let telemetry = f.telemetry.clone();
    wait_until(|| telemetry.names().len() == 3).await;

    assert_eq!(
        f.telemetry.names(),
        vec!["run_starting", "run_time_ms", "run_finished"]
    );
    for metric in f.telemetry.metrics() {
        assert_eq!(metric.tags, vec![("type".to_string(), "demand".to_string())]);
    }
}

#[tokio::test]
async fn dispatcher_stops_on_shutdown() {
    init_tracing();
    let cfg = ConfigFileBuilder::new().build();
    let f = DispatchFixture::start(&cfg, FakeExecutor::new());

    f.shutdown.cancel();
    runwaiter_test_utils::with_timeout(f.dispatcher).await.unwrap();
}
