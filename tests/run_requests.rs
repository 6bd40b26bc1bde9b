use tokio_util::sync::CancellationToken;

use runwaiter::config::CustomRunsSection;
use runwaiter::dispatch::{intake_channels, IntakeReceivers, RunRequests};
use runwaiter::errors::RunwaiterError;
use runwaiter::ledger::{LedgerReader, LedgerWriter};
use runwaiter::types::JobStatus;
use runwaiter_test_utils::builders::{settings, LedgerHarness};

struct Fixture {
    harness: LedgerHarness,
    requests: RunRequests,
    queues: IntakeReceivers,
    shutdown: CancellationToken,
}

fn fixture(custom_runs: CustomRunsSection) -> Fixture {
    let harness = LedgerHarness::new(settings(10, 30));
    let (senders, queues) = intake_channels();
    let shutdown = CancellationToken::new();
    let requests = RunRequests::new(harness.ledger.clone(), senders, custom_runs, shutdown.clone());
    Fixture {
        harness,
        requests,
        queues,
        shutdown,
    }
}

fn whitelist(allowed: &[&str]) -> CustomRunsSection {
    CustomRunsSection {
        whitelist: true,
        allowed: allowed.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn on_demand_run_is_queued_once() {
    let mut f = fixture(CustomRunsSection::default());

    let first = f.requests.on_demand_run().unwrap();
    let second = f.requests.on_demand_run().unwrap();

    assert_eq!(first, second);
    assert_eq!(f.queues.on_demand.try_recv().unwrap(), first);
    assert!(f.queues.on_demand.try_recv().is_err());
    assert!(f.queues.periodic.try_recv().is_err());
}

#[test]
fn custom_runs_go_through_the_on_demand_queue() {
    let mut f = fixture(CustomRunsSection::default());

    let id = f.requests.custom_run("recipe[base]").unwrap();

    assert_eq!(f.queues.on_demand.try_recv().unwrap(), id);
    let record = f.harness.ledger.read(&id).unwrap();
    assert!(record.is_custom);
    assert_eq!(record.override_payload(), Some("recipe[base]"));
}

#[test]
fn periodic_run_uses_its_own_queue() {
    let mut f = fixture(CustomRunsSection::default());

    let first = f.requests.periodic_run().unwrap();
    let second = f.requests.periodic_run().unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.id, second.id);
    assert_eq!(f.queues.periodic.try_recv().unwrap(), first.id);
    assert!(f.queues.periodic.try_recv().is_err());
    assert!(f.queues.on_demand.try_recv().is_err());
}

#[test]
fn locked_runs_are_refused_without_registering() {
    let mut f = fixture(CustomRunsSection::default());
    f.harness.ledger.lock_runs(true);

    assert!(matches!(f.requests.on_demand_run(), Err(RunwaiterError::Locked)));
    assert!(matches!(f.requests.custom_run("recipe[x]"), Err(RunwaiterError::Locked)));
    assert!(f.harness.ledger.is_empty());
    assert!(f.queues.on_demand.try_recv().is_err());

    f.harness.ledger.lock_runs(false);
    assert!(f.requests.on_demand_run().is_ok());
}

#[test]
fn whitelist_rejects_unknown_payloads() {
    let f = fixture(whitelist(&["recipe[base]"]));

    assert!(f.requests.custom_run("recipe[base]").is_ok());
    match f.requests.custom_run("recipe[evil]") {
        Err(RunwaiterError::PayloadNotAllowed(p)) => assert_eq!(p, "recipe[evil]"),
        other => panic!("expected PayloadNotAllowed, got {other:?}"),
    }
    assert_eq!(f.harness.ledger.len(), 1);
}

#[test]
fn empty_whitelist_allows_everything() {
    let f = fixture(whitelist(&[]));
    assert!(f.requests.custom_run("recipe[anything]").is_ok());
}

#[test]
fn nothing_is_accepted_after_shutdown() {
    let f = fixture(CustomRunsSection::default());
    f.shutdown.cancel();

    assert!(matches!(f.requests.on_demand_run(), Err(RunwaiterError::ShuttingDown)));
    assert!(matches!(f.requests.custom_run("r"), Err(RunwaiterError::ShuttingDown)));
    assert!(matches!(f.requests.periodic_run(), Err(RunwaiterError::ShuttingDown)));
    assert!(f.harness.ledger.is_empty());
}

#[test]
fn closed_queue_is_reported() {
    let f = fixture(CustomRunsSection::default());
    drop(f.queues);

    assert!(matches!(f.requests.on_demand_run(), Err(RunwaiterError::QueueClosed)));
    // The job stays registered; a later request collapses into it.
    let ids: Vec<_> = f.harness.ledger.read_all().into_keys().collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(f.harness.ledger.read(&ids[0]).unwrap().status, JobStatus::Registered);
}
