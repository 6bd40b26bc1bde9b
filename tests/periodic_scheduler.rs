use tokio_util::sync::CancellationToken;

use runwaiter::config::CustomRunsSection;
use runwaiter::dispatch::{intake_channels, time_to_run, IntakeReceivers, PeriodicScheduler, RunRequests};
use runwaiter::ledger::{LedgerReader, LedgerWriter};
use runwaiter::types::JobStatus;
use runwaiter_test_utils::builders::{settings, LedgerHarness, START};

fn build_scheduler(h: &LedgerHarness) -> (PeriodicScheduler, IntakeReceivers) {
    let (senders, receivers) = intake_channels();
    let requests = RunRequests::new(
        h.ledger.clone(),
        senders,
        CustomRunsSection::default(),
        CancellationToken::new(),
    );
    let scheduler = PeriodicScheduler::new(h.ledger.clone(), requests, std::sync::Arc::new(h.clock.clone()));
    (scheduler, receivers)
}

#[test]
fn first_run_is_due_immediately() {
    let h = LedgerHarness::new(settings(10, 30));
    assert!(time_to_run(&*h.ledger, START));
}

#[test]
fn run_is_due_once_interval_has_elapsed() {
    let h = LedgerHarness::new(settings(10, 30));
    h.ledger.update_last_periodic_start(START);

    assert!(!time_to_run(&*h.ledger, START + 1799));
    assert!(time_to_run(&*h.ledger, START + 1800));
}

#[test]
fn huge_interval_is_never_due() {
    let h = LedgerHarness::new(settings(10, 153_722_867_280_912_930));
    h.ledger.update_last_periodic_start(START);

    assert!(!time_to_run(&*h.ledger, START + 1));
    assert!(!time_to_run(&*h.ledger, i64::MAX - 1));
}

#[test]
fn lock_blocks_periodic_runs() {
    let h = LedgerHarness::new(settings(10, 30));
    h.ledger.lock_runs(true);
    assert!(!time_to_run(&*h.ledger, START));
}

#[test]
fn maintenance_blocks_until_window_ends() {
    let h = LedgerHarness::new(settings(10, 30));
    let end = h.ledger.start_maintenance(10);

    assert!(!time_to_run(&*h.ledger, START));
    assert!(!time_to_run(&*h.ledger, end - 1));
    assert!(time_to_run(&*h.ledger, end));
}

#[test]
fn tick_queues_a_periodic_run_when_due() {
    let h = LedgerHarness::new(settings(10, 30));
    let (scheduler, mut queues) = build_scheduler(&h);

    let id = scheduler.tick().expect("run should be queued");

    assert_eq!(queues.periodic.try_recv().unwrap(), id);
    let record = h.ledger.read(&id).unwrap();
    assert!(!record.on_demand);
    assert_eq!(record.status, JobStatus::Registered);
}

#[test]
fn tick_does_not_requeue_a_waiting_run() {
    let h = LedgerHarness::new(settings(10, 30));
    let (scheduler, mut queues) = build_scheduler(&h);

    assert!(scheduler.tick().is_some());
    // Still due: the dispatcher has not started the first one.
    assert!(scheduler.time_to_run());
    assert!(scheduler.tick().is_none());

    assert!(queues.periodic.try_recv().is_ok());
    assert!(queues.periodic.try_recv().is_err());
    assert_eq!(h.ledger.len(), 1);
}

#[test]
fn tick_respects_disabled_periodic_runs() {
    let h = LedgerHarness::new(settings(10, 30));
    h.ledger.write_periodic_runs(false);
    let (scheduler, mut queues) = build_scheduler(&h);

    assert!(scheduler.tick().is_none());
    assert!(queues.periodic.try_recv().is_err());
    assert!(h.ledger.is_empty());
}

#[test]
fn tick_waits_for_the_clock() {
    let h = LedgerHarness::new(settings(10, 30));
    h.ledger.update_last_periodic_start(START);
    let (scheduler, _queues) = build_scheduler(&h);

    assert!(scheduler.tick().is_none());
    h.clock.advance(30 * 60);
    assert!(scheduler.tick().is_some());
}
