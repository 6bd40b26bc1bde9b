// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod joblogs;
pub mod ledger;
pub mod logging;
pub mod service;
pub mod status;
pub mod telemetry;
pub mod types;

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::errors::Result;
use crate::service::{shutdown_signal, Service, ServiceDeps};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the job ledger (restored from its snapshot when one exists)
/// - the dispatcher and the two intake queues
/// - the periodic scheduler, eviction, persistence and log sweep loops
/// - SIGINT/SIGTERM handling with a final snapshot on the way out
pub async fn run(args: CliArgs, cfg: ConfigFile) -> Result<()> {
    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let service = Service::start(&cfg, ServiceDeps::production())?;
    shutdown_signal().await;
    service.shutdown().await;
    Ok(())
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    println!("runwaiter dry-run");
    println!("  config.debug = {}", cfg.config.debug);
    println!("  ledger.max_records = {}", cfg.ledger.max_records);
    println!("  ledger.snapshot = {}", cfg.snapshot_path().display());
    println!("  periodic.enabled = {}", cfg.periodic.enabled);
    println!("  periodic.interval_minutes = {}", cfg.periodic.interval_minutes);
    println!("  client.path = {}", cfg.client.path);
    if !cfg.client.args.is_empty() {
        println!("  client.args = {:?}", cfg.client.args);
    }
    println!("  client.override_flag = {}", cfg.client.override_flag);
    println!("  logs.dir = {}", cfg.logs.dir.display());
    if cfg.custom_runs.whitelist {
        println!("  custom_runs.allowed = {:?}", cfg.custom_runs.allowed);
    }
    println!(
        "  timers = scheduler {}s, eviction {}s, persistence {}s, client version {}s",
        cfg.timers.scheduler_secs,
        cfg.timers.eviction_secs,
        cfg.timers.persistence_secs,
        cfg.timers.client_version_secs
    );

    debug!("dry-run complete (nothing started)");
}
