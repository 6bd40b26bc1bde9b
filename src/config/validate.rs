// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, MAX_INTERVAL_MINUTES};
use crate::errors::{Result, RunwaiterError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RunwaiterError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_ledger(cfg)?;
    validate_dirs(cfg)?;
    validate_periodic(cfg)?;
    validate_client(cfg)?;
    validate_timers(cfg)?;
    Ok(())
}

fn validate_ledger(cfg: &RawConfigFile) -> Result<()> {
    if cfg.ledger.max_records == 0 {
        return Err(RunwaiterError::ConfigError(
            "[ledger].max_records must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_dirs(cfg: &RawConfigFile) -> Result<()> {
    // Stale *.log files in the log directory belong to the sweeper.
    if cfg.ledger.state_dir == cfg.logs.dir {
        return Err(RunwaiterError::ConfigError(format!(
            "[ledger].state_dir and [logs].dir must differ (both {})",
            cfg.ledger.state_dir.display()
        )));
    }
    Ok(())
}

fn validate_periodic(cfg: &RawConfigFile) -> Result<()> {
    let minutes = cfg.periodic.interval_minutes;
    if minutes == 0 || minutes > MAX_INTERVAL_MINUTES {
        return Err(RunwaiterError::ConfigError(format!(
            "[periodic].interval_minutes must be between 1 and {MAX_INTERVAL_MINUTES} (got {minutes})"
        )));
    }
    Ok(())
}

fn validate_client(cfg: &RawConfigFile) -> Result<()> {
    if cfg.client.path.trim().is_empty() {
        return Err(RunwaiterError::ConfigError(
            "[client].path must not be empty".to_string(),
        ));
    }
    if cfg.client.override_flag.trim().is_empty() {
        return Err(RunwaiterError::ConfigError(
            "[client].override_flag must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_timers(cfg: &RawConfigFile) -> Result<()> {
    let timers = [
        ("scheduler_secs", cfg.timers.scheduler_secs),
        ("eviction_secs", cfg.timers.eviction_secs),
        ("persistence_secs", cfg.timers.persistence_secs),
        ("client_version_secs", cfg.timers.client_version_secs),
    ];
    for (name, value) in timers {
        if value == 0 {
            return Err(RunwaiterError::ConfigError(format!(
                "[timers].{name} must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}
