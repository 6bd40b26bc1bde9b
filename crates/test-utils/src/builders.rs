#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use runwaiter::config::{ConfigFile, LedgerSettings, RawConfigFile};
use runwaiter::fs::mock::MockFileSystem;
use runwaiter::ledger::{JobLedger, LedgerContext};

use crate::clock::ManualClock;
use crate::recorders::RecordingSweeper;

/// Where [`LedgerHarness`] keeps its snapshot inside the mock filesystem.
pub const SNAPSHOT_PATH: &str = "/state/ledger.state";

/// Epoch the harness clock starts at.
pub const START: i64 = 1_700_000_000;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn max_records(mut self, max: usize) -> Self {
        self.config.ledger.max_records = max;
        self
    }

    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.ledger.state_dir = dir.into();
        self
    }

    pub fn logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.logs.dir = dir.into();
        self
    }

    pub fn interval_minutes(mut self, minutes: u64) -> Self {
        self.config.periodic.interval_minutes = minutes;
        self
    }

    pub fn periodic_enabled(mut self, enabled: bool) -> Self {
        self.config.periodic.enabled = enabled;
        self
    }

    pub fn client(mut self, path: &str, args: &[&str]) -> Self {
        self.config.client.path = path.to_string();
        self.config.client.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn whitelist(mut self, allowed: &[&str]) -> Self {
        self.config.custom_runs.whitelist = true;
        self.config.custom_runs.allowed = allowed.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Use the same tick period for every background loop.
    pub fn timers_secs(mut self, secs: u64) -> Self {
        self.config.timers.scheduler_secs = secs;
        self.config.timers.eviction_secs = secs;
        self.config.timers.persistence_secs = secs;
        self.config.timers.client_version_secs = secs;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ledger settings with the given size limit and interval, periodic runs on.
pub fn settings(max_records: usize, interval_minutes: u64) -> LedgerSettings {
    LedgerSettings {
        max_records,
        interval_minutes,
        ..LedgerSettings::default()
    }
}

/// A ledger wired to a manual clock, an in-memory filesystem and a recording
/// sweeper, with handles to all three.
pub struct LedgerHarness {
    pub ledger: Arc<JobLedger>,
    pub clock: ManualClock,
    pub fs: MockFileSystem,
    pub sweeper: RecordingSweeper,
}

impl LedgerHarness {
    /// Fresh empty ledger; the clock starts at [`START`].
    pub fn new(settings: LedgerSettings) -> Self {
        let clock = ManualClock::new(START);
        let fs = MockFileSystem::new();
        let sweeper = RecordingSweeper::new();
        let ctx = context(&clock, &fs, &sweeper);
        let ledger = Arc::new(JobLedger::new(&settings, PathBuf::from(SNAPSHOT_PATH), ctx));
        Self {
            ledger,
            clock,
            fs,
            sweeper,
        }
    }

    /// Open a ledger from whatever `fs` holds at [`SNAPSHOT_PATH`].
    pub fn open(settings: LedgerSettings, fs: MockFileSystem) -> Self {
        let clock = ManualClock::new(START);
        let sweeper = RecordingSweeper::new();
        let ctx = context(&clock, &fs, &sweeper);
        let ledger = Arc::new(JobLedger::open(&settings, PathBuf::from(SNAPSHOT_PATH), ctx));
        Self {
            ledger,
            clock,
            fs,
            sweeper,
        }
    }
}

fn context(clock: &ManualClock, fs: &MockFileSystem, sweeper: &RecordingSweeper) -> LedgerContext {
    LedgerContext {
        clock: Arc::new(clock.clone()),
        fs: Arc::new(fs.clone()),
        sweeper: Arc::new(sweeper.clone()),
    }
}
