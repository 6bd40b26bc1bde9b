// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::minutes_to_secs;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// debug = false
///
/// [ledger]
/// max_records = 20
/// state_dir = "/var/lib/runwaiter"
///
/// [periodic]
/// enabled = true
/// interval_minutes = 30
///
/// [client]
/// path = "/usr/bin/chef-client"
///
/// [logs]
/// dir = "/var/log/runwaiter"
///
/// [custom_runs]
/// whitelist = true
/// allowed = ["recipe[base]"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub ledger: LedgerSection,

    #[serde(default)]
    pub periodic: PeriodicSection,

    #[serde(default)]
    pub client: ClientSection,

    #[serde(default)]
    pub logs: LogsSection,

    #[serde(default)]
    pub custom_runs: CustomRunsSection,

    #[serde(default)]
    pub timers: TimersSection,
}

/// Validated configuration. Build one with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub ledger: LedgerSection,
    pub periodic: PeriodicSection,
    pub client: ClientSection,
    pub logs: LogsSection,
    pub custom_runs: CustomRunsSection,
    pub timers: TimersSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            ledger: raw.ledger,
            periodic: raw.periodic,
            client: raw.client,
            logs: raw.logs,
            custom_runs: raw.custom_runs,
            timers: raw.timers,
        }
    }

    /// The subset of settings the ledger reads at construction and again on
    /// snapshot restore.
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            max_records: self.ledger.max_records,
            interval_minutes: self.periodic.interval_minutes,
            periodic_enabled: self.periodic.enabled,
        }
    }

    /// Location of the ledger snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.ledger.state_dir.join(SNAPSHOT_FILE_NAME)
    }
}

/// Longest accepted periodic interval: one week.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// File name of the ledger snapshot inside `[ledger].state_dir`.
pub const SNAPSHOT_FILE_NAME: &str = "ledger.state";

/// Read-only settings handed to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub max_records: usize,
    pub interval_minutes: u64,
    pub periodic_enabled: bool,
}

impl LedgerSettings {
    pub fn interval_secs(&self) -> i64 {
        minutes_to_secs(self.interval_minutes)
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        ConfigFile::new_unchecked(RawConfigFile::default()).ledger_settings()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigSection {
    /// Raises the default log level to DEBUG.
    #[serde(default)]
    pub debug: bool,
}

/// `[ledger]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSection {
    /// Maximum number of job records kept before eviction kicks in.
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Directory holding the ledger snapshot.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_max_records() -> usize {
    20
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/runwaiter")
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            state_dir: default_state_dir(),
        }
    }
}

/// `[periodic]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PeriodicSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

fn default_true() -> bool {
    true
}

fn default_interval_minutes() -> u64 {
    30
}

impl Default for PeriodicSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_minutes: default_interval_minutes(),
        }
    }
}

/// `[client]` section: how to invoke the configuration-management client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSection {
    /// Program to execute.
    #[serde(default = "default_client_path")]
    pub path: String,

    /// Arguments placed before `-L <log>`. Useful when `path` is a wrapper
    /// such as `sudo`.
    #[serde(default)]
    pub args: Vec<String>,

    /// Flag that carries a custom run payload.
    #[serde(default = "default_override_flag")]
    pub override_flag: String,
}

fn default_client_path() -> String {
    "/usr/bin/chef-client".to_string()
}

fn default_override_flag() -> String {
    "-o".to_string()
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            path: default_client_path(),
            args: Vec::new(),
            override_flag: default_override_flag(),
        }
    }
}

/// `[logs]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsSection {
    /// Directory that holds one `<job id>.log` per run.
    #[serde(default = "default_logs_dir")]
    pub dir: PathBuf,
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("/var/log/runwaiter")
}

impl Default for LogsSection {
    fn default() -> Self {
        Self {
            dir: default_logs_dir(),
        }
    }
}

/// `[custom_runs]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CustomRunsSection {
    /// Only accept payloads listed in `allowed`.
    #[serde(default)]
    pub whitelist: bool,

    #[serde(default)]
    pub allowed: Vec<String>,
}

impl CustomRunsSection {
    /// An enabled but empty whitelist lets everything through.
    pub fn is_enforced(&self) -> bool {
        self.whitelist && !self.allowed.is_empty()
    }
}

/// `[timers]` section: background loop tick periods, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimersSection {
    #[serde(default = "default_tick_secs")]
    pub scheduler_secs: u64,

    #[serde(default = "default_tick_secs")]
    pub eviction_secs: u64,

    #[serde(default = "default_tick_secs")]
    pub persistence_secs: u64,

    /// How often `<client> -v` is re-run for the status report.
    #[serde(default = "default_client_version_secs")]
    pub client_version_secs: u64,
}

fn default_tick_secs() -> u64 {
    60
}

fn default_client_version_secs() -> u64 {
    15 * 60
}

impl Default for TimersSection {
    fn default() -> Self {
        Self {
            scheduler_secs: default_tick_secs(),
            eviction_secs: default_tick_secs(),
            persistence_secs: default_tick_secs(),
            client_version_secs: default_client_version_secs(),
        }
    }
}
