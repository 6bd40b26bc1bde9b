// src/config/mod.rs

//! Configuration loading and validation for runwaiter.
//!
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like non-zero intervals (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ClientSection, ConfigFile, ConfigSection, CustomRunsSection, LedgerSection, LedgerSettings,
    LogsSection, PeriodicSection, RawConfigFile, TimersSection, MAX_INTERVAL_MINUTES,
};
