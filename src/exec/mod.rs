// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `CommandExecutor` trait and `CommandOutput`.
//! - [`command`] holds `ProcessExecutor`, the production implementation using
//!   `tokio::process::Command`.

pub mod backend;
pub mod command;

pub use backend::{CommandExecutor, CommandOutput};
pub use command::{ProcessExecutor, DEFAULT_FAILED_CODE};
