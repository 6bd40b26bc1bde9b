// src/exec/backend.rs

//! Pluggable command executor abstraction.
//!
//! The dispatcher talks to a `CommandExecutor` instead of spawning processes
//! itself. Production code uses [`ProcessExecutor`](super::ProcessExecutor);
//! tests provide a fake that records invocations and returns canned exit
//! codes.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait abstracting how the external client is executed.
///
/// Implementations never fail: anything that goes wrong (missing binary,
/// killed by a signal) is reported as a non-zero exit code.
pub trait CommandExecutor: Send + Sync + Debug {
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
    ) -> Pin<Box<dyn Future<Output = CommandOutput> + Send + 'a>>;
}
