// src/exec/command.rs

//! Real process executor backed by `tokio::process::Command`.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, warn};

use super::backend::{CommandExecutor, CommandOutput};

/// Exit code used when the process could not be started or did not report
/// one (e.g. killed by a signal).
pub const DEFAULT_FAILED_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl CommandExecutor for ProcessExecutor {
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
    ) -> Pin<Box<dyn Future<Output = CommandOutput> + Send + 'a>> {
        Box::pin(async move {
            match run_inner(program, args).await {
                Ok(output) => output,
                Err(err) => {
                    warn!(program, error = %err, "command execution error");
                    CommandOutput {
                        stdout: String::new(),
                        stderr: format!("{err:#}"),
                        exit_code: DEFAULT_FAILED_CODE,
                    }
                }
            }
        })
    }
}

async fn run_inner(program: &str, args: &[String]) -> Result<CommandOutput> {
    debug!(program, ?args, "spawning command");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("running '{program}'"))?;

    let exit_code = output.status.code().unwrap_or(DEFAULT_FAILED_CODE);
    debug!(program, exit_code, success = output.status.success(), "command exited");

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code,
    })
}
