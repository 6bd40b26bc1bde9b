use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use runwaiter::exec::{CommandExecutor, CommandOutput};

/// One invocation seen by [`FakeExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
}

/// A fake executor that:
/// - records every `(program, args)` it is asked to run
/// - answers with queued exit codes, then `0` once the queue is empty
/// - prints `fake run of <program>` unless given other stdout
/// - optionally holds each run until the test releases a permit on its gate
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    exit_codes: Arc<Mutex<VecDeque<i32>>>,
    gate: Option<Arc<Semaphore>>,
    stdout: Option<String>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit codes handed out in order, one per run.
    pub fn with_exit_codes(codes: impl IntoIterator<Item = i32>) -> Self {
        let executor = Self::default();
        executor.exit_codes.lock().unwrap().extend(codes);
        executor
    }

    /// An executor whose runs block until a permit is added to the returned
    /// semaphore. The call is recorded before blocking.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let executor = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (executor, gate)
    }

    /// Print `stdout` on every run instead of the default line.
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CommandExecutor for FakeExecutor {
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
    ) -> Pin<Box<dyn Future<Output = CommandOutput> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(RecordedCall {
                program: program.to_string(),
                args: args.to_vec(),
            });

            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }

            let exit_code = self.exit_codes.lock().unwrap().pop_front().unwrap_or(0);
            CommandOutput {
                stdout: self
                    .stdout
                    .clone()
                    .unwrap_or_else(|| format!("fake run of {program}")),
                stderr: String::new(),
                exit_code,
            }
        })
    }
}
