// src/joblogs/mod.rs

//! Per-job client log files.
//!
//! Every run writes its client output to `<log dir>/<job id>.log`. The ledger
//! and dispatcher never build these paths themselves; they go through
//! [`LogPathProvider`]. Removal of stale files is handled by the
//! [`sweeper`].

use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::errors::{Result, RunwaiterError};
use crate::fs::FileSystem;

pub mod sweeper;

pub use sweeper::{LogSweeper, RetentionSweeper, SweepRequest};

/// Maps a job id to the location of its log file. Must be pure and
/// deterministic.
pub trait LogPathProvider: Send + Sync + Debug {
    fn path_for(&self, id: &str) -> PathBuf;
}

/// Log files laid out flat in one directory.
#[derive(Debug, Clone)]
pub struct LogDirectory {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl LogDirectory {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Whether the run with this id has produced a log file.
    pub fn is_log_available(&self, id: &str) -> bool {
        self.fs.is_file(&self.path_for(id))
    }

    /// Client output of the run with this id. Invalid UTF-8 is replaced.
    pub fn read_log(&self, id: &str) -> Result<String> {
        let path = self.path_for(id);
        if !self.fs.is_file(&path) {
            debug!(job_id = %id, path = %path.display(), "job log not available");
            return Err(RunwaiterError::LogNotFound(id.to_string()));
        }
        let bytes = self.fs.read(&path).map_err(RunwaiterError::Other)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl LogPathProvider for LogDirectory {
    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.log"))
    }
}
