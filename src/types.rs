use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque job identifier issued at registration (a UUID v4 string).
pub type JobId = String;

/// Exit code recorded on a job until the client has actually finished.
pub const PENDING_EXIT_CODE: i32 = 99;

/// Convert a duration in minutes to seconds, clamping at `i64::MAX`.
pub fn minutes_to_secs(minutes: u64) -> i64 {
    i64::try_from(minutes)
        .unwrap_or(i64::MAX)
        .saturating_mul(60)
}

/// Lifecycle state of a single job.
///
/// Normal flow is `Registered -> Running -> {Complete | Failed}`. The two
/// remaining states only appear after a restart:
/// - `Unknown`: the job was `Running` when the previous process went away.
/// - `Abandoned`: the job was `Registered` and never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Registered,
    Running,
    Complete,
    Failed,
    Unknown,
    Abandoned,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Registered => "registered",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
            JobStatus::Abandoned => "abandoned",
        }
    }

    /// Status a record should carry after a restart.
    pub fn linted(self) -> Self {
        match self {
            JobStatus::Running => JobStatus::Unknown,
            JobStatus::Registered => JobStatus::Abandoned,
            other => other,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which intake a job came through. Used for log lines and telemetry tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Scheduler-triggered run.
    Periodic,
    /// User-triggered run, custom or not.
    Demand,
}

impl JobKind {
    pub fn from_on_demand(on_demand: bool) -> Self {
        if on_demand {
            JobKind::Demand
        } else {
            JobKind::Periodic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Periodic => "periodic",
            JobKind::Demand => "demand",
        }
    }
}
