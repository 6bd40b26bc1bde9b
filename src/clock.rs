// src/clock.rs

//! Wall-clock source for the ledger and scheduler.
//!
//! All timestamps in runwaiter are epoch seconds. Components take an
//! `Arc<dyn Clock>` so tests can drive time by hand.

use std::fmt::Debug;

/// Source of "now" as epoch seconds.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}
