// src/telemetry.rs

//! Counter and timing sink used around each client run.
//!
//! The wire protocol of a metrics backend is out of scope; the default
//! [`TracingTelemetry`] turns every data point into a `tracing` event under the
//! `runwaiter::metrics` target so it can be filtered or scraped from logs.

use std::fmt::Debug;

use tracing::debug;

/// Metrics sink.
pub trait Telemetry: Send + Sync + Debug {
    fn incr(&self, name: &str, value: u64, tags: &[(&str, &str)]);
    fn timing(&self, name: &str, millis: u64, tags: &[(&str, &str)]);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn incr(&self, name: &str, value: u64, tags: &[(&str, &str)]) {
        debug!(target: "runwaiter::metrics", metric = name, value, tags = ?tags, "counter");
    }

    fn timing(&self, name: &str, millis: u64, tags: &[(&str, &str)]) {
        debug!(target: "runwaiter::metrics", metric = name, millis, tags = ?tags, "timing");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn incr(&self, _name: &str, _value: u64, _tags: &[(&str, &str)]) {}
    fn timing(&self, _name: &str, _millis: u64, _tags: &[(&str, &str)]) {}
}
