use std::sync::{Arc, Mutex};

use runwaiter::joblogs::{RetentionSweeper, SweepRequest};
use runwaiter::telemetry::Telemetry;

/// Sweeper that keeps every delete request instead of touching files.
#[derive(Debug, Clone, Default)]
pub struct RecordingSweeper {
    requests: Arc<Mutex<Vec<SweepRequest>>>,
}

impl RecordingSweeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<SweepRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<SweepRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl RetentionSweeper for RecordingSweeper {
    fn request_delete(&self, request: SweepRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

/// A metric emitted through [`RecordingTelemetry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub name: String,
    pub tags: Vec<(String, String)>,
}

/// Telemetry sink that remembers metric names and tags.
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    metrics: Arc<Mutex<Vec<Metric>>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.metrics
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn metrics(&self) -> Vec<Metric> {
        self.metrics.lock().unwrap().clone()
    }

    fn push(&self, name: &str, tags: &[(&str, &str)]) {
        self.metrics.lock().unwrap().push(Metric {
            name: name.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }
}

impl Telemetry for RecordingTelemetry {
    fn incr(&self, name: &str, _value: u64, tags: &[(&str, &str)]) {
        self.push(name, tags);
    }

    fn timing(&self, name: &str, _millis: u64, tags: &[(&str, &str)]) {
        self.push(name, tags);
    }
}
