// src/ledger/record.rs

//! Job record types held by the ledger.

use serde::{Deserialize, Serialize};

use crate::types::{JobKind, JobStatus, PENDING_EXIT_CODE};

/// Everything the ledger knows about one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    /// Only meaningful once `status` is `Complete` or `Failed`.
    pub exit_code: i32,
    /// Epoch seconds.
    pub registered_at: i64,
    pub on_demand: bool,
    pub is_custom: bool,
    /// Passed to the client as an override; only meaningful when `is_custom`.
    pub custom_payload: String,
}

impl JobRecord {
    /// A fresh `Registered` record.
    pub fn registered(on_demand: bool, is_custom: bool, payload: &str, now: i64) -> Self {
        Self {
            status: JobStatus::Registered,
            exit_code: PENDING_EXIT_CODE,
            registered_at: now,
            on_demand,
            is_custom,
            custom_payload: if is_custom {
                payload.to_string()
            } else {
                String::new()
            },
        }
    }

    pub fn kind(&self) -> JobKind {
        JobKind::from_on_demand(self.on_demand)
    }

    /// The payload to hand to the client, if this is a custom run with one.
    pub fn override_payload(&self) -> Option<&str> {
        if self.is_custom && !self.custom_payload.is_empty() {
            Some(&self.custom_payload)
        } else {
            None
        }
    }

    /// Whether a new request of this shape should collapse into this record.
    pub(crate) fn is_queued_duplicate_of(
        &self,
        on_demand: bool,
        is_custom: bool,
        payload: &str,
    ) -> bool {
        if self.status != JobStatus::Registered
            || self.on_demand != on_demand
            || self.is_custom != is_custom
        {
            return false;
        }
        !is_custom || self.custom_payload == payload
    }
}

/// Projection of a [`JobRecord`] without the custom payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub status: JobStatus,
    pub exit_code: i32,
    pub registered_at: i64,
    pub on_demand: bool,
}

impl From<&JobRecord> for JobSummary {
    fn from(record: &JobRecord) -> Self {
        Self {
            status: record.status,
            exit_code: record.exit_code,
            registered_at: record.registered_at,
            on_demand: record.on_demand,
        }
    }
}
