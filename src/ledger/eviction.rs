// src/ledger/eviction.rs

//! Bounded history: trim completed jobs once the ledger grows past its
//! configured size.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{JobLedger, LedgerReader, LedgerWriter};
use crate::joblogs::SweepRequest;
use crate::types::JobId;

/// Ids that fall outside the `keep` most recently registered jobs.
///
/// Ordering is by registration time, newest first; equal timestamps are
/// broken by id so the result is deterministic.
pub fn old_states(times: &HashMap<JobId, i64>, keep: usize) -> Vec<JobId> {
    let mut runs: Vec<(&JobId, i64)> = times.iter().map(|(id, t)| (id, *t)).collect();
    runs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    runs.into_iter()
        .skip(keep)
        .map(|(id, _)| id.clone())
        .collect()
}

impl JobLedger {
    /// Remove completed jobs outside the newest `max_records`, then ask the
    /// retention sweeper to drop logs of everything that no longer exists.
    ///
    /// Jobs in any state other than `Complete` are never removed, even when
    /// they are among the oldest. Returns how many records were removed.
    pub fn evict(&self) -> usize {
        let max = self.max_records();
        let before = self.len();
        if before <= max {
            return 0;
        }

        let old = old_states(&self.registration_times(), max);
        debug!(?old, "eviction candidates");
        for id in &old {
            self.remove_state(id);
        }

        let surviving = self.registration_times();
        let removed = before.saturating_sub(surviving.len());
        debug!(removed, remaining = surviving.len(), max, "evicted old jobs");

        self.context().sweeper.request_delete(SweepRequest {
            keep: surviving,
            cutoff: self.context().clock.now(),
        });
        removed
    }
}

/// Spawn the retention loop: every `period`, evict if the ledger is over
/// size.
pub fn spawn_eviction_loop(
    ledger: Arc<JobLedger>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately; skip it.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let (len, max) = (ledger.len(), ledger.max_records());
                    if len > max {
                        debug!(len, max, "ledger too large; evicting");
                        ledger.evict();
                    } else {
                        debug!(len, max, "ledger size");
                    }
                }
            }
        }
        debug!("eviction loop finished");
    })
}
