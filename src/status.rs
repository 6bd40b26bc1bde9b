// src/status.rs

//! Service identity and health, as served on the status endpoint.
//!
//! Most fields are read live from the ledger. The installed client version
//! is found by running `<client> -v` and is refreshed on a timer; a failed
//! check marks the service unhealthy until the next one succeeds.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{ClientSection, CustomRunsSection};
use crate::exec::CommandExecutor;
use crate::ledger::LedgerReader;
use crate::types::JobId;

/// Reported when the host name cannot be determined.
pub const UNKNOWN_HOSTNAME: &str = "na";

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+\.[0-9]+\.[0-9]+)").expect("version regex"));

/// First `major.minor.patch` triple in the client's version output.
pub fn extract_version(output: &str) -> Option<String> {
    VERSION_RE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Point-in-time status of the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppStatus {
    pub service_name: String,
    pub hostname: String,
    pub start_time: i64,
    pub start_time_human: String,
    pub version: String,
    pub client_version: Option<String>,
    pub healthy: bool,
    pub in_maintenance: bool,
    pub maintenance_end: i64,
    pub last_run_id: Option<JobId>,
    pub locked: bool,
    pub whitelist_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelisted_payloads: Option<Vec<String>>,
}

#[derive(Debug, Default)]
struct ClientHealth {
    version: Option<String>,
    healthy: bool,
}

/// Builds [`AppStatus`] reports and keeps the client version current.
#[derive(Debug)]
pub struct StatusReporter {
    ledger: Arc<dyn LedgerReader>,
    executor: Arc<dyn CommandExecutor>,
    client: ClientSection,
    custom_runs: CustomRunsSection,
    hostname: String,
    start_time: i64,
    health: RwLock<ClientHealth>,
}

impl StatusReporter {
    /// The service is considered started when this is called. Health stays
    /// false until the first successful version check.
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        executor: Arc<dyn CommandExecutor>,
        client: ClientSection,
        custom_runs: CustomRunsSection,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            ledger,
            executor,
            client,
            custom_runs,
            hostname: local_hostname(),
            start_time: clock.now(),
            health: RwLock::new(ClientHealth::default()),
        }
    }

    /// Run `<client> -v` and record the version it prints.
    ///
    /// A non-zero exit or output without a version triple marks the service
    /// unhealthy and clears the recorded version.
    pub async fn refresh_client_version(&self) -> Option<String> {
        let mut args = self.client.args.clone();
        args.push("-v".to_string());
        let output = self.executor.run(&self.client.path, &args).await;

        let version = if output.success() {
            let found = extract_version(&output.stdout);
            if found.is_none() {
                warn!(stdout = %output.stdout.trim(), "no version in client output");
            }
            found
        } else {
            warn!(
                code = output.exit_code,
                stderr = %output.stderr.trim(),
                "client version check failed"
            );
            None
        };

        let mut health = self.health.write();
        if health.version != version {
            info!(version = ?version, "client version changed");
        }
        health.healthy = version.is_some();
        health.version = version.clone();
        version
    }

    pub fn status(&self) -> AppStatus {
        let (client_version, healthy) = {
            let health = self.health.read();
            (health.version.clone(), health.healthy)
        };
        let whitelist_enabled = self.custom_runs.whitelist;

        AppStatus {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            hostname: self.hostname.clone(),
            start_time: self.start_time,
            start_time_human: human_time(self.start_time),
            version: env!("CARGO_PKG_VERSION").to_string(),
            client_version,
            healthy,
            in_maintenance: self.ledger.in_maintenance(),
            maintenance_end: self.ledger.maintenance_end(),
            last_run_id: self.ledger.last_completed(),
            locked: self.ledger.run_lock(),
            whitelist_enabled,
            whitelisted_payloads: whitelist_enabled.then(|| self.custom_runs.allowed.clone()),
        }
    }
}

fn local_hostname() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!(error = %e, "could not determine hostname");
            UNKNOWN_HOSTNAME.to_string()
        }
    }
}

fn human_time(epoch: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

/// Spawn the version refresh loop. The first check runs immediately.
pub fn spawn_client_version_refresh(
    reporter: Arc<StatusReporter>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = reporter.refresh_client_version() => {}
                    }
                }
            }
        }
        debug!("client version refresh loop finished");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_found_in_client_banners() {
        assert_eq!(extract_version("Chef: 15.9.100\n").as_deref(), Some("15.9.100"));
        assert_eq!(
            extract_version("chef-client - 11.1.1\r\n").as_deref(),
            Some("11.1.1")
        );
        assert_eq!(
            extract_version("wibbleWobbled1923.321 - 12.9.41\n").as_deref(),
            Some("12.9.41")
        );
    }

    #[test]
    fn output_without_a_triple_has_no_version() {
        assert_eq!(extract_version(""), None);
        assert_eq!(extract_version("Chef: 15.9\n"), None);
        assert_eq!(extract_version("command not found"), None);
    }

    #[test]
    fn start_time_is_rendered_in_utc() {
        assert_eq!(human_time(1_700_000_000), "2023-11-14 22:13:20 UTC");
    }
}
