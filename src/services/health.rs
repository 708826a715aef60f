//! Health monitor — periodic probes that drive routing eligibility.
//!
//! DESIGN
//! ======
//! A spawned task sweeps every registered service on a fixed interval. The
//! first tick fires immediately, so the initial sweep runs at startup.
//! Probes run with bounded concurrency. Each probe and the write of its
//! result form one future, so a slow store write never holds a finished
//! response while another probe's timeout runs. Status follows the latest probe only: one
//! failure marks a service unhealthy, one success marks it healthy again.
//!
//! ERROR HANDLING
//! ==============
//! Probe failures are outcomes, not errors. A store failure while applying
//! one result is logged and the sweep continues with the rest.

use std::time::Duration;

use futures::StreamExt;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::db::StoreError;
use crate::model::{Service, ServiceStatus};
use crate::state::AppState;

const HEALTH_PATH: &str = "/dispatch/health";

/// Counts from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub healthy: usize,
    pub unhealthy: usize,
    /// Services unregistered between listing and applying their result.
    pub skipped: usize,
    /// Results that could not be written.
    pub failed: usize,
}

/// Spawn the monitor loop. Cancelling `cancel` stops it between sweeps and
/// drops any probes still in flight.
pub fn spawn_health_monitor(state: AppState, cancel: CancellationToken) -> JoinHandle<()> {
    let period = state.config.timing.health_check_interval;
    info!(
        interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        concurrency = state.config.timing.probe_concurrency,
        "health monitor started"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                () = cancel.cancelled() => break,
                result = sweep(&state) => match result {
                    Ok(summary) => debug!(?summary, "health sweep complete"),
                    Err(e) => error!(error = %e, "health sweep could not list services"),
                },
            }
        }
        info!("health monitor stopped");
    })
}

/// Probe every registered service once and persist each outcome.
///
/// # Errors
///
/// Returns an error only if the service list cannot be read.
pub async fn sweep(state: &AppState) -> Result<SweepSummary, StoreError> {
    let services = state.store.list_services().await?;
    let timeout = state.config.timing.probe_timeout;

    let mut checks = futures::stream::iter(services)
        .map(move |service| async move {
            let status = probe(&state.http, &service.base_url, timeout).await;
            apply(state, &service, status, OffsetDateTime::now_utc()).await
        })
        .buffer_unordered(state.config.timing.probe_concurrency.max(1));

    let mut summary = SweepSummary::default();
    while let Some(applied) = checks.next().await {
        match applied {
            Applied::Recorded(ServiceStatus::Healthy) => summary.healthy += 1,
            Applied::Recorded(ServiceStatus::Unhealthy) => summary.unhealthy += 1,
            Applied::Skipped => summary.skipped += 1,
            Applied::Failed => summary.failed += 1,
        }
    }
    Ok(summary)
}

/// One health check: any 2xx from `GET {base_url}/dispatch/health` within
/// `timeout` is healthy.
pub async fn probe(http: &reqwest::Client, base_url: &str, timeout: Duration) -> ServiceStatus {
    let url = format!("{base_url}{HEALTH_PATH}");
    match http.get(&url).timeout(timeout).send().await {
        Ok(response) if response.status().is_success() => ServiceStatus::Healthy,
        Ok(response) => {
            debug!(%url, status = %response.status(), "health probe failed");
            ServiceStatus::Unhealthy
        }
        Err(e) => {
            debug!(%url, error = %e, "health probe failed");
            ServiceStatus::Unhealthy
        }
    }
}

enum Applied {
    Recorded(ServiceStatus),
    Skipped,
    Failed,
}

async fn apply(state: &AppState, service: &Service, status: ServiceStatus, checked_at: OffsetDateTime) -> Applied {
    match state.store.update_health(service.id, status, checked_at).await {
        Ok(true) => {
            if service.status == status {
                debug!(service = %service.name, status = status.as_str(), "health unchanged");
            } else {
                info!(
                    service = %service.name,
                    from = service.status.as_str(),
                    to = status.as_str(),
                    "service health changed"
                );
            }
            Applied::Recorded(status)
        }
        Ok(false) => {
            debug!(service = %service.name, "service unregistered during sweep; skipping");
            Applied::Skipped
        }
        Err(e) => {
            error!(service = %service.name, error = %e, "failed to persist health result");
            Applied::Failed
        }
    }
}

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;
