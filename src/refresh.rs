//! Dashboard refresh controller
//!
//! Owns the recurring fetch-and-aggregate task: on start it spawns a ticker
//! (first cycle immediate, then every interval) and each tick runs one cycle
//! that fetches the three collections concurrently, aggregates them, and
//! swaps the result into the shared state. Stopping cancels only the ticker;
//! an in-flight cycle finishes its fetches but its results are discarded
//! before any state write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::aggregation::{aggregate, DashboardSummary, Snapshot};
use crate::clients::{EnergyClient, WaterClient};
use crate::config::AlertThresholds;
use crate::error::AppResult;
use crate::state::SharedState;

/// Everything one fetch-and-aggregate cycle needs
#[derive(Debug, Clone)]
pub struct DashboardContext {
    pub energy: EnergyClient,
    pub water: WaterClient,
    pub thresholds: AlertThresholds,
    pub state: SharedState,
}

/// Recurring refresh task with explicit start/stop lifecycle
pub struct RefreshController {
    ctx: DashboardContext,
    period: Duration,
    active: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshController {
    pub fn new(ctx: DashboardContext, interval_secs: u64) -> Self {
        Self {
            ctx,
            period: Duration::from_secs(interval_secs),
            active: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Start the recurring refresh. The first cycle runs immediately.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            warn!("Refresh controller already started");
            return;
        }

        info!(period_secs = self.period.as_secs(), "Starting refresh controller");
        self.active.store(true, Ordering::SeqCst);

        let ctx = self.ctx.clone();
        let active = self.active.clone();
        let period = self.period;

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                // Cycles run detached so stopping the ticker never cancels
                // an in-flight fetch; the cycle itself checks `active`
                // before writing anything.
                tokio::spawn(scheduled_cycle(ctx.clone(), active.clone()));
            }
        }));
    }

    /// Stop the recurring refresh. In-flight cycles may finish their
    /// fetches but their results are discarded.
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Refresh controller stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for RefreshController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fetch the three collections concurrently; the first failure
/// short-circuits and the whole snapshot is abandoned
async fn fetch_snapshot(ctx: &DashboardContext) -> AppResult<Snapshot> {
    let (pumps, reservoirs, consumptions) = future::try_join3(
        ctx.energy.fetch_pumps(),
        ctx.water.fetch_reservoirs(),
        ctx.energy.fetch_consumptions(),
    )
    .await?;

    debug!(
        pumps = pumps.len(),
        reservoirs = reservoirs.len(),
        consumptions = consumptions.len(),
        "Snapshot fetched"
    );

    Ok(Snapshot {
        pumps,
        reservoirs,
        consumptions,
    })
}

/// Run one fetch-and-aggregate cycle on demand, always committing the
/// outcome. Used by the manual refresh endpoint.
pub async fn run_cycle(ctx: &DashboardContext) -> AppResult<DashboardSummary> {
    ctx.state.write().await.begin_refresh();

    match fetch_snapshot(ctx).await {
        Ok(snapshot) => {
            let summary = aggregate(&snapshot, &ctx.thresholds, Utc::now());
            ctx.state.write().await.apply_summary(summary.clone());
            Ok(summary)
        }
        Err(e) => {
            error!(error = %e, "Dashboard refresh cycle failed");
            ctx.state.write().await.mark_failed(e.to_string());
            Err(e)
        }
    }
}

/// One scheduled cycle: like `run_cycle` but every state write is gated on
/// the controller still being active, so late results become no-ops
async fn scheduled_cycle(ctx: DashboardContext, active: Arc<AtomicBool>) {
    if !active.load(Ordering::SeqCst) {
        return;
    }

    ctx.state.write().await.begin_refresh();
    let fetched = fetch_snapshot(&ctx).await;
    commit_cycle(&ctx, &active, fetched).await;
}

/// Commit a fetched snapshot (or its failure) unless the controller was
/// stopped while the fetches were in flight
async fn commit_cycle(ctx: &DashboardContext, active: &AtomicBool, fetched: AppResult<Snapshot>) {
    if !active.load(Ordering::SeqCst) {
        debug!("Refresh controller stopped mid-cycle, discarding results");
        return;
    }

    match fetched {
        Ok(snapshot) => {
            let summary = aggregate(&snapshot, &ctx.thresholds, Utc::now());
            ctx.state.write().await.apply_summary(summary);
        }
        Err(e) => {
            error!(error = %e, "Scheduled refresh cycle failed");
            ctx.state.write().await.mark_failed(e.to_string());
        }
    }
}
