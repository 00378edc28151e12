//! Application state management
//!
//! Central state container for the dashboard: the current refresh status,
//! the last good aggregation result, and refresh bookkeeping. Results are
//! swapped in as one atomic write; a failed cycle never clobbers the last
//! good summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::aggregation::DashboardSummary;

/// Shared handle to the dashboard state
pub type SharedState = Arc<RwLock<DashboardState>>;

/// Refresh lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshStatus {
    #[serde(rename = "IDLE")]
    Idle,
    #[serde(rename = "LOADING")]
    Loading,
    #[serde(rename = "READY")]
    Ready,
    #[serde(rename = "FAILED")]
    Failed,
}

/// Central application state
#[derive(Debug)]
pub struct DashboardState {
    status: RefreshStatus,
    /// Last good aggregation result; stays displayed through failures
    summary: Option<DashboardSummary>,
    last_refresh: Option<DateTime<Utc>>,
    last_error: Option<String>,
    /// Application start time
    start_time: DateTime<Utc>,
    /// Completed fetch-and-aggregate cycles (including failed ones)
    refresh_cycles: u64,
}

impl DashboardState {
    /// Create new application state
    pub fn new() -> Self {
        info!("Initializing dashboard state");
        Self {
            status: RefreshStatus::Idle,
            summary: None,
            last_refresh: None,
            last_error: None,
            start_time: Utc::now(),
            refresh_cycles: 0,
        }
    }

    /// Mark the start of a fetch-and-aggregate cycle
    pub fn begin_refresh(&mut self) {
        debug!("Refresh cycle starting");
        self.status = RefreshStatus::Loading;
    }

    /// Swap in the result of a successful cycle as one atomic update
    pub fn apply_summary(&mut self, summary: DashboardSummary) {
        self.refresh_cycles += 1;
        self.last_refresh = Some(summary.generated_at);
        self.last_error = None;
        self.status = RefreshStatus::Ready;

        debug!(
            cycle = self.refresh_cycles,
            alerts = summary.alerts.len(),
            "Applying dashboard summary"
        );

        self.summary = Some(summary);
    }

    /// Record a failed cycle, leaving the previous summary untouched
    pub fn mark_failed(&mut self, error: String) {
        self.refresh_cycles += 1;
        self.status = RefreshStatus::Failed;
        self.last_error = Some(error);
    }

    pub fn status(&self) -> RefreshStatus {
        self.status
    }

    pub fn summary(&self) -> Option<&DashboardSummary> {
        self.summary.as_ref()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.start_time).num_seconds() as u64
    }

    pub fn refresh_cycles(&self) -> u64 {
        self.refresh_cycles
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}
