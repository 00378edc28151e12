//! Dashboard aggregation engine
//!
//! Turns one fetched snapshot (pumps, reservoirs, consumption events) into
//! summary statistics and a prioritized alert feed. Pure computation over the
//! given snapshot: no I/O, no hidden state, and `now` is fixed for the whole
//! pass so repeated calls with identical inputs produce identical output.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AlertThresholds;
use crate::models::{Alert, AlertCategory, AlertSeverity, ConsumptionEvent, Pump, PumpStatus, Reservoir};

/// The three collections fetched together and treated as consistent
/// for one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub pumps: Vec<Pump>,
    pub reservoirs: Vec<Reservoir>,
    pub consumptions: Vec<ConsumptionEvent>,
}

/// Summary statistics over one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(rename = "totalPompes")]
    pub total_pumps: usize,

    #[serde(rename = "pompesActives")]
    pub active_pumps: usize,

    #[serde(rename = "totalReservoirs")]
    pub total_reservoirs: usize,

    /// Reservoirs whose fill ratio is below the critical threshold
    #[serde(rename = "reservoirsCritiques")]
    pub critical_reservoirs: usize,

    /// Sum of energy used across all consumption events, in kWh
    #[serde(rename = "consommationTotale")]
    pub total_consumption_kwh: f64,
}

/// Output of one aggregation pass: statistics plus the sorted alert feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub stats: DashboardStats,
    pub alerts: Vec<Alert>,
    pub generated_at: DateTime<Utc>,
}

/// Aggregate one snapshot into statistics and alerts.
///
/// Alerts are generated in three passes (overconsumption, reservoir level,
/// inactive pump with recent activity) and then stably sorted by severity,
/// so equal severities keep their generation order.
pub fn aggregate(
    snapshot: &Snapshot,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> DashboardSummary {
    let stats = compute_stats(snapshot, thresholds);
    let mut alerts = Vec::new();

    check_overconsumption(snapshot, thresholds, &mut alerts);
    check_reservoir_levels(snapshot, thresholds, now, &mut alerts);
    check_inactive_pumps(snapshot, thresholds, now, &mut alerts);

    // Stable: ties keep generation order
    alerts.sort_by_key(|a| a.severity.rank());

    DashboardSummary {
        stats,
        alerts,
        generated_at: now,
    }
}

fn compute_stats(snapshot: &Snapshot, thresholds: &AlertThresholds) -> DashboardStats {
    DashboardStats {
        total_pumps: snapshot.pumps.len(),
        active_pumps: snapshot
            .pumps
            .iter()
            .filter(|p| p.status == PumpStatus::Active)
            .count(),
        total_reservoirs: snapshot.reservoirs.len(),
        critical_reservoirs: snapshot
            .reservoirs
            .iter()
            .filter(|r| r.fill_ratio() < thresholds.critical_fill_ratio)
            .count(),
        total_consumption_kwh: snapshot
            .consumptions
            .iter()
            .map(|c| c.energy_used_kwh)
            .sum(),
    }
}

/// Pass 1: one ENERGY/WARNING alert per event strictly above the threshold
fn check_overconsumption(
    snapshot: &Snapshot,
    thresholds: &AlertThresholds,
    alerts: &mut Vec<Alert>,
) {
    for event in &snapshot.consumptions {
        if event.energy_used_kwh <= thresholds.overconsumption_threshold_kwh {
            continue;
        }

        let label = snapshot
            .pumps
            .iter()
            .find(|p| p.id == event.pump_id)
            .map(|p| p.reference.clone())
            .unwrap_or_else(|| format!("Pompe #{}", event.pump_id));

        alerts.push(Alert {
            id: format!("energy-{}", event.id),
            category: AlertCategory::Energy,
            severity: AlertSeverity::Warning,
            message: format!(
                "Surconsommation détectée sur {}: {} kWh",
                label, event.energy_used_kwh
            ),
            timestamp: event.measured_at,
            pump_id: Some(event.pump_id),
            resolved: false,
        });
    }
}

/// Pass 2: one WATER alert per reservoir below the critical fill ratio,
/// escalated to CRITICAL below the severe threshold
fn check_reservoir_levels(
    snapshot: &Snapshot,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
    alerts: &mut Vec<Alert>,
) {
    for reservoir in &snapshot.reservoirs {
        let ratio = reservoir.fill_ratio();
        if ratio >= thresholds.critical_fill_ratio {
            continue;
        }

        let severity = if ratio < thresholds.severe_fill_ratio {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };

        alerts.push(Alert {
            id: format!("water-{}", reservoir.id),
            category: AlertCategory::Water,
            severity,
            message: format!(
                "Niveau critique du réservoir {}: {:.1}%",
                reservoir.name, ratio
            ),
            timestamp: now,
            pump_id: None,
            resolved: false,
        });
    }
}

/// Pass 3: one SYSTEM/INFO alert per INACTIVE pump that still has a
/// consumption event inside the lookback window (at most one per pump)
fn check_inactive_pumps(
    snapshot: &Snapshot,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
    alerts: &mut Vec<Alert>,
) {
    let cutoff = now - Duration::hours(thresholds.recent_window_hours);

    for pump in &snapshot.pumps {
        if pump.status != PumpStatus::Inactive {
            continue;
        }

        let recent_activity = snapshot
            .consumptions
            .iter()
            .any(|c| c.pump_id == pump.id && c.measured_at > cutoff);

        if recent_activity {
            alerts.push(Alert {
                id: format!("system-{}", pump.id),
                category: AlertCategory::System,
                severity: AlertSeverity::Info,
                message: format!(
                    "Pompe {} inactive mais avec consommation récente",
                    pump.reference
                ),
                timestamp: now,
                pump_id: Some(pump.id),
                resolved: false,
            });
        }
    }
}
