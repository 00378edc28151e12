//! Data models for pumps, reservoirs, consumption events and derived alerts
//!
//! Field names on the wire follow the upstream energy and water services
//! (French camelCase), so every record decodes straight off their JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Operating status of a pump, as reported by the energy service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "INACTIVE")]
    Inactive,
    #[serde(rename = "EN_MAINTENANCE")]
    Maintenance,
}

/// Industrial pump record owned by the energy service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pump {
    /// Identifier assigned by the energy service, never generated here
    pub id: i64,

    /// Human-readable pump reference (unique upstream)
    pub reference: String,

    /// Rated power in kW
    #[serde(rename = "puissance")]
    pub power_kw: f64,

    #[serde(rename = "statut")]
    pub status: PumpStatus,

    #[serde(rename = "dateMiseEnService")]
    pub commissioned_at: DateTime<Utc>,
}

/// Water reservoir record owned by the water service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservoir {
    pub id: i64,

    #[serde(rename = "nom")]
    pub name: String,

    /// Total capacity in liters, expected > 0 upstream
    #[serde(rename = "capaciteTotale")]
    pub total_capacity: f64,

    /// Current volume in liters, expected within [0, capacity]
    #[serde(rename = "volumeActuel")]
    pub current_volume: f64,

    #[serde(rename = "localisation")]
    pub location: String,
}

impl Reservoir {
    /// Fill ratio as a percentage, always recomputed and never stored.
    /// A non-positive capacity reports 0.0 rather than NaN or infinity.
    pub fn fill_ratio(&self) -> f64 {
        if self.total_capacity <= 0.0 {
            return 0.0;
        }
        (self.current_volume / self.total_capacity) * 100.0
    }
}

/// One electrical consumption measurement, weakly referencing its pump by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    pub id: i64,

    #[serde(rename = "pompeId")]
    pub pump_id: i64,

    /// Energy used in kWh
    #[serde(rename = "energieUtilisee")]
    pub energy_used_kwh: f64,

    /// Measurement duration in hours
    #[serde(rename = "duree")]
    pub duration_hours: f64,

    #[serde(rename = "dateMesure")]
    pub measured_at: DateTime<Utc>,
}

/// Alert category, one per detection pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCategory {
    #[serde(rename = "ENERGY")]
    Energy,
    #[serde(rename = "WATER")]
    Water,
    #[serde(rename = "SYSTEM")]
    System,
}

/// Alert severity; `rank` drives the feed ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    #[serde(rename = "CRITICAL")]
    Critical,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "INFO")]
    Info,
}

impl AlertSeverity {
    /// Sort rank: CRITICAL(0) < WARNING(1) < INFO(2)
    pub fn rank(&self) -> u8 {
        match self {
            AlertSeverity::Critical => 0,
            AlertSeverity::Warning => 1,
            AlertSeverity::Info => 2,
        }
    }
}

/// Derived alert, computed per aggregation pass and never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Synthesized as `<category>-<sourceId>`, unique within one pass
    pub id: String,

    #[serde(rename = "type")]
    pub category: AlertCategory,

    pub severity: AlertSeverity,

    pub message: String,

    pub timestamp: DateTime<Utc>,

    /// Owning pump, when the alert concerns one
    #[serde(rename = "pompeId", skip_serializing_if = "Option::is_none")]
    pub pump_id: Option<i64>,

    /// Always false at creation; there is no resolution workflow
    pub resolved: bool,
}

/// Input DTO for creating or updating a pump via the pass-through API
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PumpInput {
    #[validate(length(min = 1, message = "Reference must not be empty"))]
    pub reference: String,

    #[serde(rename = "puissance")]
    #[validate(range(exclusive_min = 0.0, message = "Power must be positive"))]
    pub power_kw: f64,

    #[serde(rename = "statut")]
    pub status: PumpStatus,

    #[serde(rename = "dateMiseEnService")]
    pub commissioned_at: DateTime<Utc>,
}

/// Input DTO for creating or updating a reservoir
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReservoirInput {
    #[serde(rename = "nom")]
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,

    #[serde(rename = "capaciteTotale")]
    #[validate(range(exclusive_min = 0.0, message = "Capacity must be positive"))]
    pub total_capacity: f64,

    #[serde(rename = "volumeActuel")]
    #[validate(range(min = 0.0, message = "Volume must not be negative"))]
    pub current_volume: f64,

    #[serde(rename = "localisation")]
    #[validate(length(min = 1, message = "Location must not be empty"))]
    pub location: String,
}

/// Input DTO for recording a consumption measurement
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConsumptionInput {
    #[serde(rename = "pompeId")]
    pub pump_id: i64,

    #[serde(rename = "energieUtilisee")]
    #[validate(range(min = 0.0, message = "Energy must not be negative"))]
    pub energy_used_kwh: f64,

    #[serde(rename = "duree")]
    #[validate(range(exclusive_min = 0.0, message = "Duration must be positive"))]
    pub duration_hours: f64,

    /// Optional client-provided measurement time (defaults to server time)
    #[serde(rename = "dateMesure", skip_serializing_if = "Option::is_none")]
    pub measured_at: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub last_refresh: Option<DateTime<Utc>>,
}
