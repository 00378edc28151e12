//! Input validation module
//!
//! Validates CRUD inputs before they are proxied to the upstream services,
//! and parses the alert feed query filters.

use crate::error::{AppError, AppResult};
use crate::models::{
    AlertCategory, AlertSeverity, ConsumptionInput, PumpInput, ReservoirInput,
};
use tracing::{debug, warn};
use validator::{Validate, ValidationErrors};

/// Flatten validator field errors into one client-safe message
fn collect_field_errors(errors: ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let msgs: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.message.as_ref().map(|c| c.as_ref()))
                .collect();
            format!("{}: {}", field, msgs.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Reject NaN and infinities before they reach the upstream services
fn require_finite(value: f64, field: &str) -> AppResult<()> {
    if !value.is_finite() {
        return Err(AppError::ValidationError(format!(
            "{field} must be a finite number"
        )));
    }
    Ok(())
}

/// Validate a pump create/update input
pub fn validate_pump_input(input: &PumpInput) -> AppResult<()> {
    if let Err(errors) = input.validate() {
        let message = collect_field_errors(errors);
        warn!(errors = %message, "Pump input validation failed");
        return Err(AppError::ValidationError(message));
    }

    require_finite(input.power_kw, "Power")?;

    debug!("Pump input validation passed");
    Ok(())
}

/// Validate a reservoir create/update input
pub fn validate_reservoir_input(input: &ReservoirInput) -> AppResult<()> {
    if let Err(errors) = input.validate() {
        let message = collect_field_errors(errors);
        warn!(errors = %message, "Reservoir input validation failed");
        return Err(AppError::ValidationError(message));
    }

    require_finite(input.total_capacity, "Capacity")?;
    require_finite(input.current_volume, "Volume")?;

    if input.current_volume > input.total_capacity {
        return Err(AppError::ValidationError(format!(
            "Volume {} exceeds capacity {}",
            input.current_volume, input.total_capacity
        )));
    }

    debug!("Reservoir input validation passed");
    Ok(())
}

/// Validate a consumption measurement input
pub fn validate_consumption_input(input: &ConsumptionInput) -> AppResult<()> {
    if let Err(errors) = input.validate() {
        let message = collect_field_errors(errors);
        warn!(errors = %message, "Consumption input validation failed");
        return Err(AppError::ValidationError(message));
    }

    require_finite(input.energy_used_kwh, "Energy")?;
    require_finite(input.duration_hours, "Duration")?;

    debug!("Consumption input validation passed");
    Ok(())
}

/// Parse an optional `severity=` query value
pub fn parse_severity_filter(value: Option<&str>) -> AppResult<Option<AlertSeverity>> {
    match value {
        None => Ok(None),
        Some(s) => match s.to_uppercase().as_str() {
            "CRITICAL" => Ok(Some(AlertSeverity::Critical)),
            "WARNING" => Ok(Some(AlertSeverity::Warning)),
            "INFO" => Ok(Some(AlertSeverity::Info)),
            other => Err(AppError::BadRequest(format!(
                "Invalid severity: {other}. Valid values: CRITICAL, WARNING, INFO"
            ))),
        },
    }
}

/// Parse an optional `type=` query value
pub fn parse_category_filter(value: Option<&str>) -> AppResult<Option<AlertCategory>> {
    match value {
        None => Ok(None),
        Some(s) => match s.to_uppercase().as_str() {
            "ENERGY" => Ok(Some(AlertCategory::Energy)),
            "WATER" => Ok(Some(AlertCategory::Water)),
            "SYSTEM" => Ok(Some(AlertCategory::System)),
            other => Err(AppError::BadRequest(format!(
                "Invalid alert type: {other}. Valid values: ENERGY, WATER, SYSTEM"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PumpStatus;
    use chrono::Utc;

    fn valid_pump() -> PumpInput {
        PumpInput {
            reference: "P-001".to_string(),
            power_kw: 15.0,
            status: PumpStatus::Active,
            commissioned_at: Utc::now(),
        }
    }

    fn valid_reservoir() -> ReservoirInput {
        ReservoirInput {
            name: "Reservoir Nord".to_string(),
            total_capacity: 1000.0,
            current_volume: 400.0,
            location: "Zone A".to_string(),
        }
    }

    #[test]
    fn test_valid_pump_input() {
        assert!(validate_pump_input(&valid_pump()).is_ok());
    }

    #[test]
    fn test_pump_rejects_non_positive_power() {
        let mut input = valid_pump();
        input.power_kw = 0.0;
        assert!(validate_pump_input(&input).is_err());
    }

    #[test]
    fn test_pump_rejects_empty_reference() {
        let mut input = valid_pump();
        input.reference = "".to_string();
        assert!(validate_pump_input(&input).is_err());
    }

    #[test]
    fn test_valid_reservoir_input() {
        assert!(validate_reservoir_input(&valid_reservoir()).is_ok());
    }

    #[test]
    fn test_reservoir_rejects_volume_above_capacity() {
        let mut input = valid_reservoir();
        input.current_volume = 1500.0;

        let result = validate_reservoir_input(&input);
        assert!(result.is_err());
        if let Err(AppError::ValidationError(msg)) = result {
            assert!(msg.contains("exceeds capacity"));
        }
    }

    #[test]
    fn test_reservoir_rejects_zero_capacity() {
        let mut input = valid_reservoir();
        input.total_capacity = 0.0;
        input.current_volume = 0.0;
        assert!(validate_reservoir_input(&input).is_err());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let mut reservoir = valid_reservoir();
        reservoir.total_capacity = f64::INFINITY;
        assert!(validate_reservoir_input(&reservoir).is_err());

        let consumption = ConsumptionInput {
            pump_id: 1,
            energy_used_kwh: f64::NAN,
            duration_hours: 1.0,
            measured_at: None,
        };
        assert!(validate_consumption_input(&consumption).is_err());
    }

    #[test]
    fn test_consumption_rejects_zero_duration() {
        let input = ConsumptionInput {
            pump_id: 1,
            energy_used_kwh: 10.0,
            duration_hours: 0.0,
            measured_at: None,
        };
        assert!(validate_consumption_input(&input).is_err());
    }

    #[test]
    fn test_severity_filter_parsing() {
        assert_eq!(parse_severity_filter(None).unwrap(), None);
        assert_eq!(
            parse_severity_filter(Some("critical")).unwrap(),
            Some(AlertSeverity::Critical)
        );
        assert_eq!(
            parse_severity_filter(Some("WARNING")).unwrap(),
            Some(AlertSeverity::Warning)
        );
        assert!(parse_severity_filter(Some("LOUD")).is_err());
    }

    #[test]
    fn test_category_filter_parsing() {
        assert_eq!(
            parse_category_filter(Some("water")).unwrap(),
            Some(AlertCategory::Water)
        );
        assert!(parse_category_filter(Some("FIRE")).is_err());
    }
}
