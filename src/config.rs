//! Configuration management module
//!
//! Loads and validates environment-based configuration.
//! Designed to be production-ready and easily extensible.

use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid number format in environment variable")]
    ParseError,
}

/// Server configuration settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Upstream data provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of the energy service (pumps, consumption events)
    pub energy_base_url: String,
    /// Base URL of the water service (reservoirs)
    pub water_base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Dashboard refresh settings
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshSettings {
    /// Interval in seconds between fetch-and-aggregate cycles
    pub interval_secs: u64,
}

/// Alert derivation thresholds
///
/// Explicit, typed and defaulted; the aggregation engine takes these as a
/// whole rather than loose numeric parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertThresholds {
    /// Energy used strictly above this (kWh) raises an ENERGY alert
    pub overconsumption_threshold_kwh: f64,
    /// Fill ratio strictly below this (percent) raises a WATER alert
    pub critical_fill_ratio: f64,
    /// Fill ratio strictly below this (percent) escalates the WATER alert to CRITICAL
    pub severe_fill_ratio: f64,
    /// Lookback window (hours) for the inactive-pump anomaly check
    pub recent_window_hours: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            overconsumption_threshold_kwh: 100.0,
            critical_fill_ratio: 20.0,
            severe_fill_ratio: 10.0,
            recent_window_hours: 24,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub providers: ProviderSettings,
    pub refresh: RefreshSettings,
    pub alerts: AlertThresholds,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self, SettingsError> {
        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .map_err(|_| SettingsError::ParseError)?;

        let request_timeout_secs = env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .map_err(|_| SettingsError::ParseError)?;

        let interval_secs = env::var("REFRESH_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .map_err(|_| SettingsError::ParseError)?;

        let defaults = AlertThresholds::default();

        let overconsumption_threshold_kwh = env::var("OVERCONSUMPTION_THRESHOLD_KWH")
            .map(|v| v.parse())
            .unwrap_or(Ok(defaults.overconsumption_threshold_kwh))
            .map_err(|_| SettingsError::ParseError)?;

        let critical_fill_ratio = env::var("CRITICAL_FILL_RATIO")
            .map(|v| v.parse())
            .unwrap_or(Ok(defaults.critical_fill_ratio))
            .map_err(|_| SettingsError::ParseError)?;

        let severe_fill_ratio = env::var("SEVERE_FILL_RATIO")
            .map(|v| v.parse())
            .unwrap_or(Ok(defaults.severe_fill_ratio))
            .map_err(|_| SettingsError::ParseError)?;

        let recent_window_hours = env::var("RECENT_WINDOW_HOURS")
            .map(|v| v.parse())
            .unwrap_or(Ok(defaults.recent_window_hours))
            .map_err(|_| SettingsError::ParseError)?;

        Ok(Self {
            server: ServerSettings {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
                port,
            },
            providers: ProviderSettings {
                energy_base_url: env::var("ENERGY_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:30888/energy".into()),
                water_base_url: env::var("WATER_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:30888/eau".into()),
                request_timeout_secs,
            },
            refresh: RefreshSettings { interval_secs },
            alerts: AlertThresholds {
                overconsumption_threshold_kwh,
                critical_fill_ratio,
                severe_fill_ratio,
                recent_window_hours,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes tests that touch process-wide environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_settings() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("SERVER_HOST");
        env::remove_var("SERVER_PORT");
        env::remove_var("REFRESH_INTERVAL_SECS");
        env::remove_var("OVERCONSUMPTION_THRESHOLD_KWH");
        env::remove_var("CRITICAL_FILL_RATIO");

        let settings = Settings::from_env().unwrap();

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.refresh.interval_secs, 30);
        assert_eq!(settings.alerts.overconsumption_threshold_kwh, 100.0);
        assert_eq!(settings.alerts.critical_fill_ratio, 20.0);
        assert_eq!(settings.alerts.severe_fill_ratio, 10.0);
        assert_eq!(settings.alerts.recent_window_hours, 24);
    }

    #[test]
    fn test_custom_settings() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("SERVER_PORT", "3000");
        env::set_var("REFRESH_INTERVAL_SECS", "10");
        env::set_var("CRITICAL_FILL_RATIO", "25.0");

        let settings = Settings::from_env().unwrap();

        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.refresh.interval_secs, 10);
        assert_eq!(settings.alerts.critical_fill_ratio, 25.0);

        env::remove_var("SERVER_PORT");
        env::remove_var("REFRESH_INTERVAL_SECS");
        env::remove_var("CRITICAL_FILL_RATIO");
    }

    #[test]
    fn test_invalid_number_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("REFRESH_INTERVAL_SECS", "soon");

        assert!(Settings::from_env().is_err());

        env::remove_var("REFRESH_INTERVAL_SECS");
    }
}
