//! Upstream data provider clients
//!
//! Typed HTTP clients for the two backend services: the energy service
//! (pumps, consumption events) and the water service (reservoirs). Every
//! response body is decoded into the typed models at this boundary, so a
//! missing or malformed field surfaces as a descriptive error here instead
//! of leaking NaN into the dashboard. No retries: the refresh cadence is
//! the retry mechanism.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{ConsumptionEvent, ConsumptionInput, Pump, PumpInput, Reservoir, ReservoirInput};

/// Client for the energy service (pumps and consumption events)
#[derive(Debug, Clone)]
pub struct EnergyClient {
    http: Client,
    base_url: String,
}

/// Client for the water service (reservoirs)
#[derive(Debug, Clone)]
pub struct WaterClient {
    http: Client,
    base_url: String,
}

/// Map a non-success upstream status to an application error
async fn check_status(response: Response, context: &str) -> AppResult<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!("{context}: not found upstream")));
    }
    if !status.is_success() {
        return Err(AppError::UpstreamError(format!(
            "{context}: upstream returned {status}"
        )));
    }
    Ok(response)
}

/// Decode a JSON body, naming the collection in the error
async fn decode_json<T: DeserializeOwned>(response: Response, context: &str) -> AppResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| AppError::DecodeError(format!("{context}: {e}")))
}

impl EnergyClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Fetch the full pump collection
    pub async fn fetch_pumps(&self) -> AppResult<Vec<Pump>> {
        let url = self.endpoint("/pompes");
        debug!(url = %url, "Fetching pumps");
        let response = self.http.get(&url).send().await?;
        decode_json(check_status(response, "pumps").await?, "pumps").await
    }

    /// Fetch the full consumption event collection
    pub async fn fetch_consumptions(&self) -> AppResult<Vec<ConsumptionEvent>> {
        let url = self.endpoint("/consommations");
        debug!(url = %url, "Fetching consumption events");
        let response = self.http.get(&url).send().await?;
        decode_json(check_status(response, "consumptions").await?, "consumptions").await
    }

    pub async fn get_pump(&self, id: i64) -> AppResult<Pump> {
        let response = self.http.get(self.endpoint(&format!("/pompes/{id}"))).send().await?;
        decode_json(check_status(response, "pump").await?, "pump").await
    }

    pub async fn create_pump(&self, input: &PumpInput) -> AppResult<Pump> {
        let response = self
            .http
            .post(self.endpoint("/pompes"))
            .json(input)
            .send()
            .await?;
        decode_json(check_status(response, "pump").await?, "pump").await
    }

    pub async fn update_pump(&self, id: i64, input: &PumpInput) -> AppResult<Pump> {
        let response = self
            .http
            .put(self.endpoint(&format!("/pompes/{id}")))
            .json(input)
            .send()
            .await?;
        decode_json(check_status(response, "pump").await?, "pump").await
    }

    pub async fn delete_pump(&self, id: i64) -> AppResult<()> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/pompes/{id}")))
            .send()
            .await?;
        check_status(response, "pump").await?;
        Ok(())
    }

    /// Toggle the pump to ACTIVE via the dedicated upstream operation
    pub async fn activate_pump(&self, id: i64) -> AppResult<()> {
        let response = self
            .http
            .put(self.endpoint(&format!("/pompes/{id}/activer")))
            .send()
            .await?;
        check_status(response, "pump").await?;
        Ok(())
    }

    /// Toggle the pump to INACTIVE via the dedicated upstream operation
    pub async fn deactivate_pump(&self, id: i64) -> AppResult<()> {
        let response = self
            .http
            .put(self.endpoint(&format!("/pompes/{id}/desactiver")))
            .send()
            .await?;
        check_status(response, "pump").await?;
        Ok(())
    }

    pub async fn get_consumption(&self, id: i64) -> AppResult<ConsumptionEvent> {
        let response = self
            .http
            .get(self.endpoint(&format!("/consommations/{id}")))
            .send()
            .await?;
        decode_json(check_status(response, "consumption").await?, "consumption").await
    }

    pub async fn create_consumption(&self, input: &ConsumptionInput) -> AppResult<ConsumptionEvent> {
        let response = self
            .http
            .post(self.endpoint("/consommations"))
            .json(input)
            .send()
            .await?;
        decode_json(check_status(response, "consumption").await?, "consumption").await
    }

    pub async fn consumptions_for_pump(&self, pump_id: i64) -> AppResult<Vec<ConsumptionEvent>> {
        let response = self
            .http
            .get(self.endpoint(&format!("/consommations/pompe/{pump_id}")))
            .send()
            .await?;
        decode_json(check_status(response, "consumptions").await?, "consumptions").await
    }
}

impl WaterClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Fetch the full reservoir collection
    pub async fn fetch_reservoirs(&self) -> AppResult<Vec<Reservoir>> {
        let url = self.endpoint("/reservoirs");
        debug!(url = %url, "Fetching reservoirs");
        let response = self.http.get(&url).send().await?;
        decode_json(check_status(response, "reservoirs").await?, "reservoirs").await
    }

    pub async fn get_reservoir(&self, id: i64) -> AppResult<Reservoir> {
        let response = self
            .http
            .get(self.endpoint(&format!("/reservoirs/{id}")))
            .send()
            .await?;
        decode_json(check_status(response, "reservoir").await?, "reservoir").await
    }

    pub async fn create_reservoir(&self, input: &ReservoirInput) -> AppResult<Reservoir> {
        let response = self
            .http
            .post(self.endpoint("/reservoirs"))
            .json(input)
            .send()
            .await?;
        decode_json(check_status(response, "reservoir").await?, "reservoir").await
    }

    pub async fn update_reservoir(&self, id: i64, input: &ReservoirInput) -> AppResult<Reservoir> {
        let response = self
            .http
            .put(self.endpoint(&format!("/reservoirs/{id}")))
            .json(input)
            .send()
            .await?;
        decode_json(check_status(response, "reservoir").await?, "reservoir").await
    }

    pub async fn delete_reservoir(&self, id: i64) -> AppResult<()> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/reservoirs/{id}")))
            .send()
            .await?;
        check_status(response, "reservoir").await?;
        Ok(())
    }

    /// Upstream-computed fill ratio for one reservoir (percentage)
    pub async fn fill_ratio(&self, id: i64) -> AppResult<f64> {
        let response = self
            .http
            .get(self.endpoint(&format!("/reservoirs/{id}/remplissage")))
            .send()
            .await?;
        decode_json(check_status(response, "fill ratio").await?, "fill ratio").await
    }
}
