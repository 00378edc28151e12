//! HTTP request handlers
//!
//! Implements the REST API: dashboard summary, stats and alert feed, manual
//! refresh, and pass-through CRUD proxied to the upstream services.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::aggregation::DashboardStats;
use crate::error::AppError;
use crate::models::{
    Alert, ConsumptionInput, HealthCheck, PumpInput, ReservoirInput,
};
use crate::refresh::{run_cycle, DashboardContext};
use crate::state::RefreshStatus;
use crate::validation::{
    parse_category_filter, parse_severity_filter, validate_consumption_input,
    validate_pump_input, validate_reservoir_input,
};

/// Configure all application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Health check
            .route("/health", web::get().to(health_check))
            // Dashboard endpoints
            .route("/dashboard", web::get().to(get_dashboard))
            .route("/dashboard/stats", web::get().to(get_stats))
            .route("/dashboard/alerts", web::get().to(get_alerts))
            .route("/dashboard/refresh", web::post().to(refresh_dashboard))
            // Pump pass-through (energy service)
            .route("/pompes", web::get().to(list_pumps))
            .route("/pompes", web::post().to(create_pump))
            .route("/pompes/{id}", web::get().to(get_pump))
            .route("/pompes/{id}", web::put().to(update_pump))
            .route("/pompes/{id}", web::delete().to(delete_pump))
            .route("/pompes/{id}/activer", web::put().to(activate_pump))
            .route("/pompes/{id}/desactiver", web::put().to(deactivate_pump))
            // Consumption pass-through (energy service)
            .route("/consommations", web::get().to(list_consumptions))
            .route("/consommations", web::post().to(create_consumption))
            .route("/consommations/{id}", web::get().to(get_consumption))
            .route(
                "/consommations/pompe/{id}",
                web::get().to(consumptions_for_pump),
            )
            // Reservoir pass-through (water service)
            .route("/reservoirs", web::get().to(list_reservoirs))
            .route("/reservoirs", web::post().to(create_reservoir))
            .route("/reservoirs/{id}", web::get().to(get_reservoir))
            .route("/reservoirs/{id}", web::put().to(update_reservoir))
            .route("/reservoirs/{id}", web::delete().to(delete_reservoir))
            .route(
                "/reservoirs/{id}/remplissage",
                web::get().to(get_fill_ratio),
            ),
    );
}

/// Health check endpoint
///
/// GET /api/health
pub async fn health_check(
    ctx: web::Data<DashboardContext>,
) -> Result<HttpResponse, AppError> {
    let state = ctx.state.read().await;

    let health = HealthCheck {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.uptime_seconds(),
        last_refresh: state.last_refresh(),
    };

    Ok(HttpResponse::Ok().json(health))
}

/// Full dashboard view: refresh status plus the last good summary
#[derive(Serialize)]
struct DashboardResponse {
    status: RefreshStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<DashboardStats>,
    alerts: Vec<Alert>,
    last_refresh: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

/// Get the dashboard summary
///
/// GET /api/dashboard
///
/// Always answers, even before the first refresh completes; the `status`
/// field tells the presentation layer what it is looking at.
pub async fn get_dashboard(
    ctx: web::Data<DashboardContext>,
) -> Result<HttpResponse, AppError> {
    let state = ctx.state.read().await;

    let response = DashboardResponse {
        status: state.status(),
        stats: state.summary().map(|s| s.stats.clone()),
        alerts: state
            .summary()
            .map(|s| s.alerts.clone())
            .unwrap_or_default(),
        last_refresh: state.last_refresh(),
        last_error: state.last_error().map(|e| e.to_string()),
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Get dashboard statistics
///
/// GET /api/dashboard/stats
pub async fn get_stats(ctx: web::Data<DashboardContext>) -> Result<HttpResponse, AppError> {
    let state = ctx.state.read().await;

    match state.summary() {
        Some(summary) => Ok(HttpResponse::Ok().json(&summary.stats)),
        None => Err(AppError::NotFound(
            "No dashboard data available yet".to_string(),
        )),
    }
}

/// Query parameters for the alert feed
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub severity: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
}

#[derive(Serialize)]
struct AlertFeedResponse {
    alerts: Vec<Alert>,
    total: usize,
}

/// Get the prioritized alert feed, optionally filtered
///
/// GET /api/dashboard/alerts?severity=WARNING&type=WATER
pub async fn get_alerts(
    ctx: web::Data<DashboardContext>,
    query: web::Query<AlertQuery>,
) -> Result<HttpResponse, AppError> {
    let severity = parse_severity_filter(query.severity.as_deref())?;
    let category = parse_category_filter(query.category.as_deref())?;

    let state = ctx.state.read().await;
    let summary = state
        .summary()
        .ok_or_else(|| AppError::NotFound("No dashboard data available yet".to_string()))?;

    let alerts: Vec<Alert> = summary
        .alerts
        .iter()
        .filter(|a| severity.map_or(true, |s| a.severity == s))
        .filter(|a| category.map_or(true, |c| a.category == c))
        .cloned()
        .collect();

    let total = alerts.len();
    Ok(HttpResponse::Ok().json(AlertFeedResponse { alerts, total }))
}

/// Run one fetch-and-aggregate cycle now
///
/// POST /api/dashboard/refresh
pub async fn refresh_dashboard(
    ctx: web::Data<DashboardContext>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let correlation_id = extract_correlation_id(&req);
    info!(correlation_id = %correlation_id, "Manual dashboard refresh requested");

    let summary = run_cycle(ctx.get_ref()).await?;

    Ok(HttpResponse::Ok().json(summary))
}

// ---------------------------------------------------------------------------
// Pump pass-through
// ---------------------------------------------------------------------------

/// GET /api/pompes
pub async fn list_pumps(ctx: web::Data<DashboardContext>) -> Result<HttpResponse, AppError> {
    let pumps = ctx.energy.fetch_pumps().await?;
    Ok(HttpResponse::Ok().json(pumps))
}

/// POST /api/pompes
pub async fn create_pump(
    ctx: web::Data<DashboardContext>,
    body: web::Json<PumpInput>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let correlation_id = extract_correlation_id(&req);
    info!(
        correlation_id = %correlation_id,
        reference = %body.reference,
        "Creating pump"
    );

    validate_pump_input(&body)?;
    let created = ctx.energy.create_pump(&body).await?;

    Ok(HttpResponse::Created().json(created))
}

/// GET /api/pompes/{id}
pub async fn get_pump(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let pump = ctx.energy.get_pump(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(pump))
}

/// PUT /api/pompes/{id}
pub async fn update_pump(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
    body: web::Json<PumpInput>,
) -> Result<HttpResponse, AppError> {
    validate_pump_input(&body)?;
    let updated = ctx.energy.update_pump(path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/pompes/{id}
pub async fn delete_pump(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    ctx.energy.delete_pump(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// PUT /api/pompes/{id}/activer
pub async fn activate_pump(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    info!(pump_id = id, "Activating pump");
    ctx.energy.activate_pump(id).await?;
    Ok(HttpResponse::Ok().finish())
}

/// PUT /api/pompes/{id}/desactiver
pub async fn deactivate_pump(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    info!(pump_id = id, "Deactivating pump");
    ctx.energy.deactivate_pump(id).await?;
    Ok(HttpResponse::Ok().finish())
}

// ---------------------------------------------------------------------------
// Consumption pass-through
// ---------------------------------------------------------------------------

/// GET /api/consommations
pub async fn list_consumptions(
    ctx: web::Data<DashboardContext>,
) -> Result<HttpResponse, AppError> {
    let events = ctx.energy.fetch_consumptions().await?;
    Ok(HttpResponse::Ok().json(events))
}

/// POST /api/consommations
pub async fn create_consumption(
    ctx: web::Data<DashboardContext>,
    body: web::Json<ConsumptionInput>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let correlation_id = extract_correlation_id(&req);
    info!(
        correlation_id = %correlation_id,
        pump_id = body.pump_id,
        "Recording consumption measurement"
    );

    let mut input = body.into_inner();
    validate_consumption_input(&input)?;
    if input.measured_at.is_none() {
        input.measured_at = Some(Utc::now());
    }

    let created = ctx.energy.create_consumption(&input).await?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /api/consommations/{id}
pub async fn get_consumption(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let event = ctx.energy.get_consumption(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(event))
}

/// GET /api/consommations/pompe/{id}
pub async fn consumptions_for_pump(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let events = ctx.energy.consumptions_for_pump(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(events))
}

// ---------------------------------------------------------------------------
// Reservoir pass-through
// ---------------------------------------------------------------------------

/// GET /api/reservoirs
pub async fn list_reservoirs(
    ctx: web::Data<DashboardContext>,
) -> Result<HttpResponse, AppError> {
    let reservoirs = ctx.water.fetch_reservoirs().await?;
    Ok(HttpResponse::Ok().json(reservoirs))
}

/// POST /api/reservoirs
pub async fn create_reservoir(
    ctx: web::Data<DashboardContext>,
    body: web::Json<ReservoirInput>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let correlation_id = extract_correlation_id(&req);
    info!(
        correlation_id = %correlation_id,
        name = %body.name,
        "Creating reservoir"
    );

    validate_reservoir_input(&body)?;
    let created = ctx.water.create_reservoir(&body).await?;

    Ok(HttpResponse::Created().json(created))
}

/// GET /api/reservoirs/{id}
pub async fn get_reservoir(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let reservoir = ctx.water.get_reservoir(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(reservoir))
}

/// PUT /api/reservoirs/{id}
pub async fn update_reservoir(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
    body: web::Json<ReservoirInput>,
) -> Result<HttpResponse, AppError> {
    validate_reservoir_input(&body)?;
    let updated = ctx.water.update_reservoir(path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/reservoirs/{id}
pub async fn delete_reservoir(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    ctx.water.delete_reservoir(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/reservoirs/{id}/remplissage
pub async fn get_fill_ratio(
    ctx: web::Data<DashboardContext>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let ratio = ctx.water.fill_ratio(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ratio))
}

/// Extract or generate correlation ID from request headers
fn extract_correlation_id(req: &HttpRequest) -> String {
    req.headers()
        .get("X-Correlation-ID")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{aggregate, Snapshot};
    use crate::clients::{EnergyClient, WaterClient};
    use crate::config::AlertThresholds;
    use crate::models::{Pump, PumpStatus, Reservoir};
    use crate::state::DashboardState;
    use actix_web::{test, App};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn test_context() -> DashboardContext {
        let http = reqwest::Client::new();
        DashboardContext {
            energy: EnergyClient::new(http.clone(), "http://127.0.0.1:9/energy"),
            water: WaterClient::new(http, "http://127.0.0.1:9/eau"),
            thresholds: AlertThresholds::default(),
            state: Arc::new(RwLock::new(DashboardState::new())),
        }
    }

    fn populated_summary() -> crate::aggregation::DashboardSummary {
        let snapshot = Snapshot {
            pumps: vec![Pump {
                id: 1,
                reference: "P-001".to_string(),
                power_kw: 10.0,
                status: PumpStatus::Active,
                commissioned_at: Utc::now(),
            }],
            reservoirs: vec![Reservoir {
                id: 10,
                name: "Reservoir Nord".to_string(),
                total_capacity: 100.0,
                current_volume: 15.0,
                location: "Zone A".to_string(),
            }],
            consumptions: vec![],
        };
        aggregate(&snapshot, &AlertThresholds::default(), Utc::now())
    }

    #[actix_web::test]
    async fn test_health_check() {
        let ctx = test_context();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_dashboard_before_first_refresh() {
        let ctx = test_context();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/dashboard").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "IDLE");
        assert!(body.get("stats").is_none());
        assert_eq!(body["alerts"].as_array().unwrap().len(), 0);
    }

    #[actix_web::test]
    async fn test_dashboard_after_refresh() {
        let ctx = test_context();
        {
            let mut state = ctx.state.write().await;
            state.apply_summary(populated_summary());
        }

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/dashboard").to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;

        assert_eq!(body["status"], "READY");
        assert_eq!(body["stats"]["totalPompes"], 1);
        assert_eq!(body["stats"]["reservoirsCritiques"], 1);
        // 15% fill ratio produces one WATER warning
        assert_eq!(body["alerts"][0]["id"], "water-10");
    }

    #[actix_web::test]
    async fn test_stats_not_found_before_refresh() {
        let ctx = test_context();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/dashboard/stats")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_alert_filters() {
        let ctx = test_context();
        {
            let mut state = ctx.state.write().await;
            state.apply_summary(populated_summary());
        }

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/dashboard/alerts?type=WATER")
            .to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["total"], 1);

        let req = test::TestRequest::get()
            .uri("/api/dashboard/alerts?severity=CRITICAL")
            .to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["total"], 0);
    }

    #[actix_web::test]
    async fn test_alert_filter_rejects_unknown_severity() {
        let ctx = test_context();
        {
            let mut state = ctx.state.write().await;
            state.apply_summary(populated_summary());
        }

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/dashboard/alerts?severity=LOUD")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_create_pump_rejects_invalid_input() {
        // Validation fails before any upstream call is attempted
        let ctx = test_context();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .configure(configure_routes),
        )
        .await;

        let invalid = serde_json::json!({
            "reference": "",
            "puissance": -5.0,
            "statut": "ACTIVE",
            "dateMiseEnService": "2023-04-01T00:00:00Z"
        });

        let req = test::TestRequest::post()
            .uri("/api/pompes")
            .set_json(&invalid)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_create_reservoir_rejects_overfilled_input() {
        let ctx = test_context();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .configure(configure_routes),
        )
        .await;

        let invalid = serde_json::json!({
            "nom": "Reservoir Sud",
            "capaciteTotale": 100.0,
            "volumeActuel": 150.0,
            "localisation": "Zone B"
        });

        let req = test::TestRequest::post()
            .uri("/api/reservoirs")
            .set_json(&invalid)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_manual_refresh_failure_marks_state_failed() {
        let ctx = test_context();
        let state = ctx.state.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/dashboard/refresh")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 502);

        // The failed cycle is recorded but no summary was ever clobbered
        let req = test::TestRequest::get().uri("/api/dashboard").to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["status"], "FAILED");
        assert!(body.get("stats").is_none());
        assert!(body.get("last_error").is_some());

        assert_eq!(state.read().await.refresh_cycles(), 1);
    }

    #[actix_web::test]
    async fn test_list_pumps_maps_upstream_failure() {
        // Upstream unreachable: the proxy surfaces a gateway error
        let ctx = test_context();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ctx))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/pompes").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 502);
    }
}
