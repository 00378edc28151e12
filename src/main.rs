//! HydroPulse
//!
//! Backend for an industrial pump, reservoir and energy-consumption
//! monitoring dashboard. Periodically pulls pumps, reservoirs and
//! consumption events from the upstream energy and water services,
//! aggregates them into statistics and a prioritized alert feed, and
//! serves the results plus pass-through CRUD over REST.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod aggregation;
mod clients;
mod config;
mod error;
mod handlers;
mod models;
mod refresh;
mod state;
mod validation;

use crate::clients::{EnergyClient, WaterClient};
use crate::config::Settings;
use crate::refresh::{DashboardContext, RefreshController};
use crate::state::DashboardState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenv::dotenv().ok();

    // Logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hydropulse=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();

    // Load configuration
    let settings = Settings::from_env().context("Failed to load configuration")?;
    let bind_address = format!("{}:{}", settings.server.host, settings.server.port);

    info!("Starting HydroPulse backend");
    info!(
        energy = %settings.providers.energy_base_url,
        water = %settings.providers.water_base_url,
        "Upstream data providers"
    );
    info!("Binding server to {}", bind_address);

    // One HTTP client shared by both provider clients
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.providers.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let ctx = DashboardContext {
        energy: EnergyClient::new(http.clone(), settings.providers.energy_base_url.clone()),
        water: WaterClient::new(http, settings.providers.water_base_url.clone()),
        thresholds: settings.alerts.clone(),
        state: Arc::new(RwLock::new(DashboardState::new())),
    };

    // ---------------------------------------------------------------------
    // Recurring fetch-and-aggregate task
    // Owned by the controller; stopped explicitly when the server exits
    // ---------------------------------------------------------------------
    let mut controller = RefreshController::new(ctx.clone(), settings.refresh.interval_secs);
    controller.start();

    // ---------------------------------------------------------------------
    // HTTP server
    // ---------------------------------------------------------------------
    let app_ctx = ctx.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_ctx.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    controller.stop();
    Ok(())
}
