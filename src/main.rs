/// Flight board aggregation service entry point
mod clients;
mod config;
mod coords;
mod domain;
mod enricher;
mod errors;
mod handlers;
mod mock;
mod providers;
mod routes;
mod services;
mod utils;

use crate::clients::HttpClient;
use crate::config::AppConfig;
use crate::coords::CoordinateResolver;
use crate::enricher::RouteEnricher;
use crate::handlers::AppState;
use crate::providers::{ProviderContext, ProviderKind};
use crate::routes::build_router;
use crate::services::{
    AirportService, BoardService, FlightAggregator, FlightService, ProviderListing,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // Initialize shared clients
    let http_client = HttpClient::new(config.http_timeout_seconds.map(Duration::from_secs))?;
    let resolver = Arc::new(CoordinateResolver::new(
        http_client.clone(),
        config.airframes_api_url.clone(),
    ));
    let enricher = Arc::new(RouteEnricher::with_default_lookups(http_client.clone()));

    // Initialize providers
    let ctx = ProviderContext {
        http_client,
        api_keys: config.api_keys.clone(),
        airframes_api_url: config.airframes_api_url.clone(),
        resolver: resolver.clone(),
        enricher: enricher.clone(),
        base_urls: config
            .provider_base_urls
            .iter()
            .filter_map(|(name, url)| Some((name.parse::<ProviderKind>().ok()?, url.clone())))
            .collect(),
    };
    let aggregator = Arc::new(FlightAggregator::from_config(&config.provider_priority, &ctx));
    info!("Provider chain: {:?}", aggregator.provider_ids());

    // Initialize services
    let flight_service = Arc::new(FlightService::new(
        aggregator.clone(),
        config.default_flight_count,
    ));
    let airport_service = Arc::new(AirportService::new(aggregator.clone(), resolver));
    let board_service = Arc::new(BoardService::new(config.board.clone()));
    let providers = Arc::new(ProviderListing::new(
        &config.provider_priority,
        &config.api_keys,
        &aggregator,
    ));

    // Initialize application state
    let state = AppState {
        flight_service,
        airport_service,
        board_service: board_service.clone(),
        enricher,
        providers,
    };

    // Start background tasks
    start_background_tasks(board_service);

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("flightboard service listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Start the live board simulation tasks
fn start_background_tasks(board_service: Arc<BoardService>) {
    let settings = board_service.settings().clone();

    // Background task: advance board statuses
    {
        let service = board_service.clone();
        let interval = settings.tick_seconds;
        tokio::spawn(async move {
            info!("Starting board simulation task (interval: {}s)", interval);
            loop {
                tokio::time::sleep(Duration::from_secs(interval)).await;
                service.tick().await;
            }
        });
    }

    // Background task: regenerate boards
    {
        let service = board_service;
        let interval = settings.refresh_seconds;
        tokio::spawn(async move {
            info!("Starting board refresh task (interval: {}s)", interval);
            loop {
                tokio::time::sleep(Duration::from_secs(interval)).await;
                service.refresh().await;
            }
        });
    }

    info!(
        "Background tasks started for boards: {}",
        settings.airports.join(", ")
    );
}
