/// HTTP request handlers
use crate::domain::{Airport, FlightType, FlightsResponse, Health, RouteInfo};
use crate::enricher::RouteEnricher;
use crate::errors::ApiError;
use crate::mock::MAX_FLIGHT_COUNT;
use crate::services::{
    AirportLocation, AirportService, Board, BoardService, FlightService, ProviderListing,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_AIRPORT: &str = "KSMF";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub flight_service: Arc<FlightService>,
    pub airport_service: Arc<AirportService>,
    pub board_service: Arc<BoardService>,
    pub enricher: Arc<RouteEnricher>,
    pub providers: Arc<ProviderListing>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Departures or arrivals for an airport.
///
/// Query: `airport` (default KSMF), `type` (departure|arrival), `count`
/// (mock board size) and `mock=true` to skip the providers.
pub async fn get_flights(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<FlightsResponse>>, ApiError> {
    let airport = params
        .get("airport")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_AIRPORT);

    let kind = match params.get("type") {
        Some(raw) => raw.parse::<FlightType>().map_err(ApiError::InvalidInput)?,
        None => FlightType::Departure,
    };

    let count = params
        .get("count")
        .map(|raw| match raw.trim().parse::<usize>() {
            Ok(count) if count <= MAX_FLIGHT_COUNT => Ok(count),
            _ => Err(ApiError::InvalidInput(format!(
                "count must be a number between 0 and {}, got '{}'",
                MAX_FLIGHT_COUNT, raw
            ))),
        })
        .transpose()?;

    let force_mock = params
        .get("mock")
        .is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes"));

    let response = state
        .flight_service
        .get_flights(airport, kind, count, force_mock)
        .await;
    Ok(Json(SuccessResponse::new(response)))
}

/// Reference airport table
pub async fn list_airports(State(state): State<AppState>) -> Json<Value> {
    let airports = state.airport_service.list_airports();
    Json(serde_json::json!(SuccessResponse::new(serde_json::json!({
        "airports": airports
    }))))
}

/// Airport metadata
pub async fn get_airport(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Airport>>, ApiError> {
    let airport = state.airport_service.get_airport(&code).await?;
    Ok(Json(SuccessResponse::new(airport)))
}

/// Airport coordinates and search box
pub async fn get_airport_coordinates(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<AirportLocation>>, ApiError> {
    let location = state.airport_service.get_location(&code).await?;
    Ok(Json(SuccessResponse::new(location)))
}

/// Route of a callsign from the route-lookup services
pub async fn lookup_route(
    Path(callsign): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<RouteInfo>>, ApiError> {
    let callsign = callsign.trim().to_ascii_uppercase();
    let route = state
        .enricher
        .lookup_route(&callsign)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("route for {}", callsign)))?;
    Ok(Json(SuccessResponse::new(route)))
}

/// Known providers and the active chain
pub async fn list_providers(
    State(state): State<AppState>,
) -> Json<SuccessResponse<ProviderListing>> {
    Json(SuccessResponse::new(state.providers.as_ref().clone()))
}

/// Live mock board of a configured airport
pub async fn get_board(
    Path(airport): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Board>>, ApiError> {
    let board = state.board_service.get(&airport).await?;
    Ok(Json(SuccessResponse::new(board)))
}
