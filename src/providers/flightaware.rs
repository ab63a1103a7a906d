//! FlightAware AeroAPI provider.
//!
//! Scheduled departures/arrivals per airport, authenticated with the
//! `x-apikey` header. Timestamps are ISO 8601 strings.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{airport_from_value, batch_id, map_status, or_empty, FlightDataProvider};
use crate::clients::HttpClient;
use crate::domain::{gate_from_raw, Airport, Endpoint, Flight, FlightStatus, FlightType};
use crate::errors::{ApiError, ApiResult};
use crate::utils::{first_non_empty, parse_time};

pub(crate) const BASE_URL: &str = "https://aeroapi.flightaware.com/aeroapi";
const PROVIDER_ID: &str = "FLIGHTAWARE";

const STATUS_TABLE: &[(&str, FlightStatus)] = &[
    ("Scheduled", FlightStatus::Scheduled),
    ("Boarding", FlightStatus::Boarding),
    ("Departed", FlightStatus::Departed),
    ("En Route", FlightStatus::Departed),
    ("Approaching", FlightStatus::Arriving),
    ("Arrived", FlightStatus::Landed),
    ("Cancelled", FlightStatus::Cancelled),
    ("Delayed", FlightStatus::Delayed),
];

#[derive(Debug, Default, Deserialize)]
struct FlightsResponse {
    #[serde(default)]
    scheduled: Option<Vec<FaFlight>>,
    #[serde(default)]
    flights: Option<Vec<FaFlight>>,
    #[serde(default)]
    scheduled_departures: Option<Vec<FaFlight>>,
    #[serde(default)]
    scheduled_arrivals: Option<Vec<FaFlight>>,
}

impl FlightsResponse {
    fn into_flights(self) -> Vec<FaFlight> {
        self.scheduled
            .or(self.flights)
            .or(self.scheduled_departures)
            .or(self.scheduled_arrivals)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct FaAirport {
    code: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FaFlight {
    fa_flight_id: Option<String>,
    ident: Option<String>,
    operator: Option<String>,
    origin: Option<FaAirport>,
    destination: Option<FaAirport>,
    scheduled_off: Option<String>,
    scheduled_on: Option<String>,
    estimated_off: Option<String>,
    estimated_on: Option<String>,
    actual_off: Option<String>,
    actual_on: Option<String>,
    gate_origin: Option<String>,
    gate_destination: Option<String>,
    terminal_origin: Option<String>,
    terminal_destination: Option<String>,
    status: Option<String>,
    aircraft_type: Option<String>,
}

fn endpoint(airport: &Option<FaAirport>) -> Endpoint {
    match airport {
        Some(a) => Endpoint::from_raw(a.name.as_deref(), a.code.as_deref()),
        None => Endpoint::unknown(),
    }
}

/// Pick the departure-side or arrival-side value, falling back to the other.
fn sided<'a>(kind: FlightType, off: &'a Option<String>, on: &'a Option<String>) -> Option<&'a str> {
    match kind {
        FlightType::Departure => first_non_empty(&[off.as_deref(), on.as_deref()]),
        FlightType::Arrival => first_non_empty(&[on.as_deref(), off.as_deref()]),
    }
}

/// FlightAware AeroAPI provider
pub struct FlightAwareProvider {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

impl FlightAwareProvider {
    pub fn with_base_url(
        http_client: HttpClient,
        api_key: String,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_key,
            base_url: base_url.into(),
        }
    }

    async fn flights(&self, airport: &str, kind: FlightType) -> ApiResult<Vec<Flight>> {
        let endpoint = match kind {
            FlightType::Departure => "scheduled_departures",
            FlightType::Arrival => "scheduled_arrivals",
        };
        let request = self
            .http_client
            .get_client()
            .get(format!(
                "{}/airports/{}/flights/{}",
                self.base_url, airport, endpoint
            ))
            .header("x-apikey", &self.api_key);

        let data: FlightsResponse = self.http_client.send_json(PROVIDER_ID, request).await?;
        Ok(data
            .into_flights()
            .into_iter()
            .filter_map(|f| Self::transform(f, kind))
            .collect())
    }

    fn transform(f: FaFlight, kind: FlightType) -> Option<Flight> {
        let scheduled = sided(kind, &f.scheduled_off, &f.scheduled_on).and_then(parse_time);
        let Some(scheduled_time) = scheduled else {
            debug!("FlightAware: skipping {:?} without a schedule", f.ident);
            return None;
        };

        let ident = first_non_empty(&[f.fa_flight_id.as_deref(), f.ident.as_deref()])
            .unwrap_or("flightaware");
        let gate = sided(kind, &f.gate_origin, &f.gate_destination);

        Some(Flight {
            id: batch_id(ident),
            flight_number: f.ident.clone().filter(|s| !s.trim().is_empty()),
            airline: f.operator.clone(),
            origin: endpoint(&f.origin),
            destination: endpoint(&f.destination),
            scheduled_time,
            estimated_time: sided(kind, &f.estimated_off, &f.estimated_on).and_then(parse_time),
            actual_time: sided(kind, &f.actual_off, &f.actual_on).and_then(parse_time),
            gate: gate_from_raw(gate),
            terminal: sided(kind, &f.terminal_origin, &f.terminal_destination).map(str::to_string),
            status: map_status(STATUS_TABLE, f.status.as_deref()),
            aircraft: f.aircraft_type.clone(),
            duration: None,
        })
    }

    async fn airport(&self, code: &str) -> ApiResult<Option<Airport>> {
        let request = self
            .http_client
            .get_client()
            .get(format!("{}/airports/{}", self.base_url, code))
            .header("x-apikey", &self.api_key);

        match self.http_client.send_json::<Value>(PROVIDER_ID, request).await {
            Ok(data) => Ok(airport_from_value(&data, &["code", "code_icao"], code)),
            Err(ApiError::UpstreamStatus { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl FlightDataProvider for FlightAwareProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_flights(&self, airport: &str, kind: FlightType) -> ApiResult<Vec<Flight>> {
        Ok(or_empty(PROVIDER_ID, "flights", self.flights(airport, kind).await))
    }

    async fn fetch_airport_info(&self, code: &str) -> ApiResult<Option<Airport>> {
        Ok(or_empty(PROVIDER_ID, "airport info", self.airport(code).await))
    }
}
