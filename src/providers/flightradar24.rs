//! FlightRadar24 airport boards (token authenticated).
//!
//! Times arrive as Unix seconds.

use async_trait::async_trait;
use serde::Deserialize;

use super::{batch_id, map_status_lower, or_empty, FlightDataProvider};
use crate::clients::HttpClient;
use crate::domain::{gate_from_raw, Airport, Endpoint, Flight, FlightStatus, FlightType};
use crate::errors::ApiResult;
use crate::utils::{first_non_empty, from_epoch_seconds};

pub(crate) const BASE_URL: &str = "https://api.flightradar24.com/common/v1";
const PROVIDER_ID: &str = "FLIGHTRADAR24";

const STATUS_TABLE: &[(&str, FlightStatus)] = &[
    ("scheduled", FlightStatus::Scheduled),
    ("boarding", FlightStatus::Boarding),
    ("departed", FlightStatus::Departed),
    ("airborne", FlightStatus::Departed),
    ("landing", FlightStatus::Arriving),
    ("landed", FlightStatus::Landed),
    ("arrived", FlightStatus::Landed),
    ("cancelled", FlightStatus::Cancelled),
    ("delayed", FlightStatus::Delayed),
];

#[derive(Debug, Default, Deserialize)]
struct BoardResponse {
    #[serde(default)]
    flights: Option<Vec<Fr24Flight>>,
    #[serde(default)]
    data: Option<Vec<Fr24Flight>>,
}

#[derive(Debug, Deserialize)]
struct Fr24Flight {
    flight_id: Option<String>,
    reg: Option<String>,
    flight: Option<String>,
    airline: Option<String>,
    orig: Option<String>,
    orig_name: Option<String>,
    dest: Option<String>,
    dest_name: Option<String>,
    #[serde(alias = "sched_time")]
    scheduled_time: Option<i64>,
    estimated_time: Option<i64>,
    actual_time: Option<i64>,
    gate: Option<String>,
    terminal: Option<String>,
    status: Option<String>,
    #[serde(alias = "aircraft_type")]
    aircraft: Option<String>,
}

pub struct FlightRadar24Provider {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

impl FlightRadar24Provider {
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
        let board = match kind {
            FlightType::Departure => "airport-departures",
            FlightType::Arrival => "airport-arrivals",
        };
        let request = self
            .http_client
            .get_client()
            .get(format!("{}/{}/{}.json", self.base_url, board, airport))
            .query(&[("token", self.api_key.as_str())]);

        let body: BoardResponse = self.http_client.send_json(PROVIDER_ID, request).await?;
        let flights = body.flights.or(body.data).unwrap_or_default();

        Ok(flights.into_iter().filter_map(Self::transform).collect())
    }

    fn transform(f: Fr24Flight) -> Option<Flight> {
        let scheduled_time = f.scheduled_time.and_then(from_epoch_seconds)?;
        let number = first_non_empty(&[f.flight.as_deref()]);
        let ident = first_non_empty(&[f.flight_id.as_deref(), f.reg.as_deref(), number])
            .unwrap_or("fr24");

        Some(Flight {
            id: batch_id(ident),
            flight_number: number.map(str::to_string),
            airline: f.airline.clone(),
            origin: Endpoint::from_raw(f.orig_name.as_deref(), f.orig.as_deref()),
            destination: Endpoint::from_raw(f.dest_name.as_deref(), f.dest.as_deref()),
            scheduled_time,
            estimated_time: f.estimated_time.and_then(from_epoch_seconds),
            actual_time: f.actual_time.and_then(from_epoch_seconds),
            gate: gate_from_raw(f.gate.as_deref()),
            terminal: f.terminal.clone(),
            status: map_status_lower(STATUS_TABLE, f.status.as_deref()),
            aircraft: f.aircraft.clone(),
            duration: None,
        })
    }
}

#[async_trait]
impl FlightDataProvider for FlightRadar24Provider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_flights(&self, airport: &str, kind: FlightType) -> ApiResult<Vec<Flight>> {
        Ok(or_empty(PROVIDER_ID, "flights", self.flights(airport, kind).await))
    }

    // FR24 exposes no airport metadata endpoint on this plan
    async fn fetch_airport_info(&self, _code: &str) -> ApiResult<Option<Airport>> {
        Ok(None)
    }
}
