//! AirNav RadarBox provider (bearer token).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{airport_from_value, batch_id, map_status_lower, or_empty, FlightDataProvider};
use crate::clients::HttpClient;
use crate::domain::{gate_from_raw, Airport, Endpoint, Flight, FlightStatus, FlightType};
use crate::errors::{ApiError, ApiResult};
use crate::utils::{first_non_empty, parse_time};

pub(crate) const BASE_URL: &str = "https://api.radarbox.com/v2";
const PROVIDER_ID: &str = "AIRNAV";

const STATUS_TABLE: &[(&str, FlightStatus)] = &[
    ("scheduled", FlightStatus::Scheduled),
    ("boarding", FlightStatus::Boarding),
    ("departed", FlightStatus::Departed),
    ("en-route", FlightStatus::Departed),
    ("approaching", FlightStatus::Arriving),
    ("landed", FlightStatus::Landed),
    ("cancelled", FlightStatus::Cancelled),
    ("delayed", FlightStatus::Delayed),
];

#[derive(Debug, Default, Deserialize)]
struct BoardResponse {
    #[serde(default)]
    flights: Option<Vec<RbFlight>>,
    #[serde(default)]
    data: Option<Vec<RbFlight>>,
}

#[derive(Debug, Deserialize)]
struct RbFlight {
    flight_id: Option<String>,
    callsign: Option<String>,
    flight_number: Option<String>,
    airline: Option<String>,
    origin: Option<String>,
    origin_airport: Option<String>,
    destination: Option<String>,
    destination_airport: Option<String>,
    scheduled_departure: Option<String>,
    scheduled_arrival: Option<String>,
    estimated_departure: Option<String>,
    estimated_arrival: Option<String>,
    actual_departure: Option<String>,
    actual_arrival: Option<String>,
    gate: Option<String>,
    terminal: Option<String>,
    status: Option<String>,
    aircraft_type: Option<String>,
    flight_time: Option<String>,
}

/// Departure-side time first for departures, arrival-side first for arrivals
fn leg_time(
    kind: FlightType,
    departure: &Option<String>,
    arrival: &Option<String>,
) -> Option<DateTime<Utc>> {
    let raw = match kind {
        FlightType::Departure => first_non_empty(&[departure.as_deref(), arrival.as_deref()]),
        FlightType::Arrival => first_non_empty(&[arrival.as_deref(), departure.as_deref()]),
    };
    raw.and_then(parse_time)
}

pub struct AirNavProvider {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

impl AirNavProvider {
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
            FlightType::Departure => "departures",
            FlightType::Arrival => "arrivals",
        };
        let request = self
            .http_client
            .get_client()
            .get(format!("{}/airports/{}/{}", self.base_url, airport, board))
            .bearer_auth(&self.api_key);

        let body: BoardResponse = self.http_client.send_json(PROVIDER_ID, request).await?;
        Ok(body
            .flights
            .or(body.data)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|f| Self::transform(f, kind))
            .collect())
    }

    fn transform(f: RbFlight, kind: FlightType) -> Option<Flight> {
        let scheduled_time = leg_time(kind, &f.scheduled_departure, &f.scheduled_arrival)?;
        let number = first_non_empty(&[f.callsign.as_deref(), f.flight_number.as_deref()]);
        let ident = first_non_empty(&[f.flight_id.as_deref(), number]).unwrap_or("airnav");

        Some(Flight {
            id: batch_id(ident),
            flight_number: number.map(str::to_string),
            airline: f.airline.clone(),
            origin: Endpoint::from_raw(f.origin_airport.as_deref(), f.origin.as_deref()),
            destination: Endpoint::from_raw(
                f.destination_airport.as_deref(),
                f.destination.as_deref(),
            ),
            scheduled_time,
            estimated_time: leg_time(kind, &f.estimated_departure, &f.estimated_arrival),
            actual_time: leg_time(kind, &f.actual_departure, &f.actual_arrival),
            gate: gate_from_raw(f.gate.as_deref()),
            terminal: f.terminal.clone(),
            status: map_status_lower(STATUS_TABLE, f.status.as_deref()),
            aircraft: f.aircraft_type.clone(),
            duration: f.flight_time.clone(),
        })
    }

    async fn airport(&self, code: &str) -> ApiResult<Option<Airport>> {
        let request = self
            .http_client
            .get_client()
            .get(format!("{}/airports/{}", self.base_url, code))
            .bearer_auth(&self.api_key);

        match self.http_client.send_json::<Value>(PROVIDER_ID, request).await {
            Ok(data) => Ok(airport_from_value(&data, &["icao", "iata"], code)),
            Err(ApiError::UpstreamStatus { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl FlightDataProvider for AirNavProvider {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::http;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_departures_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/airports/KSMF/departures"))
            .and(header("authorization", "Bearer an-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "flight_id": "rb-77",
                    "callsign": "ASA612",
                    "airline": "Alaska Airlines",
                    "origin": "KSMF",
                    "origin_airport": "Sacramento",
                    "destination": "KSEA",
                    "destination_airport": "Seattle",
                    "scheduled_departure": "2024-01-15T10:30:00Z",
                    "estimated_departure": "2024-01-15T10:50:00Z",
                    "status": "EN-ROUTE",
                    "aircraft_type": "E175",
                    "flight_time": "1h 45m"
                }]
            })))
            .mount(&server)
            .await;

        let provider = AirNavProvider::with_base_url(http(), "an-key".into(), server.uri());
        let flights = provider
            .fetch_flights("KSMF", FlightType::Departure)
            .await
            .unwrap();

        assert_eq!(flights.len(), 1);
        let f = &flights[0];
        assert!(f.id.starts_with("rb-77-"));
        assert_eq!(f.flight_number.as_deref(), Some("ASA612"));
        assert_eq!(f.origin.code(), Some("KSMF"));
        assert_eq!(f.destination.name(), Some("Seattle"));
        assert_eq!(f.status, FlightStatus::Departed);
        assert_eq!(f.gate, None);
        assert_eq!(f.duration.as_deref(), Some("1h 45m"));
        assert!(f.estimated_time.is_some());
    }

    #[tokio::test]
    async fn test_airport_info_and_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/airports/KSEA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "icao": "KSEA", "name": "Seattle-Tacoma International",
                "city": "Seattle", "country": "USA", "timezone": "America/Los_Angeles"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/airports/ZZZZ"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = AirNavProvider::with_base_url(http(), "k".into(), server.uri());
        let airport = provider.fetch_airport_info("KSEA").await.unwrap().unwrap();
        assert_eq!(airport.city, "Seattle");
        assert_eq!(provider.fetch_airport_info("ZZZZ").await.unwrap(), None);
    }
}
