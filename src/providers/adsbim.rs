//! adsb.im provider (no key).
//!
//! adsb.im has no airport board, so this adapter asks `routeset` about a
//! fixed list of common callsigns and keeps the ones whose route starts or
//! ends at the requested airport.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use super::{callsign_airline, map_status_lower, or_empty, FlightDataProvider};
use crate::clients::{AdsbImClient, HttpClient};
use crate::coords::CoordinateResolver;
use crate::domain::{gate_from_raw, Airport, Endpoint, Flight, FlightStatus, FlightType};
use crate::errors::ApiResult;
use crate::utils::{s_pick, t_pick};

const PROVIDER_ID: &str = "ADSB_IM";
const MAX_RESULTS: usize = 10;

const CALLSIGNS: &[&str] = &[
    "UAL123", "AAL456", "DAL789", "SWA321", "ASA654", "JBU987", "NKS246", "FFT135", "SKW579",
    "FDX842",
];

const STATUS_TABLE: &[(&str, FlightStatus)] = &[
    ("scheduled", FlightStatus::Scheduled),
    ("boarding", FlightStatus::Boarding),
    ("departed", FlightStatus::Departed),
    ("in-flight", FlightStatus::Departed),
    ("airborne", FlightStatus::Departed),
    ("landed", FlightStatus::Landed),
    ("arrived", FlightStatus::Landed),
    ("cancelled", FlightStatus::Cancelled),
    ("delayed", FlightStatus::Delayed),
];

pub struct AdsbImProvider {
    client: AdsbImClient,
    resolver: Arc<CoordinateResolver>,
}

impl AdsbImProvider {
    pub fn with_base_url(
        http_client: HttpClient,
        resolver: Arc<CoordinateResolver>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: AdsbImClient::with_base_url(http_client, base_url),
            resolver,
        }
    }

    async fn flights(&self, airport: &str, kind: FlightType) -> ApiResult<Vec<Flight>> {
        let airport = airport.trim().to_ascii_uppercase();
        // upstream accepts 0,0 when the airport cannot be located
        let position = self.resolver.resolve(&airport).await;

        let mut flights = Vec::new();
        for callsign in CALLSIGNS {
            match self.client.routeset(callsign, position).await {
                Ok(data) => {
                    if let Some(flight) = Self::transform(&data, callsign, kind, &airport) {
                        flights.push(flight);
                    }
                }
                Err(e) => error!("adsb.im: error fetching schedule for {}: {}", callsign, e),
            }

            if flights.len() >= MAX_RESULTS {
                break;
            }
        }

        debug!("adsb.im: {} matching flights for {}", flights.len(), airport);
        Ok(flights)
    }

    fn transform(data: &Value, callsign: &str, kind: FlightType, airport: &str) -> Option<Flight> {
        let route = data.get("route").filter(|r| r.is_object())?;
        let origin = s_pick(route, &["origin"]);
        let destination = s_pick(route, &["destination"]);

        let matches = match kind {
            FlightType::Departure => origin.as_deref(),
            FlightType::Arrival => destination.as_deref(),
        }
        .is_some_and(|code| code.eq_ignore_ascii_case(airport));
        if !matches {
            return None;
        }

        let now = Utc::now();
        Some(Flight {
            id: format!("{}-{}", callsign, now.timestamp_millis()),
            flight_number: Some(callsign.to_string()),
            airline: s_pick(data, &["airline"])
                .or_else(|| Some(callsign_airline(callsign))),
            origin: Endpoint::from_raw(origin.as_deref(), origin.as_deref()),
            destination: Endpoint::from_raw(destination.as_deref(), destination.as_deref()),
            scheduled_time: t_pick(data, &["scheduled"]).unwrap_or(now),
            estimated_time: t_pick(data, &["estimated"]),
            actual_time: t_pick(data, &["actual"]),
            gate: gate_from_raw(s_pick(data, &["gate"]).as_deref()),
            terminal: s_pick(data, &["terminal"]),
            status: map_status_lower(STATUS_TABLE, s_pick(data, &["status"]).as_deref()),
            aircraft: s_pick(data, &["aircraft", "type"]),
            duration: s_pick(data, &["duration"]),
        })
    }
}

#[async_trait]
impl FlightDataProvider for AdsbImProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_flights(&self, airport: &str, kind: FlightType) -> ApiResult<Vec<Flight>> {
        Ok(or_empty(PROVIDER_ID, "flights", self.flights(airport, kind).await))
    }

    async fn fetch_airport_info(&self, _code: &str) -> ApiResult<Option<Airport>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::http;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AdsbImProvider {
        let resolver = Arc::new(CoordinateResolver::new(http(), server.uri()));
        AdsbImProvider::with_base_url(http(), resolver, server.uri())
    }

    #[tokio::test]
    async fn test_keeps_routes_touching_airport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/0/routeset"))
            .and(body_partial_json(json!({"callsign": "SWA321", "lat": 38.6954})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "route": {"origin": "KSMF", "destination": "KPHX"},
                "status": "Boarding",
                "gate": "B9"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/0/routeset"))
            .and(body_partial_json(json!({"callsign": "DAL789"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "route": {"origin": "KATL", "destination": "KSMF"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/0/routeset"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let departures = provider(&server)
            .fetch_flights("ksmf", FlightType::Departure)
            .await
            .unwrap();

        assert_eq!(departures.len(), 1);
        let f = &departures[0];
        assert_eq!(f.flight_number.as_deref(), Some("SWA321"));
        assert_eq!(f.airline.as_deref(), Some("Southwest Airlines"));
        assert_eq!(f.origin.code(), Some("KSMF"));
        assert_eq!(f.destination.code(), Some("KPHX"));
        assert_eq!(f.status, FlightStatus::Boarding);
        assert_eq!(f.gate.as_deref(), Some("B9"));

        let arrivals = provider(&server)
            .fetch_flights("KSMF", FlightType::Arrival)
            .await
            .unwrap();
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].flight_number.as_deref(), Some("DAL789"));
    }

    #[tokio::test]
    async fn test_stops_after_ten_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/0/routeset"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "route": {"origin": "KSMF", "destination": "KLAX"}
            })))
            .expect(10)
            .mount(&server)
            .await;

        let flights = provider(&server)
            .fetch_flights("KSMF", FlightType::Departure)
            .await
            .unwrap();
        assert_eq!(flights.len(), MAX_RESULTS);
    }

    #[tokio::test]
    async fn test_failed_lookups_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/0/routeset"))
            .respond_with(ResponseTemplate::new(500))
            .expect(CALLSIGNS.len() as u64)
            .mount(&server)
            .await;

        let flights = provider(&server)
            .fetch_flights("KSMF", FlightType::Departure)
            .await
            .unwrap();
        assert!(flights.is_empty());
        assert_eq!(provider(&server).fetch_airport_info("KSMF").await.unwrap(), None);
    }
}
