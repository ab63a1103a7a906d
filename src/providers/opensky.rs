//! OpenSky Network provider (anonymous access).
//!
//! Returns flights seen over the last hour. OpenSky only estimates airports,
//! so the results go through the route enricher before being returned.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{callsign_airline, or_empty, FlightDataProvider};
use crate::clients::HttpClient;
use crate::domain::{Airport, Endpoint, Flight, FlightStatus, FlightType};
use crate::enricher::RouteEnricher;
use crate::errors::ApiResult;
use crate::utils::from_epoch_seconds;

pub(crate) const BASE_URL: &str = "https://opensky-network.org/api";
const PROVIDER_ID: &str = "OPENSKY";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OsFlight {
    icao24: Option<String>,
    callsign: Option<String>,
    first_seen: Option<i64>,
    last_seen: Option<i64>,
    est_departure_airport: Option<String>,
    est_arrival_airport: Option<String>,
}

fn endpoint(code: Option<&str>) -> Endpoint {
    Endpoint::from_raw(code, code)
}

pub struct OpenSkyProvider {
    http_client: HttpClient,
    enricher: Arc<RouteEnricher>,
    base_url: String,
}

impl OpenSkyProvider {
    pub fn with_base_url(
        http_client: HttpClient,
        enricher: Arc<RouteEnricher>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            enricher,
            base_url: base_url.into(),
        }
    }

    async fn flights(&self, airport: &str, kind: FlightType) -> ApiResult<Vec<Flight>> {
        let end = Utc::now();
        let begin = end - Duration::hours(1);
        let request = self
            .http_client
            .get_client()
            .get(format!("{}/flights/{}", self.base_url, kind))
            .query(&[
                ("airport", airport.to_string()),
                ("begin", begin.timestamp().to_string()),
                ("end", end.timestamp().to_string()),
            ]);

        let raw: Vec<OsFlight> = self.http_client.send_json(PROVIDER_ID, request).await?;
        let flights: Vec<Flight> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, f)| Self::transform(f, index, kind))
            .collect();

        info!("OpenSky: enriching {} flights with route data", flights.len());
        Ok(self.enricher.enrich(flights).await)
    }

    fn transform(f: OsFlight, index: usize, kind: FlightType) -> Option<Flight> {
        let seen = match kind {
            FlightType::Departure => f.first_seen,
            FlightType::Arrival => f.last_seen,
        };
        let scheduled_time = seen.and_then(from_epoch_seconds)?;
        let callsign = f
            .callsign
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Some(Flight {
            id: format!("{}-{}", f.icao24.as_deref().unwrap_or("opensky"), index),
            airline: callsign.as_deref().map(callsign_airline),
            flight_number: callsign,
            origin: endpoint(f.est_departure_airport.as_deref()),
            destination: endpoint(f.est_arrival_airport.as_deref()),
            scheduled_time,
            estimated_time: None,
            actual_time: f.last_seen.and_then(from_epoch_seconds),
            gate: None,
            terminal: None,
            status: FlightStatus::Scheduled,
            aircraft: None,
            duration: None,
        })
    }
}

#[async_trait]
impl FlightDataProvider for OpenSkyProvider {
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
    use crate::config::ApiKeys;
    use crate::providers::test_support::context;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenSkyProvider {
        let ctx = context(ApiKeys::default(), &server.uri());
        OpenSkyProvider::with_base_url(ctx.http_client, ctx.enricher, server.uri())
    }

    #[tokio::test]
    async fn test_departures_last_hour() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flights/departure"))
            .and(query_param("airport", "KSMF"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"icao24": "a0b1c2", "callsign": "SWA1234 ", "firstSeen": 1705314600,
                 "lastSeen": 1705318200, "estDepartureAirport": "KSMF",
                 "estArrivalAirport": "KLAS"},
                {"icao24": "a0b1c3", "callsign": "   ", "lastSeen": 1705318200}
            ])))
            .mount(&server)
            .await;

        let flights = provider(&server)
            .fetch_flights("KSMF", FlightType::Departure)
            .await
            .unwrap();

        assert_eq!(flights.len(), 1);
        let f = &flights[0];
        assert_eq!(f.id, "a0b1c2-0");
        assert_eq!(f.flight_number.as_deref(), Some("SWA1234"));
        assert_eq!(f.airline.as_deref(), Some("Southwest Airlines"));
        assert_eq!(f.destination.code(), Some("KLAS"));
        assert_eq!(f.status, FlightStatus::Scheduled);
        assert_eq!(
            f.scheduled_time,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );
        assert_eq!(
            f.actual_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 11, 30, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_missing_origin_is_enriched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flights/arrival"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"icao24": "abc", "callsign": "DAL789", "lastSeen": 1705318200,
                 "estArrivalAirport": "KSMF"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/0/routeset"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"airport_codes": "KATL-KSMF"}])),
            )
            .mount(&server)
            .await;

        let flights = provider(&server)
            .fetch_flights("KSMF", FlightType::Arrival)
            .await
            .unwrap();

        assert_eq!(flights[0].origin.code(), Some("KATL"));
        assert_eq!(flights[0].destination.name(), Some("KSMF"));
    }

    #[tokio::test]
    async fn test_upstream_error_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let flights = provider(&server)
            .fetch_flights("KSMF", FlightType::Departure)
            .await
            .unwrap();
        assert!(flights.is_empty());
    }
}
