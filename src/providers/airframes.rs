//! Airframes.io, our own service.
//!
//! Its active-flights feed carries no departure/arrival airports yet, so
//! flight queries are a deliberate no-op that always yields nothing. The
//! adapter stays in the chain because airport metadata already works.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{airport_from_value, or_empty, FlightDataProvider};
use crate::clients::HttpClient;
use crate::domain::{Airport, Flight, FlightType};
use crate::errors::{ApiError, ApiResult};

const PROVIDER_ID: &str = "AIRFRAMES";

pub struct AirframesProvider {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

impl AirframesProvider {
    pub fn new(http_client: HttpClient, api_key: String, base_url: String) -> Self {
        Self {
            http_client,
            api_key,
            base_url,
        }
    }

    async fn airport(&self, code: &str) -> ApiResult<Option<Airport>> {
        let request = self
            .http_client
            .get_client()
            .get(format!("{}/airports/icao/{}", self.base_url, code))
            .header("X-API-Key", &self.api_key);

        let data: Value = match self.http_client.send_json(PROVIDER_ID, request).await {
            Ok(data) => data,
            // a missing airport is an answer, not a failure
            Err(ApiError::UpstreamStatus { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(airport_from_value(&data, &["icao", "iata"], code))
    }
}

#[async_trait]
impl FlightDataProvider for AirframesProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_flights(&self, airport: &str, _kind: FlightType) -> ApiResult<Vec<Flight>> {
        info!(
            "Airframes.io: active flights carry no airport data yet, nothing to return for {}",
            airport
        );
        Ok(Vec::new())
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
    async fn test_flights_are_always_empty_without_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = AirframesProvider::new(http(), "key".into(), server.uri());
        let flights = provider
            .fetch_flights("KSMF", FlightType::Departure)
            .await
            .unwrap();
        assert!(flights.is_empty());
    }

    #[tokio::test]
    async fn test_airport_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/airports/icao/KSMF"))
            .and(header("X-API-Key", "secret"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "icao": "KSMF",
                "iata": "SMF",
                "name": "Sacramento International Airport",
                "city": "Sacramento",
                "country": "USA",
                "timezone": "America/Los_Angeles"
            })))
            .mount(&server)
            .await;

        let provider = AirframesProvider::new(http(), "secret".into(), server.uri());
        let airport = provider.fetch_airport_info("KSMF").await.unwrap().unwrap();
        assert_eq!(airport.name, "Sacramento International Airport");
        assert_eq!(airport.timezone, "America/Los_Angeles");
    }

    #[tokio::test]
    async fn test_airport_info_failure_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let provider = AirframesProvider::new(http(), "secret".into(), server.uri());
        assert_eq!(provider.fetch_airport_info("KSMF").await.unwrap(), None);
    }
}
