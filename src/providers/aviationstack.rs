//! AviationStack provider (free tier with an access key).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{airport_from_value, batch_id, map_status, or_empty, FlightDataProvider};
use crate::clients::HttpClient;
use crate::domain::{gate_from_raw, Airport, Endpoint, Flight, FlightStatus, FlightType};
use crate::errors::{ApiError, ApiResult};
use crate::utils::{first_non_empty, parse_time};

pub(crate) const BASE_URL: &str = "http://api.aviationstack.com/v1";
const PROVIDER_ID: &str = "AVIATIONSTACK";

const STATUS_TABLE: &[(&str, FlightStatus)] = &[
    ("scheduled", FlightStatus::Scheduled),
    ("active", FlightStatus::Departed),
    ("landed", FlightStatus::Landed),
    ("cancelled", FlightStatus::Cancelled),
    ("incident", FlightStatus::Delayed),
    ("diverted", FlightStatus::Delayed),
];

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<Vec<T>>,
    error: Option<Value>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> ApiResult<Vec<T>> {
        if let Some(error) = self.error {
            return Err(ApiError::malformed(PROVIDER_ID, error));
        }
        Ok(self.data.unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
struct AsFlightCode {
    iata: Option<String>,
    icao: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AsAirline {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AsAircraft {
    model: Option<String>,
    iata: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AsLeg {
    airport: Option<String>,
    iata: Option<String>,
    icao: Option<String>,
    scheduled: Option<String>,
    estimated: Option<String>,
    actual: Option<String>,
    gate: Option<String>,
    terminal: Option<String>,
}

impl AsLeg {
    fn endpoint(&self) -> Endpoint {
        let code = first_non_empty(&[self.icao.as_deref(), self.iata.as_deref()]);
        Endpoint::from_raw(self.airport.as_deref(), code)
    }
}

#[derive(Debug, Deserialize)]
struct AsFlight {
    #[serde(default)]
    flight: AsFlightCode,
    #[serde(default)]
    airline: Option<AsAirline>,
    #[serde(default)]
    departure: AsLeg,
    #[serde(default)]
    arrival: AsLeg,
    flight_status: Option<String>,
    #[serde(default)]
    aircraft: Option<AsAircraft>,
}

/// Query parameter name for an airport filter: ICAO for 4-letter codes.
fn code_param(prefix: &str, code: &str) -> String {
    if code.len() == 4 {
        format!("{}_icao", prefix)
    } else {
        format!("{}_iata", prefix)
    }
}

/// AviationStack provider
pub struct AviationStackProvider {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

impl AviationStackProvider {
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
        let filter = match kind {
            FlightType::Departure => code_param("dep", airport),
            FlightType::Arrival => code_param("arr", airport),
        };
        let request = self
            .http_client
            .get_client()
            .get(format!("{}/flights", self.base_url))
            .query(&[
                ("access_key", self.api_key.as_str()),
                (filter.as_str(), airport),
                ("limit", "100"),
            ]);

        let data: Envelope<AsFlight> = self.http_client.send_json(PROVIDER_ID, request).await?;
        Ok(data
            .into_data()?
            .into_iter()
            .filter_map(|f| Self::transform(f, kind))
            .collect())
    }

    fn transform(f: AsFlight, kind: FlightType) -> Option<Flight> {
        let leg = match kind {
            FlightType::Departure => &f.departure,
            FlightType::Arrival => &f.arrival,
        };
        let scheduled_time = leg.scheduled.as_deref().and_then(parse_time)?;
        let number = first_non_empty(&[f.flight.iata.as_deref(), f.flight.icao.as_deref()]);
        let ident = first_non_empty(&[f.flight.icao.as_deref(), number]).unwrap_or("aviationstack");

        Some(Flight {
            id: batch_id(ident),
            flight_number: number.map(str::to_string),
            airline: f.airline.as_ref().and_then(|a| a.name.clone()),
            origin: f.departure.endpoint(),
            destination: f.arrival.endpoint(),
            scheduled_time,
            estimated_time: leg.estimated.as_deref().and_then(parse_time),
            actual_time: leg.actual.as_deref().and_then(parse_time),
            gate: gate_from_raw(leg.gate.as_deref()),
            terminal: leg.terminal.clone(),
            status: map_status(STATUS_TABLE, f.flight_status.as_deref()),
            aircraft: f
                .aircraft
                .as_ref()
                .and_then(|a| a.model.clone().or_else(|| a.iata.clone())),
            duration: None,
        })
    }

    async fn airport(&self, code: &str) -> ApiResult<Option<Airport>> {
        let filter = if code.len() == 4 { "icao_code" } else { "iata_code" };
        let request = self
            .http_client
            .get_client()
            .get(format!("{}/airports", self.base_url))
            .query(&[("access_key", self.api_key.as_str()), (filter, code)]);

        let data: Envelope<Value> = self.http_client.send_json(PROVIDER_ID, request).await?;
        Ok(data
            .into_data()?
            .first()
            .and_then(|a| airport_from_value(a, &["icao_code", "iata_code"], code)))
    }
}

#[async_trait]
impl FlightDataProvider for AviationStackProvider {
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
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_departures_by_icao() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flights"))
            .and(query_param("access_key", "as-key"))
            .and(query_param("dep_icao", "KSMF"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "flight_status": "active",
                    "flight": {"iata": "WN1234", "icao": "SWA1234"},
                    "airline": {"name": "Southwest Airlines"},
                    "departure": {
                        "airport": "Sacramento International", "iata": "SMF", "icao": "KSMF",
                        "scheduled": "2024-01-15T10:30:00+00:00", "gate": "", "terminal": "B"
                    },
                    "arrival": {
                        "airport": "Denver International", "iata": "DEN", "icao": "KDEN",
                        "scheduled": "2024-01-15T13:30:00+00:00"
                    },
                    "aircraft": {"model": "Boeing 737-800"}
                }]
            })))
            .mount(&server)
            .await;

        let provider = AviationStackProvider::with_base_url(http(), "as-key".into(), server.uri());
        let flights = provider
            .fetch_flights("KSMF", FlightType::Departure)
            .await
            .unwrap();

        assert_eq!(flights.len(), 1);
        let f = &flights[0];
        assert_eq!(f.flight_number.as_deref(), Some("WN1234"));
        assert_eq!(f.status, FlightStatus::Departed);
        assert_eq!(f.destination.code(), Some("KDEN"));
        assert_eq!(f.gate, None);
        assert_eq!(f.terminal.as_deref(), Some("B"));
        assert_eq!(f.aircraft.as_deref(), Some("Boeing 737-800"));
    }

    #[tokio::test]
    async fn test_error_envelope_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flights"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": {"code": "usage_limit_reached", "message": "limit reached"}
            })))
            .mount(&server)
            .await;

        let provider = AviationStackProvider::with_base_url(http(), "k".into(), server.uri());
        let flights = provider
            .fetch_flights("SMF", FlightType::Arrival)
            .await
            .unwrap();
        assert!(flights.is_empty());
    }

    #[tokio::test]
    async fn test_airport_info_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/airports"))
            .and(query_param("iata_code", "SMF"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "iata_code": "SMF", "icao_code": "KSMF",
                    "airport_name": "Sacramento International",
                    "country_name": "United States", "timezone": "America/Los_Angeles"
                }]
            })))
            .mount(&server)
            .await;

        let provider = AviationStackProvider::with_base_url(http(), "k".into(), server.uri());
        let airport = provider.fetch_airport_info("SMF").await.unwrap().unwrap();
        assert_eq!(airport.code, "KSMF");
        assert_eq!(airport.name, "Sacramento International");
        assert_eq!(airport.country, "United States");
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: Envelope<AsFlight> =
            serde_json::from_value(serde_json::json!({"pagination": {"total": 0}})).unwrap();
        assert!(envelope.into_data().unwrap().is_empty());
    }

    #[test]
    fn test_code_param() {
        assert_eq!(code_param("dep", "KSMF"), "dep_icao");
        assert_eq!(code_param("arr", "SMF"), "arr_iata");
    }
}
