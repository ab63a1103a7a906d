//! adsb.lol area search (no key).
//!
//! Lists aircraft currently near the airport and guesses direction from the
//! vertical rate. The far end of the route is unknown at this point, so it is
//! marked en route and left to the route enricher.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{callsign_airline, or_empty, FlightDataProvider};
use crate::clients::HttpClient;
use crate::coords::{calculate_bounding_box, CoordinateResolver, DEFAULT_RADIUS_KM};
use crate::domain::{Airport, Endpoint, Flight, FlightStatus, FlightType};
use crate::enricher::RouteEnricher;
use crate::errors::ApiResult;

pub(crate) const BASE_URL: &str = "https://api.adsb.lol";
const PROVIDER_ID: &str = "ADSB_LOL";

const KM_PER_NM: f64 = 1.852;
const MAX_ALTITUDE_FT: f64 = 10_000.0;
const GROUND_ALTITUDE_FT: f64 = 500.0;
const TAXI_SPEED_KT: f64 = 50.0;
const VERTICAL_RATE_FPM: f64 = 100.0;

#[derive(Debug, Default, Deserialize)]
struct PointResponse {
    #[serde(default)]
    ac: Option<Vec<Aircraft>>,
}

#[derive(Debug, Default, Deserialize)]
struct Aircraft {
    hex: Option<String>,
    flight: Option<String>,
    t: Option<String>,
    /// Feet, or the string "ground"
    #[serde(default)]
    alt_baro: Option<Value>,
    baro_rate: Option<f64>,
    geom_rate: Option<f64>,
    gs: Option<f64>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl Aircraft {
    fn altitude(&self) -> Option<f64> {
        match self.alt_baro.as_ref()? {
            Value::String(s) if s.eq_ignore_ascii_case("ground") => Some(0.0),
            v => v.as_f64(),
        }
    }

    fn callsign(&self) -> Option<&str> {
        self.flight.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Status of an aircraft seen near the airport, or `None` when it does not
/// belong on this board.
fn classify(ac: &Aircraft, kind: FlightType) -> Option<FlightStatus> {
    let altitude = ac.altitude()?;
    if altitude >= MAX_ALTITUDE_FT {
        return None;
    }

    let rate = ac.baro_rate.or(ac.geom_rate).unwrap_or(0.0);
    let heading = if rate > VERTICAL_RATE_FPM {
        FlightType::Departure
    } else if rate < -VERTICAL_RATE_FPM {
        FlightType::Arrival
    } else {
        return None;
    };
    if heading != kind {
        return None;
    }

    let on_ground = altitude < GROUND_ALTITUDE_FT && ac.gs.unwrap_or(0.0) < TAXI_SPEED_KT;
    Some(match (kind, on_ground) {
        (FlightType::Departure, true) => FlightStatus::Boarding,
        (FlightType::Departure, false) => FlightStatus::Departed,
        (FlightType::Arrival, true) => FlightStatus::Landed,
        (FlightType::Arrival, false) => FlightStatus::Arriving,
    })
}

pub struct AdsbLolProvider {
    http_client: HttpClient,
    resolver: Arc<CoordinateResolver>,
    enricher: Arc<RouteEnricher>,
    base_url: String,
}

impl AdsbLolProvider {
    pub fn with_base_url(
        http_client: HttpClient,
        resolver: Arc<CoordinateResolver>,
        enricher: Arc<RouteEnricher>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            resolver,
            enricher,
            base_url: base_url.into(),
        }
    }

    async fn flights(&self, airport: &str, kind: FlightType) -> ApiResult<Vec<Flight>> {
        let airport = airport.trim().to_ascii_uppercase();
        let Some(coords) = self.resolver.resolve(&airport).await else {
            warn!("adsb.lol: no coordinates for {}, skipping area search", airport);
            return Ok(Vec::new());
        };

        let radius_nm = (DEFAULT_RADIUS_KM / KM_PER_NM).ceil() as u32;
        let request = self.http_client.get_client().get(format!(
            "{}/v2/point/{}/{}/{}",
            self.base_url, coords.latitude, coords.longitude, radius_nm
        ));
        let body: PointResponse = self.http_client.send_json(PROVIDER_ID, request).await?;

        let bbox = calculate_bounding_box(coords, DEFAULT_RADIUS_KM);
        let now = Utc::now();
        let home = Endpoint::airport(airport.as_str(), airport.as_str());

        let flights: Vec<Flight> = body
            .ac
            .unwrap_or_default()
            .into_iter()
            .filter(|ac| match (ac.lat, ac.lon) {
                (Some(lat), Some(lon)) => bbox.contains(lat, lon),
                _ => false,
            })
            .filter_map(|ac| {
                let status = classify(&ac, kind)?;
                let callsign = ac.callsign().map(str::to_string);
                let ident = ac.hex.as_deref().or(callsign.as_deref()).unwrap_or("adsblol");
                let (origin, destination) = match kind {
                    FlightType::Departure => (home.clone(), Endpoint::EnRoute),
                    FlightType::Arrival => (Endpoint::EnRoute, home.clone()),
                };

                Some(Flight {
                    id: format!("{}-{}", ident, now.timestamp_millis()),
                    airline: callsign.as_deref().map(callsign_airline),
                    flight_number: callsign,
                    origin,
                    destination,
                    scheduled_time: now,
                    estimated_time: None,
                    actual_time: None,
                    gate: None,
                    terminal: None,
                    status,
                    aircraft: ac.t.clone(),
                    duration: None,
                })
            })
            .collect();

        debug!("adsb.lol: {} aircraft match {} {}", flights.len(), airport, kind);
        Ok(self.enricher.enrich(flights).await)
    }
}

#[async_trait]
impl FlightDataProvider for AdsbLolProvider {
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
