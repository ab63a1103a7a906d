/// External API clients module
use crate::domain::{AirportCoordinates, Endpoint, RouteInfo};
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = "FlightBoard/1.0";

/// HTTP client wrapper with common configuration
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Without a timeout requests wait as long as the upstream does.
    pub fn new(timeout: Option<Duration>) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }

    /// Send a request and decode a JSON body, failing on non-success statuses
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        provider: &'static str,
        request: RequestBuilder,
    ) -> ApiResult<T> {
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            debug!("{} request failed with status {}", provider, status);
            return Err(ApiError::UpstreamStatus { provider, status });
        }

        resp.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                ApiError::malformed(provider, e)
            } else {
                ApiError::ExternalApi(e)
            }
        })
    }
}

/// Route-lookup service answering "where is this callsign flying from/to"
#[async_trait]
pub trait RouteLookup: Send + Sync {
    fn id(&self) -> &'static str;

    async fn lookup_route(
        &self,
        callsign: &str,
        position: Option<AirportCoordinates>,
    ) -> ApiResult<Option<RouteInfo>>;
}

fn lat_lng(position: Option<AirportCoordinates>) -> (f64, f64) {
    position
        .map(|p| (p.latitude, p.longitude))
        .unwrap_or((0.0, 0.0))
}

/// adsb.lol route service
pub struct AdsbLolRouteClient {
    http_client: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LolRoute {
    #[serde(default)]
    airport_codes: Option<String>,
    #[serde(default, rename = "_airports")]
    airports: Vec<LolAirport>,
}

#[derive(Debug, Deserialize)]
struct LolAirport {
    #[serde(default)]
    icao: Option<String>,
    #[serde(default)]
    iata: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl LolAirport {
    fn endpoint(&self) -> Endpoint {
        let code = self.icao.as_deref().or(self.iata.as_deref());
        Endpoint::from_raw(self.name.as_deref(), code)
    }
}

impl AdsbLolRouteClient {
    pub const ID: &'static str = "ADSB_LOL_ROUTES";

    pub fn new(http_client: HttpClient) -> Self {
        Self::with_base_url(http_client, "https://api.adsb.lol")
    }

    pub fn with_base_url(http_client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    fn route_from(item: &LolRoute) -> Option<(Endpoint, Endpoint)> {
        if item.airports.len() >= 2 {
            let origin = item.airports[0].endpoint();
            let destination = item.airports[item.airports.len() - 1].endpoint();
            return Some((origin, destination));
        }

        let codes: Vec<&str> = item
            .airport_codes
            .as_deref()?
            .split('-')
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("unknown"))
            .collect();
        match codes.as_slice() {
            [first, .., last] => Some((
                Endpoint::from_raw(None, Some(*first)),
                Endpoint::from_raw(None, Some(*last)),
            )),
            _ => None,
        }
    }
}

#[async_trait]
impl RouteLookup for AdsbLolRouteClient {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn lookup_route(
        &self,
        callsign: &str,
        position: Option<AirportCoordinates>,
    ) -> ApiResult<Option<RouteInfo>> {
        let (lat, lng) = lat_lng(position);
        let body = json!({
            "planes": [{ "callsign": callsign.to_ascii_uppercase(), "lat": lat, "lng": lng }]
        });
        let request = self
            .http_client
            .get_client()
            .post(format!("{}/api/0/routeset", self.base_url))
            .json(&body);

        let items: Vec<LolRoute> = self.http_client.send_json(Self::ID, request).await?;

        Ok(items
            .first()
            .and_then(Self::route_from)
            .map(|(origin, destination)| RouteInfo {
                source: Self::ID,
                origin,
                destination,
                airline: None,
            }))
    }
}

/// adsb.im route service; also backs the adsb.im flight provider
pub struct AdsbImClient {
    http_client: HttpClient,
    base_url: String,
}

impl AdsbImClient {
    pub const ID: &'static str = "ADSB_IM_ROUTES";
    pub const BASE_URL: &'static str = "https://adsb.im";

    pub fn new(http_client: HttpClient) -> Self {
        Self::with_base_url(http_client, Self::BASE_URL)
    }

    pub fn with_base_url(http_client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// Raw `routeset` payload for one callsign
    pub async fn routeset(
        &self,
        callsign: &str,
        position: Option<AirportCoordinates>,
    ) -> ApiResult<Value> {
        let (lat, lng) = lat_lng(position);
        let body = json!({ "callsign": callsign.to_ascii_uppercase(), "lat": lat, "lng": lng });
        let request = self
            .http_client
            .get_client()
            .post(format!("{}/api/0/routeset", self.base_url))
            .json(&body);

        self.http_client.send_json(Self::ID, request).await
    }
}

#[async_trait]
impl RouteLookup for AdsbImClient {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn lookup_route(
        &self,
        callsign: &str,
        position: Option<AirportCoordinates>,
    ) -> ApiResult<Option<RouteInfo>> {
        let data = self.routeset(callsign, position).await?;
        let Some(route) = data.get("route").filter(|r| r.is_object()) else {
            return Ok(None);
        };

        let origin = route.get("origin").and_then(Value::as_str);
        let destination = route.get("destination").and_then(Value::as_str);
        if origin.is_none() && destination.is_none() {
            return Ok(None);
        }

        Ok(Some(RouteInfo {
            source: Self::ID,
            origin: Endpoint::from_raw(None, origin),
            destination: Endpoint::from_raw(None, destination),
            airline: crate::utils::s_pick(&data, &["airline"]),
        }))
    }
}
