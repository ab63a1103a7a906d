//! Flight data providers.
//!
//! Every upstream flight API gets one adapter implementing
//! [`FlightDataProvider`]. Adapters swallow their own failures: transport
//! errors, bad statuses and malformed payloads are logged and surface as an
//! empty list (or `None`), so the aggregator can move on to the next one.

mod adsbim;
mod adsblol;
mod airframes;
mod airnav;
mod aviationstack;
mod flightaware;
mod flightradar24;
mod opensky;

pub use adsbim::AdsbImProvider;
pub use adsblol::AdsbLolProvider;
pub use airframes::AirframesProvider;
pub use airnav::AirNavProvider;
pub use aviationstack::AviationStackProvider;
pub use flightaware::FlightAwareProvider;
pub use flightradar24::FlightRadar24Provider;
pub use opensky::OpenSkyProvider;

use crate::clients::{AdsbImClient, HttpClient};
use crate::config::ApiKeys;
use crate::coords::CoordinateResolver;
use crate::domain::{Airport, Flight, FlightStatus, FlightType};
use crate::enricher::RouteEnricher;
use crate::errors::{ApiError, ApiResult};
use crate::utils::s_pick;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Uniform contract every flight data source implements
#[async_trait]
pub trait FlightDataProvider: Send + Sync {
    /// Identifier used in logs and responses
    fn id(&self) -> &'static str;

    async fn fetch_flights(&self, airport: &str, kind: FlightType) -> ApiResult<Vec<Flight>>;

    async fn fetch_airport_info(&self, code: &str) -> ApiResult<Option<Airport>>;
}

/// Provider names accepted in the priority list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Airframes,
    FlightAware,
    AviationStack,
    FlightRadar24,
    AirNav,
    AdsbIm,
    AdsbLol,
    OpenSky,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 8] = [
        ProviderKind::Airframes,
        ProviderKind::FlightAware,
        ProviderKind::AviationStack,
        ProviderKind::FlightRadar24,
        ProviderKind::AirNav,
        ProviderKind::AdsbIm,
        ProviderKind::AdsbLol,
        ProviderKind::OpenSky,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Airframes => "airframes",
            ProviderKind::FlightAware => "flightaware",
            ProviderKind::AviationStack => "aviationstack",
            ProviderKind::FlightRadar24 => "flightradar24",
            ProviderKind::AirNav => "airnav",
            ProviderKind::AdsbIm => "adsbim",
            ProviderKind::AdsbLol => "adsblol",
            ProviderKind::OpenSky => "opensky",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(
            self,
            ProviderKind::AdsbIm | ProviderKind::AdsbLol | ProviderKind::OpenSky
        )
    }

    fn api_key<'a>(&self, keys: &'a ApiKeys) -> Option<&'a str> {
        match self {
            ProviderKind::Airframes => keys.airframes.as_deref(),
            ProviderKind::FlightAware => keys.flightaware.as_deref(),
            ProviderKind::AviationStack => keys.aviationstack.as_deref(),
            ProviderKind::FlightRadar24 => keys.flightradar24.as_deref(),
            ProviderKind::AirNav => keys.airnav.as_deref(),
            ProviderKind::AdsbIm | ProviderKind::AdsbLol | ProviderKind::OpenSky => None,
        }
    }

    /// Whether the factory can build this provider with the given keys
    pub fn is_available(&self, keys: &ApiKeys) -> bool {
        !self.requires_api_key() || self.api_key(keys).is_some()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| format!("unknown provider '{}'", s.trim()))
    }
}

/// Shared dependencies handed to each provider on construction
#[derive(Clone)]
pub struct ProviderContext {
    pub http_client: HttpClient,
    pub api_keys: ApiKeys,
    pub airframes_api_url: String,
    pub resolver: Arc<CoordinateResolver>,
    pub enricher: Arc<RouteEnricher>,
    /// Per-provider API roots replacing the public upstreams
    pub base_urls: HashMap<ProviderKind, String>,
}

impl ProviderContext {
    fn base_url(&self, kind: ProviderKind, default: &str) -> String {
        self.base_urls
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

/// Build one provider; keyed providers fail with `MissingApiKey` without one.
pub fn build_provider(
    kind: ProviderKind,
    ctx: &ProviderContext,
) -> ApiResult<Arc<dyn FlightDataProvider>> {
    let http = ctx.http_client.clone();
    let key = || {
        kind.api_key(&ctx.api_keys)
            .map(str::to_string)
            .ok_or(ApiError::MissingApiKey(kind.name()))
    };

    let base = |default: &str| ctx.base_url(kind, default);

    let provider: Arc<dyn FlightDataProvider> = match kind {
        ProviderKind::Airframes => Arc::new(AirframesProvider::new(
            http,
            key()?,
            base(&ctx.airframes_api_url),
        )),
        ProviderKind::FlightAware => Arc::new(FlightAwareProvider::with_base_url(
            http,
            key()?,
            base(flightaware::BASE_URL),
        )),
        ProviderKind::AviationStack => Arc::new(AviationStackProvider::with_base_url(
            http,
            key()?,
            base(aviationstack::BASE_URL),
        )),
        ProviderKind::FlightRadar24 => Arc::new(FlightRadar24Provider::with_base_url(
            http,
            key()?,
            base(flightradar24::BASE_URL),
        )),
        ProviderKind::AirNav => Arc::new(AirNavProvider::with_base_url(
            http,
            key()?,
            base(airnav::BASE_URL),
        )),
        ProviderKind::AdsbIm => Arc::new(AdsbImProvider::with_base_url(
            http,
            ctx.resolver.clone(),
            base(AdsbImClient::BASE_URL),
        )),
        ProviderKind::AdsbLol => Arc::new(AdsbLolProvider::with_base_url(
            http,
            ctx.resolver.clone(),
            ctx.enricher.clone(),
            base(adsblol::BASE_URL),
        )),
        ProviderKind::OpenSky => Arc::new(OpenSkyProvider::with_base_url(
            http,
            ctx.enricher.clone(),
            base(opensky::BASE_URL),
        )),
    };
    Ok(provider)
}

/// Providers in priority order, skipping unknown names and missing keys.
pub fn configured_providers(
    priority: &[String],
    ctx: &ProviderContext,
) -> Vec<Arc<dyn FlightDataProvider>> {
    let mut providers = Vec::new();
    for name in priority {
        let kind = match name.parse::<ProviderKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Ignoring provider in priority list: {}", e);
                continue;
            }
        };
        match build_provider(kind, ctx) {
            Ok(provider) => {
                info!("Configured provider: {}", kind);
                providers.push(provider);
            }
            Err(e) => info!("Skipping provider {}: {}", kind, e),
        }
    }
    providers
}

/// Turn an adapter's internal failure into an empty result.
pub(crate) fn or_empty<T: Default>(provider: &'static str, op: &str, result: ApiResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!("{} {} error: {}", provider, op, e);
            T::default()
        }
    }
}

/// Look a raw status up in a provider's vocabulary; unknown means scheduled.
pub(crate) fn map_status(table: &[(&str, FlightStatus)], raw: Option<&str>) -> FlightStatus {
    let Some(raw) = raw.map(str::trim) else {
        return FlightStatus::Scheduled;
    };
    table
        .iter()
        .find(|(name, _)| *name == raw)
        .map(|(_, status)| *status)
        .unwrap_or(FlightStatus::Scheduled)
}

/// Case-insensitive variant of [`map_status`] for feeds with loose casing.
pub(crate) fn map_status_lower(table: &[(&str, FlightStatus)], raw: Option<&str>) -> FlightStatus {
    let lowered = raw.map(str::to_ascii_lowercase);
    map_status(table, lowered.as_deref())
}

pub const UNKNOWN_AIRLINE: &str = "Unknown Airline";

/// Operator name for a callsign, "Unknown Airline" for unlisted prefixes
pub(crate) fn callsign_airline(callsign: &str) -> String {
    airline_for_callsign(callsign)
        .unwrap_or(UNKNOWN_AIRLINE)
        .to_string()
}

/// Airline name from the ICAO prefix of a callsign
pub fn airline_for_callsign(callsign: &str) -> Option<&'static str> {
    let prefix = callsign.trim().get(..3)?.to_ascii_uppercase();
    let name = match prefix.as_str() {
        "UAL" => "United Airlines",
        "AAL" => "American Airlines",
        "DAL" => "Delta Air Lines",
        "SWA" => "Southwest Airlines",
        "ASA" => "Alaska Airlines",
        "JBU" => "JetBlue Airways",
        "NKS" => "Spirit Airlines",
        "FFT" => "Frontier Airlines",
        _ => return None,
    };
    Some(name)
}

/// Airport record from a metadata payload; `None` without a name
pub(crate) fn airport_from_value(v: &Value, code_keys: &[&str], fallback: &str) -> Option<Airport> {
    let name = s_pick(v, &["name", "airport_name"])?;
    Some(Airport {
        code: s_pick(v, code_keys).unwrap_or_else(|| fallback.to_string()),
        name,
        city: s_pick(v, &["city", "city_name"]).unwrap_or_default(),
        country: s_pick(v, &["country", "country_name"]).unwrap_or_default(),
        timezone: s_pick(v, &["timezone", "tz"]).unwrap_or_default(),
    })
}

/// Id unique within one fetch batch
pub(crate) fn batch_id(ident: &str) -> String {
    format!("{}-{}", ident, chrono::Utc::now().timestamp_millis())
}
