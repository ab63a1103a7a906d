/// Domain models for the flight board
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_CODE: &str = "UNK";
pub const EN_ROUTE_NAME: &str = "En Route";
pub const EN_ROUTE_CODE: &str = "ENR";
pub const NOT_AVAILABLE: &str = "N/A";

/// Board direction relative to the queried airport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightType {
    Departure,
    Arrival,
}

impl FlightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightType::Departure => "departure",
            FlightType::Arrival => "arrival",
        }
    }
}

impl fmt::Display for FlightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "departure" | "departures" => Ok(FlightType::Departure),
            "arrival" | "arrivals" => Ok(FlightType::Arrival),
            other => Err(format!("unknown flight type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    Scheduled,
    Boarding,
    Departed,
    Arriving,
    Landed,
    Delayed,
    Cancelled,
}

impl FlightStatus {
    /// Terminal statuses are never rewritten by the simulator.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            FlightStatus::Departed | FlightStatus::Landed | FlightStatus::Cancelled
        )
    }

    /// Status a flight reaches once it has left (departures) or arrived (arrivals).
    pub fn completed(kind: FlightType) -> Self {
        match kind {
            FlightType::Departure => FlightStatus::Departed,
            FlightType::Arrival => FlightStatus::Landed,
        }
    }

    /// Status of a flight around its scheduled time.
    pub fn imminent(kind: FlightType) -> Self {
        match kind {
            FlightType::Departure => FlightStatus::Boarding,
            FlightType::Arrival => FlightStatus::Arriving,
        }
    }
}

/// One end of a flight's route.
///
/// Upstream feeds mark unresolved endpoints with "Unknown"/"UNK" and
/// airborne-but-unresolved ones with "En Route"/"ENR". Both are folded into
/// this type on ingestion and restored only when serializing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Airport {
        code: Option<String>,
        name: Option<String>,
    },
    EnRoute,
}

impl Endpoint {
    pub fn unknown() -> Self {
        Endpoint::Airport {
            code: None,
            name: None,
        }
    }

    pub fn airport(code: impl Into<String>, name: impl Into<String>) -> Self {
        let (code, name): (String, String) = (code.into(), name.into());
        Endpoint::from_raw(Some(name.as_str()), Some(code.as_str()))
    }

    /// Build an endpoint from raw upstream name/code strings.
    pub fn from_raw(name: Option<&str>, code: Option<&str>) -> Self {
        let name = name.map(str::trim).filter(|s| !s.is_empty());
        let code = code.map(str::trim).filter(|s| !s.is_empty());

        if name == Some(EN_ROUTE_NAME) || code == Some(EN_ROUTE_CODE) {
            return Endpoint::EnRoute;
        }

        Endpoint::Airport {
            code: code.filter(|c| *c != UNKNOWN_CODE).map(str::to_string),
            name: name.filter(|n| *n != UNKNOWN_NAME).map(str::to_string),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Endpoint::Airport { code, .. } => code.as_deref(),
            Endpoint::EnRoute => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Endpoint::Airport { name, .. } => name.as_deref(),
            Endpoint::EnRoute => None,
        }
    }

    /// True when either half of the endpoint is missing or en route.
    pub fn is_unresolved(&self) -> bool {
        match self {
            Endpoint::Airport { code, name } => code.is_none() || name.is_none(),
            Endpoint::EnRoute => true,
        }
    }

    /// Fill the missing halves of `self` from `found`. A resolved endpoint,
    /// or one whose code disagrees with `found`, is kept as is.
    pub fn merge(self, found: Endpoint) -> Endpoint {
        if !self.is_unresolved() {
            return self;
        }
        match (self, found) {
            (Endpoint::EnRoute, found) if found == Endpoint::unknown() => Endpoint::EnRoute,
            (Endpoint::EnRoute, found) => found,
            (current, Endpoint::EnRoute) if current == Endpoint::unknown() => Endpoint::EnRoute,
            (current, Endpoint::EnRoute) => current,
            (
                Endpoint::Airport { code, name },
                Endpoint::Airport {
                    code: found_code,
                    name: found_name,
                },
            ) => {
                let conflict = matches!(
                    (&code, &found_code),
                    (Some(a), Some(b)) if !a.eq_ignore_ascii_case(b)
                );
                if conflict {
                    Endpoint::Airport { code, name }
                } else {
                    Endpoint::Airport {
                        code: code.or(found_code),
                        name: name.or(found_name),
                    }
                }
            }
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Endpoint::EnRoute => EN_ROUTE_NAME,
            Endpoint::Airport { name, code } => name
                .as_deref()
                .or(code.as_deref())
                .unwrap_or(UNKNOWN_NAME),
        }
    }

    pub fn display_code(&self) -> &str {
        match self {
            Endpoint::EnRoute => EN_ROUTE_CODE,
            Endpoint::Airport { code, .. } => code.as_deref().unwrap_or(UNKNOWN_CODE),
        }
    }
}

/// Flight record produced by a provider adapter or the mock generator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "FlightRecord")]
pub struct Flight {
    pub id: String,
    pub flight_number: Option<String>,
    pub airline: Option<String>,
    pub origin: Endpoint,
    pub destination: Endpoint,
    pub scheduled_time: DateTime<Utc>,
    pub estimated_time: Option<DateTime<Utc>>,
    pub actual_time: Option<DateTime<Utc>>,
    pub gate: Option<String>,
    pub terminal: Option<String>,
    pub status: FlightStatus,
    pub aircraft: Option<String>,
    pub duration: Option<String>,
}

/// Normalize an upstream gate value; "N/A" and "" both mean no gate.
pub fn gate_from_raw(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|g| !g.is_empty() && *g != NOT_AVAILABLE)
        .map(str::to_string)
}

/// Serialized shape of a flight, with the sentinels the UI expects
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    pub id: String,
    pub flight_number: String,
    pub airline: String,
    pub origin: String,
    pub origin_code: String,
    pub destination: String,
    pub destination_code: String,
    pub scheduled_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<DateTime<Utc>>,
    pub gate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    pub status: FlightStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aircraft: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl From<Flight> for FlightRecord {
    fn from(f: Flight) -> Self {
        FlightRecord {
            origin: f.origin.display_name().to_string(),
            origin_code: f.origin.display_code().to_string(),
            destination: f.destination.display_name().to_string(),
            destination_code: f.destination.display_code().to_string(),
            id: f.id,
            flight_number: f.flight_number.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            airline: f.airline.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            scheduled_time: f.scheduled_time,
            estimated_time: f.estimated_time,
            actual_time: f.actual_time,
            gate: f.gate.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            terminal: f.terminal,
            status: f.status,
            aircraft: f.aircraft,
            duration: f.duration,
        }
    }
}

/// Airport reference data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirportCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Latitude/longitude box around a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub lat1: f64,
    pub lat2: f64,
    pub lon1: f64,
    pub lon2: f64,
}

impl BoundingBox {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.lat1..=self.lat2).contains(&latitude) && (self.lon1..=self.lon2).contains(&longitude)
    }
}

/// Origin and destination of a callsign as reported by a route service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteInfo {
    pub source: &'static str,
    pub origin: Endpoint,
    pub destination: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
}

impl Serialize for Endpoint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Endpoint", 2)?;
        s.serialize_field("code", self.display_code())?;
        s.serialize_field("name", self.display_name())?;
        s.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Api,
    Mock,
}

/// Inbound flights contract
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightsResponse {
    pub airport: String,
    #[serde(rename = "type")]
    pub kind: FlightType,
    pub flights: Vec<Flight>,
    pub data_source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'static str>,
    pub timestamp: DateTime<Utc>,
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}
