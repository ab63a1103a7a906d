/// Business logic services layer
use crate::config::{ApiKeys, BoardSettings};
use crate::coords::{calculate_bounding_box, CoordinateResolver, DEFAULT_RADIUS_KM};
use crate::domain::{
    Airport, AirportCoordinates, BoundingBox, DataSource, Flight, FlightType, FlightsResponse,
};
use crate::errors::{ApiError, ApiResult};
use crate::mock::{generate_mock_flights, simulate_flight_updates, simulate_flight_updates_at};
use crate::providers::{
    build_provider, configured_providers, FlightDataProvider, ProviderContext, ProviderKind,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Result of one walk over the provider chain
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub flights: Vec<Flight>,
    /// Provider that supplied `flights`, if any did
    pub provider: Option<&'static str>,
    /// Providers that returned an error along the way
    pub failures: usize,
}

/// Tries providers in priority order until one has flights
pub struct FlightAggregator {
    providers: Vec<Arc<dyn FlightDataProvider>>,
}

impl FlightAggregator {
    pub fn new(providers: Vec<Arc<dyn FlightDataProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain from a priority list. Never empty: OpenSky stands in
    /// when nothing in the list can be built.
    pub fn from_config(priority: &[String], ctx: &ProviderContext) -> Self {
        let mut providers = configured_providers(priority, ctx);
        if providers.is_empty() {
            warn!("No flight data providers configured, using default OpenSky");
            providers.extend(build_provider(ProviderKind::OpenSky, ctx).ok());
        }
        Self::new(providers)
    }

    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// First non-empty answer wins; results are never merged.
    pub async fn fetch_flights(&self, airport: &str, kind: FlightType) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();

        for provider in &self.providers {
            match provider.fetch_flights(airport, kind).await {
                Ok(flights) if !flights.is_empty() => {
                    info!(
                        "{} returned {} {} flights for {}",
                        provider.id(),
                        flights.len(),
                        kind,
                        airport
                    );
                    outcome.flights = flights;
                    outcome.provider = Some(provider.id());
                    return outcome;
                }
                Ok(_) => debug!("{} had no {} flights for {}", provider.id(), kind, airport),
                Err(e) => {
                    error!("Provider {} failed, trying next: {}", provider.id(), e);
                    outcome.failures += 1;
                }
            }
        }

        outcome
    }

    pub async fn fetch_airport_info(&self, code: &str) -> Option<Airport> {
        for provider in &self.providers {
            match provider.fetch_airport_info(code).await {
                Ok(Some(airport)) => return Some(airport),
                Ok(None) => {}
                Err(e) => error!(
                    "Provider {} failed for airport info, trying next: {}",
                    provider.id(),
                    e
                ),
            }
        }
        None
    }
}

/// Flights endpoint logic: live data first, simulated mock board otherwise
pub struct FlightService {
    aggregator: Arc<FlightAggregator>,
    default_count: usize,
}

impl FlightService {
    pub fn new(aggregator: Arc<FlightAggregator>, default_count: usize) -> Self {
        Self {
            aggregator,
            default_count,
        }
    }

    pub async fn get_flights(
        &self,
        airport: &str,
        kind: FlightType,
        count: Option<usize>,
        force_mock: bool,
    ) -> FlightsResponse {
        let airport = airport.trim().to_ascii_uppercase();

        if !force_mock {
            let outcome = self.aggregator.fetch_flights(&airport, kind).await;
            if !outcome.flights.is_empty() {
                return FlightsResponse {
                    airport,
                    kind,
                    flights: outcome.flights,
                    data_source: DataSource::Api,
                    provider: outcome.provider,
                    timestamp: Utc::now(),
                };
            }
            info!(
                "No real flight data for {} ({} provider failures), using mock data",
                airport, outcome.failures
            );
        }

        let count = count.unwrap_or(self.default_count);
        let flights = generate_mock_flights(&airport, kind, count);

        FlightsResponse {
            flights: simulate_flight_updates(&flights, kind),
            airport,
            kind,
            data_source: DataSource::Mock,
            provider: None,
            timestamp: Utc::now(),
        }
    }
}

/// Where an airport is, plus the search box around it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AirportLocation {
    pub code: String,
    pub coordinates: AirportCoordinates,
    pub radius_km: f64,
    pub bounding_box: BoundingBox,
}

/// Airport metadata and coordinates
pub struct AirportService {
    aggregator: Arc<FlightAggregator>,
    resolver: Arc<CoordinateResolver>,
}

impl AirportService {
    pub fn new(aggregator: Arc<FlightAggregator>, resolver: Arc<CoordinateResolver>) -> Self {
        Self {
            aggregator,
            resolver,
        }
    }

    /// Reference airports known without any provider
    pub fn list_airports(&self) -> Vec<Airport> {
        crate::mock::airports()
    }

    /// Provider metadata, falling back to the static reference table
    pub async fn get_airport(&self, code: &str) -> ApiResult<Airport> {
        let code = code.trim().to_ascii_uppercase();
        if let Some(airport) = self.aggregator.fetch_airport_info(&code).await {
            return Ok(airport);
        }
        crate::mock::airport(&code).ok_or_else(|| ApiError::NotFound(format!("airport {}", code)))
    }

    pub async fn get_location(&self, code: &str) -> ApiResult<AirportLocation> {
        let code = code.trim().to_ascii_uppercase();
        let coordinates = self
            .resolver
            .resolve(&code)
            .await
            .ok_or_else(|| ApiError::NotFound(format!("coordinates for {}", code)))?;

        Ok(AirportLocation {
            code,
            coordinates,
            radius_km: DEFAULT_RADIUS_KM,
            bounding_box: calculate_bounding_box(coordinates, DEFAULT_RADIUS_KM),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub name: &'static str,
    pub requires_api_key: bool,
    pub configured: bool,
}

/// Which providers exist, which can run, and the order they are tried in
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderListing {
    pub priority: Vec<String>,
    pub active: Vec<&'static str>,
    pub providers: Vec<ProviderSummary>,
}

impl ProviderListing {
    pub fn new(priority: &[String], keys: &ApiKeys, aggregator: &FlightAggregator) -> Self {
        Self {
            priority: priority.to_vec(),
            active: aggregator.provider_ids(),
            providers: ProviderKind::ALL
                .iter()
                .map(|kind| ProviderSummary {
                    name: kind.name(),
                    requires_api_key: kind.requires_api_key(),
                    configured: kind.is_available(keys),
                })
                .collect(),
        }
    }
}

/// One airport's live mock board
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub airport: String,
    pub departures: Vec<Flight>,
    pub arrivals: Vec<Flight>,
    pub generated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    fn generate(airport: &str, count: usize, now: DateTime<Utc>) -> Self {
        Self {
            airport: airport.to_string(),
            departures: generate_mock_flights(airport, FlightType::Departure, count),
            arrivals: generate_mock_flights(airport, FlightType::Arrival, count),
            generated_at: now,
            updated_at: now,
        }
    }

    fn advance(&mut self, now: DateTime<Utc>) {
        self.departures = simulate_flight_updates_at(&self.departures, FlightType::Departure, now);
        self.arrivals = simulate_flight_updates_at(&self.arrivals, FlightType::Arrival, now);
        self.updated_at = now;
    }
}

/// Live mock boards for the configured airports, aged on every tick and
/// regenerated on every refresh
pub struct BoardService {
    settings: BoardSettings,
    boards: RwLock<HashMap<String, Board>>,
}

impl BoardService {
    pub fn new(settings: BoardSettings) -> Self {
        let now = Utc::now();
        let boards = settings
            .airports
            .iter()
            .map(|code| {
                (
                    code.clone(),
                    Board::generate(code, settings.flights_per_board, now),
                )
            })
            .collect();

        Self {
            settings,
            boards: RwLock::new(boards),
        }
    }

    pub fn settings(&self) -> &BoardSettings {
        &self.settings
    }

    pub async fn tick(&self) {
        self.tick_at(Utc::now()).await
    }

    pub async fn tick_at(&self, now: DateTime<Utc>) {
        let mut boards = self.boards.write().await;
        for board in boards.values_mut() {
            board.advance(now);
        }
    }

    pub async fn refresh(&self) {
        let now = Utc::now();
        let mut boards = self.boards.write().await;
        for (code, board) in boards.iter_mut() {
            *board = Board::generate(code, self.settings.flights_per_board, now);
        }
        info!("Regenerated {} flight boards", boards.len());
    }

    pub async fn get(&self, airport: &str) -> ApiResult<Board> {
        let code = airport.trim().to_ascii_uppercase();
        self.boards
            .read()
            .await
            .get(&code)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("no live board for {}", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Endpoint, FlightStatus};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Fail,
        Empty,
        Flights(Vec<Flight>),
    }

    struct FakeProvider {
        id: &'static str,
        reply: Reply,
        airport: Option<Airport>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(id: &'static str, reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                id,
                reply,
                airport: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FlightDataProvider for FakeProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn fetch_flights(&self, _airport: &str, _kind: FlightType) -> ApiResult<Vec<Flight>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Fail => Err(ApiError::Internal("boom".into())),
                Reply::Empty => Ok(Vec::new()),
                Reply::Flights(flights) => Ok(flights.clone()),
            }
        }

        async fn fetch_airport_info(&self, _code: &str) -> ApiResult<Option<Airport>> {
            match self.reply {
                Reply::Fail => Err(ApiError::Internal("boom".into())),
                _ => Ok(self.airport.clone()),
            }
        }
    }

    fn sample_flight(id: &str) -> Flight {
        Flight {
            id: id.to_string(),
            flight_number: Some(id.to_string()),
            airline: None,
            origin: Endpoint::airport("KSMF", "Sacramento"),
            destination: Endpoint::airport("KDEN", "Denver"),
            scheduled_time: Utc::now(),
            estimated_time: None,
            actual_time: None,
            gate: None,
            terminal: None,
            status: FlightStatus::Scheduled,
            aircraft: None,
            duration: None,
        }
    }

    fn settings(airports: &[&str]) -> BoardSettings {
        BoardSettings {
            airports: airports.iter().map(|a| a.to_string()).collect(),
            flights_per_board: 25,
            tick_seconds: 10,
            refresh_seconds: 120,
        }
    }

    #[tokio::test]
    async fn test_first_non_empty_provider_wins() {
        let a = FakeProvider::new("A", Reply::Fail);
        let b = FakeProvider::new("B", Reply::Empty);
        let c = FakeProvider::new("C", Reply::Flights(vec![sample_flight("f1")]));
        let d = FakeProvider::new("D", Reply::Flights(vec![sample_flight("f2")]));
        let aggregator =
            FlightAggregator::new(vec![a.clone(), b.clone(), c.clone(), d.clone()]);

        let outcome = aggregator.fetch_flights("KSMF", FlightType::Departure).await;

        assert_eq!(outcome.flights.len(), 1);
        assert_eq!(outcome.flights[0].id, "f1");
        assert_eq!(outcome.provider, Some("C"));
        assert_eq!(outcome.failures, 1);
        assert_eq!(d.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_empty_yields_empty_outcome() {
        let aggregator = FlightAggregator::new(vec![
            FakeProvider::new("A", Reply::Empty),
            FakeProvider::new("B", Reply::Fail),
        ]);

        let outcome = aggregator.fetch_flights("KSMF", FlightType::Arrival).await;
        assert!(outcome.flights.is_empty());
        assert_eq!(outcome.provider, None);
        assert_eq!(outcome.failures, 1);
    }

    #[tokio::test]
    async fn test_airport_info_first_success() {
        let sac = crate::mock::airport("KSMF").unwrap();
        let failing = FakeProvider::new("A", Reply::Fail);
        let knows = Arc::new(FakeProvider {
            id: "B",
            reply: Reply::Empty,
            airport: Some(sac.clone()),
            calls: AtomicUsize::new(0),
        });
        let aggregator = FlightAggregator::new(vec![failing, knows]);

        assert_eq!(aggregator.fetch_airport_info("KSMF").await, Some(sac));
        assert_eq!(FlightAggregator::new(Vec::new()).fetch_airport_info("KSMF").await, None);
    }

    #[tokio::test]
    async fn test_from_config_falls_back_to_opensky() {
        let ctx = crate::providers::test_support::context(ApiKeys::default(), "http://127.0.0.1:9");
        let aggregator = FlightAggregator::from_config(&["flightaware".to_string()], &ctx);
        assert_eq!(aggregator.provider_ids(), vec!["OPENSKY"]);
    }

    #[tokio::test]
    async fn test_flight_service_prefers_live_data() {
        let aggregator = Arc::new(FlightAggregator::new(vec![FakeProvider::new(
            "LIVE",
            Reply::Flights(vec![sample_flight("f1")]),
        )]));
        let service = FlightService::new(aggregator, 20);

        let live = service
            .get_flights("ksmf", FlightType::Departure, None, false)
            .await;
        assert_eq!(live.data_source, DataSource::Api);
        assert_eq!(live.provider, Some("LIVE"));
        assert_eq!(live.airport, "KSMF");

        let forced = service
            .get_flights("KSMF", FlightType::Departure, Some(5), true)
            .await;
        assert_eq!(forced.data_source, DataSource::Mock);
        assert_eq!(forced.flights.len(), 5);
        assert_eq!(forced.provider, None);
    }

    #[tokio::test]
    async fn test_flight_service_caps_mock_count() {
        let service = FlightService::new(Arc::new(FlightAggregator::new(Vec::new())), 20);
        let response = service
            .get_flights("KSMF", FlightType::Departure, Some(usize::MAX), true)
            .await;
        assert_eq!(response.flights.len(), crate::mock::MAX_FLIGHT_COUNT);
    }

    #[tokio::test]
    async fn test_flight_service_falls_back_to_simulated_mock() {
        let aggregator = Arc::new(FlightAggregator::new(vec![FakeProvider::new(
            "A",
            Reply::Empty,
        )]));
        let service = FlightService::new(aggregator, 20);

        let response = service
            .get_flights("KLAX", FlightType::Arrival, None, false)
            .await;
        assert_eq!(response.data_source, DataSource::Mock);
        assert_eq!(response.flights.len(), 20);
        assert!(response
            .flights
            .iter()
            .all(|f| f.destination.code() == Some("KLAX")));

        // generator and simulator agree, so nothing is left mid-transition
        let now = Utc::now();
        for f in &response.flights {
            if f.scheduled_time < now - Duration::minutes(31) && f.status != FlightStatus::Cancelled {
                assert_eq!(f.status, FlightStatus::Landed);
            }
        }
    }

    #[tokio::test]
    async fn test_airport_service_falls_back_to_reference_table() {
        let aggregator = Arc::new(FlightAggregator::new(vec![FakeProvider::new(
            "A",
            Reply::Fail,
        )]));
        let http = crate::providers::test_support::http();
        let resolver = Arc::new(CoordinateResolver::new(http, "http://127.0.0.1:9"));
        let service = AirportService::new(aggregator, resolver);

        assert_eq!(service.list_airports().len(), 10);
        let ord = service.get_airport("kord").await.unwrap();
        assert_eq!(ord.city, "Chicago");
        assert!(matches!(
            service.get_airport("ZZZZ").await,
            Err(ApiError::NotFound(_))
        ));

        let location = service.get_location("KSMF").await.unwrap();
        assert!(location.bounding_box.contains(38.6954, -121.5908));
        assert!(matches!(
            service.get_location("ZZZZ").await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_board_tick_and_refresh() {
        let service = BoardService::new(settings(&["KSMF"]));

        let board = service.get("ksmf").await.unwrap();
        assert_eq!(board.departures.len(), 25);
        assert_eq!(board.arrivals.len(), 25);

        // far enough ahead that every flight has completed
        let later = Utc::now() + Duration::days(1);
        service.tick_at(later).await;
        let aged = service.get("KSMF").await.unwrap();
        assert_eq!(aged.updated_at, later);
        assert!(aged
            .departures
            .iter()
            .all(|f| matches!(f.status, FlightStatus::Departed | FlightStatus::Cancelled)));
        assert!(aged
            .arrivals
            .iter()
            .all(|f| matches!(f.status, FlightStatus::Landed | FlightStatus::Cancelled)));

        service.refresh().await;
        let fresh = service.get("KSMF").await.unwrap();
        assert!(fresh.generated_at < later);
        assert!(fresh
            .departures
            .iter()
            .any(|f| f.status != FlightStatus::Departed));
    }

    #[tokio::test]
    async fn test_board_for_unconfigured_airport() {
        let service = BoardService::new(settings(&["KSMF"]));
        assert!(matches!(
            service.get("KJFK").await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_provider_listing() {
        let keys = ApiKeys {
            flightaware: Some("k".into()),
            ..ApiKeys::default()
        };
        let aggregator = FlightAggregator::new(vec![FakeProvider::new("FLIGHTAWARE", Reply::Empty)]);
        let listing = ProviderListing::new(&["flightaware".to_string()], &keys, &aggregator);

        assert_eq!(listing.active, vec!["FLIGHTAWARE"]);
        assert_eq!(listing.providers.len(), 8);
        let fa = listing.providers.iter().find(|p| p.name == "flightaware").unwrap();
        assert!(fa.configured && fa.requires_api_key);
        let lol = listing.providers.iter().find(|p| p.name == "adsblol").unwrap();
        assert!(lol.configured && !lol.requires_api_key);
    }
}
