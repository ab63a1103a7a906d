/// Airport coordinate lookup with a process-lifetime cache
use crate::clients::HttpClient;
use crate::domain::{AirportCoordinates, BoundingBox};
use crate::errors::{ApiError, ApiResult};
use crate::utils::f_pick;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error};

const PROVIDER_ID: &str = "AIRPORT_COORDS";
const KM_PER_DEGREE_LAT: f64 = 111.32;
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

/// Major airports known without a lookup
const SEEDED: &[(&str, f64, f64)] = &[
    ("KSMF", 38.6954, -121.5908),
    ("KLAX", 33.9425, -118.4081),
    ("KJFK", 40.6413, -73.7781),
    ("KORD", 41.9742, -87.9073),
    ("KDFW", 32.8998, -97.0403),
    ("KSFO", 37.6213, -122.3790),
    ("KDEN", 39.8561, -104.6737),
    ("KATL", 33.6407, -84.4277),
    ("KPHX", 33.4343, -112.0080),
    ("KSEA", 47.4502, -122.3088),
    ("KLAS", 36.0840, -115.1537),
    ("KMIA", 25.7959, -80.2870),
    ("KBOS", 42.3656, -71.0096),
    ("KEWR", 40.6895, -74.1745),
    ("KIAD", 38.9531, -77.4565),
    ("KMSP", 44.8848, -93.2223),
    ("KDTW", 42.2162, -83.3554),
    ("KPHL", 39.8729, -75.2437),
    ("KCLT", 35.2144, -80.9473),
    ("KMCO", 28.4312, -81.3081),
];

/// Resolves ICAO codes to coordinates.
///
/// Entries are never evicted. Concurrent misses for the same code share a
/// single outbound lookup; failed lookups are not cached.
pub struct CoordinateResolver {
    http_client: HttpClient,
    base_url: String,
    cache: RwLock<HashMap<String, AirportCoordinates>>,
    inflight: Inflight,
}

type Inflight = SyncMutex<HashMap<String, Arc<Mutex<()>>>>;

/// Share of a per-code lookup gate. The last holder to go, finished or
/// cancelled, removes the gate from the map.
struct GateTicket<'a> {
    inflight: &'a Inflight,
    icao: String,
    gate: Arc<Mutex<()>>,
}

impl<'a> GateTicket<'a> {
    fn take(inflight: &'a Inflight, icao: &str) -> Self {
        let mut map = inflight.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = map
            .entry(icao.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self {
            inflight,
            icao: icao.to_string(),
            gate,
        }
    }
}

impl Drop for GateTicket<'_> {
    fn drop(&mut self) {
        let mut map = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        let last = map
            .get(&self.icao)
            .is_some_and(|g| Arc::ptr_eq(g, &self.gate) && Arc::strong_count(&self.gate) <= 2);
        if last {
            map.remove(&self.icao);
        }
    }
}

impl CoordinateResolver {
    pub fn new(http_client: HttpClient, base_url: impl Into<String>) -> Self {
        let seeded = SEEDED
            .iter()
            .map(|(code, latitude, longitude)| {
                (
                    code.to_string(),
                    AirportCoordinates {
                        latitude: *latitude,
                        longitude: *longitude,
                    },
                )
            })
            .collect();

        Self {
            http_client,
            base_url: base_url.into(),
            cache: RwLock::new(seeded),
            inflight: SyncMutex::new(HashMap::new()),
        }
    }

    /// Coordinates for an airport, or `None` when unavailable. Never errors.
    pub async fn resolve(&self, icao: &str) -> Option<AirportCoordinates> {
        let icao = icao.trim().to_ascii_uppercase();
        if let Some(coords) = self.cached(&icao).await {
            return Some(coords);
        }

        let ticket = GateTicket::take(&self.inflight, &icao);
        let _guard = ticket.gate.lock().await;

        // Another caller may have filled the cache while we waited
        if let Some(coords) = self.cached(&icao).await {
            return Some(coords);
        }

        match self.lookup(&icao).await {
            Ok(coords) => {
                self.cache.write().await.insert(icao.clone(), coords);
                Some(coords)
            }
            Err(e) => {
                error!("Failed to fetch coordinates for {}: {}", icao, e);
                None
            }
        }
    }

    async fn cached(&self, icao: &str) -> Option<AirportCoordinates> {
        self.cache.read().await.get(icao).copied()
    }

    async fn lookup(&self, icao: &str) -> ApiResult<AirportCoordinates> {
        let url = format!("{}/airports/icao/{}", self.base_url, icao);
        debug!("Looking up coordinates for {}", icao);

        let request = self.http_client.get_client().get(url);
        let data: Value = self.http_client.send_json(PROVIDER_ID, request).await?;

        let latitude = f_pick(&data, &["latitude", "lat"]);
        let longitude = f_pick(&data, &["longitude", "lon", "lng"]);
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Ok(AirportCoordinates {
                latitude,
                longitude,
            }),
            _ => Err(ApiError::malformed(
                PROVIDER_ID,
                "response carries no latitude/longitude",
            )),
        }
    }
}

/// Box of `radius_km` around a point using a flat-earth approximation.
///
/// Longitude spans widen toward the poles and are unbounded at +/-90 degrees.
pub fn calculate_bounding_box(coords: AirportCoordinates, radius_km: f64) -> BoundingBox {
    let km_per_degree_lon = KM_PER_DEGREE_LAT * coords.latitude.to_radians().cos();

    let lat_delta = radius_km / KM_PER_DEGREE_LAT;
    let lon_delta = radius_km / km_per_degree_lon;

    BoundingBox {
        lat1: coords.latitude - lat_delta,
        lat2: coords.latitude + lat_delta,
        lon1: coords.longitude - lon_delta,
        lon2: coords.longitude + lon_delta,
    }
}
