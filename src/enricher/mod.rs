//! Route enricher.
//!
//! Fills in origin/destination for flights whose endpoints are missing or en
//! route by asking the route-lookup services in order. Best effort: a flight
//! that cannot be enriched comes back untouched.

use crate::clients::{AdsbImClient, AdsbLolRouteClient, HttpClient, RouteLookup};
use crate::domain::{Flight, RouteInfo};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Flights looked up concurrently per batch
pub const BATCH_SIZE: usize = 5;

pub struct RouteEnricher {
    lookups: Vec<Arc<dyn RouteLookup>>,
}

impl RouteEnricher {
    pub fn new(lookups: Vec<Arc<dyn RouteLookup>>) -> Self {
        Self { lookups }
    }

    /// adsb.lol first, then adsb.im
    pub fn with_default_lookups(http_client: HttpClient) -> Self {
        Self::new(vec![
            Arc::new(AdsbLolRouteClient::new(http_client.clone())),
            Arc::new(AdsbImClient::new(http_client)),
        ])
    }

    /// Same flights, same order; unresolved endpoints replaced where a
    /// lookup answered.
    pub async fn enrich(&self, flights: Vec<Flight>) -> Vec<Flight> {
        let mut enriched = Vec::with_capacity(flights.len());
        let mut batches = flights.into_iter().peekable();

        while batches.peek().is_some() {
            let batch: Vec<Flight> = batches.by_ref().take(BATCH_SIZE).collect();
            let results = join_all(batch.into_iter().map(|f| self.enrich_one(f))).await;
            enriched.extend(results);
        }

        enriched
    }

    async fn enrich_one(&self, flight: Flight) -> Flight {
        if !flight.origin.is_unresolved() && !flight.destination.is_unresolved() {
            return flight;
        }
        let Some(callsign) = flight.flight_number.clone() else {
            return flight;
        };

        match self.lookup_route(&callsign).await {
            Some(route) => apply_route(flight, route),
            None => flight,
        }
    }

    /// First route any lookup service knows for a callsign.
    pub async fn lookup_route(&self, callsign: &str) -> Option<RouteInfo> {
        let callsign = callsign.trim();
        if callsign.is_empty() {
            return None;
        }

        for lookup in &self.lookups {
            match lookup.lookup_route(callsign, None).await {
                Ok(Some(route)) => {
                    debug!("{}: route for {} found", lookup.id(), callsign);
                    return Some(route);
                }
                Ok(None) => debug!("{}: no route for {}", lookup.id(), callsign),
                Err(e) => warn!("{}: route lookup for {} failed: {}", lookup.id(), callsign, e),
            }
        }
        None
    }
}

/// Fill only the halves of each side that are still missing.
fn apply_route(flight: Flight, route: RouteInfo) -> Flight {
    Flight {
        origin: flight.origin.merge(route.origin),
        destination: flight.destination.merge(route.destination),
        airline: flight.airline.or(route.airline),
        ..flight
    }
}
