/// Application routes configuration
use crate::handlers::{
    get_airport, get_airport_coordinates, get_board, get_flights, health, list_airports,
    list_providers, lookup_route, AppState,
};
use axum::{routing::get, Router};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Flight boards
        .route("/api/flights", get(get_flights))
        .route("/api/board/:airport", get(get_board))
        // Airports
        .route("/api/airports", get(list_airports))
        .route("/api/airports/:code", get(get_airport))
        .route("/api/airports/:code/coordinates", get(get_airport_coordinates))
        // Routes and providers
        .route("/api/routes/:callsign", get(lookup_route))
        .route("/api/providers", get(list_providers))
        .with_state(state)
}
