/// Synthetic flight feed used when no provider has data
pub mod simulator;

use crate::domain::{Airport, Endpoint, Flight, FlightStatus, FlightType};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

pub use simulator::{simulate_flight_updates, simulate_flight_updates_at};

/// (code, name, city, country, timezone)
const AIRPORTS: &[(&str, &str, &str, &str, &str)] = &[
    ("KSMF", "Sacramento International Airport", "Sacramento", "USA", "America/Los_Angeles"),
    ("KLAX", "Los Angeles International Airport", "Los Angeles", "USA", "America/Los_Angeles"),
    ("KJFK", "John F. Kennedy International Airport", "New York", "USA", "America/New_York"),
    ("KORD", "O'Hare International Airport", "Chicago", "USA", "America/Chicago"),
    ("KDFW", "Dallas/Fort Worth International Airport", "Dallas", "USA", "America/Chicago"),
    ("KSFO", "San Francisco International Airport", "San Francisco", "USA", "America/Los_Angeles"),
    ("KDEN", "Denver International Airport", "Denver", "USA", "America/Denver"),
    ("KATL", "Hartsfield-Jackson Atlanta International Airport", "Atlanta", "USA", "America/New_York"),
    ("KPHX", "Phoenix Sky Harbor International Airport", "Phoenix", "USA", "America/Phoenix"),
    ("KSEA", "Seattle-Tacoma International Airport", "Seattle", "USA", "America/Los_Angeles"),
];

const AIRLINES: &[(&str, &str)] = &[
    ("United Airlines", "UA"),
    ("American Airlines", "AA"),
    ("Delta Air Lines", "DL"),
    ("Southwest Airlines", "WN"),
    ("Alaska Airlines", "AS"),
    ("JetBlue Airways", "B6"),
    ("Spirit Airlines", "NK"),
    ("Frontier Airlines", "F9"),
];

const AIRCRAFT_TYPES: &[&str] = &[
    "Boeing 737-800",
    "Boeing 737 MAX 9",
    "Boeing 757-200",
    "Boeing 777-300ER",
    "Airbus A320",
    "Airbus A321neo",
    "Airbus A350-900",
    "Embraer E175",
];

/// Largest board the generator builds
pub const MAX_FLIGHT_COUNT: usize = 200;

const CONCOURSES: &[&str] = &["A", "B", "C", "D"];
const TERMINALS: &[&str] = &["1", "2", "3"];

/// Static reference airport by ICAO code
pub fn airport(code: &str) -> Option<Airport> {
    AIRPORTS
        .iter()
        .find(|(c, ..)| c.eq_ignore_ascii_case(code))
        .map(|(code, name, city, country, timezone)| Airport {
            code: code.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            country: country.to_string(),
            timezone: timezone.to_string(),
        })
}

pub fn airports() -> Vec<Airport> {
    AIRPORTS.iter().filter_map(|(code, ..)| airport(code)).collect()
}

/// Generate `count` flights around now for an airport board.
pub fn generate_mock_flights(airport_code: &str, kind: FlightType, count: usize) -> Vec<Flight> {
    generate_mock_flights_with(&mut rand::thread_rng(), airport_code, kind, count, Utc::now())
}

/// Generator with injected randomness and clock. At most
/// [`MAX_FLIGHT_COUNT`] flights are built.
///
/// Flight `i` is scheduled at `now + (i - 5) * 30` minutes so a fresh board
/// already shows flights that have left, are boarding, and are upcoming.
pub fn generate_mock_flights_with<R: Rng + ?Sized>(
    rng: &mut R,
    airport_code: &str,
    kind: FlightType,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<Flight> {
    let airport_code = airport_code.trim().to_ascii_uppercase();
    let home = match airport(&airport_code) {
        Some(a) => Endpoint::airport(a.code, a.city),
        None => Endpoint::airport(airport_code.clone(), airport_code.clone()),
    };
    let others: Vec<&(&str, &str, &str, &str, &str)> = AIRPORTS
        .iter()
        .filter(|(code, ..)| *code != airport_code)
        .collect();

    let mut flights: Vec<Flight> = (0..count.min(MAX_FLIGHT_COUNT))
        .map(|i| {
            let (airline_name, airline_code) = *AIRLINES.choose(rng).unwrap_or(&AIRLINES[0]);
            let remote = others
                .choose(rng)
                .map(|(code, _, city, ..)| Endpoint::airport(*code, *city))
                .unwrap_or_else(Endpoint::unknown);

            let scheduled_time = now + Duration::minutes((i as i64 - 5) * 30);
            let (status, estimated_time, actual_time) =
                initial_status(rng, kind, now, scheduled_time);

            let (origin, destination) = match kind {
                FlightType::Departure => (home.clone(), remote),
                FlightType::Arrival => (remote, home.clone()),
            };

            Flight {
                id: format!("{}-{}-{}", airline_code, i, now.timestamp_millis()),
                flight_number: Some(format!("{}{}", airline_code, rng.gen_range(1000..10000))),
                airline: Some(airline_name.to_string()),
                origin,
                destination,
                scheduled_time,
                estimated_time,
                actual_time,
                gate: Some(format!(
                    "{}{}",
                    CONCOURSES.choose(rng).unwrap_or(&"A"),
                    rng.gen_range(1..=30)
                )),
                terminal: if rng.gen_bool(0.5) {
                    TERMINALS.choose(rng).map(|t| t.to_string())
                } else {
                    None
                },
                status,
                aircraft: AIRCRAFT_TYPES.choose(rng).map(|a| a.to_string()),
                duration: Some(format!(
                    "{}h {}m",
                    rng.gen_range(1..=4),
                    rng.gen_range(0..60)
                )),
            }
        })
        .collect();

    flights.sort_by_key(|f| f.scheduled_time);
    flights
}

type InitialStatus = (FlightStatus, Option<DateTime<Utc>>, Option<DateTime<Utc>>);

fn initial_status<R: Rng + ?Sized>(
    rng: &mut R,
    kind: FlightType,
    now: DateTime<Utc>,
    scheduled: DateTime<Utc>,
) -> InitialStatus {
    let until = scheduled - now;

    if until < Duration::minutes(-30) {
        let actual = scheduled + Duration::minutes(rng.gen_range(-10..10));
        return (FlightStatus::completed(kind), None, Some(actual));
    }
    if until < Duration::zero() {
        let estimated = scheduled + Duration::minutes(rng.gen_range(0..15));
        return (FlightStatus::imminent(kind), Some(estimated), None);
    }
    if until < Duration::minutes(60) {
        let mut status = FlightStatus::Scheduled;
        let mut estimated = None;
        if rng.gen_bool(0.2) {
            status = FlightStatus::Delayed;
            estimated = Some(scheduled + Duration::minutes(rng.gen_range(15..75)));
        }
        if rng.gen_bool(0.05) {
            status = FlightStatus::Cancelled;
        }
        return (status, estimated, None);
    }

    (FlightStatus::Scheduled, None, None)
}
