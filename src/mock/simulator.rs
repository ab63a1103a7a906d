/// Time-driven status state machine for synthetic flights
use crate::domain::{Flight, FlightStatus, FlightType};
use chrono::{DateTime, Duration, Utc};

/// Outcome of evaluating one flight against the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    /// Scheduled flight entering its final half hour
    Imminent(FlightStatus),
    /// Flight more than 30 minutes past schedule; carries the actual time
    Complete(FlightStatus, DateTime<Utc>),
}

/// Transition function of the simulator.
///
/// Cancelled, departed and landed are absorbing. Completion wins over the
/// imminent step, so statuses only move forward.
pub fn transition(
    current: FlightStatus,
    kind: FlightType,
    now: DateTime<Utc>,
    scheduled: DateTime<Utc>,
    estimated: Option<DateTime<Utc>>,
) -> Transition {
    if current.is_final() {
        return Transition::Stay;
    }

    let until_scheduled = scheduled - now;
    if until_scheduled < Duration::minutes(-30) {
        return Transition::Complete(
            FlightStatus::completed(kind),
            estimated.unwrap_or(scheduled),
        );
    }

    if until_scheduled > Duration::minutes(-30)
        && until_scheduled < Duration::zero()
        && current == FlightStatus::Scheduled
    {
        return Transition::Imminent(FlightStatus::imminent(kind));
    }

    Transition::Stay
}

/// Apply one simulator step to a single flight, superseding it if it moved.
pub fn advance(flight: &Flight, kind: FlightType, now: DateTime<Utc>) -> Flight {
    match transition(
        flight.status,
        kind,
        now,
        flight.scheduled_time,
        flight.estimated_time,
    ) {
        Transition::Stay => flight.clone(),
        Transition::Imminent(status) => Flight {
            status,
            ..flight.clone()
        },
        Transition::Complete(status, actual) => Flight {
            status,
            actual_time: Some(actual),
            ..flight.clone()
        },
    }
}

/// Re-evaluate a board on a refresh tick.
pub fn simulate_flight_updates(flights: &[Flight], kind: FlightType) -> Vec<Flight> {
    simulate_flight_updates_at(flights, kind, Utc::now())
}

pub fn simulate_flight_updates_at(
    flights: &[Flight],
    kind: FlightType,
    now: DateTime<Utc>,
) -> Vec<Flight> {
    flights.iter().map(|f| advance(f, kind, now)).collect()
}
