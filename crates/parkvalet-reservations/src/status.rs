//! Display status of a reservation, derived from its planned window, its stay
//! record and an evaluation time.
//!
//! Rules are checked in a fixed order and the first match wins:
//!
//! | # | condition | status |
//! |---|-----------|--------|
//! | 1 | raw status is cancelled | `Cancelled` |
//! | 2 | arrival and departure recorded | `Completed` |
//! | 3 | planned arrival <= now, no arrival | `AwaitingArrival` |
//! | 4 | arrived, planned departure >= now, no departure | `AwaitingDeparture` |
//! | 5 | planned arrival > now | `Upcoming` |
//! | 6 | planned departure < now, no arrival | `LateAwaitingArrival` |
//! | 7 | planned departure < now, arrived, no departure | `LateAwaitingDeparture` |
//! | 8 | planned arrival < now, no arrival | `LateArrivalNotDone` |
//! | 9 | otherwise | `Upcoming` |
//!
//! Rules 3 and 5 already cover every reservation without a recorded arrival,
//! and rules 4, 5 and 7 every one that arrived but has not left, so 6, 8 and 9
//! never fire. They are kept so the order stays intact if an earlier rule
//! changes.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReservationError, Result};
use crate::types::Reservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Cancelled,
    Completed,
    AwaitingArrival,
    AwaitingDeparture,
    Upcoming,
    LateAwaitingArrival,
    LateAwaitingDeparture,
    LateArrivalNotDone,
}

impl ReservationStatus {
    /// Stable machine code, identical to the serde form.
    pub fn code(self) -> &'static str {
        match self {
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
            ReservationStatus::AwaitingArrival => "awaiting_arrival",
            ReservationStatus::AwaitingDeparture => "awaiting_departure",
            ReservationStatus::Upcoming => "upcoming",
            ReservationStatus::LateAwaitingArrival => "late_awaiting_arrival",
            ReservationStatus::LateAwaitingDeparture => "late_awaiting_departure",
            ReservationStatus::LateArrivalNotDone => "late_arrival_not_done",
        }
    }

    /// Human readable label for UIs.
    pub fn label(self) -> &'static str {
        match self {
            ReservationStatus::Cancelled => "Cancelled",
            ReservationStatus::Completed => "Completed",
            ReservationStatus::AwaitingArrival => "Awaiting arrival",
            ReservationStatus::AwaitingDeparture => "Awaiting departure",
            ReservationStatus::Upcoming => "Upcoming",
            ReservationStatus::LateAwaitingArrival => "Late (awaiting arrival)",
            ReservationStatus::LateAwaitingDeparture => "Late (awaiting departure)",
            ReservationStatus::LateArrivalNotDone => "Late (arrival not done)",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A status together with the number (1-9) of the rule that selected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: ReservationStatus,
    pub rule: u8,
}

/// Classify `reservation` as seen at `now`.
pub fn classify(reservation: &Reservation, now: DateTime<Utc>) -> Result<ReservationStatus> {
    classify_with_rule(reservation, now).map(|c| c.status)
}

/// Like [`classify`], also reporting which rule matched.
///
/// A cancelled reservation short-circuits before any timestamp is parsed;
/// otherwise every present timestamp must parse or the call fails with
/// `MalformedTimestamp`.
pub fn classify_with_rule(reservation: &Reservation, now: DateTime<Utc>) -> Result<Classification> {
    use ReservationStatus::*;

    if reservation.status.is_cancelled() {
        return Ok(hit(Cancelled, 1));
    }

    let planned_arrival = parse_timestamp("planned_arrival", &reservation.planned_arrival)?;
    let planned_departure = parse_timestamp("planned_departure", &reservation.planned_departure)?;
    let arrived = reservation
        .actual_arrival()
        .map(|v| parse_timestamp("actual_arrival", v))
        .transpose()?
        .is_some();
    let departed = reservation
        .actual_departure()
        .map(|v| parse_timestamp("actual_departure", v))
        .transpose()?
        .is_some();

    let c = if arrived && departed {
        hit(Completed, 2)
    } else if planned_arrival <= now && !arrived {
        hit(AwaitingArrival, 3)
    } else if arrived && planned_departure >= now && !departed {
        hit(AwaitingDeparture, 4)
    } else if planned_arrival > now {
        hit(Upcoming, 5)
    } else if planned_departure < now && !arrived {
        hit(LateAwaitingArrival, 6)
    } else if planned_departure < now && arrived && !departed {
        hit(LateAwaitingDeparture, 7)
    } else if planned_arrival < now && !arrived {
        hit(LateArrivalNotDone, 8)
    } else {
        hit(Upcoming, 9)
    };
    Ok(c)
}

fn hit(status: ReservationStatus, rule: u8) -> Classification {
    Classification { status, rule }
}

/// Parse a stored timestamp. RFC3339 is the canonical form; offset-less
/// `YYYY-MM-DDTHH:MM[:SS[.f]]` (or with a space separator) is read as UTC.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ReservationError::MalformedTimestamp {
            field,
            value: value.to_string(),
        })
}
