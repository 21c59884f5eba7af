use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw booking status as stored. Only `Cancelled` matters to the classifier;
/// unknown strings read back from storage are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookingStatus {
    #[default]
    Booked,
    Cancelled,
    Other(String),
}

impl BookingStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BookingStatus::Booked => "booked",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Other(s) => s,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "booked" => BookingStatus::Booked,
            "cancelled" | "canceled" => BookingStatus::Cancelled,
            _ => BookingStatus::Other(s.to_string()),
        })
    }
}

impl From<String> for BookingStatus {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl From<BookingStatus> for String {
    fn from(status: BookingStatus) -> Self {
        status.as_str().to_string()
    }
}

/// What actually happened on site. Created empty with its reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub actual_arrival: Option<String>,
    pub actual_departure: Option<String>,
}

/// A booked spot. All timestamps are RFC3339 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub lot_id: String,
    pub spot_id: String,
    pub car_id: Option<String>,
    #[serde(rename = "booking_status")]
    pub status: BookingStatus,
    pub reserved_at: String,
    pub planned_arrival: String,
    pub planned_departure: String,
    /// `None` only for rows written without a stay record.
    pub stay: Option<Stay>,
}

impl Reservation {
    pub fn actual_arrival(&self) -> Option<&str> {
        self.stay.as_ref()?.actual_arrival.as_deref()
    }

    pub fn actual_departure(&self) -> Option<&str> {
        self.stay.as_ref()?.actual_departure.as_deref()
    }
}

/// Input for `ReservationManager::create`. Missing planned times default to now.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewReservation {
    pub lot_id: String,
    pub spot_id: String,
    pub car_id: Option<String>,
    pub planned_arrival: Option<String>,
    pub planned_departure: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_status_parse_is_total() {
        assert_eq!("booked".parse::<BookingStatus>().unwrap(), BookingStatus::Booked);
        assert_eq!("Cancelled".parse::<BookingStatus>().unwrap(), BookingStatus::Cancelled);
        assert_eq!(
            "no-show".parse::<BookingStatus>().unwrap(),
            BookingStatus::Other("no-show".into())
        );
    }

    #[test]
    fn booking_status_serde_is_a_plain_string() {
        let json = serde_json::to_string(&BookingStatus::Cancelled).unwrap();
        assert_eq!(json, r#""cancelled""#);
        let back: BookingStatus = serde_json::from_str(r#""weird""#).unwrap();
        assert_eq!(back, BookingStatus::Other("weird".into()));
    }

    #[test]
    fn accessors_handle_missing_stay() {
        let r = Reservation {
            id: "r".into(),
            lot_id: "l".into(),
            spot_id: "s".into(),
            car_id: None,
            status: BookingStatus::Booked,
            reserved_at: "2025-01-01T00:00:00Z".into(),
            planned_arrival: "2025-01-01T10:00:00Z".into(),
            planned_departure: "2025-01-01T18:00:00Z".into(),
            stay: None,
        };
        assert!(r.actual_arrival().is_none());
        assert!(r.actual_departure().is_none());
    }
}
