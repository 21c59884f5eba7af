pub mod db;
pub mod error;
pub mod manager;
pub mod status;
pub mod types;

pub use error::ReservationError;
pub use manager::ReservationManager;
pub use status::{classify, classify_with_rule, Classification, ReservationStatus};
pub use types::{BookingStatus, NewReservation, Reservation, Stay};
