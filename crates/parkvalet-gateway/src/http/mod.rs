pub mod cars;
pub mod categories;
pub mod health;
pub mod parkings;
pub mod reservations;
pub mod spots;
pub mod users;
