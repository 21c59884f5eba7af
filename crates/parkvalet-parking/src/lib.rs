pub mod availability;
pub mod category;
pub mod db;
pub mod error;
pub mod layout;
pub mod manager;
pub mod types;

pub use availability::{free_spots, free_spots_all_lots};
pub use category::{Category, CategoryMap};
pub use error::ParkingError;
pub use manager::ParkingManager;
pub use types::{LotUpdate, ParkingLot, Position, Spot, SpotDraft, SpotUpdate};
