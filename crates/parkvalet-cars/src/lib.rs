pub mod db;
pub mod error;
pub mod manager;
pub mod types;

pub use error::CarError;
pub use manager::CarManager;
pub use types::{Car, CarUpdate};
