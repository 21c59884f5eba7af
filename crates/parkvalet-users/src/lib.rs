pub mod account;
pub mod db;
pub mod error;
pub mod manager;
pub mod password;
pub mod session;
pub mod types;

pub use error::UserError;
pub use manager::AccountManager;
pub use types::{LoginSession, User, UserUpdate};
