//! Shared building blocks for every ParkValet crate: configuration loading,
//! the startup error type and row id helpers.

pub mod config;
pub mod error;
pub mod types;

pub use config::ValetConfig;
pub use error::{Result, ValetError};
