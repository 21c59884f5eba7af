use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParkingError {
    #[error("parking lot not found: {0}")]
    NotFound(String),

    #[error("spot {spot_id} not found in lot {lot_id}")]
    SpotNotFound { lot_id: String, spot_id: String },

    /// `(city, name)` already taken, or a spot already sits at that position.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid dimensions {rows}x{cols}: both must be positive")]
    InvalidDimensions { rows: u32, cols: u32 },

    #[error("layout of {requested} spots exceeds the limit of {max}")]
    TooManySpots { requested: u64, max: u32 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The stored layout column is not valid spot JSON.
    #[error("layout encoding error: {0}")]
    Layout(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ParkingError>;
