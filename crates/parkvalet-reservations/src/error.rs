use thiserror::Error;

/// Errors that can occur during reservation operations.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// The requested reservation does not exist in the database.
    #[error("reservation not found: {0}")]
    NotFound(String),

    /// A planned or actual timestamp could not be parsed.
    #[error("malformed timestamp in {field}: {value:?}")]
    MalformedTimestamp { field: &'static str, value: String },

    #[error("invalid reservation: {0}")]
    InvalidInput(String),

    /// Departure cannot be recorded before arrival.
    #[error("arrival not recorded for reservation {0}")]
    ArrivalNotRecorded(String),

    /// The stay already has a departure; its arrival is fixed.
    #[error("stay already closed for reservation {0}")]
    StayClosed(String),

    #[error("departure {departure} is before arrival {arrival} for reservation {id}")]
    DepartureBeforeArrival {
        id: String,
        arrival: String,
        departure: String,
    },

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ReservationError>;
