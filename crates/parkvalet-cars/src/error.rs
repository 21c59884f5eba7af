use thiserror::Error;

#[derive(Debug, Error)]
pub enum CarError {
    /// No car with this id belongs to the caller.
    #[error("car not found: {0}")]
    NotFound(String),

    /// The owner already registered this plate.
    #[error("car already registered: {0}")]
    AlreadyExists(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, CarError>;
