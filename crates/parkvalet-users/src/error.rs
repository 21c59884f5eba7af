use thiserror::Error;

/// All account-layer errors. Kept separate from the other crates' errors so
/// the gateway can map each one to an HTTP status without coupling layers.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown login or wrong password. Deliberately does not say which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token unknown, revoked or past its expiry.
    #[error("Invalid or expired session")]
    InvalidSession,

    /// Session lifetime pushes the expiry past the representable range.
    #[error("Session expiry out of range")]
    ExpiryOutOfRange,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, UserError>;
