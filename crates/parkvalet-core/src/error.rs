use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ValetError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            ValetError::Config(_) => "CONFIG_ERROR",
            ValetError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ValetError>;
