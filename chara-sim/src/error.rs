//! Error types for CharaSim

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, SimError>;

/// CharaSim error type
#[derive(Debug, Error)]
pub enum SimError {
    /// Referenced map record is absent upstream
    #[error("map not found: {0}")]
    MapNotFound(i64),

    /// A required precondition does not hold (missing image path, empty cache)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Malformed caller input (vertex text and friends)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Spatial-library failure (rasterization, encoding)
    #[error(transparent)]
    Map(#[from] kshetra_map::MapError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for SimError {
    fn from(e: toml::de::Error) -> Self {
        SimError::Config(e.to_string())
    }
}
