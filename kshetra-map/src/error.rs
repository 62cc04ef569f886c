//! Error types for kshetra-map.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, MapError>;

/// Kshetra-map error types
#[derive(Debug, Error)]
pub enum MapError {
    /// Parameter outside its valid range (cell size, threshold)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Sensor image could not be read from disk
    #[error("Failed to read sensor image {path}: {source}")]
    ImageRead {
        /// Path that failed to open
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Sensor image bytes could not be decoded
    #[error("Failed to decode sensor image {path}: {source}")]
    ImageDecode {
        /// Path that failed to decode
        path: PathBuf,
        /// Underlying decoder error
        source: image::ImageError,
    },

    /// PNG encoding failed
    #[error("Failed to encode grid image: {0}")]
    ImageEncode(#[from] image::ImageError),

    /// Polygon vertex text did not contain a usable vertex list
    #[error("Invalid vertices: {0}")]
    InvalidVertices(String),
}
