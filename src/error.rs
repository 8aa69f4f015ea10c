//! Error types for terrain generation

use thiserror::Error;

/// Terrain generation error type
#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("Failed to decode heightmap {origin}: {source}")]
    Decode {
        /// Path or description of the image that failed to decode
        origin: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Unsupported heightmap image: {0}")]
    UnsupportedImage(String),
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),
}

impl TerrainError {
    pub(crate) fn decode(origin: impl Into<String>, source: image::ImageError) -> Self {
        TerrainError::Decode {
            origin: origin.into(),
            source,
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        TerrainError::DegenerateGeometry(reason.into())
    }

    /// Whether this error came from reading or decoding an image resource
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            TerrainError::Decode { .. } | TerrainError::UnsupportedImage(_)
        )
    }
}

pub type TerrainResult<T> = Result<T, TerrainError>;
