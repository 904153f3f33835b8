//! Error types for Sighting Flux

use thiserror::Error;

/// Errors that can occur while decoding sightings or computing analytics
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Failed to parse sighting payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid sighting at index {index}: {reason}")]
    InvalidInput { index: usize, reason: String },

    #[error("No sightings to analyze")]
    EmptyInput,

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
