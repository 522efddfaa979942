// Error types for the orbital mesh

use thiserror::Error;

/// Result type alias for mesh operations
pub type Result<T> = std::result::Result<T, Error>;

/// Orbital mesh errors
#[derive(Debug, Error)]
pub enum Error {
    /// Orbital elements that cannot be propagated
    #[error("Invalid orbital elements for '{id}': {reason}")]
    InvalidElements { id: String, reason: String },

    /// A value declared a neighbour that was not handed to the graph
    #[error("Graph neighbour not present in input: {0}")]
    MissingNeighbour(String),

    /// Body id absent from the registry
    #[error("Celestial body not found: {0}")]
    BodyNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid elements error
    pub fn invalid_elements(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidElements {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
