// src/error.rs
// Every failure in this crate is a caller bug: a bad configuration or tensors of the
// wrong shape. None of them is retried or coerced, they bubble up through `?`.

/// Main error type for the group normalization library
#[derive(Debug, thiserror::Error)]
pub enum GroupNormError {
    /// Invalid `num_groups`, `num_channels` or `eps`. Raised at construction.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Wrong rank, channel count, affine parameter shape, or gradient shape.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Unknown or unevaluated node, wrong operator arity.
    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Invalid configuration file: {0}")]
    ConfigFile(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GroupNormError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        GroupNormError::Configuration(msg.into())
    }

    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        GroupNormError::ShapeMismatch(msg.into())
    }

    pub(crate) fn graph(msg: impl Into<String>) -> Self {
        GroupNormError::Graph(msg.into())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, GroupNormError>;
