//! Error types for the ramp-metering RL crates

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for RL operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Simulator-related errors (start failure, exhausted trace, bad frame)
    #[error("Simulator error: {0}")]
    Simulator(String),

    /// Agent-related errors
    #[error("Agent error: {0}")]
    Agent(String),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid action
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Sampling asked for more transitions than the buffer holds
    #[error("Cannot sample {requested} transitions from a buffer holding {available}")]
    EmptyBatch { requested: usize, available: usize },

    /// No trained parameters where a model is required
    #[error("Model checkpoint not found at {}; train a model first or pass --model", .0.display())]
    MissingCheckpoint(PathBuf),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for RL operations
pub type Result<T> = std::result::Result<T, RLError>;
