//! Error type shared by the model and correction layers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanupError {
    /// Threshold argument could not be parsed. Raised before any processing.
    #[error("invalid threshold '{input}': {reason}")]
    InvalidThreshold { input: String, reason: String },

    /// A fragment longer than the window was handed to the window builder.
    /// Callers are expected to chunk text; it is never truncated.
    #[error("fragment of {length} characters exceeds the window length of {window}; split longer text at the call site")]
    ContractViolation { length: usize, window: usize },

    #[error("index {index} out of range for size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("invalid vocabulary: {0}")]
    InvalidVocabulary(String),

    #[error("prediction failed: {0}")]
    PredictionFailure(String),

    #[error("invalid model artifact: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, CleanupError>;
