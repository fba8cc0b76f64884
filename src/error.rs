//! Error types for Nextmove

use thiserror::Error;

/// Errors that can occur inside the prediction core.
///
/// Soft conditions (untrained models, missing context fields, absent map
/// keys) are not errors; they fall back to neutral defaults instead.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Training already in progress for {0} model")]
    TrainingInProgress(&'static str),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse persisted state: {0}")]
    ParseError(String),
}
