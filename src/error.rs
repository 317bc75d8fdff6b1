//! Error types shared by the training pipeline

use thiserror::Error;

/// Errors that can occur while building, training or evaluating a WGAN-GP
#[derive(Error, Debug)]
pub enum WganError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dimension mismatch: expected {expected}, got {actual} ({context})")]
    DimensionMismatch {
        expected: i64,
        actual: i64,
        context: &'static str,
    },

    #[error("Batch size {batch_size} yields no batches for {num_samples} training samples")]
    EmptyBatches { batch_size: usize, num_samples: usize },

    #[error("Two-sample evaluation failed: {0}")]
    Evaluation(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Plotting failed: {0}")]
    Plot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),
}

pub type Result<T> = std::result::Result<T, WganError>;
