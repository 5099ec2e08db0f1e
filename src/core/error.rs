//! Error types for admission-control operations.

use thiserror::Error;

/// Errors produced by admission-control components.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Constructor parameters failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Scheduler is draining and refuses new submissions.
    #[error("scheduler is draining and cannot accept new tasks")]
    Draining,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
