//! Engine error taxonomy.
//!
//! Every operation either completes or fails outright with one of these; no
//! partial writes survive a failure, and retry policy belongs to the caller.

use thiserror::Error;

/// Errors raised by the tournament engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Structural misconfiguration (draw smaller than the entrant list,
    /// malformed weight table, unknown seed bucket). Aborts the operation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input rejected by a business rule; the caller may retry with
    /// corrected input. Carries the individual rule violations.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Unknown match/draw/tournament/player id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Player not eligible for the requested age category.
    #[error("eligibility error: {0}")]
    Eligibility(String),

    /// Operation attempted after its deadline.
    #[error("deadline passed: {0}")]
    Deadline(String),
}

impl EngineError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(vec![msg.into()])
    }
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;
