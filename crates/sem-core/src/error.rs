//! Error taxonomy for the eddy field engine.
//!
//! Every failure the core can raise is a variant of [`CoreError`]; nothing
//! here is swallowed, and validation always fails before any allocation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("eddy too large for domain: length scale {sigma} exceeds half the smallest domain dimension ({half_min})")]
    EddyTooLarge { sigma: f64, half_min: f64 },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("unknown shape function \"{0}\"")]
    UnknownShape(String),

    #[error("out of memory: {reason} (hint: {hint})")]
    OutOfMemory { reason: String, hint: String },

    #[error("evaluation cancelled")]
    Cancelled,
}

pub type CoreResult<T> = Result<T, CoreError>;
