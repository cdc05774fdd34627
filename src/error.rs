//! Error taxonomy for the screening engine.

use thiserror::Error;

use crate::quadrature::QuadratureError;

/// Errors surfaced by the truncated-distribution engine.
///
/// Every fallible operation reports to its immediate caller; nothing is
/// retried or suppressed above the sampler's single bracketing retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Invalid input parameters; no computation was attempted.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Numerical integration did not converge within its limits.
    #[error("integration failed: {0}")]
    Integration(#[from] QuadratureError),

    /// The inverse CDF could not be solved for one draw.
    #[error("sampling failed for probability {probability}: {reason}")]
    Sampling { probability: f64, reason: String },

    /// Statistics were requested on fewer than two values.
    #[error("insufficient data: need at least 2 values, got {count}")]
    InsufficientData { count: usize },
}

impl Error {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
