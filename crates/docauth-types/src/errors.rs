//! # Error Types
//!
//! Invariant violations detected while building model values.

use thiserror::Error;

/// Errors raised when a model value would break one of its invariants.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// Both sides of a cross-match name the same evidence source.
    #[error("cross-match for field '{field}' compares a source with itself")]
    SelfCrossMatch { field: String },

    /// A confidence score outside `[0.0, 1.0]` (or NaN).
    #[error("confidence {0} is outside [0.0, 1.0]")]
    ConfidenceOutOfRange(f64),
}
