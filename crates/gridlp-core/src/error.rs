//! Error types for formulation building.
//!
//! Every fallible operation in this crate returns [`FormulationResult`]. Errors
//! are raised only for malformed input: a constraint row of the wrong width,
//! a negative capacity, an empty or non-finite critical-point list. Feasibility
//! of the resulting program is never checked here; that is the solver's job.
//!
//! Identity lookups that find the wrong number of matches (a linked bus that
//! does not appear in exactly two groups, a battery without one stored-energy
//! column per stage) are not errors. Those builders return no rows and log a
//! warning instead.

use thiserror::Error;

/// Errors raised while building or extending a formulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulationError {
    /// A caller-supplied constraint row does not match the column count.
    ///
    /// The whole batch containing the row is rejected.
    #[error("constraint row {index} has length {actual}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        actual: usize,
        expected: usize,
    },

    /// A declared capacity or limit is negative or not finite.
    #[error("invalid {name}: {value} (must be finite and non-negative)")]
    InvalidCapacity { name: &'static str, value: f64 },

    /// A segment model needs at least one critical point.
    #[error("segment model requires at least one critical point, got {actual}")]
    InsufficientCriticalPoints { actual: usize },

    /// A critical point holds NaN or an infinite value.
    #[error("critical point {index} is not finite")]
    NonFiniteCriticalPoint { index: usize },
}

/// Convenience type alias for formulation results.
pub type FormulationResult<T> = Result<T, FormulationError>;

impl FormulationError {
    /// Validate a declared capacity, returning it unchanged when usable.
    pub(crate) fn check_capacity(name: &'static str, value: f64) -> FormulationResult<f64> {
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(FormulationError::InvalidCapacity { name, value })
        }
    }
}
