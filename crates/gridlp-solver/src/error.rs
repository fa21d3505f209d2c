//! Solver adapter errors.

use gridlp_core::FormulationError;
use good_lp::ResolutionError;
use thiserror::Error;

use crate::config::Backend;

/// Result type for solver adapter operations.
pub type SolverResult<T> = std::result::Result<T, SolverError>;

#[derive(Debug, Error)]
pub enum SolverError {
    /// The problem has no feasible point.
    #[error("problem is infeasible")]
    Infeasible,

    /// The objective is unbounded below.
    #[error("problem is unbounded")]
    Unbounded,

    /// The backend cannot branch on integer columns.
    #[error("{backend} cannot enforce {integer_columns} integer column(s); use the highs backend or relax integrality")]
    IntegralityUnsupported {
        backend: Backend,
        integer_columns: usize,
    },

    /// The backend was not compiled in.
    #[error("solver backend '{0}' is not available in this build")]
    BackendUnavailable(String),

    /// Any other failure reported by the backend.
    #[error("solver failed: {0}")]
    Backend(String),

    /// The formulation itself is malformed.
    #[error(transparent)]
    Formulation(#[from] FormulationError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ResolutionError> for SolverError {
    fn from(e: ResolutionError) -> Self {
        match e {
            ResolutionError::Infeasible => SolverError::Infeasible,
            ResolutionError::Unbounded => SolverError::Unbounded,
            other => SolverError::Backend(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for SolverError {
    fn from(e: toml::de::Error) -> Self {
        SolverError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for SolverError {
    fn from(e: toml::ser::Error) -> Self {
        SolverError::Config(e.to_string())
    }
}
