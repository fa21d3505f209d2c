//! Primal solutions returned by the adapters.

use gridlp_core::WeightedColumn;
use serde::{Deserialize, Serialize};

use crate::config::Backend;

/// Status of a successful solve.
///
/// Failures (infeasible, unbounded, backend errors) come back as
/// [`crate::SolverError`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    /// Optimal for the problem as given.
    Optimal,
    /// Optimal for the LP relaxation; integer columns may be fractional.
    Relaxed,
}

impl SolutionStatus {
    /// Whether the solution honours the integrality mask.
    pub fn is_exact(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Relaxed => write!(f, "optimal (LP relaxation)"),
        }
    }
}

/// Column-aligned primal vector plus solve metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub status: SolutionStatus,
    pub backend: Backend,
    /// `sum(cost_j * x_j)` at the returned point.
    pub objective: f64,
    /// One value per formulation column.
    pub values: Vec<f64>,
    pub solve_time_ms: u64,
}

impl Solution {
    pub fn value(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied()
    }

    /// Values of the given columns, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any column is not below `values.len()`. Columns taken from
    /// the solved formulation's own locations are always in range; use
    /// [`Solution::value`] for unchecked indices.
    pub fn values_at(&self, columns: &[usize]) -> Vec<f64> {
        columns.iter().map(|&c| self.values[c]).collect()
    }

    /// `sum(weight * x_column)`: the physical quantity behind a set of
    /// weighted columns (real power, reserved capacity, stored energy).
    ///
    /// # Panics
    ///
    /// Panics if any term's column is not below `values.len()`, like
    /// [`Solution::values_at`].
    pub fn weighted_sum(&self, terms: &[WeightedColumn]) -> f64 {
        terms
            .iter()
            .map(|t| t.weight * self.values[t.column])
            .sum()
    }
}
