//! The formulation contract consumed by solver adapters.
//!
//! Every level of the hierarchy exposes the same tuple:
//!
//! | Part | Shape | Meaning |
//! |------|-------|---------|
//! | cost coefficients | `N` | minimised objective weights |
//! | bounds | `N` pairs | `(lower, upper)` per column |
//! | constraints | `M` rows of `N + 2` | `[lower, c_1..c_N, upper]` |
//! | integrality | `N` | `1` = integer column, `0` = continuous |
//!
//! The column order is shared by all four parts, so a solver's primal
//! vector maps back onto the hierarchy by index.

use serde::{Deserialize, Serialize};

use crate::error::FormulationResult;
use crate::layout::{columns_of, WeightedColumn};
use crate::row::{self, Bound, Row};
use crate::unit::Pid;

/// Linear program in `min c'x  s.t. lb <= Ax <= ub, lo <= x <= hi` form.
pub trait LinearProgram {
    fn cost_coefficients(&self) -> Vec<f64>;
    fn bounds(&self) -> Vec<Bound>;
    fn constraints(&self) -> Vec<Row>;
}

/// Linear program with an integrality mask.
pub trait MipLinearProgram: LinearProgram {
    fn integrality(&self) -> Vec<i32>;
}

/// A building block with a fixed column count that accepts extra rows.
pub trait Formulation: MipLinearProgram {
    /// Number of columns `N`.
    fn column_size(&self) -> usize;

    /// Append caller-supplied rows.
    ///
    /// Every row must have `column_size() + 2` entries. If any row does not,
    /// the whole batch is rejected and the formulation is left unchanged.
    fn new_constraint<I>(&mut self, rows: I) -> FormulationResult<()>
    where
        I: IntoIterator<Item = Row>,
        Self: Sized;

    /// Consuming form of [`Formulation::new_constraint`].
    fn with_constraint<I>(mut self, rows: I) -> FormulationResult<Self>
    where
        I: IntoIterator<Item = Row>,
        Self: Sized,
    {
        self.new_constraint(rows)?;
        Ok(self)
    }
}

/// A formulation that can stand as one stage of a [`crate::Series`].
///
/// Stages answer identity queries in their own column space; the series
/// shifts the answers by each stage's offset.
pub trait Sequencer: Formulation {
    /// Weighted real-power columns of every unit with identity `pid`.
    fn real_power_pid_terms(&self, pid: Pid) -> Vec<WeightedColumn>;

    /// Weighted stored-energy columns of every storage-capable unit with
    /// identity `pid`.
    fn stored_energy_pid_terms(&self, pid: Pid) -> Vec<WeightedColumn>;

    fn real_power_pid_loc(&self, pid: Pid) -> Vec<usize> {
        columns_of(&self.real_power_pid_terms(pid))
    }

    fn stored_energy_pid_loc(&self, pid: Pid) -> Vec<usize> {
        columns_of(&self.stored_energy_pid_terms(pid))
    }
}

/// Owned snapshot of a flattened formulation.
///
/// This is what gets written to disk by the CLI and what solver adapters work
/// from internally. Infinite bounds survive a TOML round trip (`inf`/`-inf`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDescription {
    pub cost_coefficients: Vec<f64>,
    pub bounds: Vec<Bound>,
    pub constraints: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrality: Option<Vec<i32>>,
}

impl ProblemDescription {
    /// Snapshot a pure LP.
    pub fn from_lp<P: LinearProgram + ?Sized>(program: &P) -> Self {
        Self {
            cost_coefficients: program.cost_coefficients(),
            bounds: program.bounds(),
            constraints: program.constraints(),
            integrality: None,
        }
    }

    /// Snapshot a MIP, keeping its integrality mask.
    pub fn from_mip<P: MipLinearProgram + ?Sized>(program: &P) -> Self {
        Self {
            integrality: Some(program.integrality()),
            ..Self::from_lp(program)
        }
    }

    pub fn num_columns(&self) -> usize {
        self.cost_coefficients.len()
    }

    pub fn num_rows(&self) -> usize {
        self.constraints.len()
    }

    /// Number of columns flagged integer.
    pub fn num_integer(&self) -> usize {
        self.integrality
            .as_ref()
            .map_or(0, |mask| mask.iter().filter(|&&flag| flag != 0).count())
    }

    pub fn is_mip(&self) -> bool {
        self.num_integer() > 0
    }

    pub fn is_integer(&self, column: usize) -> bool {
        self.integrality
            .as_ref()
            .and_then(|mask| mask.get(column))
            .is_some_and(|&flag| flag != 0)
    }

    /// Check that bounds, rows and mask all agree on the column count.
    pub fn validate(&self) -> FormulationResult<()> {
        let n = self.num_columns();
        if self.bounds.len() != n {
            return Err(crate::FormulationError::DimensionMismatch {
                index: 0,
                actual: self.bounds.len(),
                expected: n,
            });
        }
        if let Some(mask) = &self.integrality {
            if mask.len() != n {
                return Err(crate::FormulationError::DimensionMismatch {
                    index: 0,
                    actual: mask.len(),
                    expected: n,
                });
            }
        }
        row::check_widths(&self.constraints, n)
    }
}

impl LinearProgram for ProblemDescription {
    fn cost_coefficients(&self) -> Vec<f64> {
        self.cost_coefficients.clone()
    }

    fn bounds(&self) -> Vec<Bound> {
        self.bounds.clone()
    }

    fn constraints(&self) -> Vec<Row> {
        self.constraints.clone()
    }
}

impl MipLinearProgram for ProblemDescription {
    fn integrality(&self) -> Vec<i32> {
        self.integrality
            .clone()
            .unwrap_or_else(|| vec![0; self.num_columns()])
    }
}
