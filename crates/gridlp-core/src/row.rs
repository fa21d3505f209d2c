//! Bounded constraint rows.
//!
//! A row over `N` columns is stored as a flat vector of length `N + 2`:
//!
//! ```text
//! [ lower, c_1, c_2, ..., c_N, upper ]
//! ```
//!
//! and encodes `lower <= sum(c_j * x_j) <= upper`. Unbounded sides use
//! `f64::NEG_INFINITY` / `f64::INFINITY`; equalities use `lower == upper`.

use crate::error::{FormulationError, FormulationResult};

/// A constraint row in `[lower, coefficients.., upper]` layout.
pub type Row = Vec<f64>;

/// Column bound `(lower, upper)`.
pub type Bound = (f64, f64);

/// Lower bound of a row.
#[inline]
pub fn lower(row: &[f64]) -> f64 {
    row[0]
}

/// Upper bound of a row.
#[inline]
pub fn upper(row: &[f64]) -> f64 {
    row[row.len() - 1]
}

/// Coefficient slice of a row, without its bounds.
#[inline]
pub fn coefficients(row: &[f64]) -> &[f64] {
    &row[1..row.len() - 1]
}

/// Wrap a coefficient vector with its bounds.
pub fn bounded(coefficients: Vec<f64>, lower: f64, upper: f64) -> Row {
    let mut row = Vec::with_capacity(coefficients.len() + 2);
    row.push(lower);
    row.extend(coefficients);
    row.push(upper);
    row
}

/// Check that every row has exactly `column_size + 2` entries.
pub fn check_widths(rows: &[Row], column_size: usize) -> FormulationResult<()> {
    let expected = column_size + 2;
    match rows.iter().position(|row| row.len() != expected) {
        Some(index) => Err(FormulationError::DimensionMismatch {
            index,
            actual: rows[index].len(),
            expected,
        }),
        None => Ok(()),
    }
}

/// Append-only list of caller-supplied rows.
///
/// Each level of the hierarchy keeps one of these for the constraints added
/// through `new_constraint`. A batch is appended only if every row in it has
/// the right width; otherwise nothing changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSet {
    rows: Vec<Row>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a batch of rows.
    pub fn append(&mut self, column_size: usize, batch: Vec<Row>) -> FormulationResult<()> {
        check_widths(&batch, column_size)?;
        self.rows.extend(batch);
        Ok(())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
