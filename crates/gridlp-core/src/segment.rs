//! Piecewise-linear segment model.
//!
//! A cost curve is given by `k` critical points `(value, cost)`. The model
//! represents an operating point as a convex combination of two *adjacent*
//! points, selected by binary segment columns.
//!
//! # Columns
//!
//! | Index | Count | Meaning | Bounds | Integer |
//! |-------|-------|---------|--------|---------|
//! | `0..k` | `k` | interpolation weight of point `i` | `[0, 1]` or `[0, inf)` | no |
//! | `k..2k-1` | `k-1` | segment `j` active (between points `j` and `j+1`) | `[0, 1]` | yes |
//!
//! # Rows
//!
//! For `k >= 2`:
//!
//! - `k` partition rows: `w_i - b_{i-1} - b_i <= 0` (missing neighbours dropped),
//!   so a point carries weight only if a segment touching it is active;
//! - one interpolation row: `sum(w_i) == 1`;
//! - one activation row: `sum(b_j) == 1`.
//!
//! A single point has no segments. Its model is one column pinned to `1` by
//! the interpolation row; partition and activation rows are omitted.

use serde::{Deserialize, Serialize};

use crate::error::{FormulationError, FormulationResult};
use crate::layout::WeightedColumn;
use crate::row::{self, Bound, Row};

/// One breakpoint of a piecewise cost curve.
///
/// `value` is the physical quantity (kW, signed: negative for absorption),
/// `cost` the cost incurred at that operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalPoint {
    pub value: f64,
    pub cost: f64,
}

impl CriticalPoint {
    pub const fn new(value: f64, cost: f64) -> Self {
        Self { value, cost }
    }

    fn is_finite(&self) -> bool {
        self.value.is_finite() && self.cost.is_finite()
    }
}

/// Upper bound applied to the interpolation columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowBounds {
    /// `[0, 1]`, implied by the interpolation row anyway.
    #[default]
    UnitInterval,
    /// `[0, inf)`, left to the interpolation row.
    NonNegative,
}

/// Sorted critical points and the rows that tie them together.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentModel {
    points: Vec<CriticalPoint>,
    flow_bounds: FlowBounds,
}

impl SegmentModel {
    /// Build a model from unsorted critical points.
    ///
    /// Points are sorted by value (stable, so ties keep their order). Fails on
    /// an empty list or a non-finite point.
    pub fn new(mut points: Vec<CriticalPoint>) -> FormulationResult<Self> {
        if points.is_empty() {
            return Err(FormulationError::InsufficientCriticalPoints { actual: 0 });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(FormulationError::NonFiniteCriticalPoint { index });
        }
        points.sort_by(|a, b| a.value.total_cmp(&b.value));
        Ok(Self {
            points,
            flow_bounds: FlowBounds::default(),
        })
    }

    pub fn with_flow_bounds(mut self, flow_bounds: FlowBounds) -> Self {
        self.flow_bounds = flow_bounds;
        self
    }

    pub fn points(&self) -> &[CriticalPoint] {
        &self.points
    }

    /// Number of critical points `k`.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of binary segment columns, `k - 1`.
    pub fn segment_count(&self) -> usize {
        self.len() - 1
    }

    /// `2k - 1`.
    pub fn column_size(&self) -> usize {
        self.len() + self.segment_count()
    }

    /// Interpolation columns weighted by their point's value.
    pub fn value_terms(&self) -> Vec<WeightedColumn> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| WeightedColumn::new(i, p.value))
            .collect()
    }

    pub fn cost_coefficients(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.cost)
            .chain(std::iter::repeat(0.0).take(self.segment_count()))
            .collect()
    }

    pub fn bounds(&self) -> Vec<Bound> {
        let flow_upper = match self.flow_bounds {
            FlowBounds::UnitInterval => 1.0,
            FlowBounds::NonNegative => f64::INFINITY,
        };
        std::iter::repeat((0.0, flow_upper))
            .take(self.len())
            .chain(std::iter::repeat((0.0, 1.0)).take(self.segment_count()))
            .collect()
    }

    pub fn integrality(&self) -> Vec<i32> {
        std::iter::repeat(0)
            .take(self.len())
            .chain(std::iter::repeat(1).take(self.segment_count()))
            .collect()
    }

    /// All segment rows at the model's own width.
    pub fn constraints(&self) -> Vec<Row> {
        self.constraints_in(self.column_size())
    }

    /// All segment rows, padded with zeros to `width` columns.
    ///
    /// Units that append capacity or energy columns after the segment block
    /// use this to get rows of their full width.
    pub fn constraints_in(&self, width: usize) -> Vec<Row> {
        debug_assert!(width >= self.column_size());
        let mut rows = self.partition_rows(width);
        rows.push(self.interpolation_row(width));
        if let Some(activation) = self.activation_row(width) {
            rows.push(activation);
        }
        rows
    }

    /// One row per point: the point's weight may be positive only if an
    /// adjacent segment is active. Empty for a single point.
    pub fn partition_rows(&self, width: usize) -> Vec<Row> {
        let k = self.len();
        if k < 2 {
            return Vec::new();
        }
        (0..k)
            .map(|i| {
                let mut coefficients = vec![0.0; width];
                coefficients[i] = 1.0;
                if i < k - 1 {
                    coefficients[k + i] = -1.0;
                }
                if i > 0 {
                    coefficients[k + i - 1] = -1.0;
                }
                row::bounded(coefficients, f64::NEG_INFINITY, 0.0)
            })
            .collect()
    }

    /// Interpolation weights sum to one.
    pub fn interpolation_row(&self, width: usize) -> Row {
        let mut coefficients = vec![0.0; width];
        coefficients[..self.len()].fill(1.0);
        row::bounded(coefficients, 1.0, 1.0)
    }

    /// Exactly one segment is active. `None` for a single point.
    pub fn activation_row(&self, width: usize) -> Option<Row> {
        if self.segment_count() == 0 {
            return None;
        }
        let mut coefficients = vec![0.0; width];
        coefficients[self.len()..self.column_size()].fill(1.0);
        Some(row::bounded(coefficients, 1.0, 1.0))
    }
}
