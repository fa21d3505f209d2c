//! Column allocation for composite formulations.
//!
//! A composite (group, cluster, series) lays its children out side by side:
//! child `j` owns a contiguous [`ColumnRange`] of the composite's columns.
//! Ranges are handed out by a [`ColumnAllocator`] once, at construction time,
//! and stored in a [`BlockLayout`]. Every later query is an explicit copy or
//! shift through the stored range.
//!
//! ```text
//!            child 0        child 1           child 2
//! columns: [ 0 .. 7 )    [ 7 .. 14 )     [ 14 .. 18 )
//!
//! child 1 row [lb, a, b, c, d, e, f, g, ub] projected into width 18:
//! [lb, 0 x7, a, b, c, d, e, f, g, 0 x4, ub]
//! ```

use serde::{Deserialize, Serialize};

use crate::row::{self, Row};

/// Half-open range `[start, end)` of columns owned by one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRange {
    start: usize,
    end: usize,
}

impl ColumnRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, column: usize) -> bool {
        (self.start..self.end).contains(&column)
    }

    /// Translate a child-local column index to the parent's index space.
    #[inline]
    pub fn global(&self, local: usize) -> usize {
        self.start + local
    }

    /// Re-project a child row into a parent of `width` columns.
    ///
    /// The child's coefficients are copied into this range of a zeroed row;
    /// the bounds are carried over unchanged.
    ///
    /// ```
    /// use gridlp_core::layout::ColumnRange;
    ///
    /// let range = ColumnRange::new(2, 4);
    /// let row = range.project(&[0.0, 1.0, -1.0, 5.0], 5);
    /// assert_eq!(row, vec![0.0, 0.0, 0.0, 1.0, -1.0, 0.0, 5.0]);
    /// ```
    pub fn project(&self, child_row: &[f64], width: usize) -> Row {
        debug_assert_eq!(child_row.len(), self.len() + 2);
        debug_assert!(self.end <= width);
        let mut projected = vec![0.0; width + 2];
        projected[0] = row::lower(child_row);
        projected[width + 1] = row::upper(child_row);
        projected[1 + self.start..1 + self.end].copy_from_slice(row::coefficients(child_row));
        projected
    }

    /// Shift child-local weighted columns into the parent's index space.
    pub fn relocate(&self, terms: Vec<WeightedColumn>) -> Vec<WeightedColumn> {
        terms
            .into_iter()
            .map(|term| WeightedColumn::new(self.global(term.column), term.weight))
            .collect()
    }
}

/// A column index paired with the coefficient it contributes to a physical
/// quantity (real power, reserved capacity, stored energy).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedColumn {
    pub column: usize,
    pub weight: f64,
}

impl WeightedColumn {
    pub const fn new(column: usize, weight: f64) -> Self {
        Self { column, weight }
    }
}

/// Column indices of a list of weighted columns.
pub fn columns_of(terms: &[WeightedColumn]) -> Vec<usize> {
    terms.iter().map(|term| term.column).collect()
}

/// Build a row of `width` columns from weighted columns.
///
/// Weights landing on the same column are summed.
pub fn weighted_row(width: usize, terms: &[WeightedColumn], lower: f64, upper: f64) -> Row {
    let mut coefficients = vec![0.0; width];
    for term in terms {
        coefficients[term.column] += term.weight;
    }
    row::bounded(coefficients, lower, upper)
}

/// Sequential column counter.
#[derive(Debug, Default)]
pub struct ColumnAllocator {
    next: usize,
}

impl ColumnAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next `len` columns.
    pub fn allocate(&mut self, len: usize) -> ColumnRange {
        let range = ColumnRange::new(self.next, self.next + len);
        self.next = range.end;
        range
    }

    /// Total number of columns handed out so far.
    pub fn allocated(&self) -> usize {
        self.next
    }
}

/// Column ranges of every child of a composite plus its total width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockLayout {
    ranges: Vec<ColumnRange>,
    width: usize,
}

impl BlockLayout {
    /// Allocate one range per child size, in order.
    pub fn from_sizes(sizes: impl IntoIterator<Item = usize>) -> Self {
        let mut allocator = ColumnAllocator::new();
        let ranges = sizes
            .into_iter()
            .map(|size| allocator.allocate(size))
            .collect();
        Self {
            ranges,
            width: allocator.allocated(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn ranges(&self) -> &[ColumnRange] {
        &self.ranges
    }

    pub fn range(&self, child: usize) -> Option<ColumnRange> {
        self.ranges.get(child).copied()
    }

    /// Project every row of one child into this layout's width.
    pub fn project_rows(&self, child: usize, rows: &[Row]) -> Vec<Row> {
        let range = self.ranges[child];
        rows.iter()
            .map(|row| range.project(row, self.width))
            .collect()
    }
}
