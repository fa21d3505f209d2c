use super::{Pid, UnitModel};
use crate::contract::{Formulation, LinearProgram, MipLinearProgram};
use crate::error::{FormulationError, FormulationResult};
use crate::layout::{weighted_row, WeightedColumn};
use crate::row::{Bound, ConstraintSet, Row};
use crate::segment::{CriticalPoint, FlowBounds, SegmentModel};

/// Asset with a piecewise-linear cost curve and reserved capacity.
///
/// Columns are the segment block (`2k - 1`) followed by a positive and a
/// negative capacity column. Capacity columns are fractions in `[0, 1]` of
/// the declared capacity, costed at the declared capacity's cost.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseUnit {
    pid: Pid,
    segments: SegmentModel,
    positive_capacity: CriticalPoint,
    negative_capacity: CriticalPoint,
    constraints: ConstraintSet,
}

impl PiecewiseUnit {
    /// Build a unit from its cost curve and declared capacities.
    ///
    /// `positive_capacity.value` and `negative_capacity.value` are magnitudes
    /// and must be non-negative.
    pub fn new(
        pid: Pid,
        points: Vec<CriticalPoint>,
        positive_capacity: CriticalPoint,
        negative_capacity: CriticalPoint,
    ) -> FormulationResult<Self> {
        FormulationError::check_capacity("positive capacity", positive_capacity.value)?;
        FormulationError::check_capacity("negative capacity", negative_capacity.value)?;
        let segments = SegmentModel::new(points)?;
        Ok(Self {
            pid,
            segments,
            positive_capacity,
            negative_capacity,
            constraints: ConstraintSet::new(),
        })
    }

    /// Bound the interpolation columns by `flow_bounds` instead of `[0, 1]`.
    pub fn with_flow_bounds(mut self, flow_bounds: FlowBounds) -> Self {
        self.segments = self.segments.with_flow_bounds(flow_bounds);
        self
    }

    pub fn segments(&self) -> &SegmentModel {
        &self.segments
    }

    pub fn positive_capacity(&self) -> CriticalPoint {
        self.positive_capacity
    }

    pub fn negative_capacity(&self) -> CriticalPoint {
        self.negative_capacity
    }

    fn positive_capacity_column(&self) -> usize {
        self.segments.column_size()
    }

    fn negative_capacity_column(&self) -> usize {
        self.segments.column_size() + 1
    }

    /// Columns owned by this unit, without any trailing extension.
    pub(super) fn base_columns(&self) -> usize {
        self.segments.column_size() + 2
    }

    /// Built-in rows padded to `width`.
    pub(super) fn base_rows(&self, width: usize) -> Vec<Row> {
        self.segments.constraints_in(width)
    }

    /// `sum(value_i * w_i) - cap * c_pos <= 0` over `width` columns.
    pub(super) fn positive_capacity_row(&self, width: usize) -> Row {
        let mut terms = self.real_power_terms();
        terms.push(WeightedColumn::new(
            self.positive_capacity_column(),
            -self.positive_capacity.value,
        ));
        weighted_row(width, &terms, f64::NEG_INFINITY, 0.0)
    }

    /// `sum(value_i * w_i) + cap * c_neg >= 0` over `width` columns.
    pub(super) fn negative_capacity_row(&self, width: usize) -> Row {
        let mut terms = self.real_power_terms();
        terms.push(WeightedColumn::new(
            self.negative_capacity_column(),
            self.negative_capacity.value,
        ));
        weighted_row(width, &terms, 0.0, f64::INFINITY)
    }
}

impl LinearProgram for PiecewiseUnit {
    fn cost_coefficients(&self) -> Vec<f64> {
        let mut costs = self.segments.cost_coefficients();
        costs.push(self.positive_capacity.cost);
        costs.push(self.negative_capacity.cost);
        costs
    }

    fn bounds(&self) -> Vec<Bound> {
        let mut bounds = self.segments.bounds();
        bounds.extend([(0.0, 1.0), (0.0, 1.0)]);
        bounds
    }

    fn constraints(&self) -> Vec<Row> {
        let mut rows = self.base_rows(self.column_size());
        rows.extend_from_slice(self.constraints.rows());
        rows
    }
}

impl MipLinearProgram for PiecewiseUnit {
    fn integrality(&self) -> Vec<i32> {
        let mut mask = self.segments.integrality();
        mask.extend([0, 0]);
        mask
    }
}

impl Formulation for PiecewiseUnit {
    fn column_size(&self) -> usize {
        self.base_columns()
    }

    fn new_constraint<I>(&mut self, rows: I) -> FormulationResult<()>
    where
        I: IntoIterator<Item = Row>,
    {
        let width = self.column_size();
        self.constraints.append(width, rows.into_iter().collect())
    }
}

impl UnitModel for PiecewiseUnit {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn real_power_terms(&self) -> Vec<WeightedColumn> {
        self.segments.value_terms()
    }

    fn positive_capacity_terms(&self) -> Vec<WeightedColumn> {
        vec![WeightedColumn::new(
            self.positive_capacity_column(),
            self.positive_capacity.value,
        )]
    }

    fn negative_capacity_terms(&self) -> Vec<WeightedColumn> {
        vec![WeightedColumn::new(
            self.negative_capacity_column(),
            self.negative_capacity.value,
        )]
    }

    fn critical_points(&self) -> Vec<CriticalPoint> {
        self.segments.points().to_vec()
    }

    fn positive_capacity_constraint(&self) -> Row {
        self.positive_capacity_row(self.column_size())
    }

    fn negative_capacity_constraint(&self) -> Row {
        self.negative_capacity_row(self.column_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> PiecewiseUnit {
        PiecewiseUnit::new(
            Pid::new(),
            vec![
                CriticalPoint::new(-10.0, -1.0),
                CriticalPoint::new(0.0, 0.0),
                CriticalPoint::new(10.0, 1.0),
            ],
            CriticalPoint::new(10.0, 1.1),
            CriticalPoint::new(10.0, 2.2),
        )
        .unwrap()
    }

    #[test]
    fn test_piecewise_cost_coefficients() {
        assert_eq!(
            unit().cost_coefficients(),
            vec![-1.0, 0.0, 1.0, 0.0, 0.0, 1.1, 2.2]
        );
    }

    #[test]
    fn test_piecewise_bounds_and_mask() {
        let u = unit();
        assert_eq!(u.bounds(), vec![(0.0, 1.0); 7]);
        assert_eq!(u.integrality(), vec![0, 0, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn test_piecewise_locations() {
        let u = unit();
        assert_eq!(u.real_power_loc(), vec![0, 1, 2]);
        assert_eq!(u.real_positive_capacity_loc(), vec![5]);
        assert_eq!(u.real_negative_capacity_loc(), vec![6]);
        assert!(u.as_storage().is_none());
    }

    #[test]
    fn test_piecewise_builtin_rows() {
        let u = unit();
        let rows = u.constraints();
        // k partition rows + interpolation + activation
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|row| row.len() == u.column_size() + 2));
    }

    #[test]
    fn test_piecewise_capacity_constraints() {
        let u = unit();
        let (inf, ninf) = (f64::INFINITY, f64::NEG_INFINITY);
        assert_eq!(
            u.positive_capacity_constraint(),
            vec![ninf, -10.0, 0.0, 10.0, 0.0, 0.0, -10.0, 0.0, 0.0]
        );
        assert_eq!(
            u.negative_capacity_constraint(),
            vec![0.0, -10.0, 0.0, 10.0, 0.0, 0.0, 0.0, 10.0, inf]
        );
    }

    #[test]
    fn test_non_negative_flow_bounds_only_touch_interpolation_columns() {
        let u = unit().with_flow_bounds(FlowBounds::NonNegative);
        let bounds = u.bounds();
        assert_eq!(bounds[..3], [(0.0, f64::INFINITY); 3]);
        assert_eq!(bounds[3..], [(0.0, 1.0); 4]);
        assert_eq!(u.column_size(), 7);
        assert_eq!(u.constraints(), unit().constraints());
    }

    #[test]
    fn test_negative_capacity_is_rejected() {
        let err = PiecewiseUnit::new(
            Pid::new(),
            vec![CriticalPoint::new(0.0, 0.0)],
            CriticalPoint::new(-1.0, 0.0),
            CriticalPoint::new(1.0, 0.0),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FormulationError::InvalidCapacity { name: "positive capacity", .. }
        ));
    }

    #[test]
    fn test_user_rows_follow_builtin_rows() {
        let mut u = unit();
        let extra = u.real_power_constraint(2.0);
        u.new_constraint([extra.clone()]).unwrap();
        assert_eq!(u.constraints().last(), Some(&extra));
    }
}
