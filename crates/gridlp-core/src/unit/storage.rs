use super::{EnergyStorage, PiecewiseUnit, Pid, UnitModel};
use crate::contract::{Formulation, LinearProgram, MipLinearProgram};
use crate::error::{FormulationError, FormulationResult};
use crate::layout::WeightedColumn;
use crate::row::{Bound, ConstraintSet, Row};
use crate::segment::{CriticalPoint, FlowBounds};

/// Piecewise asset with one extra stored-energy column.
///
/// The stored-energy column is the state of charge as a fraction in `[0, 1]`
/// of `energy_capacity`, so its energy scale is `energy_capacity`. It has no
/// cost and sits after the two capacity columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageUnit {
    base: PiecewiseUnit,
    energy_capacity: f64,
    constraints: ConstraintSet,
}

impl StorageUnit {
    pub fn new(
        pid: Pid,
        points: Vec<CriticalPoint>,
        positive_capacity: CriticalPoint,
        negative_capacity: CriticalPoint,
        energy_capacity: f64,
    ) -> FormulationResult<Self> {
        let energy_capacity =
            FormulationError::check_capacity("energy capacity", energy_capacity)?;
        let base = PiecewiseUnit::new(pid, points, positive_capacity, negative_capacity)?;
        Ok(Self {
            base,
            energy_capacity,
            constraints: ConstraintSet::new(),
        })
    }

    /// Bound the interpolation columns by `flow_bounds` instead of `[0, 1]`.
    pub fn with_flow_bounds(mut self, flow_bounds: FlowBounds) -> Self {
        self.base = self.base.with_flow_bounds(flow_bounds);
        self
    }

    /// The power-side model this unit extends.
    pub fn power_model(&self) -> &PiecewiseUnit {
        &self.base
    }

    fn energy_column(&self) -> usize {
        self.base.base_columns()
    }
}

impl LinearProgram for StorageUnit {
    fn cost_coefficients(&self) -> Vec<f64> {
        let mut costs = self.base.cost_coefficients();
        costs.push(0.0);
        costs
    }

    fn bounds(&self) -> Vec<Bound> {
        let mut bounds = self.base.bounds();
        bounds.push((0.0, 1.0));
        bounds
    }

    fn constraints(&self) -> Vec<Row> {
        let mut rows = self.base.base_rows(self.column_size());
        rows.extend_from_slice(self.constraints.rows());
        rows
    }
}

impl MipLinearProgram for StorageUnit {
    fn integrality(&self) -> Vec<i32> {
        let mut mask = self.base.integrality();
        mask.push(0);
        mask
    }
}

impl Formulation for StorageUnit {
    fn column_size(&self) -> usize {
        self.base.base_columns() + 1
    }

    fn new_constraint<I>(&mut self, rows: I) -> FormulationResult<()>
    where
        I: IntoIterator<Item = Row>,
    {
        let width = self.column_size();
        self.constraints.append(width, rows.into_iter().collect())
    }
}

impl UnitModel for StorageUnit {
    fn pid(&self) -> Pid {
        self.base.pid()
    }

    fn real_power_terms(&self) -> Vec<WeightedColumn> {
        self.base.real_power_terms()
    }

    fn positive_capacity_terms(&self) -> Vec<WeightedColumn> {
        self.base.positive_capacity_terms()
    }

    fn negative_capacity_terms(&self) -> Vec<WeightedColumn> {
        self.base.negative_capacity_terms()
    }

    fn critical_points(&self) -> Vec<CriticalPoint> {
        self.base.critical_points()
    }

    fn positive_capacity_constraint(&self) -> Row {
        self.base.positive_capacity_row(self.column_size())
    }

    fn negative_capacity_constraint(&self) -> Row {
        self.base.negative_capacity_row(self.column_size())
    }

    fn as_storage(&self) -> Option<&dyn EnergyStorage> {
        Some(self)
    }
}

impl EnergyStorage for StorageUnit {
    fn stored_energy_terms(&self) -> Vec<WeightedColumn> {
        vec![WeightedColumn::new(self.energy_column(), self.energy_capacity)]
    }

    fn stored_energy_capacity(&self) -> f64 {
        self.energy_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ess() -> StorageUnit {
        StorageUnit::new(
            Pid::new(),
            vec![
                CriticalPoint::new(-10.0, -1.0),
                CriticalPoint::new(0.0, 0.0),
                CriticalPoint::new(10.0, 1.0),
            ],
            CriticalPoint::new(10.0, 0.1),
            CriticalPoint::new(10.0, 0.1),
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn test_storage_appends_energy_column() {
        let u = ess();
        assert_eq!(u.column_size(), 8);
        assert_eq!(
            u.cost_coefficients(),
            vec![-1.0, 0.0, 1.0, 0.0, 0.0, 0.1, 0.1, 0.0]
        );
        assert_eq!(u.bounds().last(), Some(&(0.0, 1.0)));
        assert_eq!(u.integrality(), vec![0, 0, 0, 1, 1, 0, 0, 0]);
        assert_eq!(u.stored_energy_loc(), vec![7]);
        assert_eq!(u.stored_energy_terms()[0].weight, 100.0);
    }

    #[test]
    fn test_storage_rows_cover_energy_column() {
        let u = ess();
        let rows = u.constraints();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|row| row.len() == 10));
        // energy column never appears in the segment rows
        assert!(rows.iter().all(|row| row[8] == 0.0));

        let pos = u.positive_capacity_constraint();
        assert_eq!(pos.len(), 10);
        assert_eq!(pos[6], -10.0);
    }

    #[test]
    fn test_storage_flow_bounds_leave_energy_column_alone() {
        let u = ess().with_flow_bounds(FlowBounds::NonNegative);
        let bounds = u.bounds();
        assert_eq!(bounds[0], (0.0, f64::INFINITY));
        assert_eq!(bounds[3], (0.0, 1.0));
        assert_eq!(bounds[7], (0.0, 1.0));
    }

    #[test]
    fn test_negative_energy_capacity_is_rejected() {
        let err = StorageUnit::new(
            Pid::new(),
            vec![CriticalPoint::new(0.0, 0.0)],
            CriticalPoint::new(1.0, 0.0),
            CriticalPoint::new(1.0, 0.0),
            -5.0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            FormulationError::InvalidCapacity {
                name: "energy capacity",
                value: -5.0
            }
        );
    }
}
