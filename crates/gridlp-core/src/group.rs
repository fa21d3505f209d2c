//! Groups: units on one bus, laid out block-diagonally.
//!
//! A group concatenates its units' columns in order and re-projects each
//! unit's rows into the group's width. Bus-level rows (net load, group
//! reserve) are built from the units' weighted locations.

use tracing::debug;

use crate::contract::{Formulation, LinearProgram, MipLinearProgram, Sequencer};
use crate::error::FormulationResult;
use crate::layout::{columns_of, weighted_row, BlockLayout, WeightedColumn};
use crate::row::{Bound, ConstraintSet, Row};
use crate::segment::CriticalPoint;
use crate::unit::{Pid, Unit, UnitModel};

/// Ordered collection of units sharing a bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    units: Vec<Unit>,
    layout: BlockLayout,
    constraints: ConstraintSet,
}

impl Group {
    pub fn new<I, U>(units: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<Unit>,
    {
        let units: Vec<Unit> = units.into_iter().map(Into::into).collect();
        let layout = BlockLayout::from_sizes(units.iter().map(Formulation::column_size));
        debug!(units = units.len(), columns = layout.width(), "built group");
        Self {
            units,
            layout,
            constraints: ConstraintSet::new(),
        }
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Number of units carrying identity `pid`.
    pub fn unit_count_pid(&self, pid: Pid) -> usize {
        self.units.iter().filter(|u| u.pid() == pid).count()
    }

    /// Collect a per-unit query across all units, shifted to group columns.
    fn collect_terms<F>(&self, mut select: F) -> Vec<WeightedColumn>
    where
        F: FnMut(&Unit) -> Vec<WeightedColumn>,
    {
        self.units
            .iter()
            .zip(self.layout.ranges())
            .flat_map(|(unit, range)| range.relocate(select(unit)))
            .collect()
    }

    pub fn real_power_terms(&self) -> Vec<WeightedColumn> {
        self.collect_terms(|u| u.real_power_terms())
    }

    pub fn positive_capacity_terms(&self) -> Vec<WeightedColumn> {
        self.collect_terms(|u| u.positive_capacity_terms())
    }

    pub fn negative_capacity_terms(&self) -> Vec<WeightedColumn> {
        self.collect_terms(|u| u.negative_capacity_terms())
    }

    pub fn stored_energy_terms(&self) -> Vec<WeightedColumn> {
        self.collect_terms(|u| {
            u.as_storage()
                .map(|s| s.stored_energy_terms())
                .unwrap_or_default()
        })
    }

    pub fn real_power_loc(&self) -> Vec<usize> {
        columns_of(&self.real_power_terms())
    }

    pub fn real_positive_capacity_loc(&self) -> Vec<usize> {
        columns_of(&self.positive_capacity_terms())
    }

    pub fn real_negative_capacity_loc(&self) -> Vec<usize> {
        columns_of(&self.negative_capacity_terms())
    }

    pub fn stored_energy_loc(&self) -> Vec<usize> {
        columns_of(&self.stored_energy_terms())
    }

    /// Critical points of every unit with identity `pid`, in unit order.
    pub fn critical_points_pid(&self, pid: Pid) -> Vec<CriticalPoint> {
        self.units
            .iter()
            .filter(|u| u.pid() == pid)
            .flat_map(|u| u.critical_points())
            .collect()
    }

    /// Weighted real power of all units equals `net_load`.
    pub fn net_load_constraint(&self, net_load: f64) -> Row {
        weighted_row(
            self.column_size(),
            &self.real_power_terms(),
            net_load,
            net_load,
        )
    }

    /// Reserved positive capacity of all units is at least `target`.
    pub fn positive_capacity_constraint(&self, target: f64) -> Row {
        weighted_row(
            self.column_size(),
            &self.positive_capacity_terms(),
            target,
            f64::INFINITY,
        )
    }

    /// Reserved negative capacity of all units is at least `target`.
    pub fn negative_capacity_constraint(&self, target: f64) -> Row {
        weighted_row(
            self.column_size(),
            &self.negative_capacity_terms(),
            target,
            f64::INFINITY,
        )
    }
}

impl LinearProgram for Group {
    fn cost_coefficients(&self) -> Vec<f64> {
        self.units.iter().flat_map(|u| u.cost_coefficients()).collect()
    }

    fn bounds(&self) -> Vec<Bound> {
        self.units.iter().flat_map(|u| u.bounds()).collect()
    }

    fn constraints(&self) -> Vec<Row> {
        let mut rows: Vec<Row> = self
            .units
            .iter()
            .enumerate()
            .flat_map(|(i, u)| self.layout.project_rows(i, &u.constraints()))
            .collect();
        rows.extend_from_slice(self.constraints.rows());
        rows
    }
}

impl MipLinearProgram for Group {
    fn integrality(&self) -> Vec<i32> {
        self.units.iter().flat_map(|u| u.integrality()).collect()
    }
}

impl Formulation for Group {
    fn column_size(&self) -> usize {
        self.layout.width()
    }

    fn new_constraint<I>(&mut self, rows: I) -> FormulationResult<()>
    where
        I: IntoIterator<Item = Row>,
    {
        let width = self.column_size();
        self.constraints.append(width, rows.into_iter().collect())
    }
}

impl Sequencer for Group {
    fn real_power_pid_terms(&self, pid: Pid) -> Vec<WeightedColumn> {
        self.collect_terms(|u| {
            if u.pid() == pid {
                u.real_power_terms()
            } else {
                Vec::new()
            }
        })
    }

    fn stored_energy_pid_terms(&self, pid: Pid) -> Vec<WeightedColumn> {
        self.collect_terms(|u| match u.as_storage() {
            Some(storage) if u.pid() == pid => storage.stored_energy_terms(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{BasicCosts, BasicLimits, BasicUnit, PiecewiseUnit};
    use crate::FormulationError;

    fn piecewise(pid: Pid, points: [(f64, f64); 3]) -> PiecewiseUnit {
        PiecewiseUnit::new(
            pid,
            points
                .iter()
                .map(|&(v, c)| CriticalPoint::new(v, c))
                .collect(),
            CriticalPoint::new(10.0, 0.0),
            CriticalPoint::new(10.0, 0.0),
        )
        .unwrap()
    }

    fn two_unit_group() -> (Group, Pid, Pid) {
        let (p1, p2) = (Pid::new(), Pid::new());
        let a1 = piecewise(p1, [(-10.0, -1.0), (0.0, 0.0), (10.0, 1.0)]);
        let a2 = piecewise(p2, [(0.0, 0.0), (5.0, 1.0), (15.0, 2.0)]);
        (Group::new([a1, a2]), p1, p2)
    }

    #[test]
    fn test_group_concatenates_columns() {
        let (g, _, _) = two_unit_group();
        assert_eq!(g.column_size(), 14);
        assert_eq!(g.bounds(), vec![(0.0, 1.0); 14]);
        assert_eq!(g.cost_coefficients().len(), 14);
        assert_eq!(
            g.integrality(),
            vec![0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 1, 1, 0, 0]
        );
    }

    #[test]
    fn test_group_projects_unit_rows() {
        let (g, _, _) = two_unit_group();
        let rows = g.constraints();
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|row| row.len() == 16));
        // second unit's rows leave the first block untouched
        assert!(rows[5..].iter().all(|row| row[1..8].iter().all(|&c| c == 0.0)));
    }

    #[test]
    fn test_group_locations() {
        let (g, p1, p2) = two_unit_group();
        assert_eq!(g.real_power_loc(), vec![0, 1, 2, 7, 8, 9]);
        assert_eq!(g.real_positive_capacity_loc(), vec![5, 12]);
        assert_eq!(g.real_negative_capacity_loc(), vec![6, 13]);
        assert_eq!(g.real_power_pid_loc(p2), vec![7, 8, 9]);
        assert_eq!(g.real_power_pid_loc(p1), vec![0, 1, 2]);
        assert!(g.stored_energy_pid_loc(p1).is_empty());
        assert!(g.real_power_pid_loc(Pid::new()).is_empty());
    }

    #[test]
    fn test_net_load_constraint() {
        let (g, _, _) = two_unit_group();
        assert_eq!(
            g.net_load_constraint(7.0),
            vec![
                7.0, -10.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 15.0, 0.0, 0.0, 0.0, 0.0,
                7.0
            ]
        );
    }

    #[test]
    fn test_group_capacity_constraints() {
        let (g, _, _) = two_unit_group();
        let inf = f64::INFINITY;
        assert_eq!(
            g.positive_capacity_constraint(3.0),
            vec![3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 0.0, inf]
        );
        assert_eq!(
            g.negative_capacity_constraint(4.0),
            vec![4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, inf]
        );
    }

    #[test]
    fn test_group_constraint_is_atomic() {
        let (mut g, _, _) = two_unit_group();
        let before = g.constraints().len();
        let err = g
            .new_constraint(vec![g.net_load_constraint(1.0), vec![0.0; 5]])
            .unwrap_err();
        assert_eq!(
            err,
            FormulationError::DimensionMismatch {
                index: 1,
                actual: 5,
                expected: 16
            }
        );
        assert_eq!(g.constraints().len(), before);

        let row = g.net_load_constraint(1.0);
        g.new_constraint([row]).unwrap();
        assert_eq!(g.constraints().len(), before + 1);
    }

    #[test]
    fn test_group_stored_energy_from_basic_unit() {
        let pid = Pid::new();
        let basic = BasicUnit::new(pid, BasicCosts::default(), BasicLimits::new(1.0, 1.0, 1.0, 1.0))
            .unwrap();
        let g = Group::new([
            Unit::from(piecewise(Pid::new(), [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])),
            Unit::from(basic),
        ]);
        assert_eq!(g.stored_energy_loc(), vec![10]);
        assert_eq!(g.stored_energy_pid_loc(pid), vec![10]);
    }

    #[test]
    fn test_critical_points_pid() {
        let (g, p1, _) = two_unit_group();
        let values: Vec<f64> = g.critical_points_pid(p1).iter().map(|p| p.value).collect();
        assert_eq!(values, vec![-10.0, 0.0, 10.0]);
    }
}
