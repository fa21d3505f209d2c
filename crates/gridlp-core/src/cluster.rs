//! Clusters: groups on different buses, tied together by shared assets.
//!
//! A cluster lays groups out block-diagonally, exactly as a group lays out
//! units. An asset that connects two buses appears as one unit in each
//! group, with the same [`Pid`]; [`Cluster::linked_bus_constraints`] ties the
//! two appearances together.

use tracing::{debug, warn};

use crate::contract::{Formulation, LinearProgram, MipLinearProgram, Sequencer};
use crate::error::FormulationResult;
use crate::group::Group;
use crate::layout::{weighted_row, BlockLayout, WeightedColumn};
use crate::row::{Bound, ConstraintSet, Row};
use crate::segment::CriticalPoint;
use crate::unit::Pid;

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    groups: Vec<Group>,
    layout: BlockLayout,
    constraints: ConstraintSet,
}

impl Cluster {
    pub fn new(groups: impl IntoIterator<Item = Group>) -> Self {
        let groups: Vec<Group> = groups.into_iter().collect();
        let layout = BlockLayout::from_sizes(groups.iter().map(Formulation::column_size));
        debug!(groups = groups.len(), columns = layout.width(), "built cluster");
        Self {
            groups,
            layout,
            constraints: ConstraintSet::new(),
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn collect_terms<F>(&self, mut select: F) -> Vec<WeightedColumn>
    where
        F: FnMut(&Group) -> Vec<WeightedColumn>,
    {
        self.groups
            .iter()
            .zip(self.layout.ranges())
            .flat_map(|(group, range)| range.relocate(select(group)))
            .collect()
    }

    /// Critical points of `pid` across every group, in group order.
    pub fn critical_points_pid(&self, pid: Pid) -> Vec<CriticalPoint> {
        self.groups
            .iter()
            .flat_map(|g| g.critical_points_pid(pid))
            .collect()
    }

    /// Tie the two appearances of a linking asset together.
    ///
    /// Emits one row `sum(w * p_first) - sum(w * p_second) == 0` when `pid`
    /// appears as exactly one unit in each of exactly two groups. Any other
    /// multiplicity yields no rows.
    pub fn linked_bus_constraints(&self, pid: Pid) -> Vec<Row> {
        let appearances: Vec<usize> = self
            .groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.unit_count_pid(pid) > 0)
            .map(|(i, _)| i)
            .collect();

        let [first, second] = appearances[..] else {
            warn!(
                %pid,
                groups = appearances.len(),
                "linked bus needs exactly two groups; no rows emitted"
            );
            return Vec::new();
        };
        if self.groups[first].unit_count_pid(pid) != 1
            || self.groups[second].unit_count_pid(pid) != 1
        {
            warn!(%pid, "linked bus unit repeated within a group; no rows emitted");
            return Vec::new();
        }

        let mut terms = self.group_terms(first, pid);
        terms.extend(
            self.group_terms(second, pid)
                .into_iter()
                .map(|t| WeightedColumn::new(t.column, -t.weight)),
        );
        vec![weighted_row(self.column_size(), &terms, 0.0, 0.0)]
    }

    fn group_terms(&self, group: usize, pid: Pid) -> Vec<WeightedColumn> {
        self.layout.ranges()[group].relocate(self.groups[group].real_power_pid_terms(pid))
    }
}

impl LinearProgram for Cluster {
    fn cost_coefficients(&self) -> Vec<f64> {
        self.groups.iter().flat_map(|g| g.cost_coefficients()).collect()
    }

    fn bounds(&self) -> Vec<Bound> {
        self.groups.iter().flat_map(|g| g.bounds()).collect()
    }

    fn constraints(&self) -> Vec<Row> {
        let mut rows: Vec<Row> = self
            .groups
            .iter()
            .enumerate()
            .flat_map(|(i, g)| self.layout.project_rows(i, &g.constraints()))
            .collect();
        rows.extend_from_slice(self.constraints.rows());
        rows
    }
}

impl MipLinearProgram for Cluster {
    fn integrality(&self) -> Vec<i32> {
        self.groups.iter().flat_map(|g| g.integrality()).collect()
    }
}

impl Formulation for Cluster {
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

impl Sequencer for Cluster {
    fn real_power_pid_terms(&self, pid: Pid) -> Vec<WeightedColumn> {
        self.collect_terms(|g| g.real_power_pid_terms(pid))
    }

    fn stored_energy_pid_terms(&self, pid: Pid) -> Vec<WeightedColumn> {
        self.collect_terms(|g| g.stored_energy_pid_terms(pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{PiecewiseUnit, StorageUnit};

    fn points(values: [f64; 3]) -> Vec<CriticalPoint> {
        values.iter().map(|&v| CriticalPoint::new(v, v / 10.0)).collect()
    }

    fn piecewise(pid: Pid, values: [f64; 3]) -> PiecewiseUnit {
        PiecewiseUnit::new(
            pid,
            points(values),
            CriticalPoint::new(10.0, 0.0),
            CriticalPoint::new(10.0, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_cluster_concatenates_groups() {
        let g1 = Group::new([piecewise(Pid::new(), [-10.0, 0.0, 10.0])]);
        let g2 = Group::new([
            piecewise(Pid::new(), [0.0, 5.0, 15.0]),
            piecewise(Pid::new(), [-5.0, 0.0, 5.0]),
        ]);
        let c = Cluster::new([g1.clone(), g2.clone()]);

        assert_eq!(c.column_size(), g1.column_size() + g2.column_size());
        assert_eq!(c.constraints().len(), 15);
        assert_eq!(c.integrality().iter().filter(|&&m| m == 1).count(), 6);
    }

    #[test]
    fn test_linked_bus_constraint() {
        let link = Pid::new();
        let g1 = Group::new([
            piecewise(Pid::new(), [0.0, 5.0, 15.0]),
            piecewise(link, [-10.0, 0.0, 10.0]),
        ]);
        let g2 = Group::new([piecewise(link, [-10.0, 0.0, 10.0])]);
        let c = Cluster::new([g1, g2]);

        let rows = c.linked_bus_constraints(link);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.len(), 21 + 2);
        assert_eq!((row[0], row[22]), (0.0, 0.0));
        assert_eq!(&row[8..11], &[-10.0, 0.0, 10.0]);
        assert_eq!(&row[15..18], &[10.0, 0.0, -10.0]);
        assert_eq!(row[1..22].iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn test_linked_bus_requires_two_groups() {
        let link = Pid::new();
        let single = Cluster::new([Group::new([piecewise(link, [-1.0, 0.0, 1.0])])]);
        assert!(single.linked_bus_constraints(link).is_empty());

        let triple = Cluster::new(vec![
            Group::new([piecewise(link, [-1.0, 0.0, 1.0])]);
            3
        ]);
        assert!(triple.linked_bus_constraints(link).is_empty());

        let repeated = Cluster::new([
            Group::new([piecewise(link, [-1.0, 0.0, 1.0]), piecewise(link, [-1.0, 0.0, 1.0])]),
            Group::new([piecewise(link, [-1.0, 0.0, 1.0])]),
        ]);
        assert!(repeated.linked_bus_constraints(link).is_empty());
        assert!(repeated.linked_bus_constraints(Pid::new()).is_empty());
    }

    #[test]
    fn test_cluster_pid_locations() {
        let pid = Pid::new();
        let ess = StorageUnit::new(
            pid,
            points([-10.0, 0.0, 10.0]),
            CriticalPoint::new(10.0, 0.1),
            CriticalPoint::new(10.0, 0.1),
            50.0,
        )
        .unwrap();
        let g1 = Group::new([piecewise(Pid::new(), [0.0, 1.0, 2.0])]);
        let g2 = Group::new([ess]);
        let c = Cluster::new([g1, g2]);

        assert_eq!(c.real_power_pid_loc(pid), vec![7, 8, 9]);
        assert_eq!(c.stored_energy_pid_loc(pid), vec![14]);
        assert_eq!(c.stored_energy_pid_terms(pid)[0].weight, 50.0);
        assert_eq!(c.critical_points_pid(pid).len(), 3);
    }
}
