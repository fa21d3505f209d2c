//! Multi-stage horizons.
//!
//! A [`Series`] repeats a stage (any [`Sequencer`], normally a [`Cluster`] or
//! a [`crate::Group`]) over time. Stages are laid out block-diagonally and
//! coupled only through the battery rows built here:
//!
//! ```text
//! stage 0: scale_0 * e_0                                  == E_init
//! stage i: scale_i * e_i - dt * sum(w * p_i) - scale_{i+1} * e_{i+1} == 0
//! ```
//!
//! Each stage supplies its own power weights and stored-energy scale, so the
//! recursion stays correct when stages carry different parameters for the
//! same asset.

use tracing::{debug, warn};

use crate::cluster::Cluster;
use crate::contract::{Formulation, LinearProgram, MipLinearProgram, Sequencer};
use crate::error::FormulationResult;
use crate::layout::{weighted_row, BlockLayout, ColumnRange, WeightedColumn};
use crate::row::{Bound, ConstraintSet, Row};
use crate::unit::Pid;

#[derive(Debug, Clone, PartialEq)]
pub struct Series<S = Cluster> {
    stages: Vec<S>,
    layout: BlockLayout,
    constraints: ConstraintSet,
}

impl<S: Sequencer> Series<S> {
    pub fn new(stages: impl IntoIterator<Item = S>) -> Self {
        let stages: Vec<S> = stages.into_iter().collect();
        let layout = BlockLayout::from_sizes(stages.iter().map(|s| s.column_size()));
        debug!(stages = stages.len(), columns = layout.width(), "built series");
        Self {
            stages,
            layout,
            constraints: ConstraintSet::new(),
        }
    }

    pub fn stages(&self) -> &[S] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Columns owned by stage `stage`.
    pub fn stage_columns(&self, stage: usize) -> Option<ColumnRange> {
        self.layout.range(stage)
    }

    /// Real-power terms of `pid`, one list per stage, in series columns.
    pub fn stage_real_power_pid_terms(&self, pid: Pid) -> Vec<Vec<WeightedColumn>> {
        self.per_stage(|s| s.real_power_pid_terms(pid))
    }

    /// Stored-energy terms of `pid`, one list per stage, in series columns.
    pub fn stage_stored_energy_pid_terms(&self, pid: Pid) -> Vec<Vec<WeightedColumn>> {
        self.per_stage(|s| s.stored_energy_pid_terms(pid))
    }

    fn per_stage<F>(&self, mut select: F) -> Vec<Vec<WeightedColumn>>
    where
        F: FnMut(&S) -> Vec<WeightedColumn>,
    {
        self.stages
            .iter()
            .zip(self.layout.ranges())
            .map(|(stage, range)| range.relocate(select(stage)))
            .collect()
    }

    /// Stored-energy column of `pid` in every stage, or `None` unless each
    /// stage has exactly one.
    fn energy_columns(&self, pid: Pid) -> Option<Vec<WeightedColumn>> {
        let per_stage = self.stage_stored_energy_pid_terms(pid);
        if let Some(stage) = per_stage.iter().position(|terms| terms.len() != 1) {
            warn!(
                %pid,
                stage,
                found = per_stage[stage].len(),
                "battery needs exactly one stored-energy column per stage; no rows emitted"
            );
            return None;
        }
        Some(per_stage.into_iter().flatten().collect())
    }

    /// Pin the first stage's stored energy of `pid` to `initial_energy`.
    ///
    /// `initial_energy` is absolute; the row coefficient is the column's
    /// energy scale.
    pub fn battery_initial_energy_constraint(&self, pid: Pid, initial_energy: f64) -> Vec<Row> {
        if self.stages.is_empty() {
            return Vec::new();
        }
        let Some(energy) = self.energy_columns(pid) else {
            return Vec::new();
        };
        vec![weighted_row(
            self.column_size(),
            &energy[..1],
            initial_energy,
            initial_energy,
        )]
    }

    /// Energy balance rows between consecutive stages, `len() - 1` of them.
    pub fn battery_energy_constraint(&self, pid: Pid, time_step: f64) -> Vec<Row> {
        if self.stages.len() < 2 {
            return Vec::new();
        }
        let Some(energy) = self.energy_columns(pid) else {
            return Vec::new();
        };
        let power = self.stage_real_power_pid_terms(pid);
        let width = self.column_size();

        energy
            .windows(2)
            .zip(&power)
            .map(|(pair, stage_power)| {
                let mut terms: Vec<WeightedColumn> = stage_power
                    .iter()
                    .map(|t| WeightedColumn::new(t.column, -time_step * t.weight))
                    .collect();
                terms.push(pair[0]);
                terms.push(WeightedColumn::new(pair[1].column, -pair[1].weight));
                weighted_row(width, &terms, 0.0, 0.0)
            })
            .collect()
    }
}

impl<S: Sequencer> LinearProgram for Series<S> {
    fn cost_coefficients(&self) -> Vec<f64> {
        self.stages.iter().flat_map(|s| s.cost_coefficients()).collect()
    }

    fn bounds(&self) -> Vec<Bound> {
        self.stages.iter().flat_map(|s| s.bounds()).collect()
    }

    fn constraints(&self) -> Vec<Row> {
        let mut rows: Vec<Row> = self
            .stages
            .iter()
            .enumerate()
            .flat_map(|(i, s)| self.layout.project_rows(i, &s.constraints()))
            .collect();
        rows.extend_from_slice(self.constraints.rows());
        rows
    }
}

impl<S: Sequencer> MipLinearProgram for Series<S> {
    fn integrality(&self) -> Vec<i32> {
        self.stages.iter().flat_map(|s| s.integrality()).collect()
    }
}

impl<S: Sequencer> Formulation for Series<S> {
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

impl<S: Sequencer> Sequencer for Series<S> {
    fn real_power_pid_terms(&self, pid: Pid) -> Vec<WeightedColumn> {
        self.stage_real_power_pid_terms(pid).concat()
    }

    fn stored_energy_pid_terms(&self, pid: Pid) -> Vec<WeightedColumn> {
        self.stage_stored_energy_pid_terms(pid).concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Group;
    use crate::segment::CriticalPoint;
    use crate::unit::{BasicCosts, BasicLimits, BasicUnit, PiecewiseUnit, StorageUnit};

    fn ess(pid: Pid) -> StorageUnit {
        StorageUnit::new(
            pid,
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
    fn test_series_concatenates_stages() {
        let g = Group::new([ess(Pid::new())]);
        let s = Series::new(vec![g.clone(); 3]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.column_size(), 24);
        assert_eq!(s.constraints().len(), 15);
        assert_eq!(s.stage_columns(2), Some(ColumnRange::new(16, 24)));
        assert_eq!(s.stage_columns(3), None);
    }

    #[test]
    fn test_battery_energy_constraint() {
        let pid = Pid::new();
        let s = Series::new(vec![Group::new([ess(pid)]); 3]);

        let rows = s.battery_energy_constraint(pid, 1.0);
        assert_eq!(rows.len(), 2);

        let mut expected = vec![0.0; 26];
        expected[1..4].copy_from_slice(&[10.0, 0.0, -10.0]);
        expected[8] = 100.0;
        expected[16] = -100.0;
        assert_eq!(rows[0], expected);

        let mut second = vec![0.0; 26];
        second[9..12].copy_from_slice(&[10.0, 0.0, -10.0]);
        second[16] = 100.0;
        second[24] = -100.0;
        assert_eq!(rows[1], second);
    }

    #[test]
    fn test_battery_initial_energy_constraint() {
        let pid = Pid::new();
        let s = Series::new(vec![Group::new([ess(pid)]); 2]);
        let rows = s.battery_initial_energy_constraint(pid, 40.0);

        let mut expected = vec![0.0; 18];
        expected[0] = 40.0;
        expected[8] = 100.0;
        expected[17] = 40.0;
        assert_eq!(rows, vec![expected]);
    }

    #[test]
    fn test_battery_rows_for_basic_unit() {
        let pid = Pid::new();
        let unit = BasicUnit::new(
            pid,
            BasicCosts::default(),
            BasicLimits::new(10.0, 10.0, 10.0, 20.0),
        )
        .unwrap();
        let s = Series::new(vec![Group::new([unit]); 2]);

        let rows = s.battery_energy_constraint(pid, 0.5);
        assert_eq!(
            rows,
            vec![vec![0.0, -0.5, 0.5, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0, 0.0]]
        );
    }

    #[test]
    fn test_battery_rows_follow_each_stage_scale() {
        let pid = Pid::new();
        let small = StorageUnit::new(
            pid,
            vec![CriticalPoint::new(-1.0, 0.0), CriticalPoint::new(1.0, 0.0)],
            CriticalPoint::new(1.0, 0.0),
            CriticalPoint::new(1.0, 0.0),
            10.0,
        )
        .unwrap();
        let large = StorageUnit::new(
            pid,
            vec![CriticalPoint::new(-1.0, 0.0), CriticalPoint::new(1.0, 0.0)],
            CriticalPoint::new(1.0, 0.0),
            CriticalPoint::new(1.0, 0.0),
            30.0,
        )
        .unwrap();
        let s = Series::new([Group::new([small]), Group::new([large])]);

        let rows = s.battery_energy_constraint(pid, 1.0);
        assert_eq!(rows.len(), 1);
        // stage 0 energy column 5, stage 1 energy column 11
        assert_eq!(rows[0][6], 10.0);
        assert_eq!(rows[0][12], -30.0);
    }

    #[test]
    fn test_battery_rows_without_storage_are_empty() {
        let pid = Pid::new();
        let pw = PiecewiseUnit::new(
            pid,
            vec![CriticalPoint::new(0.0, 0.0), CriticalPoint::new(1.0, 1.0)],
            CriticalPoint::new(1.0, 0.0),
            CriticalPoint::new(1.0, 0.0),
        )
        .unwrap();
        let s = Series::new(vec![Group::new([pw]); 3]);
        assert!(s.battery_energy_constraint(pid, 1.0).is_empty());
        assert!(s.battery_initial_energy_constraint(pid, 1.0).is_empty());

        let single = Series::new([Group::new([ess(pid)])]);
        assert!(single.battery_energy_constraint(pid, 1.0).is_empty());
        assert_eq!(single.battery_initial_energy_constraint(pid, 1.0).len(), 1);
    }

    #[test]
    fn test_series_rejects_short_row() {
        let pid = Pid::new();
        let mut s = Series::new(vec![Group::new([ess(pid)]); 2]);
        let initial = s.battery_initial_energy_constraint(pid, 10.0);
        assert!(s.new_constraint(vec![vec![0.0; 10]]).is_err());
        s.new_constraint(initial).unwrap();
        assert_eq!(s.constraints().len(), 11);
    }

    #[test]
    fn test_series_pid_locations_span_stages() {
        let pid = Pid::new();
        let s = Series::new(vec![Group::new([ess(pid)]); 2]);
        assert_eq!(s.real_power_pid_loc(pid), vec![0, 1, 2, 8, 9, 10]);
        assert_eq!(s.stored_energy_pid_loc(pid), vec![7, 15]);
    }
}
