use serde::{Deserialize, Serialize};

use super::{EnergyStorage, Pid, UnitModel};
use crate::contract::{Formulation, LinearProgram, MipLinearProgram};
use crate::error::{FormulationError, FormulationResult};
use crate::layout::WeightedColumn;
use crate::row::{self, Bound, ConstraintSet, Row};
use crate::segment::CriticalPoint;

const POSITIVE_POWER: usize = 0;
const NEGATIVE_POWER: usize = 1;
const CAPACITY: usize = 2;
const STORED_ENERGY: usize = 3;
const COLUMNS: usize = 4;

/// Per-unit costs of the four basic columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicCosts {
    pub positive: f64,
    pub negative: f64,
    pub capacity: f64,
    pub energy: f64,
}

impl BasicCosts {
    pub const fn new(positive: f64, negative: f64, capacity: f64, energy: f64) -> Self {
        Self {
            positive,
            negative,
            capacity,
            energy,
        }
    }
}

/// Upper limits of the four basic columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicLimits {
    pub positive: f64,
    pub negative: f64,
    pub capacity: f64,
    pub energy: f64,
}

impl BasicLimits {
    pub const fn new(positive: f64, negative: f64, capacity: f64, energy: f64) -> Self {
        Self {
            positive,
            negative,
            capacity,
            energy,
        }
    }
}

/// Four-column linear asset.
///
/// Real power is `positive - negative`; `capacity` is the reserved headroom
/// in either direction; `stored energy` is absolute (energy scale `1`).
/// All columns are continuous with bounds `[0, limit]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicUnit {
    pid: Pid,
    costs: BasicCosts,
    limits: BasicLimits,
    constraints: ConstraintSet,
}

impl BasicUnit {
    pub fn new(pid: Pid, costs: BasicCosts, limits: BasicLimits) -> FormulationResult<Self> {
        FormulationError::check_capacity("positive power limit", limits.positive)?;
        FormulationError::check_capacity("negative power limit", limits.negative)?;
        FormulationError::check_capacity("capacity limit", limits.capacity)?;
        FormulationError::check_capacity("stored energy limit", limits.energy)?;
        Ok(Self {
            pid,
            costs,
            limits,
            constraints: ConstraintSet::new(),
        })
    }

    pub fn costs(&self) -> BasicCosts {
        self.costs
    }

    pub fn limits(&self) -> BasicLimits {
        self.limits
    }

    // capacity - power >= 0
    fn headroom_row(power: usize) -> Row {
        let mut coefficients = vec![0.0; COLUMNS];
        coefficients[power] = -1.0;
        coefficients[CAPACITY] = 1.0;
        row::bounded(coefficients, 0.0, f64::INFINITY)
    }
}

impl LinearProgram for BasicUnit {
    fn cost_coefficients(&self) -> Vec<f64> {
        let c = &self.costs;
        vec![c.positive, c.negative, c.capacity, c.energy]
    }

    fn bounds(&self) -> Vec<Bound> {
        let l = &self.limits;
        vec![
            (0.0, l.positive),
            (0.0, l.negative),
            (0.0, l.capacity),
            (0.0, l.energy),
        ]
    }

    fn constraints(&self) -> Vec<Row> {
        self.constraints.rows().to_vec()
    }
}

impl MipLinearProgram for BasicUnit {
    fn integrality(&self) -> Vec<i32> {
        vec![0; COLUMNS]
    }
}

impl Formulation for BasicUnit {
    fn column_size(&self) -> usize {
        COLUMNS
    }

    fn new_constraint<I>(&mut self, rows: I) -> FormulationResult<()>
    where
        I: IntoIterator<Item = Row>,
    {
        self.constraints.append(COLUMNS, rows.into_iter().collect())
    }
}

impl UnitModel for BasicUnit {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn real_power_terms(&self) -> Vec<WeightedColumn> {
        vec![
            WeightedColumn::new(POSITIVE_POWER, 1.0),
            WeightedColumn::new(NEGATIVE_POWER, -1.0),
        ]
    }

    fn positive_capacity_terms(&self) -> Vec<WeightedColumn> {
        vec![WeightedColumn::new(CAPACITY, 1.0)]
    }

    fn negative_capacity_terms(&self) -> Vec<WeightedColumn> {
        vec![WeightedColumn::new(CAPACITY, 1.0)]
    }

    fn critical_points(&self) -> Vec<CriticalPoint> {
        Vec::new()
    }

    fn positive_capacity_constraint(&self) -> Row {
        Self::headroom_row(POSITIVE_POWER)
    }

    fn negative_capacity_constraint(&self) -> Row {
        Self::headroom_row(NEGATIVE_POWER)
    }

    fn as_storage(&self) -> Option<&dyn EnergyStorage> {
        Some(self)
    }
}

impl EnergyStorage for BasicUnit {
    fn stored_energy_terms(&self) -> Vec<WeightedColumn> {
        vec![WeightedColumn::new(STORED_ENERGY, 1.0)]
    }

    fn stored_energy_capacity(&self) -> f64 {
        self.limits.energy
    }
}
