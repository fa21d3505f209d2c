//! Units: the leaves of the formulation hierarchy.
//!
//! A unit is one physical asset (generator, load, battery) with its own
//! column block. Three variants exist:
//!
//! | Variant | Columns | Storage |
//! |---------|---------|---------|
//! | [`BasicUnit`] | positive power, negative power, capacity, stored energy | yes |
//! | [`PiecewiseUnit`] | `2k-1` segment columns, positive capacity, negative capacity | no |
//! | [`StorageUnit`] | piecewise columns plus one stored-energy column | yes |
//!
//! All variants implement [`UnitModel`]. Storage-capable ones also implement
//! [`EnergyStorage`], reached through [`UnitModel::as_storage`], so callers
//! never match on the concrete variant to find stored-energy columns.

mod basic;
mod piecewise;
mod storage;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::{Formulation, LinearProgram, MipLinearProgram};
use crate::error::FormulationResult;
use crate::layout::{columns_of, weighted_row, WeightedColumn};
use crate::row::{Bound, Row};
use crate::segment::CriticalPoint;

pub use basic::{BasicCosts, BasicLimits, BasicUnit};
pub use piecewise::PiecewiseUnit;
pub use storage::StorageUnit;

/// Physical identity of an asset.
///
/// The same pid may appear in several groups (a tie between buses) and in
/// every stage of a series (the same battery over time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(Uuid);

impl Pid {
    /// Fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for Pid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Behaviour shared by every unit variant.
///
/// Locations are local to the unit's own column block. Terms pair each
/// location with the coefficient that turns the column into a physical
/// quantity: a critical point's value for interpolation columns, `+1`/`-1`
/// for the basic unit's positive/negative power, a declared capacity for
/// capacity-fraction columns.
pub trait UnitModel: Formulation {
    fn pid(&self) -> Pid;

    fn real_power_terms(&self) -> Vec<WeightedColumn>;

    fn positive_capacity_terms(&self) -> Vec<WeightedColumn>;

    fn negative_capacity_terms(&self) -> Vec<WeightedColumn>;

    /// Critical points of the unit's cost curve, empty for linear units.
    fn critical_points(&self) -> Vec<CriticalPoint>;

    /// Real power must stay within the reserved positive capacity.
    fn positive_capacity_constraint(&self) -> Row;

    /// Real power must stay within the reserved negative capacity.
    fn negative_capacity_constraint(&self) -> Row;

    /// Storage capability query.
    fn as_storage(&self) -> Option<&dyn EnergyStorage> {
        None
    }

    fn real_power_loc(&self) -> Vec<usize> {
        columns_of(&self.real_power_terms())
    }

    fn real_positive_capacity_loc(&self) -> Vec<usize> {
        columns_of(&self.positive_capacity_terms())
    }

    fn real_negative_capacity_loc(&self) -> Vec<usize> {
        columns_of(&self.negative_capacity_terms())
    }

    /// Both capacity rows, positive first.
    fn capacity_constraints(&self) -> Vec<Row> {
        vec![
            self.positive_capacity_constraint(),
            self.negative_capacity_constraint(),
        ]
    }

    /// Pin the unit's real power to `setpoint`.
    fn real_power_constraint(&self, setpoint: f64) -> Row {
        weighted_row(
            self.column_size(),
            &self.real_power_terms(),
            setpoint,
            setpoint,
        )
    }
}

/// Extra capability of units that carry a stored-energy column.
pub trait EnergyStorage {
    /// Stored-energy column weighted by the energy scale of the column.
    fn stored_energy_terms(&self) -> Vec<WeightedColumn>;

    /// Declared energy capacity.
    fn stored_energy_capacity(&self) -> f64;

    fn stored_energy_loc(&self) -> Vec<usize> {
        columns_of(&self.stored_energy_terms())
    }
}

/// Any unit, as held by a [`crate::Group`].
#[derive(Debug, Clone, PartialEq)]
pub enum Unit {
    Basic(BasicUnit),
    Piecewise(PiecewiseUnit),
    Storage(StorageUnit),
}

macro_rules! dispatch {
    ($unit:expr, $inner:ident => $body:expr) => {
        match $unit {
            Unit::Basic($inner) => $body,
            Unit::Piecewise($inner) => $body,
            Unit::Storage($inner) => $body,
        }
    };
}

impl Unit {
    /// Short variant name for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Unit::Basic(_) => "basic",
            Unit::Piecewise(_) => "piecewise",
            Unit::Storage(_) => "storage",
        }
    }
}

impl From<BasicUnit> for Unit {
    fn from(unit: BasicUnit) -> Self {
        Unit::Basic(unit)
    }
}

impl From<PiecewiseUnit> for Unit {
    fn from(unit: PiecewiseUnit) -> Self {
        Unit::Piecewise(unit)
    }
}

impl From<StorageUnit> for Unit {
    fn from(unit: StorageUnit) -> Self {
        Unit::Storage(unit)
    }
}

impl LinearProgram for Unit {
    fn cost_coefficients(&self) -> Vec<f64> {
        dispatch!(self, u => u.cost_coefficients())
    }

    fn bounds(&self) -> Vec<Bound> {
        dispatch!(self, u => u.bounds())
    }

    fn constraints(&self) -> Vec<Row> {
        dispatch!(self, u => u.constraints())
    }
}

impl MipLinearProgram for Unit {
    fn integrality(&self) -> Vec<i32> {
        dispatch!(self, u => u.integrality())
    }
}

impl Formulation for Unit {
    fn column_size(&self) -> usize {
        dispatch!(self, u => u.column_size())
    }

    fn new_constraint<I>(&mut self, rows: I) -> FormulationResult<()>
    where
        I: IntoIterator<Item = Row>,
    {
        dispatch!(self, u => u.new_constraint(rows))
    }
}

impl UnitModel for Unit {
    fn pid(&self) -> Pid {
        dispatch!(self, u => u.pid())
    }

    fn real_power_terms(&self) -> Vec<WeightedColumn> {
        dispatch!(self, u => u.real_power_terms())
    }

    fn positive_capacity_terms(&self) -> Vec<WeightedColumn> {
        dispatch!(self, u => u.positive_capacity_terms())
    }

    fn negative_capacity_terms(&self) -> Vec<WeightedColumn> {
        dispatch!(self, u => u.negative_capacity_terms())
    }

    fn critical_points(&self) -> Vec<CriticalPoint> {
        dispatch!(self, u => u.critical_points())
    }

    fn positive_capacity_constraint(&self) -> Row {
        dispatch!(self, u => u.positive_capacity_constraint())
    }

    fn negative_capacity_constraint(&self) -> Row {
        dispatch!(self, u => u.negative_capacity_constraint())
    }

    fn as_storage(&self) -> Option<&dyn EnergyStorage> {
        dispatch!(self, u => u.as_storage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piecewise(pid: Pid) -> PiecewiseUnit {
        PiecewiseUnit::new(
            pid,
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
    fn test_pid_is_unique() {
        assert_ne!(Pid::new(), Pid::new());
    }

    #[test]
    fn test_storage_capability_query() {
        let basic: Unit = BasicUnit::new(
            Pid::new(),
            BasicCosts::default(),
            BasicLimits::new(5.0, 5.0, 5.0, 5.0),
        )
        .unwrap()
        .into();
        let pw: Unit = piecewise(Pid::new()).into();
        let ess: Unit = StorageUnit::new(
            Pid::new(),
            vec![CriticalPoint::new(-10.0, -1.0), CriticalPoint::new(10.0, 1.0)],
            CriticalPoint::new(10.0, 0.1),
            CriticalPoint::new(10.0, 0.1),
            100.0,
        )
        .unwrap()
        .into();

        assert_eq!(basic.as_storage().map(|s| s.stored_energy_loc()), Some(vec![3]));
        assert!(pw.as_storage().is_none());
        let storage = ess.as_storage().unwrap();
        assert_eq!(storage.stored_energy_loc(), vec![5]);
        assert_eq!(storage.stored_energy_capacity(), 100.0);
    }

    #[test]
    fn test_enum_dispatch_matches_variant() {
        let pid = Pid::new();
        let inner = piecewise(pid);
        let unit = Unit::from(inner.clone());

        assert_eq!(unit.kind(), "piecewise");
        assert_eq!(unit.pid(), pid);
        assert_eq!(unit.column_size(), inner.column_size());
        assert_eq!(unit.cost_coefficients(), inner.cost_coefficients());
        assert_eq!(unit.constraints(), inner.constraints());
        assert_eq!(unit.real_power_loc(), vec![0, 1, 2]);
    }

    #[test]
    fn test_real_power_constraint() {
        let unit = piecewise(Pid::new());
        assert_eq!(
            unit.real_power_constraint(5.0),
            vec![5.0, -10.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 5.0]
        );
    }

    #[test]
    fn test_unit_rejects_bad_row_batch() {
        let mut unit = Unit::from(piecewise(Pid::new()));
        let before = unit.constraints().len();
        assert!(unit.new_constraint(vec![vec![0.0; 4]]).is_err());
        assert_eq!(unit.constraints().len(), before);

        unit.new_constraint(vec![vec![0.0; 9]]).unwrap();
        assert_eq!(unit.constraints().len(), before + 1);
    }
}
