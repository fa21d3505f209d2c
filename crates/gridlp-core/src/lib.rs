//! Composable LP/MIP formulations for distributed energy resources.
//!
//! Assets are modelled bottom-up and flattened into one linear program:
//!
//! ```text
//! Series ── stage 0 ── Cluster ── Group (bus A) ── Unit, Unit, ...
//!        │                    └── Group (bus B) ── Unit, ...
//!        ├─ stage 1 ── Cluster ── ...
//!        └─ ...
//! ```
//!
//! Every level implements the same contract ([`LinearProgram`],
//! [`MipLinearProgram`], [`Formulation`]): cost coefficients, column bounds,
//! bounded constraint rows and an integrality mask over one shared column
//! order. Composites place their children's columns side by side and
//! re-project child rows into their own width; columns are never shared
//! between siblings. Coupling happens only through rows added at a level:
//! net load and reserve rows on a [`Group`], linked-bus rows on a
//! [`Cluster`], battery rows on a [`Series`].
//!
//! The crate only builds formulations. Solving is left to an adapter such as
//! `gridlp-solver`.
//!
//! # Example
//!
//! ```
//! use gridlp_core::{
//!     BasicCosts, BasicLimits, BasicUnit, Formulation, Group, LinearProgram, Pid, Series,
//! };
//!
//! let battery = Pid::new();
//! let unit = BasicUnit::new(
//!     battery,
//!     BasicCosts::new(0.1, 0.1, 0.01, 0.0),
//!     BasicLimits::new(10.0, 10.0, 10.0, 20.0),
//! )?;
//!
//! let mut stage = Group::new([unit]);
//! let net_load = stage.net_load_constraint(10.0);
//! stage.new_constraint([net_load])?;
//!
//! let mut horizon = Series::new(vec![stage; 4]);
//! let initial = horizon.battery_initial_energy_constraint(battery, 20.0);
//! let balance = horizon.battery_energy_constraint(battery, 0.5);
//! horizon.new_constraint(initial.into_iter().chain(balance))?;
//!
//! assert_eq!(horizon.column_size(), 16);
//! assert_eq!(horizon.constraints().len(), 4 + 1 + 3);
//! # Ok::<(), gridlp_core::FormulationError>(())
//! ```

pub mod cluster;
pub mod contract;
pub mod error;
pub mod group;
pub mod layout;
pub mod row;
pub mod segment;
pub mod series;
pub mod unit;

pub use cluster::Cluster;
pub use contract::{Formulation, LinearProgram, MipLinearProgram, ProblemDescription, Sequencer};
pub use error::{FormulationError, FormulationResult};
pub use group::Group;
pub use layout::{BlockLayout, ColumnAllocator, ColumnRange, WeightedColumn};
pub use row::{Bound, Row};
pub use segment::{CriticalPoint, FlowBounds, SegmentModel};
pub use series::Series;
pub use unit::{
    BasicCosts, BasicLimits, BasicUnit, EnergyStorage, Pid, PiecewiseUnit, StorageUnit, Unit,
    UnitModel,
};
