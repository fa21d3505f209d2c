//! Reference solver adapters for `gridlp` formulations.
//!
//! Any [`gridlp_core::LinearProgram`] or [`gridlp_core::MipLinearProgram`]
//! can be handed to [`solve_lp`] / [`solve_mip`]; the result is a primal
//! vector aligned with the formulation's columns.
//!
//! # Backends
//!
//! | Backend | Problem Type | Feature |
//! |---------|--------------|---------|
//! | Clarabel | LP (MIP as LP relaxation) | always |
//! | HiGHS | LP/MIP | `solver-highs` |
//!
//! Both are driven through `good_lp`.
//!
//! # Example
//!
//! ```no_run
//! use gridlp_core::{BasicCosts, BasicLimits, BasicUnit, Formulation, Group, Pid};
//! use gridlp_solver::{solve_lp, SolverConfig};
//!
//! let unit = BasicUnit::new(
//!     Pid::new(),
//!     BasicCosts::new(1.0, 2.0, 0.0, 0.0),
//!     BasicLimits::new(5.0, 5.0, 5.0, 5.0),
//! )?;
//! let mut group = Group::new([unit]);
//! let row = group.net_load_constraint(3.0);
//! group.new_constraint([row])?;
//!
//! let solution = solve_lp(&group, &SolverConfig::default())?;
//! println!("positive power: {}", solution.values[0]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod solution;
pub mod solve;

pub use config::{Backend, IntegralityMode, SolverConfig};
pub use error::{SolverError, SolverResult};
pub use solution::{Solution, SolutionStatus};
pub use solve::{solve_lp, solve_mip, solve_problem};
