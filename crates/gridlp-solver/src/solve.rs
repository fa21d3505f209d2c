//! Mapping of the formulation tuple onto `good_lp`.
//!
//! Each column becomes one variable with its finite bounds applied. Each row
//! `[lb, c.., ub]` becomes `c'x == lb` when both bounds agree, otherwise
//! `c'x >= lb` and/or `c'x <= ub` for whichever sides are finite. A row
//! whose bounds admit no value is reported as infeasible before any model is
//! built. The objective is always minimised.

use std::time::Instant;

use good_lp::solvers::clarabel::clarabel;
#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, Solution as _, SolverModel, Variable,
};
use gridlp_core::{row, LinearProgram, MipLinearProgram, ProblemDescription};
use tracing::{debug, info};

use crate::config::{Backend, IntegralityMode, SolverConfig};
use crate::error::{SolverError, SolverResult};
use crate::solution::{Solution, SolutionStatus};

/// Solve a pure LP.
pub fn solve_lp<P>(program: &P, config: &SolverConfig) -> SolverResult<Solution>
where
    P: LinearProgram + ?Sized,
{
    solve_problem(&ProblemDescription::from_lp(program), config)
}

/// Solve a MIP, honouring or relaxing its integrality mask per `config`.
pub fn solve_mip<P>(program: &P, config: &SolverConfig) -> SolverResult<Solution>
where
    P: MipLinearProgram + ?Sized,
{
    solve_problem(&ProblemDescription::from_mip(program), config)
}

/// Solve a flattened problem snapshot.
pub fn solve_problem(
    problem: &ProblemDescription,
    config: &SolverConfig,
) -> SolverResult<Solution> {
    problem.validate()?;
    if let Some(index) = problem.constraints.iter().position(|r| empty_row(r)) {
        debug!(row = index, "row bounds admit no value");
        return Err(SolverError::Infeasible);
    }

    let backend = config.backend;
    if !backend.is_available() {
        return Err(SolverError::BackendUnavailable(backend.to_string()));
    }

    let integer_columns = problem.num_integer();
    let enforce = integer_columns > 0 && config.integrality == IntegralityMode::Enforce;
    if enforce && !backend.supports_integrality() {
        return Err(SolverError::IntegralityUnsupported {
            backend,
            integer_columns,
        });
    }
    let status = if integer_columns > 0 && !enforce {
        SolutionStatus::Relaxed
    } else {
        SolutionStatus::Optimal
    };

    info!(
        %backend,
        columns = problem.num_columns(),
        rows = problem.num_rows(),
        integer = integer_columns,
        enforce,
        "solving formulation"
    );
    let start = Instant::now();

    let mut vars = ProblemVariables::new();
    let columns: Vec<Variable> = problem
        .bounds
        .iter()
        .enumerate()
        .map(|(j, &(lower, upper))| {
            let mut definition = variable();
            if lower.is_finite() {
                definition = definition.min(lower);
            }
            if upper.is_finite() {
                definition = definition.max(upper);
            }
            if enforce && problem.is_integer(j) {
                definition = definition.integer();
            }
            vars.add(definition)
        })
        .collect();

    let objective = linear_expression(&problem.cost_coefficients, &columns);
    let unsolved = vars.minimise(objective);

    let values: Vec<f64> = match backend {
        Backend::Clarabel => {
            let solution = add_rows(unsolved.using(clarabel), problem, &columns).solve()?;
            columns.iter().map(|&v| solution.value(v)).collect()
        }
        #[cfg(feature = "solver-highs")]
        Backend::Highs => {
            let solution = add_rows(unsolved.using(highs), problem, &columns).solve()?;
            columns.iter().map(|&v| solution.value(v)).collect()
        }
        #[cfg(not(feature = "solver-highs"))]
        Backend::Highs => return Err(SolverError::BackendUnavailable(backend.to_string())),
    };

    let objective: f64 = problem
        .cost_coefficients
        .iter()
        .zip(&values)
        .map(|(c, x)| c * x)
        .sum();
    let solve_time_ms = start.elapsed().as_millis() as u64;
    debug!(objective, solve_time_ms, %status, "solve finished");

    Ok(Solution {
        status,
        backend,
        objective,
        values,
        solve_time_ms,
    })
}

/// `lb > ub`, `lb == +inf` or `ub == -inf`: no point satisfies the row.
fn empty_row(r: &[f64]) -> bool {
    let (lower, upper) = (row::lower(r), row::upper(r));
    lower > upper || lower == f64::INFINITY || upper == f64::NEG_INFINITY
}

fn linear_expression(coefficients: &[f64], columns: &[Variable]) -> Expression {
    coefficients
        .iter()
        .zip(columns)
        .filter(|(c, _)| **c != 0.0)
        .map(|(&c, &v)| c * v)
        .sum()
}

fn add_rows<M>(mut model: M, problem: &ProblemDescription, columns: &[Variable]) -> M
where
    M: SolverModel,
{
    for r in &problem.constraints {
        let expr = linear_expression(row::coefficients(r), columns);
        let (lower, upper) = (row::lower(r), row::upper(r));
        if lower == upper && lower.is_finite() {
            model = model.with(constraint!(expr == lower));
            continue;
        }
        if lower.is_finite() {
            model = model.with(constraint!(expr.clone() >= lower));
        }
        if upper.is_finite() {
            model = model.with(constraint!(expr <= upper));
        }
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_lp() -> ProblemDescription {
        // min x + 2y  s.t.  x + y == 3,  x <= 1
        ProblemDescription {
            cost_coefficients: vec![1.0, 2.0],
            bounds: vec![(0.0, 1.0), (0.0, f64::INFINITY)],
            constraints: vec![vec![3.0, 1.0, 1.0, 3.0]],
            integrality: None,
        }
    }

    #[test]
    fn test_tiny_lp() {
        let solution = solve_problem(&tiny_lp(), &SolverConfig::default()).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 1.0).abs() < 1e-5);
        assert!((solution.values[1] - 2.0).abs() < 1e-5);
        assert!((solution.objective - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_infeasible_lp() {
        let mut problem = tiny_lp();
        problem.constraints.push(vec![5.0, 1.0, 0.0, f64::INFINITY]);
        assert!(solve_problem(&problem, &SolverConfig::default()).is_err());
    }

    #[test]
    fn test_rows_with_empty_bounds_are_infeasible() {
        let (inf, ninf) = (f64::INFINITY, f64::NEG_INFINITY);
        for bounds in [(inf, inf), (ninf, ninf), (2.0, 1.0)] {
            let mut problem = tiny_lp();
            problem.constraints.push(vec![bounds.0, 1.0, 1.0, bounds.1]);
            assert!(
                matches!(
                    solve_problem(&problem, &SolverConfig::default()),
                    Err(SolverError::Infeasible)
                ),
                "{bounds:?}"
            );
        }
    }

    #[test]
    fn test_malformed_problem_is_rejected_before_solving() {
        let mut problem = tiny_lp();
        problem.constraints.push(vec![0.0, 1.0]);
        assert!(matches!(
            solve_problem(&problem, &SolverConfig::default()),
            Err(SolverError::Formulation(_))
        ));
    }

    #[test]
    fn test_clarabel_refuses_enforced_integrality() {
        let mut problem = tiny_lp();
        problem.integrality = Some(vec![0, 1]);
        let config = SolverConfig::default().with_integrality(IntegralityMode::Enforce);
        assert!(matches!(
            solve_problem(&problem, &config),
            Err(SolverError::IntegralityUnsupported {
                backend: Backend::Clarabel,
                integer_columns: 1
            })
        ));
    }

    #[test]
    fn test_relaxed_mip_reports_relaxed_status() {
        let mut problem = tiny_lp();
        problem.integrality = Some(vec![0, 1]);
        let solution = solve_problem(&problem, &SolverConfig::default()).unwrap();
        assert_eq!(solution.status, SolutionStatus::Relaxed);
    }
}
