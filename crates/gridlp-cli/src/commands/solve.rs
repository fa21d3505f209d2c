use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use gridlp_cli::report::{dispatch_rows, write_dispatch_table};
use gridlp_cli::scenario::{build_model, load_scenario};
use gridlp_solver::{solve_mip, Backend, IntegralityMode, SolverConfig};

pub fn handle(
    scenario_path: &Path,
    config_path: Option<&Path>,
    backend: Option<Backend>,
    enforce_integrality: bool,
) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let mut config = match (config_path, &scenario.solver) {
        (Some(path), _) => SolverConfig::load_from(path)
            .with_context(|| format!("loading solver config '{}'", path.display()))?,
        (None, Some(config)) => config.clone(),
        (None, None) => SolverConfig::load().context("loading default solver config")?,
    };
    if let Some(backend) = backend {
        config = config.with_backend(backend);
    }
    if enforce_integrality {
        config = config.with_integrality(IntegralityMode::Enforce);
    }

    let model = build_model(&scenario)?;
    let solution = solve_mip(&model.series, &config)
        .with_context(|| format!("solving '{}'", scenario_path.display()))?;

    println!(
        "status: {}  backend: {}  objective: {:.6}  time: {} ms",
        solution.status, solution.backend, solution.objective, solution.solve_time_ms
    );
    write_dispatch_table(io::stdout(), &dispatch_rows(&model, &solution))
}
