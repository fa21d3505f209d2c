use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gridlp_cli::scenario::{build_model, load_scenario};
use gridlp_core::ProblemDescription;
use tracing::info;

pub fn handle(scenario: &Path, output: Option<&Path>) -> Result<()> {
    let model = build_model(&load_scenario(scenario)?)?;
    let problem = ProblemDescription::from_mip(&model.series);
    problem.validate().context("validating composed problem")?;

    let rendered = toml::to_string_pretty(&problem).context("serializing problem to toml")?;
    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("writing problem to '{}'", path.display()))?;
            info!(
                columns = problem.num_columns(),
                rows = problem.num_rows(),
                integer = problem.num_integer(),
                "wrote problem to {}",
                path.display()
            );
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
