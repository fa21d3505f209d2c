use std::io;

use anyhow::Result;
use clap::Parser;
use gridlp_cli::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // per-target RUST_LOG directives refine --log-level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(cli.log_level.into()))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Formulate { scenario, output } => {
            commands::formulate::handle(&scenario, output.as_deref())
        }
        Commands::Solve {
            scenario,
            config,
            backend,
            enforce_integrality,
        } => commands::solve::handle(
            &scenario,
            config.as_deref(),
            backend,
            enforce_integrality,
        ),
    }
}
