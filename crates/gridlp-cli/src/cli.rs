use clap::{Parser, Subcommand};
use gridlp_solver::Backend;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose a scenario and write the flattened problem as TOML
    Formulate {
        /// Path to the scenario file
        scenario: PathBuf,
        /// Write the problem to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compose a scenario, solve it and print the dispatch
    Solve {
        /// Path to the scenario file
        scenario: PathBuf,
        /// Solver config file; falls back to the scenario's [solver] table, then
        /// ~/.gridlp/solver.toml
        #[arg(long)]
        config: Option<PathBuf>,
        /// Solver backend (clarabel, highs)
        #[arg(long)]
        backend: Option<Backend>,
        /// Keep integer columns integer instead of solving the LP relaxation
        #[arg(long)]
        enforce_integrality: bool,
    },
}
