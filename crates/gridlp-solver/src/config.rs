//! Solver configuration.
//!
//! ```toml
//! backend = "clarabel"     # or "highs" (solver-highs feature)
//! integrality = "relax"    # or "enforce"
//! ```
//!
//! Missing keys take their defaults. The same table can be embedded as the
//! `[solver]` section of a scenario file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

/// Solver backend behind `good_lp`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Pure-Rust interior point solver. Continuous only.
    #[default]
    Clarabel,
    /// HiGHS simplex / branch-and-bound.
    Highs,
}

const AVAILABLE_BACKENDS: &[&str] = &[
    "clarabel",
    #[cfg(feature = "solver-highs")]
    "highs",
];

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Clarabel => "clarabel",
            Backend::Highs => "highs",
        }
    }

    /// Backends compiled into this build.
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_BACKENDS
    }

    pub fn is_available(&self) -> bool {
        Self::available().contains(&self.as_str())
    }

    /// Whether the backend can enforce integer columns.
    pub fn supports_integrality(&self) -> bool {
        matches!(self, Backend::Highs)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = SolverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "clarabel" => Ok(Backend::Clarabel),
            "highs" => Ok(Backend::Highs),
            other => Err(SolverError::Config(format!(
                "unknown solver backend '{}'; supported values: {}",
                other,
                Backend::available().join(", ")
            ))),
        }
    }
}

/// Treatment of integer columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegralityMode {
    /// Integer columns stay integer; continuous backends refuse MIPs.
    Enforce,
    /// Integer columns are solved as continuous (LP relaxation).
    #[default]
    Relax,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: Backend,
    pub integrality: IntegralityMode,
}

impl SolverConfig {
    /// Default config directory (`~/.gridlp`).
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".gridlp"))
    }

    /// Default config file (`~/.gridlp/solver.toml`).
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("solver.toml"))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> SolverResult<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> SolverResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> SolverResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn save_to(&self, path: &Path) -> SolverResult<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_integrality(mut self, integrality: IntegralityMode) -> Self {
        self.integrality = integrality;
        self
    }
}
