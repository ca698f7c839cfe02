//! CLI command implementations for Conquest.

pub(crate) mod inspect;
pub(crate) mod run;
pub(crate) mod simulate;
pub(crate) mod validate;

mod output;

use clap::ValueEnum;
use conquest::GameConfig;
use std::error::Error;
use std::fmt;
use std::path::Path;

/// Output format for the `run` and `inspect` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Output format for the `simulate` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SimulateFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
    /// CSV format.
    Csv,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<conquest::ConfigError> for CliError {
    fn from(e: conquest::ConfigError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<conquest::DataError> for CliError {
    fn from(e: conquest::DataError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<conquest::SetupError> for CliError {
    fn from(e: conquest::SetupError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<conquest::SnapshotError> for CliError {
    fn from(e: conquest::SnapshotError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<conquest::SimulationError> for CliError {
    fn from(e: conquest::SimulationError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}

/// Load a config file, or the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<GameConfig, CliError> {
    match path {
        Some(path) => GameConfig::from_path(path)
            .map_err(|e| CliError::new(format!("Failed to load {}: {e}", path.display()))),
        None => Ok(GameConfig::default()),
    }
}

/// Seed from the clock when none was given.
pub(crate) fn seed_or_clock(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos() & u128::from(u64::MAX)).unwrap_or(42))
            .unwrap_or(42)
    })
}
