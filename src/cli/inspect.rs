//! Inspect command implementation.

use super::output::{JsonStateSummary, format_log, format_state_text};
use super::{CliError, OutputFormat};
use conquest::GameEngine;
use std::path::Path;

/// Execute the inspect command.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be read or fails validation.
pub(crate) fn execute(snapshot: &Path, format: OutputFormat, log: usize) -> Result<(), CliError> {
    let engine = GameEngine::load(snapshot)
        .map_err(|e| CliError::new(format!("Failed to load {}: {e}", snapshot.display())))?;
    let view = engine.view();

    match format {
        OutputFormat::Text => {
            println!("Snapshot: {}", snapshot.display());
            println!("Seed: {}", engine.state().rng.seed());
            println!();
            print!("{}", format_state_text(&view));
            if log > 0 {
                println!();
                println!("Log:");
                print!("{}", format_log(&view, log));
            }
        }
        OutputFormat::Json => {
            let summary = JsonStateSummary::from_view(&view);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
