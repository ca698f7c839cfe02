//! Run command implementation.

use super::output::{JsonStateSummary, format_log, format_state_text, format_text};
use super::{CliError, OutputFormat, load_config, seed_or_clock};
use conquest::simulate::play;
use conquest::{GameEngine, GameSetup};
use serde::Serialize;
use std::path::PathBuf;

/// Options for the run command.
#[derive(Debug)]
pub(crate) struct RunOptions {
    pub(crate) players: usize,
    pub(crate) seed: Option<u64>,
    pub(crate) turns: Option<u32>,
    pub(crate) config: Option<PathBuf>,
    pub(crate) resume: Option<PathBuf>,
    pub(crate) format: OutputFormat,
    pub(crate) save: Option<PathBuf>,
    pub(crate) quiet: bool,
}

#[derive(Debug, Serialize)]
struct JsonRunOutput<'a> {
    result: &'a conquest::GameResult,
    state: JsonStateSummary,
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the game cannot be set up or the snapshot cannot be
/// read or written.
pub(crate) fn execute(options: &RunOptions) -> Result<(), CliError> {
    let mut engine = match &options.resume {
        Some(path) => GameEngine::load(path)
            .map_err(|e| CliError::new(format!("Failed to load {}: {e}", path.display())))?,
        None => {
            let mut config = load_config(options.config.as_deref())?;
            config.seed = seed_or_clock(options.seed);
            let setup = GameSetup::builtin(config)?;
            GameEngine::new(
                setup.config,
                setup.rules,
                setup.world,
                &conquest::PlayerSetup::roster(options.players),
            )?
        }
    };
    if let Some(turns) = options.turns {
        engine.set_max_turns(turns);
    }

    let seed = engine.state().rng.seed();
    if !options.quiet && options.format == OutputFormat::Text {
        println!("Running game with seed {seed}...");
        println!("Players: {}", engine.state().ledger.len());
        println!();
    }

    let result = play(&mut engine);

    if let Some(save_path) = &options.save {
        engine
            .save(save_path)
            .map_err(|e| CliError::new(format!("Failed to save snapshot: {e}")))?;
        if !options.quiet && options.format == OutputFormat::Text {
            println!("Snapshot saved to: {}", save_path.display());
            println!();
        }
    }

    let view = engine.view();
    match options.format {
        OutputFormat::Text => {
            if !options.quiet {
                println!("Game log (newest entries):");
                print!("{}", format_log(&view, 30));
                println!();
                print!("{}", format_state_text(&view));
                println!();
            }
            print!("{}", format_text(&result, &view));
        }
        OutputFormat::Json => {
            let output = JsonRunOutput {
                result: &result,
                state: JsonStateSummary::from_view(&view),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
