//! Simulate command implementation.

use super::output::{
    JsonSimulationResult, SimulationStats, format_simulation_csv, format_simulation_text,
};
use super::{CliError, SimulateFormat, load_config, seed_or_clock};
use conquest::game::{MAX_PLAYERS, MIN_PLAYERS};
use conquest::{GameSetup, run_game};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Options for the simulate command.
#[derive(Debug)]
pub(crate) struct SimulateOptions {
    pub(crate) players: usize,
    pub(crate) games: u64,
    pub(crate) seed: Option<u64>,
    pub(crate) threads: Option<usize>,
    pub(crate) max_turns: Option<u32>,
    pub(crate) config: Option<PathBuf>,
    pub(crate) format: SimulateFormat,
    pub(crate) progress: bool,
}

/// Execute the simulate command.
///
/// # Errors
///
/// Returns an error if the configuration or player count is invalid.
pub(crate) fn execute(options: &SimulateOptions) -> Result<(), CliError> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&options.players) {
        return Err(CliError::new(format!(
            "Player count {} outside {MIN_PLAYERS}..={MAX_PLAYERS}",
            options.players
        )));
    }

    // Set thread pool size if specified
    if let Some(num_threads) = options.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let base_seed = seed_or_clock(options.seed);
    let mut config = load_config(options.config.as_deref())?;
    if let Some(t) = options.max_turns {
        config.max_turns = t;
    }
    config.validate()?;
    let setup = GameSetup::builtin(config)?;

    // Progress bar
    let pb = if options.progress {
        let pb = ProgressBar::new(options.games);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games ({per_sec})",
            )
            .map_err(|e| CliError::new(format!("Invalid progress template: {e}")))?
            .progress_chars("=>-");
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let num_players = options.players;

    // Each worker accumulates its own stats, merged at the end
    let stats = (0..options.games)
        .into_par_iter()
        .fold(
            || SimulationStats::new(num_players),
            |mut local_stats, i| {
                let game_seed = base_seed.wrapping_add(i);
                match run_game(game_seed, num_players, &setup) {
                    Ok(result) => local_stats.add_result(&result),
                    Err(e) => tracing::error!(seed = game_seed, %e, "game failed"),
                }
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
                local_stats
            },
        )
        .reduce(
            || SimulationStats::new(num_players),
            |mut a, b| {
                a.merge(&b);
                a
            },
        );

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    let duration = start.elapsed();

    match options.format {
        SimulateFormat::Text => {
            println!();
            print!("{}", format_simulation_text(&stats));
            println!();
            #[allow(clippy::cast_precision_loss)]
            let games_per_sec = if duration.as_secs_f64() > 0.0 {
                stats.games_played as f64 / duration.as_secs_f64()
            } else {
                0.0
            };
            println!(
                "Duration: {:.2}s ({games_per_sec:.0} games/sec)",
                duration.as_secs_f64()
            );
        }
        SimulateFormat::Json => {
            let json_result = JsonSimulationResult::from_stats(&stats);
            println!("{}", serde_json::to_string_pretty(&json_result)?);
        }
        SimulateFormat::Csv => {
            print!("{}", format_simulation_csv(&stats));
        }
    }

    Ok(())
}
