//! Conquest CLI - Command-line interface for running and inspecting games.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt};

/// Conquest - A deterministic turn-based conquest engine
#[derive(Parser, Debug)]
#[command(name = "conquest")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace); `RUST_LOG` overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Play one game between computer players
    Run {
        /// Number of players (2-8)
        #[arg(short = 'n', long, default_value = "2")]
        players: usize,

        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Maximum turns (default: from config)
        #[arg(short, long)]
        turns: Option<u32>,

        /// Game config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Resume from a snapshot instead of starting a new game
        #[arg(long, conflicts_with_all = ["players", "config"])]
        resume: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Save a snapshot of the final state to file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Suppress the game log
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run many games in parallel and aggregate statistics
    Simulate {
        /// Number of players (2-8)
        #[arg(short = 'n', long, default_value = "4")]
        players: usize,

        /// Number of games to run (default: 100)
        #[arg(short, long, default_value = "100")]
        games: u64,

        /// Starting seed (increments for each game)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Maximum turns per game (default: from config)
        #[arg(short = 't', long)]
        max_turns: Option<u32>,

        /// Game config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format: text, json, or csv
        #[arg(short, long, default_value = "text")]
        format: cli::SimulateFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// Print a summary of a saved snapshot
    Inspect {
        /// Snapshot file
        #[arg(required = true)]
        snapshot: PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Log entries to show (default: 20)
        #[arg(short, long, default_value = "20")]
        log: usize,
    },

    /// Validate map, technology, event and config files
    Validate {
        /// Map JSON file (default: built-in)
        #[arg(long)]
        map: Option<PathBuf>,

        /// Technology JSON file (default: built-in)
        #[arg(long, requires = "events")]
        techs: Option<PathBuf>,

        /// Event JSON file (default: built-in)
        #[arg(long, requires = "techs")]
        events: Option<PathBuf>,

        /// Game config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Run {
            players,
            seed,
            turns,
            config,
            resume,
            format,
            save,
            quiet,
        } => cli::run::execute(&cli::run::RunOptions {
            players,
            seed,
            turns,
            config,
            resume,
            format,
            save,
            quiet,
        }),

        Commands::Simulate {
            players,
            games,
            seed,
            threads,
            max_turns,
            config,
            format,
            progress,
        } => cli::simulate::execute(&cli::simulate::SimulateOptions {
            players,
            games,
            seed,
            threads,
            max_turns,
            config,
            format,
            progress,
        }),

        Commands::Inspect {
            snapshot,
            format,
            log,
        } => cli::inspect::execute(&snapshot, format, log),

        Commands::Validate {
            map,
            techs,
            events,
            config,
        } => cli::validate::execute(
            map.as_deref(),
            techs.as_deref(),
            events.as_deref(),
            config.as_deref(),
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
