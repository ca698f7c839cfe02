//! Data table validation command implementation.

use super::{CliError, load_config};
use conquest::{GameEngine, MapData, PlayerSetup, Rules};
use std::path::Path;

fn source(path: Option<&Path>) -> String {
    path.map_or_else(|| "built-in".to_string(), |p| p.display().to_string())
}

/// Execute the validate command.
///
/// # Errors
///
/// Returns an error if any table or the config fails to load or validate.
pub(crate) fn execute(
    map: Option<&Path>,
    techs: Option<&Path>,
    events: Option<&Path>,
    config: Option<&Path>,
) -> Result<(), CliError> {
    println!("Validating tables");
    println!();

    let map_data = match map {
        Some(path) => MapData::from_path(path),
        None => MapData::builtin(),
    };
    let world = map_data.and_then(|m| m.build());
    print_check(&format!("Map ({})", source(map)), world.is_ok());
    let world = world.map_err(|e| CliError::new(format!("Map invalid: {e}")))?;

    let rules = match (techs, events) {
        (Some(t), Some(e)) => Rules::from_paths(t, e),
        _ => Rules::builtin(),
    };
    print_check(
        &format!(
            "Technologies and events ({}, {})",
            source(techs),
            source(events)
        ),
        rules.is_ok(),
    );
    let rules = rules.map_err(|e| CliError::new(format!("Rules invalid: {e}")))?;

    let game_config = load_config(config);
    let game_config = game_config.and_then(|c| {
        c.validate()?;
        Ok(c)
    });
    print_check(&format!("Config ({})", source(config)), game_config.is_ok());
    let game_config = game_config?;

    // Smoke test: the tables must support a two-player game
    let engine = GameEngine::new(
        game_config,
        rules.clone(),
        world.clone(),
        &PlayerSetup::roster(2),
    );
    let consistent = engine
        .as_ref()
        .is_ok_and(|e| e.check_invariants().is_empty());
    print_check("Two-player setup", consistent);
    engine?;

    println!();
    println!("Summary:");
    println!("  Territories:  {}", world.len());
    println!("  Continents:   {}", world.continents().len());
    println!("  Technologies: {}", rules.techs.len());
    println!("  Events:       {}", rules.events.events().len());
    println!();
    println!("Validation successful!");

    Ok(())
}

fn print_check(name: &str, ok: bool) {
    let status = if ok { "OK" } else { "FAILED" };
    let symbol = if ok { "✓" } else { "✗" };
    println!("  {symbol} {name}: {status}");
}
