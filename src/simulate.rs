//! Batch simulation: computer players against each other.
//!
//! Provides a pure function interface: `(seed, players, setup) -> GameResult`.
//! Games share nothing, so the CLI runs many of them in parallel with rayon.

use serde::Serialize;

use crate::config::GameConfig;
use crate::data::{MapData, Rules};
use crate::error::{ActionResult, DataError, SetupError};
use crate::game::{
    Action, ActionReport, ActionSource, GameEngine, GreedyAgent, Phase, PlayerId, PlayerSetup,
    VictoryType, World,
};

/// Actions allowed per player per turn before a game is cut off.
const ACTIONS_PER_TURN: u64 = 256;

/// Everything a game needs besides its seed and roster.
#[derive(Debug, Clone)]
pub struct GameSetup {
    /// Game parameters; the seed is overridden per game.
    pub config: GameConfig,
    /// Technology and event catalogs.
    pub rules: Rules,
    /// Territory graph.
    pub world: World,
}

impl GameSetup {
    /// Built-in map and catalogs with the given config.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in tables fail validation.
    pub fn builtin(config: GameConfig) -> Result<Self, DataError> {
        Ok(Self {
            config,
            rules: Rules::builtin()?,
            world: MapData::builtin()?.build()?,
        })
    }
}

/// Statistics for a single player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Territories held at the end.
    pub territories: u32,
    /// Army value on the board at the end.
    pub army_value: u32,
    /// Technologies unlocked.
    pub techs: usize,
    /// Actions the engine rejected.
    pub rejected_actions: u32,
    /// Turn the player was eliminated (None if survived).
    pub eliminated_turn: Option<u32>,
}

/// Final result of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameResult {
    /// The seed used for this game.
    pub seed: u64,
    /// The winning player (None if the turn limit was reached).
    pub winner: Option<PlayerId>,
    /// How the game was won.
    pub victory: Option<VictoryType>,
    /// Turn counter at the end.
    pub turns_played: u32,
    /// Actions applied successfully.
    pub actions: u64,
    /// Per-player statistics.
    pub player_stats: Vec<PlayerStats>,
    /// Elimination order (first eliminated is index 0).
    pub elimination_order: Vec<PlayerId>,
}

/// Error type for simulation runs.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The game could not be set up.
    #[error("game setup failed: {0}")]
    Setup(#[from] SetupError),
}

/// Run one game between greedy agents.
///
/// # Errors
///
/// Returns an error if the game cannot be set up.
pub fn run_game(
    seed: u64,
    players: usize,
    setup: &GameSetup,
) -> Result<GameResult, SimulationError> {
    let config = GameConfig {
        seed,
        ..setup.config.clone()
    };
    let mut engine = GameEngine::new(
        config,
        setup.rules.clone(),
        setup.world.clone(),
        &PlayerSetup::roster(players),
    )?;
    Ok(play(&mut engine))
}

/// Play an engine forward with one greedy agent per seat.
///
/// Play stops at a victory, when the turn counter passes `max_turns`, or
/// after an action cap. A seat whose actions are rejected
/// `max_invalid_streak` times in a row has its phase forced to end.
pub fn play(engine: &mut GameEngine) -> GameResult {
    let seed = engine.state().rng.seed();
    let players = engine.state().ledger.len();
    let max_turns = engine.state().config.max_turns;
    let max_streak = engine.state().config.max_invalid_streak.max(1);

    let mut agents: Vec<GreedyAgent> = (0..players as u64)
        .map(|i| GreedyAgent::new(seed.wrapping_add(i.wrapping_mul(0x9e37_79b9))))
        .collect();
    let mut rejected = vec![0u32; players];
    let mut elimination_order = Vec::new();
    let mut streak = 0u32;
    let mut actions = 0u64;
    let mut attempts = 0u64;
    let cap = u64::from(max_turns) * players as u64 * ACTIONS_PER_TURN;

    while !engine.is_game_over() && engine.turn() <= max_turns && attempts < cap {
        attempts += 1;
        let player = engine.current_player();
        let seat = usize::from(player).saturating_sub(1);
        let Some(agent) = agents.get_mut(seat) else {
            break;
        };
        let action = agent.next_action(&engine.view(), player);

        match engine.apply(player, action) {
            Ok(report) => {
                streak = 0;
                actions += 1;
                if let ActionReport::Conquered(outcome) = report
                    && outcome.defender_eliminated
                    && let Some(defender) = outcome.defender
                {
                    elimination_order.push(defender);
                }
            }
            Err(err) => {
                tracing::debug!(player, %err, "action rejected");
                if let Some(count) = rejected.get_mut(seat) {
                    *count += 1;
                }
                streak += 1;
                if streak >= max_streak {
                    streak = 0;
                    if let Err(err) = force_end_phase(engine, player, &mut elimination_order) {
                        // The seat can neither act nor pass; the game cannot continue.
                        tracing::warn!(player, %err, "forced phase end rejected");
                        break;
                    }
                }
            }
        }
    }

    let state = engine.state();
    let player_stats = state
        .ledger
        .players()
        .iter()
        .zip(&rejected)
        .map(|(p, &rejected_actions)| PlayerStats {
            player_id: p.id,
            territories: state.world.count_owned(p.id),
            army_value: state.world.total_army_value(p.id),
            techs: p.techs.len(),
            rejected_actions,
            eliminated_turn: p.eliminated_on,
        })
        .collect();

    tracing::info!(
        seed,
        winner = ?engine.winner(),
        turns = engine.turn(),
        actions,
        "simulation finished"
    );
    GameResult {
        seed,
        winner: engine.winner(),
        victory: engine.victory(),
        turns_played: engine.turn(),
        actions,
        player_stats,
        elimination_order,
    }
}

/// Push a stuck seat out of its phase.
///
/// # Errors
///
/// Whatever the engine returns for the resolve, place or end-phase call.
fn force_end_phase(
    engine: &mut GameEngine,
    player: PlayerId,
    eliminated: &mut Vec<PlayerId>,
) -> ActionResult<()> {
    tracing::warn!(player, phase = %engine.phase(), "forcing phase end");
    if let Some(pending) = engine.pending_conquest() {
        let outcome = engine.resolve_conquest(player, pending.min_armies)?;
        if outcome.defender_eliminated
            && let Some(defender) = outcome.defender
        {
            eliminated.push(defender);
        }
        if engine.is_game_over() {
            return Ok(());
        }
    }
    if engine.phase() == Phase::Reinforcement {
        let remaining = engine.available_reinforcements();
        let first = engine.state().world.owned_by(player).next().map(|t| t.id);
        if remaining > 0
            && let Some(territory) = first
        {
            // Placing the whole allowance moves the game to the attack phase.
            engine.apply(
                player,
                Action::PlaceReinforcements {
                    territory,
                    count: remaining,
                },
            )?;
            return Ok(());
        }
    }
    engine.end_phase(player).map(|_| ())
}
