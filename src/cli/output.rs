//! Output formatting utilities for CLI.

use std::fmt::Write as _;

use conquest::game::GameView;
use conquest::simulate::GameResult;
use conquest::{PlayerId, VictoryType};
use serde::Serialize;

const VICTORY_TYPES: [VictoryType; 4] = [
    VictoryType::Military,
    VictoryType::Economic,
    VictoryType::Technological,
    VictoryType::Diplomatic,
];

fn victory_index(victory: VictoryType) -> usize {
    match victory {
        VictoryType::Military => 0,
        VictoryType::Economic => 1,
        VictoryType::Technological => 2,
        VictoryType::Diplomatic => 3,
    }
}

/// Format a game result as human-readable text.
pub(super) fn format_text(result: &GameResult, view: &GameView<'_>) -> String {
    let mut output = String::new();
    let name = |id: PlayerId| view.player(id).map_or("Unknown", |p| p.name.as_str());

    let _ = writeln!(output, "Game Result (seed: {})", result.seed);
    match (result.winner, result.victory) {
        (Some(winner), Some(victory)) => {
            let _ = writeln!(
                output,
                "  Winner: Player {winner} ({}) by {victory} victory",
                name(winner)
            );
        }
        _ => output.push_str("  Winner: none (turn limit)\n"),
    }
    let _ = writeln!(output, "  Turns: {}", result.turns_played);
    let _ = writeln!(output, "  Actions: {}\n", result.actions);

    for stats in &result.player_stats {
        let _ = write!(
            output,
            "  Player {} ({}): {} territories, {} armies, {} techs",
            stats.player_id,
            name(stats.player_id),
            stats.territories,
            stats.army_value,
            stats.techs
        );
        if let Some(turn) = stats.eliminated_turn {
            let _ = write!(output, " [eliminated turn {turn}]");
        }
        output.push('\n');
    }

    output
}

/// Format the newest log lines.
pub(super) fn format_log(view: &GameView<'_>, limit: usize) -> String {
    let log = view.log();
    let start = log.len().saturating_sub(limit);
    let mut output = String::new();
    for entry in &log[start..] {
        let who = entry
            .player
            .map_or_else(|| "game".to_string(), |p| format!("P{p}"));
        let _ = writeln!(output, "  [{:>3}] {:<4} {}", entry.turn, who, entry.message);
    }
    output
}

/// Format a board summary as human-readable text.
pub(super) fn format_state_text(view: &GameView<'_>) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Turn {}, player {} to act ({} phase)",
        view.turn(),
        view.current_player(),
        view.phase()
    );
    if view.is_game_over() {
        let winner = view.winner().map_or_else(|| "none".to_string(), |w| w.to_string());
        let victory = view.victory().map_or_else(|| "-".to_string(), |v| v.to_string());
        let _ = writeln!(output, "Game over: winner {winner} ({victory})");
    }
    if let Some(pending) = view.pending_conquest() {
        let _ = writeln!(
            output,
            "Pending conquest {} -> {}: move {}..={} armies",
            pending.from, pending.to, pending.min_armies, pending.max_armies
        );
    }
    output.push('\n');

    for p in view.players() {
        let world = view.world();
        let r = &p.resources;
        let _ = write!(
            output,
            "  Player {} ({}, {}): {} territories, {} armies, {} cards, {} techs",
            p.id,
            p.name,
            p.color,
            world.count_owned(p.id),
            world.total_army_value(p.id),
            p.hand.len(),
            p.techs.len()
        );
        if p.eliminated {
            output.push_str(" [eliminated]");
        }
        let _ = writeln!(
            output,
            "\n    food {} production {} research {} wealth {}",
            r.food, r.production, r.research, r.wealth
        );
        if let Some(head) = p.research_queue.first() {
            let _ = writeln!(output, "    researching {head} ({} invested)", p.research_progress);
        }
        if !p.allies.is_empty() {
            let allies: Vec<String> = p.allies.iter().map(ToString::to_string).collect();
            let _ = writeln!(output, "    allied with {}", allies.join(", "));
        }
    }

    let active = view.state().events.active();
    if !active.is_empty() {
        output.push_str("\nActive events:\n");
        for event in active {
            let _ = writeln!(
                output,
                "  {} (until turn {})",
                event.name, event.end_turn
            );
        }
    }
    output
}

/// JSON-serializable board summary.
#[derive(Debug, Serialize)]
pub(super) struct JsonStateSummary {
    turn: u32,
    phase: String,
    current_player: PlayerId,
    game_over: bool,
    winner: Option<PlayerId>,
    victory: Option<VictoryType>,
    players: Vec<JsonPlayerSummary>,
}

/// JSON-serializable per-player summary.
#[derive(Debug, Serialize)]
pub(super) struct JsonPlayerSummary {
    id: PlayerId,
    name: String,
    territories: u32,
    army_value: u32,
    cards: usize,
    techs: Vec<String>,
    eliminated: bool,
}

impl JsonStateSummary {
    /// Create from a game view.
    pub(super) fn from_view(view: &GameView<'_>) -> Self {
        Self {
            turn: view.turn(),
            phase: view.phase().to_string(),
            current_player: view.current_player(),
            game_over: view.is_game_over(),
            winner: view.winner(),
            victory: view.victory(),
            players: view
                .players()
                .iter()
                .map(|p| JsonPlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    territories: view.world().count_owned(p.id),
                    army_value: view.world().total_army_value(p.id),
                    cards: p.hand.len(),
                    techs: p.techs.iter().cloned().collect(),
                    eliminated: p.eliminated,
                })
                .collect(),
        }
    }
}

/// Simulation statistics for aggregated results.
#[derive(Debug, Default)]
pub(super) struct SimulationStats {
    /// Total games played.
    pub(super) games_played: u64,
    /// Win count per player.
    pub(super) wins: Vec<u64>,
    /// Games that hit the turn limit.
    pub(super) draws: u64,
    /// Wins per victory type.
    victories: [u64; 4],
    /// Total territories held at the end, per player.
    total_territories: Vec<u64>,
    /// Total rejected actions, per player.
    total_rejected: Vec<u64>,
    /// Total turns across all games.
    total_turns: u64,
}

impl SimulationStats {
    /// Create new stats for n players.
    pub(super) fn new(num_players: usize) -> Self {
        Self {
            games_played: 0,
            wins: vec![0; num_players],
            draws: 0,
            victories: [0; 4],
            total_territories: vec![0; num_players],
            total_rejected: vec![0; num_players],
            total_turns: 0,
        }
    }

    /// Add a game result to the stats.
    pub(super) fn add_result(&mut self, result: &GameResult) {
        self.games_played += 1;
        self.total_turns += u64::from(result.turns_played);

        if let Some(winner) = result.winner {
            let idx = usize::from(winner).saturating_sub(1);
            if let Some(wins) = self.wins.get_mut(idx) {
                *wins += 1;
            }
        } else {
            self.draws += 1;
        }
        if let Some(victory) = result.victory {
            self.victories[victory_index(victory)] += 1;
        }

        for (i, stats) in result.player_stats.iter().enumerate() {
            if let Some(total) = self.total_territories.get_mut(i) {
                *total += u64::from(stats.territories);
            }
            if let Some(total) = self.total_rejected.get_mut(i) {
                *total += u64::from(stats.rejected_actions);
            }
        }
    }

    /// Merge another accumulator into this one.
    pub(super) fn merge(&mut self, other: &Self) {
        self.games_played += other.games_played;
        self.draws += other.draws;
        self.total_turns += other.total_turns;
        for (a, b) in self.victories.iter_mut().zip(other.victories) {
            *a += b;
        }
        for (a, b) in self.wins.iter_mut().zip(&other.wins) {
            *a += b;
        }
        for (a, b) in self.total_territories.iter_mut().zip(&other.total_territories) {
            *a += b;
        }
        for (a, b) in self.total_rejected.iter_mut().zip(&other.total_rejected) {
            *a += b;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn ratio(value: u64, games: u64) -> f64 {
        if games == 0 {
            return 0.0;
        }
        value as f64 / games as f64
    }

    /// Get win rate for a player (0.0-1.0).
    pub(super) fn win_rate(&self, player_idx: usize) -> f64 {
        Self::ratio(
            self.wins.get(player_idx).copied().unwrap_or(0),
            self.games_played,
        )
    }

    /// Get average final territory count for a player.
    pub(super) fn avg_territories(&self, player_idx: usize) -> f64 {
        Self::ratio(
            self.total_territories.get(player_idx).copied().unwrap_or(0),
            self.games_played,
        )
    }

    /// Get average rejected actions per game for a player.
    pub(super) fn avg_rejected(&self, player_idx: usize) -> f64 {
        Self::ratio(
            self.total_rejected.get(player_idx).copied().unwrap_or(0),
            self.games_played,
        )
    }

    /// Get average game length.
    pub(super) fn avg_turns(&self) -> f64 {
        Self::ratio(self.total_turns, self.games_played)
    }

    /// Wins of one victory type.
    pub(super) fn victories(&self, victory: VictoryType) -> u64 {
        self.victories[victory_index(victory)]
    }
}

/// JSON-serializable simulation result.
#[derive(Debug, Serialize)]
pub(super) struct JsonSimulationResult {
    /// Total games played.
    games_played: u64,
    /// Per-player statistics.
    players: Vec<JsonSimulationPlayer>,
    /// Number of games without a winner.
    draws: u64,
    /// Wins per victory type.
    victories: Vec<(VictoryType, u64)>,
    /// Average game length in turns.
    avg_turns: f64,
}

/// JSON-serializable per-player simulation stats.
#[derive(Debug, Serialize)]
pub(super) struct JsonSimulationPlayer {
    /// Player id (1-based).
    player: usize,
    /// Number of wins.
    wins: u64,
    /// Win rate (0.0-1.0).
    win_rate: f64,
    /// Average territories at the end.
    avg_territories: f64,
    /// Average rejected actions per game.
    avg_rejected: f64,
}

impl JsonSimulationResult {
    /// Create from stats.
    pub(super) fn from_stats(stats: &SimulationStats) -> Self {
        let players = (0..stats.wins.len())
            .map(|i| JsonSimulationPlayer {
                player: i + 1,
                wins: stats.wins.get(i).copied().unwrap_or(0),
                win_rate: stats.win_rate(i),
                avg_territories: stats.avg_territories(i),
                avg_rejected: stats.avg_rejected(i),
            })
            .collect();

        Self {
            games_played: stats.games_played,
            players,
            draws: stats.draws,
            victories: VICTORY_TYPES
                .iter()
                .map(|&v| (v, stats.victories(v)))
                .collect(),
            avg_turns: stats.avg_turns(),
        }
    }
}

/// Format simulation stats as human-readable text.
pub(super) fn format_simulation_text(stats: &SimulationStats) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Simulation Results ({} games)", stats.games_played);
    output.push_str("========================================\n\n");

    output.push_str("Win Rates:\n");
    for i in 0..stats.wins.len() {
        let wins = stats.wins.get(i).copied().unwrap_or(0);
        let rate = stats.win_rate(i) * 100.0;
        let _ = writeln!(output, "  Player {}: {rate:.1}% ({wins} wins)", i + 1);
    }
    let _ = writeln!(
        output,
        "  No winner: {} ({:.1}%)\n",
        stats.draws,
        SimulationStats::ratio(stats.draws, stats.games_played) * 100.0
    );

    output.push_str("Victory Types:\n");
    for victory in VICTORY_TYPES {
        let _ = writeln!(output, "  {victory}: {}", stats.victories(victory));
    }

    output.push_str("\nAverage Territories at End:\n");
    for i in 0..stats.wins.len() {
        let _ = writeln!(
            output,
            "  Player {}: {:.1} (rejected actions {:.1}/game)",
            i + 1,
            stats.avg_territories(i),
            stats.avg_rejected(i)
        );
    }

    let _ = writeln!(output, "\nAverage Game Length: {:.0} turns", stats.avg_turns());

    output
}

/// Format simulation stats as CSV.
pub(super) fn format_simulation_csv(stats: &SimulationStats) -> String {
    let mut output = String::new();

    output.push_str("player,wins,win_rate,avg_territories,avg_rejected\n");

    for i in 0..stats.wins.len() {
        let _ = writeln!(
            output,
            "{},{},{:.4},{:.2},{:.2}",
            i + 1,
            stats.wins.get(i).copied().unwrap_or(0),
            stats.win_rate(i),
            stats.avg_territories(i),
            stats.avg_rejected(i)
        );
    }

    output
}
