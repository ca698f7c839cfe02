//! Game state aggregate.
//!
//! Every manager in the engine reads and writes this one struct; there is no
//! other mutable game data. The whole struct is serializable, which is what
//! the snapshot format is built on.

use std::collections::VecDeque;
use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::data::Rules;
use crate::game::{
    CardEconomy, EventRegistry, Ledger, Player, PlayerId, TechEffect, TerritoryId, VictoryType,
    World,
};

/// Maximum number of players in a game.
pub const MAX_PLAYERS: usize = 8;

/// Minimum number of players in a game.
pub const MIN_PLAYERS: usize = 2;

/// Phase of the current player's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Placing reinforcements, trading cards, upgrading units.
    Reinforcement,
    /// Attacking neighbours.
    Attack,
    /// One fortification move.
    Fortification,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reinforcement => "reinforcement",
            Self::Attack => "attack",
            Self::Fortification => "fortification",
        };
        f.write_str(name)
    }
}

/// A conquest waiting for the attacker's army transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConquest {
    /// Attacking territory.
    pub from: TerritoryId,
    /// Emptied territory.
    pub to: TerritoryId,
    /// Smallest valid transfer.
    pub min_armies: u32,
    /// Largest valid transfer.
    pub max_armies: u32,
    /// Attacking player.
    pub attacker: PlayerId,
    /// Previous owner (`None` for neutral).
    pub defender: Option<PlayerId>,
}

/// Flags reset at the start of each player's turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFlags {
    /// A territory was conquered this turn.
    pub conquered: bool,
    /// The fortification move was used this turn.
    pub fortified: bool,
    /// Reinforcements left to place.
    pub reinforcements: u32,
    /// Hand was at the forced-trade threshold when the turn began. Cleared
    /// once a trade brings it below; cards won later do not set it.
    #[serde(default)]
    pub forced_trade: bool,
}

/// One line of the game log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonic sequence number.
    pub seq: u64,
    /// Turn counter when logged.
    pub turn: u32,
    /// Acting player, if any.
    pub player: Option<PlayerId>,
    /// Human-readable description.
    pub message: String,
}

/// Append-only game log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    next_seq: u64,
}

impl EventLog {
    /// Append an entry.
    pub fn push(&mut self, turn: u32, player: Option<PlayerId>, message: impl Into<String>) {
        self.entries.push(LogEntry {
            seq: self.next_seq,
            turn,
            player,
            message: message.into(),
        });
        self.next_seq += 1;
    }

    /// All retained entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries ever logged (including trimmed ones).
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.next_seq
    }

    /// Copy keeping only the newest `limit` entries.
    #[must_use]
    pub fn tail(&self, limit: usize) -> Self {
        let start = self.entries.len().saturating_sub(limit);
        Self {
            entries: self.entries[start..].to_vec(),
            next_seq: self.next_seq,
        }
    }
}

/// Deterministic random stream.
///
/// Each draw seeds a fresh `SmallRng` from the game seed and a draw counter,
/// so the stream position is two integers and survives serialization.
/// Scripted dice, when loaded, are consumed before any random roll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngStream {
    seed: u64,
    draws: u64,
    #[serde(default)]
    scripted: VecDeque<u8>,
}

impl RngStream {
    /// Stream at position zero.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            draws: 0,
            scripted: VecDeque::new(),
        }
    }

    /// Game seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of draws taken so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    /// Take the next generator from the stream.
    pub fn fork(&mut self) -> SmallRng {
        let rng = SmallRng::seed_from_u64(mix(self.seed, self.draws));
        self.draws += 1;
        rng
    }

    /// Queue dice faces to be returned before random rolls.
    pub fn load_dice(&mut self, dice: impl IntoIterator<Item = u8>) {
        self.scripted
            .extend(dice.into_iter().map(|d| d.clamp(1, 6)));
    }

    /// Scripted dice still queued.
    #[must_use]
    pub fn scripted_remaining(&self) -> usize {
        self.scripted.len()
    }

    /// Roll `count` six-sided dice.
    pub fn roll_dice(&mut self, count: usize) -> Vec<u8> {
        let mut rng: Option<SmallRng> = None;
        (0..count)
            .map(|_| match self.scripted.pop_front() {
                Some(face) => face,
                None => rng.get_or_insert_with(|| self.fork()).random_range(1..=6),
            })
            .collect()
    }

    /// Bernoulli trial with a percentage chance.
    pub fn chance(&mut self, percent: u32) -> bool {
        if percent == 0 {
            return false;
        }
        if percent >= 100 {
            return true;
        }
        self.fork().random_range(0..100) < percent
    }
}

/// Deterministic 64-bit mix of a seed and an index.
#[must_use]
fn mix(seed: u64, index: u64) -> u64 {
    let mut x = seed.wrapping_add(index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

/// Complete game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Game parameters.
    pub config: GameConfig,
    /// Technology and event catalogs.
    pub rules: Rules,
    /// Territory graph.
    pub world: World,
    /// Players.
    pub ledger: Ledger,
    /// Deck, discard pile and trade counter.
    pub cards: CardEconomy,
    /// Active events and occurrence counts.
    pub events: EventRegistry,
    /// Current phase.
    pub phase: Phase,
    /// Roster index of the current player.
    pub current: usize,
    /// Turn counter, starting at 1 and incremented every full round.
    pub turn: u32,
    /// Per-turn flags.
    pub flags: TurnFlags,
    /// Conquest awaiting its army transfer.
    pub pending: Option<PendingConquest>,
    /// Whether the game has ended.
    pub game_over: bool,
    /// Winning player.
    pub winner: Option<PlayerId>,
    /// How the game was won.
    pub victory: Option<VictoryType>,
    /// Game log.
    pub log: EventLog,
    /// Random stream.
    pub rng: RngStream,
}

impl GameState {
    /// Id of the player whose turn it is.
    #[must_use]
    pub fn current_player(&self) -> PlayerId {
        self.ledger.at(self.current).map_or(0, |p| p.id)
    }

    /// Current player record.
    #[must_use]
    pub fn current(&self) -> Option<&Player> {
        self.ledger.at(self.current)
    }

    /// Effects of every technology a player owns.
    pub fn owned_effects(&self, player: PlayerId) -> impl Iterator<Item = &TechEffect> {
        self.ledger
            .get(player)
            .into_iter()
            .flat_map(|p| p.techs.iter())
            .filter_map(|id| self.rules.techs.get(id))
            .flat_map(|tech| tech.effects.iter())
    }

    /// Append a log line at the current turn.
    pub fn log(&mut self, player: Option<PlayerId>, message: impl Into<String>) {
        self.log.push(self.turn, player, message);
    }
}
