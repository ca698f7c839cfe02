//! Error types for the conquest engine.
//!
//! Player actions fail with [`ActionError`]. Every variant maps onto one of
//! the five [`ErrorKind`] categories so callers (UI or agents) can branch on
//! the category without matching each variant. A rejected action never
//! mutates the game.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::game::{Phase, PlayerId, ResourceKind, TerritoryId};

/// Coarse failure category for a rejected action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Wrong player or wrong phase for the action.
    InvalidActor,
    /// Unowned, unknown or unreachable target.
    InvalidTarget,
    /// Armies, resources or cards below the requirement.
    InsufficientResource,
    /// Inputs that don't form a valid combination (card set, bounds, dice).
    InvalidCombination,
    /// The action conflicts with the current game state.
    StateConflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidActor => "invalid actor",
            Self::InvalidTarget => "invalid target",
            Self::InsufficientResource => "insufficient resource",
            Self::InvalidCombination => "invalid combination",
            Self::StateConflict => "state conflict",
        };
        f.write_str(name)
    }
}

/// Reason a player action was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The game has ended.
    #[error("the game is over")]
    GameOver,
    /// The acting player is not the player whose turn it is.
    #[error("player {player} is not the current player")]
    NotYourTurn {
        /// Player that attempted the action.
        player: PlayerId,
    },
    /// The action is not allowed in the current phase.
    #[error("action not allowed during the {phase} phase")]
    WrongPhase {
        /// Phase the game is in.
        phase: Phase,
    },
    /// No such player.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    /// The player has been eliminated.
    #[error("player {0} has been eliminated")]
    PlayerEliminated(PlayerId),
    /// No such territory.
    #[error("unknown territory {0}")]
    UnknownTerritory(TerritoryId),
    /// The player does not own the territory.
    #[error("territory {territory} is not owned by player {player}")]
    NotOwned {
        /// Acting player.
        player: PlayerId,
        /// Territory in question.
        territory: TerritoryId,
    },
    /// The attacker already owns the target.
    #[error("territory {0} is already owned by the attacker")]
    AlreadyOwned(TerritoryId),
    /// The target is held by an ally.
    #[error("territory {territory} is held by ally {ally}")]
    AlliedTarget {
        /// Target territory.
        territory: TerritoryId,
        /// Allied owner.
        ally: PlayerId,
    },
    /// The two territories are not adjacent.
    #[error("territories {from} and {to} are not adjacent")]
    NotAdjacent {
        /// Source territory.
        from: TerritoryId,
        /// Destination territory.
        to: TerritoryId,
    },
    /// No owned path within the movement range.
    #[error("territory {to} is not reachable from {from} within {range} hops")]
    Unreachable {
        /// Source territory.
        from: TerritoryId,
        /// Destination territory.
        to: TerritoryId,
        /// Effective movement range.
        range: u32,
    },
    /// Source and destination are the same territory.
    #[error("source and destination are both territory {0}")]
    SameTerritory(TerritoryId),
    /// No such technology.
    #[error("unknown technology {0:?}")]
    UnknownTech(String),
    /// No such card, or the card is not in the player's hand.
    #[error("card {0} is not in the player's hand")]
    CardNotHeld(u16),
    /// Alliance target is the acting player.
    #[error("a player cannot ally with themselves")]
    SelfAlliance,
    /// Alliance target is unknown or eliminated.
    #[error("player {0} cannot be allied with")]
    InvalidAllianceTarget(PlayerId),
    /// The territory does not hold enough army value.
    #[error("territory holds {available} army value, {required} required")]
    NotEnoughArmies {
        /// Army value available for the action.
        available: u32,
        /// Army value required.
        required: u32,
    },
    /// More reinforcements requested than remain.
    #[error("{requested} reinforcements requested, {remaining} remaining")]
    NotEnoughReinforcements {
        /// Remaining allowance.
        remaining: u32,
        /// Requested amount.
        requested: u32,
    },
    /// A resource pool is below the cost.
    #[error("{resource} is {available}, {required} required")]
    NotEnoughResource {
        /// Resource in question.
        resource: ResourceKind,
        /// Amount in the pool.
        available: u32,
        /// Amount required.
        required: u32,
    },
    /// Not enough infantry to convert.
    #[error("{available} infantry available, {required} required")]
    NotEnoughInfantry {
        /// Infantry present.
        available: u32,
        /// Infantry required.
        required: u32,
    },
    /// A count of zero was supplied.
    #[error("count must be at least 1")]
    ZeroCount,
    /// Dice count outside the allowed range.
    #[error("{requested} dice requested, allowed 1..={max}")]
    InvalidDiceCount {
        /// Requested dice.
        requested: u8,
        /// Largest allowed dice count.
        max: u8,
    },
    /// Army transfer outside the pending conquest bounds.
    #[error("{requested} armies requested, must be within {min}..={max}")]
    ConquestOutOfRange {
        /// Smallest valid transfer.
        min: u32,
        /// Largest valid transfer.
        max: u32,
        /// Requested transfer.
        requested: u32,
    },
    /// A set needs exactly three cards.
    #[error("a card set needs exactly 3 distinct cards, got {0}")]
    WrongCardCount(usize),
    /// The cards don't form a valid set.
    #[error("cards do not form a valid set")]
    InvalidCardSet,
    /// A prerequisite technology is missing.
    #[error("technology {tech:?} requires {prerequisite:?}")]
    MissingPrerequisite {
        /// Technology requested.
        tech: String,
        /// Missing prerequisite.
        prerequisite: String,
    },
    /// Only cavalry and artillery can be produced by upgrading.
    #[error("infantry cannot be an upgrade target")]
    InvalidUpgrade,
    /// A conquest decision is outstanding.
    #[error("a conquest is awaiting its army transfer")]
    ConquestPending,
    /// No conquest decision is outstanding.
    #[error("no conquest is pending")]
    NoPendingConquest,
    /// Fortification already used this turn.
    #[error("already fortified this turn")]
    AlreadyFortified,
    /// Reinforcements remain to be placed.
    #[error("{0} reinforcements still to place")]
    UnplacedReinforcements(u32),
    /// Technology already owned or queued.
    #[error("technology {0:?} is already owned or queued")]
    AlreadyResearched(String),
    /// Players are already allied.
    #[error("players {0} and {1} are already allied")]
    AlreadyAllied(PlayerId, PlayerId),
    /// Players are not allied.
    #[error("players {0} and {1} are not allied")]
    NotAllied(PlayerId, PlayerId),
}

impl ActionError {
    /// Failure category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotYourTurn { .. }
            | Self::WrongPhase { .. }
            | Self::UnknownPlayer(_)
            | Self::PlayerEliminated(_) => ErrorKind::InvalidActor,
            Self::UnknownTerritory(_)
            | Self::NotOwned { .. }
            | Self::AlreadyOwned(_)
            | Self::AlliedTarget { .. }
            | Self::NotAdjacent { .. }
            | Self::Unreachable { .. }
            | Self::SameTerritory(_)
            | Self::UnknownTech(_)
            | Self::CardNotHeld(_)
            | Self::SelfAlliance
            | Self::InvalidAllianceTarget(_) => ErrorKind::InvalidTarget,
            Self::NotEnoughArmies { .. }
            | Self::NotEnoughReinforcements { .. }
            | Self::NotEnoughResource { .. }
            | Self::NotEnoughInfantry { .. } => ErrorKind::InsufficientResource,
            Self::ZeroCount
            | Self::InvalidDiceCount { .. }
            | Self::ConquestOutOfRange { .. }
            | Self::WrongCardCount(_)
            | Self::InvalidCardSet
            | Self::MissingPrerequisite { .. }
            | Self::InvalidUpgrade => ErrorKind::InvalidCombination,
            Self::GameOver
            | Self::ConquestPending
            | Self::NoPendingConquest
            | Self::AlreadyFortified
            | Self::UnplacedReinforcements(_)
            | Self::AlreadyResearched(_)
            | Self::AlreadyAllied(..)
            | Self::NotAllied(..) => ErrorKind::StateConflict,
        }
    }
}

/// Result type for player actions.
pub type ActionResult<T> = Result<T, ActionError>;

/// Failure loading or validating static data tables.
#[derive(Debug, Error)]
pub enum DataError {
    /// Malformed JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// File could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A name refers to no territory.
    #[error("unknown territory {0:?}")]
    UnknownTerritory(String),
    /// A name refers to no continent.
    #[error("unknown continent {0:?}")]
    UnknownContinent(String),
    /// Two entries share an identifier.
    #[error("duplicate identifier {0:?}")]
    Duplicate(String),
    /// A territory is linked to itself.
    #[error("territory {0:?} is connected to itself")]
    SelfLoop(String),
    /// A territory has no neighbours.
    #[error("territory {0:?} has no connections")]
    Isolated(String),
    /// A prerequisite names no technology.
    #[error("technology {tech:?} has unknown prerequisite {prerequisite:?}")]
    UnknownPrerequisite {
        /// Technology declaring the prerequisite.
        tech: String,
        /// Unknown prerequisite id.
        prerequisite: String,
    },
    /// The prerequisite graph has a cycle.
    #[error("technology prerequisites form a cycle through {0:?}")]
    CyclicPrerequisites(Vec<String>),
    /// An event references an unknown technology.
    #[error("event {event:?} requires unknown technology {tech:?}")]
    UnknownEventTech {
        /// Event id.
        event: String,
        /// Unknown technology id.
        tech: String,
    },
}

/// Failure creating a new game.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Player count outside 2..=8.
    #[error("{0} players requested, a game needs 2 to 8")]
    PlayerCount(usize),
    /// The map is too small for the players.
    #[error("map has {territories} territories, too few for {players} players")]
    TooFewTerritories {
        /// Territories on the map.
        territories: usize,
        /// Players requested.
        players: usize,
    },
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A data table failed to load.
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Failure saving or restoring a game snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Malformed JSON or wrong shape.
    #[error("snapshot json error: {0}")]
    Json(#[from] serde_json::Error),
    /// File could not be read or written.
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    /// The snapshot parsed but describes an inconsistent game.
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
}
