//! Game layer for Conquest.
//!
//! Implements the rules on top of one [`GameState`] aggregate:
//! - Territory graph with unit counts and continents
//! - Players with resources, card hands, technologies and alliances
//! - Income, research, random events and card trading
//! - Dice combat, two-step conquest and fortification
//! - Four victory conditions
//! - The turn/phase controller exposing the action and query API
//!
//! Rule modules are public so their free functions can be used directly;
//! [`GameEngine`] is the checked entry point.

mod agent;
mod engine;
mod invariants;
mod ledger;
mod snapshot;
mod state;
mod world;

pub mod cards;
pub mod combat;
pub mod conquest;
pub mod events;
pub mod fortify;
pub mod reinforce;
pub mod research;
pub mod resources;
pub mod victory;

pub use agent::{ActionSource, DEFAULT_ATTACK_LIMIT, GreedyAgent};
pub use cards::{Card, CardEconomy, CardId, CardKind, TradeOutcome};
pub use combat::{AttackOutcome, Die};
pub use conquest::ConquestOutcome;
pub use engine::{Action, ActionReport, GameEngine, GameView, PhaseChange, TurnStart};
pub use events::{
    ActiveEvent, CombatSide, EventCatalog, EventDefinition, EventEffect, EventRegistry,
    EventTarget, TriggeredEvent,
};
pub use fortify::FortifyOutcome;
pub use invariants::{InvariantViolation, check_invariants};
pub use ledger::{Ledger, Player, PlayerId, PlayerSetup};
pub use reinforce::UpgradeOutcome;
pub use research::{
    Completion, ResearchProgress, TechCatalog, TechCategory, TechEffect, TechStatus, Technology,
};
pub use resources::{IncomeReport, ResourceKind, Resources};
pub use snapshot::SNAPSHOT_FORMAT;
pub use state::{
    EventLog, GameState, LogEntry, MAX_PLAYERS, MIN_PLAYERS, PendingConquest, Phase, RngStream,
    TurnFlags,
};
pub use victory::VictoryType;
pub use world::{
    Continent, ContinentId, Feature, Features, Territory, TerritoryId, UnitCounts, UnitType, World,
};
