// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Conquest: a deterministic turn-based territorial conquest engine.
//!
//! Players take turns reinforcing, attacking and fortifying on a graph of
//! territories, while collecting resources, researching technologies,
//! trading cards and forming alliances. Everything random is drawn from a
//! seeded stream, so a seed and a sequence of actions reproduce a game
//! exactly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   CLI / simulation runner / agents  │
//! ├─────────────────────────────────────┤
//! │   GameEngine (actions + queries)    │
//! ├─────────────────────────────────────┤
//! │   Rule modules over one GameState   │
//! ├─────────────────────────────────────┤
//! │   Data tables (map, techs, events)  │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use conquest::{GameConfig, GameEngine, Phase};
//!
//! let mut engine = GameEngine::builtin(2, GameConfig::default()).unwrap();
//! let player = engine.current_player();
//! let territory = engine.state().world.owned_by(player).next().unwrap().id;
//! let armies = engine.available_reinforcements();
//! engine.place_reinforcements(player, territory, armies).unwrap();
//! assert_eq!(engine.phase(), Phase::Attack);
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod game;
pub mod simulate;

pub use config::{ConfigError, GameConfig};
pub use data::{MapData, Rules};
pub use error::{ActionError, ActionResult, DataError, ErrorKind, SetupError, SnapshotError};

// Re-export key game types at crate root for convenience
pub use game::{
    Action, ActionReport, ActionSource, GameEngine, GameState, GameView, GreedyAgent, Phase,
    PhaseChange, Player, PlayerId, PlayerSetup, TerritoryId, UnitType, VictoryType, World,
};
pub use simulate::{GameResult, GameSetup, PlayerStats, SimulationError, play, run_game};
