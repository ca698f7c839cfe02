//! Game parameters.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. The binary layers CLI flags on top of a loaded file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON.
    #[error("config json error: {0}")]
    Json(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunable game parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for the deterministic random stream.
    pub seed: u64,
    /// Infantry placed on each territory at deal time.
    pub initial_armies: u32,
    /// Reinforcement floor.
    pub min_reinforcements: u32,
    /// Territories per reinforcement army.
    pub territories_per_army: u32,
    /// Maximum attack dice.
    pub max_attack_dice: u8,
    /// Maximum defense dice.
    pub max_defense_dice: u8,
    /// Rewards for the first card sets traded game-wide.
    pub card_rewards: Vec<u32>,
    /// Reward increase per set after the schedule runs out.
    pub card_reward_step: u32,
    /// Infantry placed on each owned territory pictured on a traded card.
    pub territory_card_bonus: u32,
    /// Wild cards in the deck.
    pub wild_cards: u32,
    /// Hand size that forces a trade.
    pub forced_trade_threshold: usize,
    /// Technology cost increase per owned technology, in percent.
    pub tech_cost_scaling_percent: u32,
    /// Technology discount per owned research center, in percent.
    pub research_center_discount_percent: u32,
    /// Cap on the research center discount, in percent.
    pub max_research_discount_percent: u32,
    /// Chance of an event at each turn start, in percent.
    pub event_chance_percent: u32,
    /// Share of an ally's base yield received each turn, in percent.
    pub alliance_share_percent: u32,
    /// Wealth paid to form an alliance.
    pub alliance_cost: u32,
    /// Production per cavalry upgrade.
    pub cavalry_cost: u32,
    /// Production per artillery upgrade.
    pub artillery_cost: u32,
    /// Consecutive rounds needed for economic and diplomatic victory.
    pub victory_hold_turns: u32,
    /// Turn limit for simulated games.
    pub max_turns: u32,
    /// Log entries kept in snapshots.
    pub log_tail: usize,
    /// End the turn right after a fortification move.
    pub auto_advance_after_fortify: bool,
    /// Consecutive rejected agent actions before the runner force-ends a phase.
    pub max_invalid_streak: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            initial_armies: 3,
            min_reinforcements: 3,
            territories_per_army: 3,
            max_attack_dice: 3,
            max_defense_dice: 2,
            card_rewards: vec![4, 6, 8, 10, 12, 15],
            card_reward_step: 5,
            territory_card_bonus: 2,
            wild_cards: 2,
            forced_trade_threshold: 5,
            tech_cost_scaling_percent: 10,
            research_center_discount_percent: 5,
            max_research_discount_percent: 50,
            event_chance_percent: 15,
            alliance_share_percent: 10,
            alliance_cost: 5,
            cavalry_cost: 2,
            artillery_cost: 4,
            victory_hold_turns: 3,
            max_turns: 200,
            log_tail: 200,
            auto_advance_after_fortify: true,
            max_invalid_streak: 8,
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Malformed JSON or an out-of-range value.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    ///
    /// # Errors
    ///
    /// I/O failure, malformed JSON, or an out-of-range value.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.initial_armies == 0 {
            return invalid("initial_armies must be at least 1");
        }
        if self.territories_per_army == 0 {
            return invalid("territories_per_army must be at least 1");
        }
        if !(1..=3).contains(&self.max_attack_dice) {
            return invalid("max_attack_dice must be within 1..=3");
        }
        if !(1..=2).contains(&self.max_defense_dice) {
            return invalid("max_defense_dice must be within 1..=2");
        }
        if self.card_rewards.is_empty() {
            return invalid("card_rewards must not be empty");
        }
        if self.forced_trade_threshold < 3 {
            return invalid("forced_trade_threshold must be at least 3");
        }
        if self.event_chance_percent > 100 {
            return invalid("event_chance_percent must be at most 100");
        }
        if self.max_research_discount_percent > 100 {
            return invalid("max_research_discount_percent must be at most 100");
        }
        if self.victory_hold_turns == 0 {
            return invalid("victory_hold_turns must be at least 1");
        }
        Ok(())
    }
}
