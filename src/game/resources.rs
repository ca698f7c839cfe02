//! Resource economy: per-turn territory yields, feature bonuses and modifiers.
//!
//! # Production Model
//!
//! For every owned territory the base yield is its table yield plus the
//! feature bonuses:
//! - research center: +3 research
//! - capital: +2 production, +2 wealth
//! - port: +2 wealth, +1 food
//!
//! Each resource is then scaled by `(100 + tech% + event%) / 100`, with the
//! combined percentage clamped at -100 so income never goes negative. Allies
//! add a share of each other's unscaled base yield.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::{GameState, PlayerId, TechEffect, Territory, TerritoryId, World};

/// Research produced by a research center.
pub const RESEARCH_CENTER_RESEARCH: u32 = 3;
/// Production produced by a capital.
pub const CAPITAL_PRODUCTION: u32 = 2;
/// Wealth produced by a capital.
pub const CAPITAL_WEALTH: u32 = 2;
/// Wealth produced by a port.
pub const PORT_WEALTH: u32 = 2;
/// Food produced by a port.
pub const PORT_FOOD: u32 = 1;

/// One of the four resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Food.
    Food,
    /// Production, spent on unit upgrades.
    Production,
    /// Research, spent on technologies.
    Research,
    /// Wealth, spent on alliances.
    Wealth,
}

impl ResourceKind {
    /// Every resource kind.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Food,
        ResourceKind::Production,
        ResourceKind::Research,
        ResourceKind::Wealth,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Food => "food",
            Self::Production => "production",
            Self::Research => "research",
            Self::Wealth => "wealth",
        };
        f.write_str(name)
    }
}

/// A bundle of the four resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    /// Food.
    pub food: u32,
    /// Production.
    pub production: u32,
    /// Research.
    pub research: u32,
    /// Wealth.
    pub wealth: u32,
}

impl Resources {
    /// Build a bundle from explicit amounts.
    #[must_use]
    pub const fn new(food: u32, production: u32, research: u32, wealth: u32) -> Self {
        Self {
            food,
            production,
            research,
            wealth,
        }
    }

    /// Amount of one resource.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Production => self.production,
            ResourceKind::Research => self.research,
            ResourceKind::Wealth => self.wealth,
        }
    }

    /// Mutable amount of one resource.
    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut u32 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Production => &mut self.production,
            ResourceKind::Research => &mut self.research,
            ResourceKind::Wealth => &mut self.wealth,
        }
    }

    /// Add every resource of `other`.
    pub fn add(&mut self, other: Resources) {
        for kind in ResourceKind::ALL {
            let slot = self.get_mut(kind);
            *slot = slot.saturating_add(other.get(kind));
        }
    }

    /// Apply a signed delta to one resource, clamping at zero.
    pub fn apply_delta(&mut self, kind: ResourceKind, delta: i32) {
        let slot = self.get_mut(kind);
        *slot = slot.saturating_add_signed(delta);
    }

    /// Spend `amount` of one resource if available.
    ///
    /// Returns `false` (leaving the pool untouched) when the pool is short.
    pub fn try_spend(&mut self, kind: ResourceKind, amount: u32) -> bool {
        let slot = self.get_mut(kind);
        match slot.checked_sub(amount) {
            Some(rest) => {
                *slot = rest;
                true
            }
            None => false,
        }
    }

    /// Sum over all resources.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.food
            .saturating_add(self.production)
            .saturating_add(self.research)
            .saturating_add(self.wealth)
    }
}

/// Income computed for a player for one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeReport {
    /// Unscaled yield of the player's own territories.
    pub base: Resources,
    /// Share received from allies.
    pub alliance_share: Resources,
    /// Total after modifiers; what is added to the pool.
    pub total: Resources,
}

/// Base yield of one territory, including feature bonuses.
#[must_use]
pub fn territory_yield(territory: &Territory) -> Resources {
    let mut out = territory.yields;
    let features = territory.features;
    if features.research_center {
        out.research = out.research.saturating_add(RESEARCH_CENTER_RESEARCH);
    }
    if features.capital {
        out.production = out.production.saturating_add(CAPITAL_PRODUCTION);
        out.wealth = out.wealth.saturating_add(CAPITAL_WEALTH);
    }
    if features.port {
        out.wealth = out.wealth.saturating_add(PORT_WEALTH);
        out.food = out.food.saturating_add(PORT_FOOD);
    }
    out
}

/// Unscaled yield of every territory a player owns.
#[must_use]
pub fn base_yield(world: &World, player: PlayerId) -> Resources {
    let mut out = Resources::default();
    for territory in world.owned_by(player) {
        out.add(territory_yield(territory));
    }
    out
}

/// Combined percentage modifier (tech + event) for one resource.
#[must_use]
pub fn modifier_percent(state: &GameState, player: PlayerId, kind: ResourceKind) -> i32 {
    let tech: i32 = state
        .owned_effects(player)
        .filter_map(|effect| match effect {
            TechEffect::ResourceMultiplier { resource, percent } if *resource == kind => {
                Some(*percent)
            }
            _ => None,
        })
        .sum();
    let event = state.events.resource_modifier(player, kind);
    tech.saturating_add(event).max(-100)
}

/// Scale an amount by a percentage modifier (floor).
#[must_use]
pub fn scale(amount: u32, percent: i32) -> u32 {
    let factor = u64::try_from(100 + i64::from(percent.max(-100))).unwrap_or(0);
    u32::try_from(u64::from(amount) * factor / 100).unwrap_or(u32::MAX)
}

/// Compute a player's income without collecting it.
#[must_use]
pub fn income(state: &GameState, player: PlayerId) -> IncomeReport {
    let base = base_yield(&state.world, player);

    let mut alliance_share = Resources::default();
    if let Some(p) = state.ledger.get(player) {
        let share = state.config.alliance_share_percent;
        for &ally in &p.allies {
            if state.ledger.get(ally).is_none_or(|a| a.eliminated) {
                continue;
            }
            let ally_base = base_yield(&state.world, ally);
            for kind in ResourceKind::ALL {
                let amount = u64::from(ally_base.get(kind)) * u64::from(share) / 100;
                let slot = alliance_share.get_mut(kind);
                *slot = slot.saturating_add(u32::try_from(amount).unwrap_or(u32::MAX));
            }
        }
    }

    let mut total = Resources::default();
    for kind in ResourceKind::ALL {
        let percent = modifier_percent(state, player, kind);
        *total.get_mut(kind) = scale(base.get(kind), percent).saturating_add(alliance_share.get(kind));
    }

    IncomeReport {
        base,
        alliance_share,
        total,
    }
}

/// Collect a player's income into their pool.
pub fn collect(state: &mut GameState, player: PlayerId) -> IncomeReport {
    let report = income(state, player);
    if let Some(p) = state.ledger.get_mut(player) {
        p.resources.add(report.total);
    }
    tracing::debug!(player, ?report.total, "collected resources");
    report
}

/// Territories whose base wealth yield is positive.
#[must_use]
pub fn wealth_territories(world: &World) -> Vec<TerritoryId> {
    world
        .territories()
        .iter()
        .filter(|t| t.yields.wealth > 0)
        .map(|t| t.id)
        .collect()
}
