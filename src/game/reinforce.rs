//! Reinforcement allowance and placement.

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ActionResult};
use crate::game::{GameState, PlayerId, ResourceKind, TechEffect, TerritoryId, UnitType};

/// Result of a unit upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeOutcome {
    /// Territory upgraded.
    pub territory: TerritoryId,
    /// Unit type produced.
    pub unit: UnitType,
    /// Units produced.
    pub count: u32,
    /// Infantry consumed.
    pub infantry_used: u32,
    /// Production spent.
    pub production_spent: u32,
}

/// Reinforcements a player receives at the start of a turn.
///
/// `max(floor, owned / territories_per_army)` plus every fully controlled
/// continent's bonus plus technology bonuses.
#[must_use]
pub fn reinforcement_armies(state: &GameState, player: PlayerId) -> u32 {
    let config = &state.config;
    let owned = state.world.count_owned(player);
    let base = (owned / config.territories_per_army.max(1)).max(config.min_reinforcements);

    let continents: u32 = state
        .world
        .controlled_continents(player)
        .map(|c| c.bonus)
        .fold(0, u32::saturating_add);

    let tech: u32 = state
        .owned_effects(player)
        .filter_map(|effect| match effect {
            TechEffect::ReinforcementBonus { armies } => Some(*armies),
            _ => None,
        })
        .fold(0, u32::saturating_add);

    base.saturating_add(continents).saturating_add(tech)
}

/// Place reinforcements as infantry on an owned territory.
///
/// Returns the allowance left. Phase and actor checks are the caller's job.
///
/// # Errors
///
/// `ZeroCount`, `NotEnoughReinforcements`, `UnknownTerritory` or `NotOwned`.
pub fn place(
    state: &mut GameState,
    player: PlayerId,
    territory: TerritoryId,
    count: u32,
) -> ActionResult<u32> {
    if count == 0 {
        return Err(ActionError::ZeroCount);
    }
    let remaining = state.flags.reinforcements;
    if count > remaining {
        return Err(ActionError::NotEnoughReinforcements {
            remaining,
            requested: count,
        });
    }
    let target = state
        .world
        .get_mut(territory)
        .ok_or(ActionError::UnknownTerritory(territory))?;
    if target.owner != Some(player) {
        return Err(ActionError::NotOwned { player, territory });
    }

    target.units.add_units(UnitType::Infantry, count);
    state.flags.reinforcements = remaining - count;
    tracing::debug!(player, territory, count, "reinforcements placed");
    Ok(state.flags.reinforcements)
}

/// Convert infantry into cavalry or artillery, paying production per unit.
///
/// Army value is unchanged. Phase and actor checks are the caller's job.
///
/// # Errors
///
/// `InvalidUpgrade` for infantry, `ZeroCount`, `UnknownTerritory`,
/// `NotOwned`, `NotEnoughInfantry` or `NotEnoughResource`.
pub fn upgrade(
    state: &mut GameState,
    player: PlayerId,
    territory: TerritoryId,
    unit: UnitType,
    count: u32,
) -> ActionResult<UpgradeOutcome> {
    let unit_cost = match unit {
        UnitType::Infantry => return Err(ActionError::InvalidUpgrade),
        UnitType::Cavalry => state.config.cavalry_cost,
        UnitType::Artillery => state.config.artillery_cost,
    };
    if count == 0 {
        return Err(ActionError::ZeroCount);
    }
    let target = state
        .world
        .get(territory)
        .ok_or(ActionError::UnknownTerritory(territory))?;
    if target.owner != Some(player) {
        return Err(ActionError::NotOwned { player, territory });
    }
    let infantry_used = unit.value().saturating_mul(count);
    if target.units.infantry < infantry_used {
        return Err(ActionError::NotEnoughInfantry {
            available: target.units.infantry,
            required: infantry_used,
        });
    }
    let production_spent = unit_cost.saturating_mul(count);
    let resources = &mut state
        .ledger
        .get_mut(player)
        .ok_or(ActionError::UnknownPlayer(player))?
        .resources;
    let available = resources.production;
    if !resources.try_spend(ResourceKind::Production, production_spent) {
        return Err(ActionError::NotEnoughResource {
            resource: ResourceKind::Production,
            available,
            required: production_spent,
        });
    }

    // Paid; convert the infantry.
    if let Some(t) = state.world.get_mut(territory) {
        t.units.infantry -= infantry_used;
        t.units.add_units(unit, count);
    }
    tracing::debug!(player, territory, ?unit, count, "units upgraded");

    Ok(UpgradeOutcome {
        territory,
        unit,
        count,
        infantry_used,
        production_spent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::tests::two_player_state;

    fn give(state: &mut GameState, player: PlayerId, count: u16) {
        for t in state.world.iter_mut() {
            t.owner = if t.id < count { Some(player) } else { Some(2) };
        }
        state.ledger.rebuild_territories(&state.world);
    }

    #[test]
    fn test_floor_of_three() {
        let mut state = two_player_state();
        give(&mut state, 1, 2);
        assert_eq!(reinforcement_armies(&state, 1), 3);
    }

    #[test]
    fn test_nine_and_twelve_territories() {
        // Ids 0..5 are Northreach (bonus 3) and 5..10 Heartland (bonus 4).
        let mut state = two_player_state();
        give(&mut state, 1, 9);
        assert_eq!(reinforcement_armies(&state, 1), 3 + 3);
        give(&mut state, 1, 12);
        assert_eq!(reinforcement_armies(&state, 1), 4 + 3 + 4);
    }

    #[test]
    fn test_nine_and_twelve_territories_without_continents() {
        // Territories 0, 5, 10 and 14 stay with player 2, one per continent.
        let spread: Vec<TerritoryId> = (0..18)
            .filter(|id| ![0, 5, 10, 14].contains(id))
            .collect();
        let mut state = two_player_state();
        for (count, expected) in [(9, 3), (12, 4)] {
            for t in state.world.iter_mut() {
                t.owner = Some(if spread[..count].contains(&t.id) { 1 } else { 2 });
            }
            state.ledger.rebuild_territories(&state.world);
            assert_eq!(state.world.count_owned(1), u32::try_from(count).unwrap());
            assert_eq!(state.world.controlled_continents(1).count(), 0);
            assert_eq!(reinforcement_armies(&state, 1), expected);
        }
    }

    #[test]
    fn test_continent_and_tech_bonus() {
        let mut state = two_player_state();
        give(&mut state, 1, 3);
        let base = reinforcement_armies(&state, 1);
        state.ledger.get_mut(1).unwrap().techs.insert("treaties".into());
        assert_eq!(reinforcement_armies(&state, 1), base + 1);
    }

    #[test]
    fn test_place_validates_before_mutating() {
        let mut state = two_player_state();
        give(&mut state, 1, 4);
        state.flags.reinforcements = 3;
        let before = state.world.get(0).unwrap().units;

        assert_eq!(place(&mut state, 1, 0, 0), Err(ActionError::ZeroCount));
        assert!(matches!(
            place(&mut state, 1, 0, 4),
            Err(ActionError::NotEnoughReinforcements { remaining: 3, requested: 4 })
        ));
        assert!(matches!(
            place(&mut state, 1, 10, 1),
            Err(ActionError::NotOwned { .. })
        ));
        assert_eq!(state.world.get(0).unwrap().units, before);

        assert_eq!(place(&mut state, 1, 0, 2), Ok(1));
        assert_eq!(
            state.world.get(0).unwrap().units.infantry,
            before.infantry + 2
        );
    }

    #[test]
    fn test_upgrade_keeps_army_value() {
        let mut state = two_player_state();
        give(&mut state, 1, 4);
        state.world.get_mut(0).unwrap().units = crate::game::UnitCounts::infantry(7);
        state.ledger.get_mut(1).unwrap().resources.production = 10;

        assert_eq!(
            upgrade(&mut state, 1, 0, UnitType::Infantry, 1),
            Err(ActionError::InvalidUpgrade)
        );
        assert!(matches!(
            upgrade(&mut state, 1, 0, UnitType::Artillery, 2),
            Err(ActionError::NotEnoughInfantry { available: 7, required: 10 })
        ));

        let outcome = upgrade(&mut state, 1, 0, UnitType::Cavalry, 2).unwrap();
        assert_eq!(outcome.infantry_used, 6);
        let units = state.world.get(0).unwrap().units;
        assert_eq!(units, crate::game::UnitCounts::new(1, 2, 0));
        assert_eq!(units.army_value(), 7);
        assert_eq!(state.ledger.get(1).unwrap().resources.production, 6);
    }

    #[test]
    fn test_upgrade_needs_production() {
        let mut state = two_player_state();
        give(&mut state, 1, 4);
        state.world.get_mut(0).unwrap().units = crate::game::UnitCounts::infantry(5);
        state.ledger.get_mut(1).unwrap().resources.production = 3;
        assert!(matches!(
            upgrade(&mut state, 1, 0, UnitType::Artillery, 1),
            Err(ActionError::NotEnoughResource { resource: ResourceKind::Production, .. })
        ));
        assert_eq!(state.world.get(0).unwrap().units.infantry, 5);
        assert_eq!(state.ledger.get(1).unwrap().resources.production, 3);

        // Exactly enough production is spent down to zero.
        state.ledger.get_mut(1).unwrap().resources.production = 4;
        let outcome = upgrade(&mut state, 1, 0, UnitType::Artillery, 1).unwrap();
        assert_eq!(outcome.production_spent, 4);
        assert_eq!(state.ledger.get(1).unwrap().resources.production, 0);
        assert_eq!(state.world.get(0).unwrap().units, crate::game::UnitCounts::new(0, 0, 1));
    }
}
