//! Combat resolution.
//!
//! Dice combat between adjacent territories. Both sides roll, modifiers from
//! technologies and events are added per die, the highest dice are paired
//! and each pair removes one unit from the loser. Defenders win ties.

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ActionResult};
use crate::game::{
    CombatSide, GameState, PendingConquest, PlayerId, TechEffect, TerritoryId, UnitCounts,
};

/// One die after modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Die {
    /// Face rolled.
    pub raw: u8,
    /// Face plus modifiers.
    pub modified: i32,
}

/// Result of one attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    /// Attacking territory.
    pub from: TerritoryId,
    /// Defending territory.
    pub to: TerritoryId,
    /// Attacker dice, sorted by modified value, highest first.
    pub attacker_dice: Vec<Die>,
    /// Defender dice, sorted by modified value, highest first.
    pub defender_dice: Vec<Die>,
    /// Units the attacker lost.
    pub attacker_losses: UnitCounts,
    /// Units the defender lost.
    pub defender_losses: UnitCounts,
    /// Conquest opened by this attack.
    pub conquest: Option<PendingConquest>,
}

impl AttackOutcome {
    /// Army value the attacker lost.
    #[must_use]
    pub const fn attacker_value_lost(&self) -> u32 {
        self.attacker_losses.army_value()
    }

    /// Army value the defender lost.
    #[must_use]
    pub const fn defender_value_lost(&self) -> u32 {
        self.defender_losses.army_value()
    }
}

/// Combat bonus of a side: technologies plus events.
///
/// Neutral territories get no bonus.
#[must_use]
pub fn combat_bonus(
    state: &GameState,
    player: Option<PlayerId>,
    territory: TerritoryId,
    side: CombatSide,
) -> i32 {
    let Some(player) = player else {
        return 0;
    };
    let Some(units) = state.world.get(territory).map(|t| t.units) else {
        return 0;
    };
    let tech: i32 = state
        .owned_effects(player)
        .map(|effect| match *effect {
            TechEffect::CombatBonus {
                unit,
                attack,
                defense,
            } if unit.is_none_or(|u| units.has(u)) => match side {
                CombatSide::Attack => attack,
                CombatSide::Defense => defense,
            },
            TechEffect::CombinedArms { bonus } if units.has_combined_arms() => bonus,
            _ => 0,
        })
        .sum();
    tech + state.events.combat_modifier(player, territory, side)
}

/// Sort dice highest first by modified value.
fn ranked(raw: Vec<u8>, bonus: i32) -> Vec<Die> {
    let mut dice: Vec<Die> = raw
        .into_iter()
        .map(|face| Die {
            raw: face,
            modified: i32::from(face) + bonus,
        })
        .collect();
    dice.sort_by(|a, b| b.modified.cmp(&a.modified).then(b.raw.cmp(&a.raw)));
    dice
}

/// Compare paired dice. Returns `(attacker_losses, defender_losses)`.
///
/// Pairs up to the shorter side; ties go to the defender.
#[must_use]
pub fn compare_dice(attacker: &[Die], defender: &[Die]) -> (u32, u32) {
    attacker
        .iter()
        .zip(defender)
        .fold((0, 0), |(a, d), (att, def)| {
            if att.modified > def.modified {
                (a, d + 1)
            } else {
                (a + 1, d)
            }
        })
}

/// Validate and resolve an attack.
///
/// Phase, actor and pending-conquest checks are the caller's job.
///
/// # Errors
///
/// Territory, ownership, alliance, adjacency, army and dice checks, each
/// with its own variant. Nothing is mutated on error.
pub fn attack(
    state: &mut GameState,
    player: PlayerId,
    from: TerritoryId,
    to: TerritoryId,
    dice: u8,
) -> ActionResult<AttackOutcome> {
    let source = state
        .world
        .get(from)
        .ok_or(ActionError::UnknownTerritory(from))?;
    let target = state
        .world
        .get(to)
        .ok_or(ActionError::UnknownTerritory(to))?;
    if source.owner != Some(player) {
        return Err(ActionError::NotOwned {
            player,
            territory: from,
        });
    }
    if target.owner == Some(player) {
        return Err(ActionError::AlreadyOwned(to));
    }
    if let Some(ally) = target.owner.filter(|&o| state.ledger.are_allied(player, o)) {
        return Err(ActionError::AlliedTarget {
            territory: to,
            ally,
        });
    }
    if !source.is_adjacent(to) {
        return Err(ActionError::NotAdjacent { from, to });
    }
    let available = source.army_value();
    if available < 2 {
        return Err(ActionError::NotEnoughArmies {
            available,
            required: 2,
        });
    }
    let max_dice = u32::from(state.config.max_attack_dice).min(available - 1);
    if dice == 0 || u32::from(dice) > max_dice {
        return Err(ActionError::InvalidDiceCount {
            requested: dice,
            max: u8::try_from(max_dice).unwrap_or(u8::MAX),
        });
    }

    let defender = target.owner;
    let defense_dice = u32::from(state.config.max_defense_dice).min(target.army_value());
    let attack_bonus = combat_bonus(state, Some(player), from, CombatSide::Attack);
    let defense_bonus = combat_bonus(state, defender, to, CombatSide::Defense);

    // Validated; mutate.
    let attacker_dice = ranked(state.rng.roll_dice(usize::from(dice)), attack_bonus);
    let defender_dice = ranked(
        state
            .rng
            .roll_dice(usize::try_from(defense_dice).unwrap_or(0)),
        defense_bonus,
    );
    let (attacker_hits, defender_hits) = compare_dice(&attacker_dice, &defender_dice);

    let mut attacker_losses = UnitCounts::default();
    if let Some(t) = state.world.get_mut(from) {
        for _ in 0..attacker_hits {
            if let Some(unit) = t.units.remove_casualty_keeping_one() {
                attacker_losses.add_units(unit, 1);
            }
        }
    }
    let mut defender_losses = UnitCounts::default();
    let mut emptied = false;
    if let Some(t) = state.world.get_mut(to) {
        for _ in 0..defender_hits {
            if let Some(unit) = t.units.remove_casualty() {
                defender_losses.add_units(unit, 1);
            }
        }
        emptied = t.army_value() == 0;
    }

    let conquest = if emptied {
        let max_armies = state
            .world
            .get(from)
            .map_or(0, |t| t.army_value().saturating_sub(1));
        let pending = PendingConquest {
            from,
            to,
            min_armies: u32::from(dice).min(max_armies),
            max_armies,
            attacker: player,
            defender,
        };
        state.pending = Some(pending);
        state.flags.conquered = true;
        Some(pending)
    } else {
        None
    };

    tracing::debug!(
        player,
        from,
        to,
        dice,
        attacker_lost = attacker_losses.army_value(),
        defender_lost = defender_losses.army_value(),
        conquest = conquest.is_some(),
        "attack resolved"
    );

    Ok(AttackOutcome {
        from,
        to,
        attacker_dice,
        defender_dice,
        attacker_losses,
        defender_losses,
        conquest,
    })
}
