//! End-of-turn army movement between owned territories.

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ActionResult};
use crate::game::{GameState, PhaseChange, PlayerId, TechEffect, TerritoryId, UnitCounts};

/// Result of a fortification move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortifyOutcome {
    /// Source territory.
    pub from: TerritoryId,
    /// Destination territory.
    pub to: TerritoryId,
    /// Units moved.
    pub moved: UnitCounts,
    /// Range the move was checked against.
    pub range: u32,
    /// Turn advance triggered by the move, if any.
    pub phase_change: Option<PhaseChange>,
}

/// Movement range in hops: 1 + technology bonus + event modifier, at least 1.
#[must_use]
pub fn movement_range(state: &GameState, player: PlayerId) -> u32 {
    let tech: u32 = state
        .owned_effects(player)
        .filter_map(|effect| match effect {
            TechEffect::MovementRange { hops } => Some(*hops),
            _ => None,
        })
        .fold(0, u32::saturating_add);
    let event = i64::from(state.events.movement_modifier(player));
    let range = (1 + i64::from(tech) + event).max(1);
    u32::try_from(range).unwrap_or(u32::MAX)
}

/// Validate and perform a fortification move.
///
/// Phase, actor and once-per-turn checks are the caller's job.
///
/// # Errors
///
/// `SameTerritory`, `UnknownTerritory`, `NotOwned`, `ZeroCount`,
/// `NotEnoughArmies`, `NotAdjacent` or `Unreachable`.
pub fn fortify(
    state: &mut GameState,
    player: PlayerId,
    from: TerritoryId,
    to: TerritoryId,
    armies: u32,
) -> ActionResult<FortifyOutcome> {
    if from == to {
        return Err(ActionError::SameTerritory(from));
    }
    let source = state
        .world
        .get(from)
        .ok_or(ActionError::UnknownTerritory(from))?;
    let target = state
        .world
        .get(to)
        .ok_or(ActionError::UnknownTerritory(to))?;
    for t in [source, target] {
        if t.owner != Some(player) {
            return Err(ActionError::NotOwned {
                player,
                territory: t.id,
            });
        }
    }
    if armies == 0 {
        return Err(ActionError::ZeroCount);
    }
    let movable = source.army_value().saturating_sub(1);
    if armies > movable {
        return Err(ActionError::NotEnoughArmies {
            available: movable,
            required: armies,
        });
    }
    let range = movement_range(state, player);
    if range == 1 {
        if !source.is_adjacent(to) {
            return Err(ActionError::NotAdjacent { from, to });
        }
    } else if !state.world.reachable_within(player, from, to, range) {
        return Err(ActionError::Unreachable { from, to, range });
    }
    let mut remaining = source.units;
    let moved = remaining.take_value(armies).ok_or(ActionError::NotEnoughArmies {
        available: movable,
        required: armies,
    })?;

    // Validated; mutate.
    if let Some(t) = state.world.get_mut(from) {
        t.units = remaining;
    }
    if let Some(t) = state.world.get_mut(to) {
        t.units.add(moved);
    }
    state.flags.fortified = true;
    state.log(
        Some(player),
        format!("fortified {to} from {from} with {armies} armies"),
    );
    tracing::debug!(player, from, to, armies, range, "fortified");

    Ok(FortifyOutcome {
        from,
        to,
        moved,
        range,
        phase_change: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::tests::lone_enemy_engine;
    use crate::game::{ActiveEvent, EventEffect, EventTarget};

    const ENEMY: TerritoryId = 17;

    fn state() -> GameState {
        lone_enemy_engine(ENEMY, 2).into_state()
    }

    /// Owned territories two hops apart but not adjacent.
    fn two_hops(state: &GameState) -> (TerritoryId, TerritoryId) {
        for a in state.world.territories() {
            for &mid in &a.adjacent {
                for &c in &state.world.get(mid).unwrap().adjacent {
                    if c != a.id && !a.is_adjacent(c) && ![a.id, mid, c].contains(&ENEMY) {
                        return (a.id, c);
                    }
                }
            }
        }
        panic!("map has no two-hop path");
    }

    #[test]
    fn test_adjacent_move_conserves_armies() {
        let mut state = state();
        let from = 0;
        let to = state.world.get(0).unwrap().adjacent[0];
        let outcome = fortify(&mut state, 1, from, to, 2).unwrap();
        assert_eq!(outcome.moved.army_value(), 2);
        assert_eq!(outcome.range, 1);
        assert_eq!(state.world.get(from).unwrap().army_value(), 1);
        assert_eq!(state.world.get(to).unwrap().army_value(), 5);
        assert!(state.flags.fortified);
    }

    #[test]
    fn test_source_keeps_one_army() {
        let mut state = state();
        let to = state.world.get(0).unwrap().adjacent[0];
        assert_eq!(
            fortify(&mut state, 1, 0, to, 3),
            Err(ActionError::NotEnoughArmies {
                available: 2,
                required: 3
            })
        );
        assert_eq!(fortify(&mut state, 1, 0, to, 0), Err(ActionError::ZeroCount));
        assert_eq!(fortify(&mut state, 1, 0, 0, 1), Err(ActionError::SameTerritory(0)));
        assert!(!state.flags.fortified);
    }

    #[test]
    fn test_enemy_territory_rejected() {
        let mut state = state();
        let from = state.world.get(ENEMY).unwrap().adjacent[0];
        assert_eq!(
            fortify(&mut state, 1, from, ENEMY, 1),
            Err(ActionError::NotOwned {
                player: 1,
                territory: ENEMY
            })
        );
    }

    #[test]
    fn test_range_grows_with_technology() {
        let mut state = state();
        let (from, to) = two_hops(&state);
        assert_eq!(
            fortify(&mut state, 1, from, to, 1),
            Err(ActionError::NotAdjacent { from, to })
        );

        state
            .ledger
            .get_mut(1)
            .unwrap()
            .techs
            .insert("logistics".into());
        assert_eq!(movement_range(&state, 1), 2);
        let outcome = fortify(&mut state, 1, from, to, 1).unwrap();
        assert_eq!(outcome.range, 2);
    }

    #[test]
    fn test_event_modifier_clamps_at_one() {
        let mut state = state();
        state.events.register(ActiveEvent {
            instance: 0,
            event_id: "mud".into(),
            name: "Mud".into(),
            target: EventTarget::Player(1),
            territories: Vec::new(),
            effect: EventEffect::MovementModifier { hops: -3 },
            start_turn: 1,
            end_turn: 3,
            reversible: false,
            undo: Vec::new(),
        });
        assert_eq!(movement_range(&state, 1), 1);
        assert_eq!(movement_range(&state, 2), 1);
    }
}
