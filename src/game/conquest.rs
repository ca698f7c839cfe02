//! Second step of a conquest: moving armies into the emptied territory.
//!
//! Ownership only changes here. If the defender is left without territories
//! they are eliminated and their hand goes to the attacker.

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ActionResult};
use crate::game::{CardId, GameState, PlayerId, TerritoryId, UnitCounts};

/// Result of a resolved conquest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConquestOutcome {
    /// Territory taken.
    pub territory: TerritoryId,
    /// Previous owner.
    pub defender: Option<PlayerId>,
    /// Units moved in.
    pub moved: UnitCounts,
    /// Whether the defender was eliminated.
    pub defender_eliminated: bool,
    /// Cards taken from the eliminated defender.
    pub cards_captured: Vec<CardId>,
}

/// Resolve the pending conquest by moving `armies` army value.
///
/// Actor and phase checks are the caller's job; this checks the pending
/// record itself. The caller runs victory evaluation afterwards.
///
/// # Errors
///
/// `NoPendingConquest`, `NotYourTurn` if `player` isn't the attacker, or
/// `ConquestOutOfRange` echoing the valid bounds.
pub fn resolve(
    state: &mut GameState,
    player: PlayerId,
    armies: u32,
) -> ActionResult<ConquestOutcome> {
    let pending = state.pending.ok_or(ActionError::NoPendingConquest)?;
    if pending.attacker != player {
        return Err(ActionError::NotYourTurn { player });
    }
    if armies < pending.min_armies || armies > pending.max_armies {
        return Err(ActionError::ConquestOutOfRange {
            min: pending.min_armies,
            max: pending.max_armies,
            requested: armies,
        });
    }
    let source = state
        .world
        .get(pending.from)
        .ok_or(ActionError::UnknownTerritory(pending.from))?;
    let mut remaining = source.units;
    let moved = remaining.take_value(armies).ok_or(ActionError::NotEnoughArmies {
        available: source.army_value(),
        required: armies,
    })?;

    // Validated; mutate.
    if let Some(t) = state.world.get_mut(pending.from) {
        t.units = remaining;
    }
    if let Some(t) = state.world.get_mut(pending.to) {
        t.units.add(moved);
        t.owner = Some(player);
    }
    state
        .ledger
        .transfer_territory(pending.to, pending.defender, player);
    state.pending = None;
    state.flags.conquered = true;
    state.log(
        Some(player),
        format!("conquered territory {} with {armies} armies", pending.to),
    );
    tracing::info!(player, territory = pending.to, armies, "territory conquered");

    let mut defender_eliminated = false;
    let mut cards_captured = Vec::new();
    if let Some(defender) = pending.defender
        && state.world.count_owned(defender) == 0
    {
        defender_eliminated = true;
        cards_captured = eliminate(state, defender, player);
    }

    Ok(ConquestOutcome {
        territory: pending.to,
        defender: pending.defender,
        moved,
        defender_eliminated,
        cards_captured,
    })
}

/// Eliminate a player, handing their cards to the conqueror.
fn eliminate(state: &mut GameState, defender: PlayerId, conqueror: PlayerId) -> Vec<CardId> {
    let turn = state.turn;
    let captured = match state.ledger.get_mut(defender) {
        Some(p) => {
            p.eliminate(turn);
            std::mem::take(&mut p.hand)
        }
        None => Vec::new(),
    };
    state.ledger.dissolve_alliances(defender);
    if let Some(p) = state.ledger.get_mut(conqueror) {
        p.hand.extend_from_slice(&captured);
    }
    state.log(
        Some(defender),
        format!(
            "eliminated by player {conqueror}, {} cards captured",
            captured.len()
        ),
    );
    tracing::info!(defender, conqueror, cards = captured.len(), "player eliminated");
    captured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::game::PendingConquest;
    use crate::game::engine::tests::lone_enemy_engine;

    /// Player 1 has emptied territory 0, the last one player 2 held.
    fn pending_last_territory() -> GameState {
        let mut state = lone_enemy_engine(0, 1).into_state();
        let from = state.world.get(0).unwrap().adjacent[0];
        state.world.get_mut(0).unwrap().units = UnitCounts::default();
        state.pending = Some(PendingConquest {
            from,
            to: 0,
            min_armies: 1,
            max_armies: 2,
            attacker: 1,
            defender: Some(2),
        });
        state
    }

    #[test]
    fn test_out_of_range_echoes_bounds() {
        let mut state = pending_last_territory();
        let before = state.clone();
        let err = resolve(&mut state, 1, 3).unwrap_err();
        assert_eq!(
            err,
            ActionError::ConquestOutOfRange {
                min: 1,
                max: 2,
                requested: 3
            }
        );
        assert_eq!(
            resolve(&mut state, 1, 0).unwrap_err().kind(),
            ErrorKind::InvalidCombination
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_only_attacker_resolves() {
        let mut state = pending_last_territory();
        assert!(matches!(
            resolve(&mut state, 2, 1),
            Err(ActionError::NotYourTurn { player: 2 })
        ));
        state.pending = None;
        assert_eq!(
            resolve(&mut state, 1, 1),
            Err(ActionError::NoPendingConquest)
        );
    }

    #[test]
    fn test_last_territory_eliminates_defender() {
        let mut state = pending_last_territory();
        let from = state.pending.unwrap().from;
        state.ledger.get_mut(2).unwrap().hand = vec![3, 7];
        state.ledger.get_mut(1).unwrap().hand.clear();
        state.ledger.ally(1, 2);

        let outcome = resolve(&mut state, 1, 2).unwrap();

        assert!(outcome.defender_eliminated);
        assert_eq!(outcome.cards_captured, vec![3, 7]);
        assert_eq!(outcome.moved.army_value(), 2);
        assert_eq!(state.world.get(0).unwrap().owner, Some(1));
        assert_eq!(state.world.get(0).unwrap().army_value(), 2);
        assert_eq!(state.world.get(from).unwrap().army_value(), 1);
        assert!(state.pending.is_none());
        assert!(state.flags.conquered);

        let defender = state.ledger.get(2).unwrap();
        assert!(defender.eliminated);
        assert!(defender.hand.is_empty());
        assert!(defender.territories.is_empty());
        assert_eq!(state.ledger.get(1).unwrap().hand, vec![3, 7]);
        assert!(!state.ledger.are_allied(1, 2));
    }

    #[test]
    fn test_survivor_keeps_cards() {
        let mut state = pending_last_territory();
        // Give player 2 a second territory far from the fight.
        let other = state
            .world
            .territories()
            .iter()
            .map(|t| t.id)
            .find(|&id| id != 0 && id != state.pending.unwrap().from)
            .unwrap();
        state.world.get_mut(other).unwrap().owner = Some(2);
        state.ledger.rebuild_territories(&state.world);
        state.ledger.get_mut(2).unwrap().hand = vec![5];

        let outcome = resolve(&mut state, 1, 1).unwrap();

        assert!(!outcome.defender_eliminated);
        assert!(outcome.cards_captured.is_empty());
        assert!(!state.ledger.get(2).unwrap().eliminated);
        assert_eq!(state.ledger.get(2).unwrap().hand, vec![5]);
    }
}
