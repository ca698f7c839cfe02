//! Victory conditions.
//!
//! Checked in a fixed order: military, economic, technological, diplomatic.
//! The first satisfied condition wins. Economic and diplomatic victories
//! need the condition to hold for several consecutive completed rounds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::{GameState, PlayerId, TechCategory, TechEffect, resources};

/// How a game was won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictoryType {
    /// Last player standing.
    Military,
    /// Held a majority of wealth territories with economic dominance.
    Economic,
    /// Completed a technology category.
    Technological,
    /// Allied with every surviving player.
    Diplomatic,
}

impl fmt::Display for VictoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Military => "military",
            Self::Economic => "economic",
            Self::Technological => "technological",
            Self::Diplomatic => "diplomatic",
        };
        f.write_str(name)
    }
}

const CATEGORIES: [TechCategory; 4] = [
    TechCategory::Military,
    TechCategory::Economic,
    TechCategory::Science,
    TechCategory::Diplomacy,
];

fn has_effect(state: &GameState, player: PlayerId, wanted: &TechEffect) -> bool {
    state.owned_effects(player).any(|e| e == wanted)
}

/// Whether a player currently meets the economic condition.
#[must_use]
pub fn economic_condition(state: &GameState, player: PlayerId) -> bool {
    if !has_effect(state, player, &TechEffect::EconomicDominance) {
        return false;
    }
    let wealth = resources::wealth_territories(&state.world);
    let owned = wealth
        .iter()
        .filter(|&&id| state.world.get(id).is_some_and(|t| t.owner == Some(player)))
        .count();
    !wealth.is_empty() && owned * 2 > wealth.len()
}

/// Whether a player currently meets the diplomatic condition.
#[must_use]
pub fn diplomatic_condition(state: &GameState, player: PlayerId) -> bool {
    if !has_effect(state, player, &TechEffect::DiplomaticVictory) {
        return false;
    }
    let mut others = state.ledger.active().filter(|p| p.id != player).peekable();
    others.peek().is_some() && others.all(|p| state.ledger.are_allied(player, p.id))
}

/// Whether a player owns every technology of a non-empty category.
#[must_use]
pub fn completed_category(state: &GameState, player: PlayerId) -> Option<TechCategory> {
    let p = state.ledger.get(player)?;
    CATEGORIES.into_iter().find(|&category| {
        let mut techs = state.rules.techs.in_category(category).peekable();
        techs.peek().is_some() && techs.all(|t| p.has_tech(&t.id))
    })
}

/// Update the consecutive-round counters at the end of a round.
///
/// Counters increase while the condition holds and reset to zero otherwise.
pub fn update_counters(state: &mut GameState) {
    let ids: Vec<PlayerId> = state.ledger.active().map(|p| p.id).collect();
    for id in ids {
        let economic = economic_condition(state, id);
        let diplomatic = diplomatic_condition(state, id);
        if let Some(p) = state.ledger.get_mut(id) {
            p.economic_turns = if economic { p.economic_turns + 1 } else { 0 };
            p.diplomatic_turns = if diplomatic {
                p.diplomatic_turns + 1
            } else {
                0
            };
        }
    }
}

/// First satisfied victory condition, if any.
#[must_use]
pub fn evaluate(state: &GameState) -> Option<(PlayerId, VictoryType)> {
    let mut active = state.ledger.active();
    if let (Some(last), None) = (active.next(), active.next()) {
        return Some((last.id, VictoryType::Military));
    }

    let hold = state.config.victory_hold_turns;
    let active: Vec<_> = state.ledger.active().collect();
    if let Some(p) = active.iter().find(|p| p.economic_turns >= hold) {
        return Some((p.id, VictoryType::Economic));
    }
    if let Some(p) = active
        .iter()
        .find(|p| completed_category(state, p.id).is_some())
    {
        return Some((p.id, VictoryType::Technological));
    }
    if let Some(p) = active.iter().find(|p| p.diplomatic_turns >= hold) {
        return Some((p.id, VictoryType::Diplomatic));
    }
    None
}

/// Evaluate victory and end the game if someone has won.
///
/// Returns the result when the game ended in this call.
pub fn check(state: &mut GameState) -> Option<(PlayerId, VictoryType)> {
    if state.game_over {
        return None;
    }
    let (winner, victory) = evaluate(state)?;
    state.game_over = true;
    state.winner = Some(winner);
    state.victory = Some(victory);
    state.pending = None;
    state.log(Some(winner), format!("won a {victory} victory"));
    tracing::info!(winner, %victory, turn = state.turn, "game over");
    Some((winner, victory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::tests::two_player_state;

    #[test]
    fn test_military_when_one_player_left() {
        let mut state = two_player_state();
        assert_eq!(evaluate(&state), None);
        state.ledger.get_mut(2).unwrap().eliminate(1);
        assert_eq!(evaluate(&state), Some((1, VictoryType::Military)));
    }

    #[test]
    fn test_technological_needs_whole_category() {
        let mut state = two_player_state();
        let p = state.ledger.get_mut(1).unwrap();
        p.techs.insert("writing".into());
        p.techs.insert("academies".into());
        assert_eq!(evaluate(&state), None);
        state.ledger.get_mut(1).unwrap().techs.insert("printing".into());
        assert_eq!(evaluate(&state), Some((1, VictoryType::Technological)));
        assert_eq!(completed_category(&state, 1), Some(TechCategory::Science));
    }

    #[test]
    fn test_economic_counter_resets_on_failure() {
        let mut state = two_player_state();
        state
            .ledger
            .get_mut(1)
            .unwrap()
            .techs
            .insert("economic_dominance".into());
        for t in state.world.iter_mut() {
            t.owner = Some(1);
        }
        state.world.get_mut(0).unwrap().owner = Some(2);
        state.ledger.rebuild_territories(&state.world);

        update_counters(&mut state);
        update_counters(&mut state);
        assert_eq!(state.ledger.get(1).unwrap().economic_turns, 2);
        assert_eq!(evaluate(&state), None);

        // Losing the majority resets the streak.
        for t in state.world.iter_mut() {
            if t.yields.wealth > 0 {
                t.owner = Some(2);
            }
        }
        update_counters(&mut state);
        assert_eq!(state.ledger.get(1).unwrap().economic_turns, 0);
    }

    #[test]
    fn test_economic_after_three_rounds() {
        let mut state = two_player_state();
        state
            .ledger
            .get_mut(1)
            .unwrap()
            .techs
            .insert("economic_dominance".into());
        for t in state.world.iter_mut() {
            t.owner = Some(if t.yields.wealth > 0 { 1 } else { 2 });
        }
        for _ in 0..3 {
            update_counters(&mut state);
        }
        assert_eq!(evaluate(&state), Some((1, VictoryType::Economic)));
    }

    #[test]
    fn test_diplomatic_requires_alliance_with_all() {
        let mut state = two_player_state();
        state
            .ledger
            .get_mut(1)
            .unwrap()
            .techs
            .insert("diplomatic_victory".into());
        update_counters(&mut state);
        assert_eq!(state.ledger.get(1).unwrap().diplomatic_turns, 0);

        state.ledger.ally(1, 2);
        for _ in 0..3 {
            update_counters(&mut state);
        }
        assert_eq!(evaluate(&state), Some((1, VictoryType::Diplomatic)));
    }

    #[test]
    fn test_check_sets_game_over_once() {
        let mut state = two_player_state();
        state.ledger.get_mut(2).unwrap().eliminate(1);
        assert!(check(&mut state).is_some());
        assert!(state.game_over);
        assert_eq!(state.winner, Some(1));
        assert!(check(&mut state).is_none());
    }
}
