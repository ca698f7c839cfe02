//! Game invariants: sanity checks that detect bugs.
//!
//! None of these should trigger in a correctly played game. They are run by
//! the property tests after every action and by snapshot restore.

use std::collections::BTreeSet;

use crate::game::{GameState, PendingConquest, Phase};

/// Invariant violation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl InvariantViolation {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Check all game invariants.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(state: &GameState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    check_territories(state, &mut violations);
    check_players(state, &mut violations);
    check_cards(state, &mut violations);
    check_turn(state, &mut violations);
    violations
}

fn check_territories(state: &GameState, violations: &mut Vec<InvariantViolation>) {
    let pending_target = state.pending.map(|p| p.to);
    for t in state.world.territories() {
        match t.owner {
            Some(owner) => {
                let Some(player) = state.ledger.get(owner) else {
                    violations.push(InvariantViolation::new(format!(
                        "Territory {} owned by unknown player {owner}",
                        t.id
                    )));
                    continue;
                };
                if player.eliminated {
                    violations.push(InvariantViolation::new(format!(
                        "Eliminated player {owner} still owns territory {}",
                        t.id
                    )));
                }
                if !player.territories.contains(&t.id) {
                    violations.push(InvariantViolation::new(format!(
                        "Territory {} missing from player {owner}'s owned set",
                        t.id
                    )));
                }
                if t.army_value() == 0 && pending_target != Some(t.id) {
                    violations.push(InvariantViolation::new(format!(
                        "Owned territory {} has no armies",
                        t.id
                    )));
                }
            }
            None if t.army_value() > 0 => {
                violations.push(InvariantViolation::new(format!(
                    "Unowned territory {} holds {} armies",
                    t.id,
                    t.army_value()
                )));
            }
            None => {}
        }
        for &n in &t.adjacent {
            if !state.world.get(n).is_some_and(|o| o.is_adjacent(t.id)) {
                violations.push(InvariantViolation::new(format!(
                    "Adjacency {} -> {n} is not symmetric",
                    t.id
                )));
            }
        }
    }
}

fn check_players(state: &GameState, violations: &mut Vec<InvariantViolation>) {
    for p in state.ledger.players() {
        for &id in &p.territories {
            if state.world.get(id).and_then(|t| t.owner) != Some(p.id) {
                violations.push(InvariantViolation::new(format!(
                    "Player {} lists territory {id} it does not own",
                    p.id
                )));
            }
        }
        for &ally in &p.allies {
            if ally == p.id || !state.ledger.are_allied(ally, p.id) {
                violations.push(InvariantViolation::new(format!(
                    "Alliance {} <-> {ally} is not symmetric",
                    p.id
                )));
            }
        }
        if p.eliminated && !p.hand.is_empty() {
            violations.push(InvariantViolation::new(format!(
                "Eliminated player {} still holds {} cards",
                p.id,
                p.hand.len()
            )));
        }
        if let Some(tech) = p.research_queue.iter().find(|t| p.has_tech(t)) {
            violations.push(InvariantViolation::new(format!(
                "Player {} queues already owned technology {tech}",
                p.id
            )));
        }
    }
}

fn check_cards(state: &GameState, violations: &mut Vec<InvariantViolation>) {
    let held = state
        .ledger
        .players()
        .iter()
        .flat_map(|p| p.hand.iter().copied());
    let all: Vec<_> = state
        .cards
        .deck()
        .iter()
        .chain(state.cards.discard_pile())
        .copied()
        .chain(held)
        .collect();
    let distinct: BTreeSet<_> = all.iter().copied().collect();
    if distinct.len() != all.len() {
        violations.push(InvariantViolation::new(
            "A card is in more than one place at once",
        ));
    }
    if all.len() != state.cards.cards().len() {
        violations.push(InvariantViolation::new(format!(
            "Card count {} differs from the table size {}",
            all.len(),
            state.cards.cards().len()
        )));
    }
    if let Some(unknown) = distinct.iter().find(|&&id| state.cards.card(id).is_none()) {
        violations.push(InvariantViolation::new(format!("Unknown card {unknown}")));
    }
}

fn check_turn(state: &GameState, violations: &mut Vec<InvariantViolation>) {
    if state.pending.is_some() && state.phase != Phase::Attack {
        violations.push(InvariantViolation::new(format!(
            "Conquest pending during the {} phase",
            state.phase
        )));
    }
    if let Some(pending) = state.pending {
        check_pending(state, pending, violations);
    }
    if state.game_over != state.winner.is_some() {
        violations.push(InvariantViolation::new(
            "Winner set without the game being over, or the reverse",
        ));
    }
    if !state.game_over && state.current().is_none_or(|p| p.eliminated) {
        violations.push(InvariantViolation::new(format!(
            "Current player index {} is not an active player",
            state.current
        )));
    }
}

fn check_pending(
    state: &GameState,
    pending: PendingConquest,
    violations: &mut Vec<InvariantViolation>,
) {
    let (Some(from), Some(to)) = (state.world.get(pending.from), state.world.get(pending.to))
    else {
        violations.push(InvariantViolation::new(format!(
            "Pending conquest {} -> {} names an unknown territory",
            pending.from, pending.to
        )));
        return;
    };
    if !state.world.are_adjacent(from.id, to.id) {
        violations.push(InvariantViolation::new(format!(
            "Pending conquest {} -> {} is not between neighbours",
            from.id, to.id
        )));
    }
    if pending.attacker != state.current_player() || from.owner != Some(pending.attacker) {
        violations.push(InvariantViolation::new(format!(
            "Pending conquest attacker {} does not hold the turn and territory {}",
            pending.attacker, from.id
        )));
    }
    if to.owner != pending.defender || to.army_value() != 0 {
        violations.push(InvariantViolation::new(format!(
            "Pending conquest target {} is not an emptied territory of its defender",
            to.id
        )));
    }
    if pending.min_armies > pending.max_armies
        || pending.max_armies > from.army_value().saturating_sub(1)
    {
        violations.push(InvariantViolation::new(format!(
            "Pending conquest range [{}, {}] does not fit {} armies in {}",
            pending.min_armies,
            pending.max_armies,
            from.army_value(),
            from.id
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::tests::two_player_state;

    #[test]
    fn test_fresh_game_is_consistent() {
        assert!(check_invariants(&two_player_state()).is_empty());
    }

    #[test]
    fn test_detects_stale_owned_set() {
        let mut state = two_player_state();
        let id = state.ledger.get(1).unwrap().territories.iter().next().copied().unwrap();
        state.world.get_mut(id).unwrap().owner = Some(2);
        let violations = check_invariants(&state);
        assert!(violations.iter().any(|v| v.message.contains("missing from")));
        assert!(violations.iter().any(|v| v.message.contains("does not own")));
    }

    #[test]
    fn test_detects_duplicated_card() {
        let mut state = two_player_state();
        let card = state.cards.deck()[0];
        state.ledger.get_mut(1).unwrap().hand.push(card);
        assert!(!check_invariants(&state).is_empty());
    }

    #[test]
    fn test_detects_pending_conquest_off_the_map() {
        let mut state = two_player_state();
        state.phase = Phase::Attack;
        state.pending = Some(PendingConquest {
            from: 0,
            to: 40,
            min_armies: 1,
            max_armies: 1,
            attacker: 1,
            defender: Some(2),
        });
        let violations = check_invariants(&state);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("unknown territory"));
    }

    #[test]
    fn test_detects_winner_without_game_over() {
        let mut state = two_player_state();
        state.winner = Some(1);
        let violations = check_invariants(&state);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].to_string().starts_with("Invariant violation"));
    }
}
