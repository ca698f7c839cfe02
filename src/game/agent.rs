//! Action sources: anything that can pick the next action for a seat.
//!
//! [`GreedyAgent`] is the bundled computer player used by the simulation
//! runner. It only ever sees a [`GameView`] and answers with an [`Action`];
//! the engine validates whatever it chooses.

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::game::{Action, GameView, Phase, PlayerId, TechStatus, TerritoryId};

/// Source of actions for one seat.
pub trait ActionSource {
    /// Choose the next action for `player`.
    fn next_action(&mut self, view: &GameView<'_>, player: PlayerId) -> Action;
}

/// Default cap on attacks per turn.
pub const DEFAULT_ATTACK_LIMIT: u32 = 12;

/// Simple greedy computer player.
#[derive(Debug, Clone)]
pub struct GreedyAgent {
    rng: SmallRng,
    attack_limit: u32,
    attacks: u32,
    turn_key: Option<(u32, PlayerId)>,
}

impl GreedyAgent {
    /// Agent with its own seeded generator.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            attack_limit: DEFAULT_ATTACK_LIMIT,
            attacks: 0,
            turn_key: None,
        }
    }

    /// Change the per-turn attack cap.
    #[must_use]
    pub const fn with_attack_limit(mut self, limit: u32) -> Self {
        self.attack_limit = limit;
        self
    }

    fn hostile_targets<'v>(
        view: &GameView<'v>,
        player: PlayerId,
        id: TerritoryId,
    ) -> impl Iterator<Item = TerritoryId> + 'v {
        let state = view.state();
        state
            .world
            .hostile_neighbours(player, id)
            .filter(move |&n| {
                state
                    .world
                    .get(n)
                    .and_then(|t| t.owner)
                    .is_none_or(|o| !state.ledger.are_allied(player, o))
            })
    }

    fn is_border(view: &GameView<'_>, player: PlayerId, id: TerritoryId) -> bool {
        Self::hostile_targets(view, player, id).next().is_some()
    }

    fn research(view: &GameView<'_>, player: PlayerId) -> Option<Action> {
        let p = view.player(player)?;
        if !p.research_queue.is_empty() {
            return None;
        }
        view.tech_status(player)
            .into_iter()
            .filter(|(_, status)| *status == TechStatus::Available)
            .filter_map(|(id, _)| view.tech_cost(player, &id).map(|cost| (cost, id)))
            .min()
            .map(|(_, tech)| Action::StartResearch { tech })
    }

    fn reinforce(&mut self, view: &GameView<'_>, player: PlayerId) -> Action {
        if let Some(action) = Self::research(view, player) {
            return action;
        }
        let hand = view.hand(player);
        if let Some(set) = view.cards().find_set(hand)
            && (view.forced_trade(player) || self.rng.random_bool(0.5))
        {
            return Action::TradeCards {
                cards: set.to_vec(),
            };
        }

        let owned: Vec<_> = view.world().owned_by(player).collect();
        let border = owned
            .iter()
            .filter(|t| Self::is_border(view, player, t.id))
            .max_by_key(|t| (t.army_value(), std::cmp::Reverse(t.id)));
        let target = border.or_else(|| owned.first());
        match (target, view.available_reinforcements()) {
            (Some(t), count) if count > 0 => Action::PlaceReinforcements {
                territory: t.id,
                count,
            },
            _ => Action::EndPhase,
        }
    }

    fn attack(&mut self, view: &GameView<'_>, player: PlayerId) -> Action {
        if self.attacks >= self.attack_limit {
            return Action::EndPhase;
        }
        let world = view.world();
        let mut best: Vec<(TerritoryId, TerritoryId, u32)> = Vec::new();
        let mut best_margin = 1i64;
        for t in world.owned_by(player) {
            let value = t.army_value();
            if value < 3 {
                continue;
            }
            for target in Self::hostile_targets(view, player, t.id) {
                let margin = i64::from(value) - i64::from(view.army_value(target));
                if margin > best_margin {
                    best_margin = margin;
                    best.clear();
                }
                if margin == best_margin {
                    best.push((t.id, target, value));
                }
            }
        }
        let Some(&(from, to, value)) = best.choose(&mut self.rng) else {
            return Action::EndPhase;
        };
        self.attacks += 1;
        let max_dice = u32::from(view.config().max_attack_dice).min(value - 1);
        Action::Attack {
            from,
            to,
            dice: u8::try_from(max_dice).unwrap_or(1),
        }
    }

    fn fortify(view: &GameView<'_>, player: PlayerId) -> Action {
        if view.has_fortified() {
            return Action::EndPhase;
        }
        let world = view.world();
        let source = world
            .owned_by(player)
            .filter(|t| t.army_value() > 1 && !Self::is_border(view, player, t.id))
            .max_by_key(|t| (t.army_value(), std::cmp::Reverse(t.id)));
        let Some(source) = source else {
            return Action::EndPhase;
        };
        let owned_neighbour =
            |id: &&TerritoryId| world.get(**id).is_some_and(|t| t.owner == Some(player));
        let destination = source
            .adjacent
            .iter()
            .filter(owned_neighbour)
            .find(|&&n| Self::is_border(view, player, n))
            .or_else(|| source.adjacent.iter().find(owned_neighbour));
        match destination {
            Some(&to) => Action::Fortify {
                from: source.id,
                to,
                armies: source.army_value() - 1,
            },
            None => Action::EndPhase,
        }
    }
}

impl ActionSource for GreedyAgent {
    fn next_action(&mut self, view: &GameView<'_>, player: PlayerId) -> Action {
        let key = (view.turn(), player);
        if self.turn_key != Some(key) {
            self.turn_key = Some(key);
            self.attacks = 0;
        }

        if let Some(pending) = view.pending_conquest()
            && pending.attacker == player
        {
            return Action::ResolveConquest {
                armies: pending.max_armies,
            };
        }
        match view.phase() {
            Phase::Reinforcement => self.reinforce(view, player),
            Phase::Attack => self.attack(view, player),
            Phase::Fortification => Self::fortify(view, player),
        }
    }
}
