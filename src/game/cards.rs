//! Card economy: deck, discard pile, set validation and trade rewards.
//!
//! Every card lives in exactly one place: the deck, the discard pile, or one
//! player's hand.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ActionResult};
use crate::game::{GameState, PlayerId, RngStream, TerritoryId, UnitType, World};

/// Identifier of a card (index into the card table).
pub type CardId = u16;

/// Card symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// Infantry symbol.
    Infantry,
    /// Cavalry symbol.
    Cavalry,
    /// Artillery symbol.
    Artillery,
    /// Matches any symbol.
    Wild,
}

impl From<UnitType> for CardKind {
    fn from(unit: UnitType) -> Self {
        match unit {
            UnitType::Infantry => CardKind::Infantry,
            UnitType::Cavalry => CardKind::Cavalry,
            UnitType::Artillery => CardKind::Artillery,
        }
    }
}

/// A single card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Card id.
    pub id: CardId,
    /// Symbol.
    pub kind: CardKind,
    /// Territory pictured on the card (wilds have none).
    pub territory: Option<TerritoryId>,
}

/// Result of a successful card trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOutcome {
    /// Game-wide sequence number of this set (1-based).
    pub set_number: u32,
    /// Armies added to the reinforcement allowance.
    pub armies: u32,
    /// Infantry placed directly on owned pictured territories.
    pub territory_bonus: Vec<(TerritoryId, u32)>,
}

/// Deck, discard pile and the game-wide trade counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEconomy {
    cards: Vec<Card>,
    deck: Vec<CardId>,
    discard: Vec<CardId>,
    sets_traded: u32,
}

impl CardEconomy {
    /// Build and shuffle the deck: one card per territory with symbols
    /// cycling infantry, cavalry, artillery, plus `wild_cards` wilds.
    #[must_use]
    pub fn new(world: &World, wild_cards: u32, rng: &mut RngStream) -> Self {
        let mut cards: Vec<Card> = world
            .territories()
            .iter()
            .enumerate()
            .map(|(i, t)| Card {
                id: 0,
                kind: CardKind::from(UnitType::PRIORITY[i % UnitType::PRIORITY.len()]),
                territory: Some(t.id),
            })
            .collect();
        cards.extend((0..wild_cards).map(|_| Card {
            id: 0,
            kind: CardKind::Wild,
            territory: None,
        }));
        for (card, id) in cards.iter_mut().zip(0..=CardId::MAX) {
            card.id = id;
        }

        let mut deck: Vec<CardId> = cards.iter().map(|c| c.id).collect();
        deck.shuffle(&mut rng.fork());

        Self {
            cards,
            deck,
            discard: Vec::new(),
            sets_traded: 0,
        }
    }

    /// Every card in the game.
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Card by id.
    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(usize::from(id))
    }

    /// Cards left in the deck (top is last).
    #[must_use]
    pub fn deck(&self) -> &[CardId] {
        &self.deck
    }

    /// Discarded cards.
    #[must_use]
    pub fn discard_pile(&self) -> &[CardId] {
        &self.discard
    }

    /// Sets traded so far, game-wide.
    #[must_use]
    pub const fn sets_traded(&self) -> u32 {
        self.sets_traded
    }

    /// Draw the top card, reshuffling the discard pile into an empty deck.
    ///
    /// Returns `None` when both are empty.
    pub fn draw(&mut self, rng: &mut RngStream) -> Option<CardId> {
        if self.deck.is_empty() && !self.discard.is_empty() {
            self.deck.append(&mut self.discard);
            self.deck.shuffle(&mut rng.fork());
        }
        self.deck.pop()
    }

    /// Put cards on the discard pile.
    pub fn discard(&mut self, ids: &[CardId]) {
        self.discard.extend_from_slice(ids);
    }

    /// Reward for the `n`th set traded game-wide (1-based).
    #[must_use]
    pub fn set_reward(schedule: &[u32], step: u32, n: u32) -> u32 {
        let Some(index) = n.checked_sub(1) else {
            return 0;
        };
        let index = usize::try_from(index).unwrap_or(usize::MAX);
        match schedule.get(index) {
            Some(&reward) => reward,
            None => {
                let last = schedule.last().copied().unwrap_or(0);
                let beyond = u32::try_from(index + 1 - schedule.len()).unwrap_or(u32::MAX);
                last.saturating_add(step.saturating_mul(beyond))
            }
        }
    }

    /// Whether three symbols form a tradeable set.
    ///
    /// Non-wild symbols must all match or all differ; wilds fill any gap.
    #[must_use]
    pub fn is_valid_set(kinds: [CardKind; 3]) -> bool {
        let symbols: Vec<CardKind> = kinds.into_iter().filter(|k| *k != CardKind::Wild).collect();
        let all_same = symbols.windows(2).all(|w| w[0] == w[1]);
        let all_distinct = symbols
            .iter()
            .enumerate()
            .all(|(i, a)| symbols[i + 1..].iter().all(|b| a != b));
        all_same || all_distinct
    }

    /// First valid set in a hand, if any.
    #[must_use]
    pub fn find_set(&self, hand: &[CardId]) -> Option<[CardId; 3]> {
        let kind = |id: CardId| self.card(id).map(|c| c.kind);
        for (i, &a) in hand.iter().enumerate() {
            for (j, &b) in hand.iter().enumerate().skip(i + 1) {
                for &c in &hand[j + 1..] {
                    if let (Some(ka), Some(kb), Some(kc)) = (kind(a), kind(b), kind(c))
                        && Self::is_valid_set([ka, kb, kc])
                    {
                        return Some([a, b, c]);
                    }
                }
            }
        }
        None
    }
}

/// Whether a player's hand is at or above the forced-trade threshold.
///
/// Checked against the live hand; the engine latches the answer at the
/// start of each turn.
#[must_use]
pub fn forced_trade(state: &GameState, player: PlayerId) -> bool {
    state
        .ledger
        .get(player)
        .is_some_and(|p| p.hand.len() >= state.config.forced_trade_threshold)
}

/// Trade a set of three cards for reinforcements.
///
/// Phase and actor checks are the caller's job.
///
/// # Errors
///
/// `WrongCardCount` for anything but three distinct ids, `CardNotHeld` for a
/// card not in the trader's hand, `InvalidCardSet` if the symbols don't form
/// a set.
pub fn trade_cards(
    state: &mut GameState,
    player: PlayerId,
    ids: &[CardId],
) -> ActionResult<TradeOutcome> {
    let set: [CardId; 3] = ids
        .try_into()
        .map_err(|_| ActionError::WrongCardCount(ids.len()))?;
    let mut distinct = set.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() != set.len() {
        return Err(ActionError::WrongCardCount(distinct.len()));
    }

    let hand = &state
        .ledger
        .get(player)
        .ok_or(ActionError::UnknownPlayer(player))?
        .hand;
    let mut kinds = [CardKind::Wild; 3];
    for (slot, &id) in kinds.iter_mut().zip(&set) {
        if !hand.contains(&id) {
            return Err(ActionError::CardNotHeld(id));
        }
        *slot = state.cards.card(id).ok_or(ActionError::CardNotHeld(id))?.kind;
    }
    if !CardEconomy::is_valid_set(kinds) {
        return Err(ActionError::InvalidCardSet);
    }

    // Validated; mutate.
    let set_number = state.cards.sets_traded + 1;
    let armies = CardEconomy::set_reward(
        &state.config.card_rewards,
        state.config.card_reward_step,
        set_number,
    );
    state.cards.sets_traded = set_number;

    let bonus = state.config.territory_card_bonus;
    let mut territory_bonus = Vec::new();
    for &id in &set {
        let pictured = state.cards.card(id).and_then(|c| c.territory);
        if let Some(territory) = pictured
            && let Some(t) = state.world.get_mut(territory)
            && t.owner == Some(player)
            && bonus > 0
        {
            t.units.add_units(UnitType::Infantry, bonus);
            territory_bonus.push((territory, bonus));
        }
    }

    if let Some(p) = state.ledger.get_mut(player) {
        p.hand.retain(|c| !set.contains(c));
    }
    state.cards.discard(&set);
    state.flags.reinforcements = state.flags.reinforcements.saturating_add(armies);

    state.log(
        Some(player),
        format!("traded set #{set_number} for {armies} armies"),
    );
    tracing::debug!(player, set_number, armies, "cards traded");

    Ok(TradeOutcome {
        set_number,
        armies,
        territory_bonus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::tests::grid_world;

    const SCHEDULE: [u32; 6] = [4, 6, 8, 10, 12, 15];

    #[test]
    fn test_reward_schedule() {
        let rewards: Vec<u32> = (1..=8)
            .map(|n| CardEconomy::set_reward(&SCHEDULE, 5, n))
            .collect();
        assert_eq!(rewards, vec![4, 6, 8, 10, 12, 15, 20, 25]);
        assert_eq!(CardEconomy::set_reward(&SCHEDULE, 5, 0), 0);
    }

    #[test]
    fn test_set_validity() {
        use CardKind::{Artillery, Cavalry, Infantry, Wild};
        assert!(CardEconomy::is_valid_set([Infantry, Infantry, Infantry]));
        assert!(CardEconomy::is_valid_set([Infantry, Cavalry, Artillery]));
        assert!(CardEconomy::is_valid_set([Wild, Cavalry, Cavalry]));
        assert!(CardEconomy::is_valid_set([Wild, Cavalry, Artillery]));
        assert!(CardEconomy::is_valid_set([Wild, Wild, Artillery]));
        assert!(!CardEconomy::is_valid_set([Infantry, Infantry, Cavalry]));
        assert!(!CardEconomy::is_valid_set([Artillery, Cavalry, Cavalry]));
    }

    #[test]
    fn test_deck_has_one_card_per_territory_plus_wilds() {
        let world = grid_world();
        let mut rng = RngStream::new(3);
        let cards = CardEconomy::new(&world, 2, &mut rng);
        assert_eq!(cards.cards().len(), 8);
        assert_eq!(cards.deck().len(), 8);
        let wilds = cards.cards().iter().filter(|c| c.kind == CardKind::Wild).count();
        assert_eq!(wilds, 2);
        let mut ids = cards.deck().to_vec();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_draw_reshuffles_discard() {
        let world = grid_world();
        let mut rng = RngStream::new(3);
        let mut cards = CardEconomy::new(&world, 0, &mut rng);
        let drawn: Vec<CardId> = (0..6).filter_map(|_| cards.draw(&mut rng)).collect();
        assert_eq!(drawn.len(), 6);
        assert!(cards.draw(&mut rng).is_none());

        cards.discard(&drawn[..2]);
        assert!(cards.draw(&mut rng).is_some());
        assert!(cards.discard_pile().is_empty());
        assert_eq!(cards.deck().len(), 1);
    }

    #[test]
    fn test_find_set() {
        let world = grid_world();
        let mut rng = RngStream::new(3);
        let cards = CardEconomy::new(&world, 0, &mut rng);
        // Ids 0,1,2 are infantry, cavalry, artillery.
        assert_eq!(cards.find_set(&[0, 3, 1, 2]), Some([0, 1, 2]));
        assert_eq!(cards.find_set(&[0, 3]), None);
    }

    #[test]
    fn test_trade_awards_armies_and_territory_bonus() {
        let mut state = crate::game::engine::tests::two_player_state();
        for (id, owner) in [(0, 1), (1, 2), (2, 2)] {
            state.world.get_mut(id).unwrap().owner = Some(owner);
        }
        state.ledger.rebuild_territories(&state.world);
        state.ledger.get_mut(1).unwrap().hand = vec![0, 1, 2];
        let allowance = state.flags.reinforcements;
        let before = state.world.get(0).unwrap().army_value();

        let outcome = trade_cards(&mut state, 1, &[0, 1, 2]).unwrap();

        assert_eq!(outcome.set_number, 1);
        assert_eq!(outcome.armies, 4);
        assert_eq!(outcome.territory_bonus, vec![(0, 2)]);
        assert_eq!(state.flags.reinforcements, allowance + 4);
        assert_eq!(state.world.get(0).unwrap().army_value(), before + 2);
        assert!(state.ledger.get(1).unwrap().hand.is_empty());
        assert_eq!(state.cards.sets_traded, 1);
        assert!(state.cards.discard_pile().contains(&1));
    }

    #[test]
    fn test_trade_rejections_leave_state_alone() {
        let mut state = crate::game::engine::tests::two_player_state();
        state.ledger.get_mut(1).unwrap().hand = vec![0, 3, 1];
        let before = state.clone();

        assert_eq!(
            trade_cards(&mut state, 1, &[0, 0, 1]),
            Err(ActionError::WrongCardCount(2))
        );
        assert_eq!(
            trade_cards(&mut state, 1, &[0, 1]),
            Err(ActionError::WrongCardCount(2))
        );
        assert_eq!(
            trade_cards(&mut state, 1, &[0, 1, 2]),
            Err(ActionError::CardNotHeld(2))
        );
        // Ids 0 and 3 are both infantry, 1 is cavalry.
        assert_eq!(
            trade_cards(&mut state, 1, &[0, 3, 1]),
            Err(ActionError::InvalidCardSet)
        );
        assert_eq!(state, before);
    }
}
