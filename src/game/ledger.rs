//! Player roster: resources, hands, technologies, alliances, elimination.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::game::{CardId, Resources, TerritoryId, World};

/// Unique identifier for a player (1-based roster position).
pub type PlayerId = u8;

/// Name and color of a player joining a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Display name.
    pub name: String,
    /// Display color (free-form, e.g. `"#c0392b"`).
    pub color: String,
}

impl PlayerSetup {
    /// Create a setup entry.
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// Default roster of `count` players with generated names and colors.
    #[must_use]
    pub fn roster(count: usize) -> Vec<Self> {
        const COLORS: [&str; 8] = [
            "red", "blue", "green", "yellow", "purple", "orange", "cyan", "grey",
        ];
        (0..count)
            .map(|i| Self::new(format!("Player {}", i + 1), COLORS[i % COLORS.len()]))
            .collect()
    }
}

/// State for a single player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier for this player.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Territories owned. Mirrors territory ownership in the world.
    #[serde(skip)]
    pub territories: BTreeSet<TerritoryId>,
    /// Resource pool.
    pub resources: Resources,
    /// Cards in hand.
    pub hand: Vec<CardId>,
    /// Unlocked technologies.
    pub techs: BTreeSet<String>,
    /// Allied players.
    pub allies: BTreeSet<PlayerId>,
    /// Whether the player has been eliminated.
    pub eliminated: bool,
    /// Turn the player was eliminated on.
    pub eliminated_on: Option<u32>,
    /// Technologies queued for research, head first.
    pub research_queue: Vec<String>,
    /// Research points invested in the queue head.
    pub research_progress: u32,
    /// Consecutive completed rounds meeting the economic victory condition.
    pub economic_turns: u32,
    /// Consecutive completed rounds meeting the diplomatic victory condition.
    pub diplomatic_turns: u32,
}

impl Player {
    /// Create a new player with an empty pool and hand.
    #[must_use]
    pub fn new(id: PlayerId, setup: &PlayerSetup) -> Self {
        Self {
            id,
            name: setup.name.clone(),
            color: setup.color.clone(),
            territories: BTreeSet::new(),
            resources: Resources::default(),
            hand: Vec::new(),
            techs: BTreeSet::new(),
            allies: BTreeSet::new(),
            eliminated: false,
            eliminated_on: None,
            research_queue: Vec::new(),
            research_progress: 0,
            economic_turns: 0,
            diplomatic_turns: 0,
        }
    }

    /// Whether the player holds a card.
    #[must_use]
    pub fn holds(&self, card: CardId) -> bool {
        self.hand.contains(&card)
    }

    /// Whether the player owns a technology.
    #[must_use]
    pub fn has_tech(&self, tech: &str) -> bool {
        self.techs.contains(tech)
    }

    /// Whether a technology is owned or already queued.
    #[must_use]
    pub fn has_or_queued(&self, tech: &str) -> bool {
        self.has_tech(tech) || self.research_queue.iter().any(|t| t == tech)
    }

    /// Eliminate this player.
    pub fn eliminate(&mut self, turn: u32) {
        self.eliminated = true;
        self.eliminated_on = Some(turn);
        self.research_queue.clear();
        self.research_progress = 0;
        self.economic_turns = 0;
        self.diplomatic_turns = 0;
    }
}

/// All players in roster order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    players: Vec<Player>,
}

impl Ledger {
    /// Create a roster; ids are assigned 1..=n in order.
    #[must_use]
    pub fn new(setups: &[PlayerSetup]) -> Self {
        let players = setups
            .iter()
            .zip(1..=PlayerId::MAX)
            .map(|(setup, id)| Player::new(id, setup))
            .collect();
        Self { players }
    }

    /// All players in roster order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Number of players, eliminated included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Roster index of a player id.
    #[must_use]
    pub fn index_of(&self, id: PlayerId) -> Option<usize> {
        let index = usize::from(id).checked_sub(1)?;
        (index < self.players.len()).then_some(index)
    }

    /// Get a player by id.
    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(self.index_of(id)?)
    }

    /// Get a mutable player by id.
    #[must_use]
    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        let index = self.index_of(id)?;
        self.players.get_mut(index)
    }

    /// Get a player by roster index.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Player> {
        self.players.get(index)
    }

    /// Players still in the game.
    pub fn active(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.eliminated)
    }

    /// Number of players still in the game.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Whether two players are allied.
    #[must_use]
    pub fn are_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        self.get(a).is_some_and(|p| p.allies.contains(&b))
    }

    /// Record a symmetric alliance.
    pub fn ally(&mut self, a: PlayerId, b: PlayerId) {
        if let Some(p) = self.get_mut(a) {
            p.allies.insert(b);
        }
        if let Some(p) = self.get_mut(b) {
            p.allies.insert(a);
        }
    }

    /// Dissolve a symmetric alliance.
    pub fn unally(&mut self, a: PlayerId, b: PlayerId) {
        if let Some(p) = self.get_mut(a) {
            p.allies.remove(&b);
        }
        if let Some(p) = self.get_mut(b) {
            p.allies.remove(&a);
        }
    }

    /// Remove every alliance a player is part of.
    pub fn dissolve_alliances(&mut self, id: PlayerId) {
        let allies: Vec<PlayerId> = self
            .get(id)
            .map(|p| p.allies.iter().copied().collect())
            .unwrap_or_default();
        for other in allies {
            self.unally(id, other);
        }
    }

    /// Move a territory between owned sets.
    pub fn transfer_territory(
        &mut self,
        territory: TerritoryId,
        from: Option<PlayerId>,
        to: PlayerId,
    ) {
        if let Some(p) = from.and_then(|id| self.get_mut(id)) {
            p.territories.remove(&territory);
        }
        if let Some(p) = self.get_mut(to) {
            p.territories.insert(territory);
        }
    }

    /// Rebuild every owned set from world ownership.
    pub fn rebuild_territories(&mut self, world: &World) {
        for player in &mut self.players {
            player.territories.clear();
        }
        for territory in world.territories() {
            if let Some(p) = territory.owner.and_then(|id| self.get_mut(id)) {
                p.territories.insert(territory.id);
            }
        }
    }
}
