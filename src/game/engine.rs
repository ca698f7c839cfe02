//! Turn and phase controller: the public action and query API.
//!
//! A turn moves through `reinforcement → attack → fortification`, then play
//! passes to the next surviving player. Every action checks the actor and
//! phase, then delegates to the module owning the rule. A rejected action
//! leaves the game untouched.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::data::{MapData, Rules};
use crate::error::{ActionError, ActionResult, SetupError};
use crate::game::{
    ActiveEvent, AttackOutcome, CardEconomy, CardId, Completion, ConquestOutcome, EventLog,
    EventRegistry, FortifyOutcome, GameState, IncomeReport, InvariantViolation, Ledger,
    LogEntry, MAX_PLAYERS, MIN_PLAYERS, PendingConquest, Phase, Player, PlayerId, PlayerSetup,
    ResearchProgress, ResourceKind, RngStream, TechStatus, Territory, TerritoryId,
    TradeOutcome, TriggeredEvent, TurnFlags, UnitCounts, UnitType, UpgradeOutcome, VictoryType,
    World, cards, check_invariants, combat, conquest, events, fortify, reinforce, research,
    resources, victory,
};

/// What happened at the start of a player's turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnStart {
    /// Player whose turn began.
    pub player: PlayerId,
    /// Income collected.
    pub income: IncomeReport,
    /// Technologies completed.
    pub completed: Vec<Completion>,
    /// Event triggered, if any.
    pub event: Option<TriggeredEvent>,
    /// Reinforcement allowance.
    pub reinforcements: u32,
    /// Hand at or above the forced-trade threshold.
    pub forced_trade: bool,
}

/// Result of ending a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChange {
    /// Player who ended the phase.
    pub player: PlayerId,
    /// Phase that ended.
    pub from: Phase,
    /// Phase now in effect.
    pub to: Phase,
    /// Player now acting.
    pub next_player: PlayerId,
    /// Turn counter after the change.
    pub turn: u32,
    /// Card drawn for a conquest this turn.
    pub card_drawn: Option<CardId>,
    /// Whether a full round completed.
    pub round_completed: bool,
    /// Start-of-turn processing for the next player.
    pub turn_start: Option<TurnStart>,
    /// Whether the game ended during the change.
    pub game_over: bool,
}

/// A player action, mirroring the action API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Place reinforcements.
    PlaceReinforcements {
        /// Owned territory.
        territory: TerritoryId,
        /// Armies to place.
        count: u32,
    },
    /// Trade a card set.
    TradeCards {
        /// Three card ids.
        cards: Vec<CardId>,
    },
    /// Convert infantry into a larger unit.
    UpgradeUnits {
        /// Owned territory.
        territory: TerritoryId,
        /// Cavalry or artillery.
        unit: UnitType,
        /// Units to produce.
        count: u32,
    },
    /// Attack a neighbour.
    Attack {
        /// Attacking territory.
        from: TerritoryId,
        /// Target territory.
        to: TerritoryId,
        /// Dice to roll.
        dice: u8,
    },
    /// Move armies into a conquered territory.
    ResolveConquest {
        /// Army value to move.
        armies: u32,
    },
    /// Move armies between owned territories.
    Fortify {
        /// Source.
        from: TerritoryId,
        /// Destination.
        to: TerritoryId,
        /// Army value to move.
        armies: u32,
    },
    /// Queue a technology.
    StartResearch {
        /// Technology id.
        tech: String,
    },
    /// Form an alliance.
    FormAlliance {
        /// Other player.
        with: PlayerId,
    },
    /// Break an alliance.
    BreakAlliance {
        /// Other player.
        with: PlayerId,
    },
    /// End the current phase.
    EndPhase,
}

/// Result of an applied action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActionReport {
    /// Reinforcements placed.
    Placed {
        /// Allowance left.
        remaining: u32,
    },
    /// Cards traded.
    Traded(TradeOutcome),
    /// Units upgraded.
    Upgraded(UpgradeOutcome),
    /// Attack resolved.
    Attacked(AttackOutcome),
    /// Conquest resolved.
    Conquered(ConquestOutcome),
    /// Fortification done.
    Fortified(FortifyOutcome),
    /// Technology queued.
    ResearchStarted,
    /// Alliance formed.
    AllianceFormed,
    /// Alliance broken.
    AllianceBroken,
    /// Phase ended.
    PhaseEnded(PhaseChange),
}

/// Read-only view of a game, handed to agents and UIs.
#[derive(Debug, Clone, Copy)]
pub struct GameView<'a> {
    state: &'a GameState,
}

impl<'a> GameView<'a> {
    /// Wrap a state.
    #[must_use]
    pub const fn new(state: &'a GameState) -> Self {
        Self { state }
    }

    /// Underlying state.
    #[must_use]
    pub const fn state(&self) -> &'a GameState {
        self.state
    }

    /// Game parameters.
    #[must_use]
    pub const fn config(&self) -> &'a GameConfig {
        &self.state.config
    }

    /// Territory graph.
    #[must_use]
    pub const fn world(&self) -> &'a World {
        &self.state.world
    }

    /// Technology and event catalogs.
    #[must_use]
    pub const fn rules(&self) -> &'a Rules {
        &self.state.rules
    }

    /// Card table and piles.
    #[must_use]
    pub const fn cards(&self) -> &'a CardEconomy {
        &self.state.cards
    }

    /// Player by id.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&'a Player> {
        self.state.ledger.get(id)
    }

    /// All players.
    #[must_use]
    pub fn players(&self) -> &'a [Player] {
        self.state.ledger.players()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Player whose turn it is.
    #[must_use]
    pub fn current_player(&self) -> PlayerId {
        self.state.current_player()
    }

    /// Turn counter.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.state.turn
    }

    /// Whether the game has ended.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.state.game_over
    }

    /// Winning player.
    #[must_use]
    pub const fn winner(&self) -> Option<PlayerId> {
        self.state.winner
    }

    /// How the game was won.
    #[must_use]
    pub const fn victory(&self) -> Option<VictoryType> {
        self.state.victory
    }

    /// Reinforcements left to place this turn.
    #[must_use]
    pub const fn available_reinforcements(&self) -> u32 {
        self.state.flags.reinforcements
    }

    /// Whether the fortification move was used this turn.
    #[must_use]
    pub const fn has_fortified(&self) -> bool {
        self.state.flags.fortified
    }

    /// Allowance a player would receive at a turn start.
    #[must_use]
    pub fn reinforcement_armies(&self, player: PlayerId) -> u32 {
        reinforce::reinforcement_armies(self.state, player)
    }

    /// Territory by id.
    #[must_use]
    pub fn territory(&self, id: TerritoryId) -> Option<&'a Territory> {
        self.state.world.get(id)
    }

    /// Owner of a territory.
    #[must_use]
    pub fn owner(&self, id: TerritoryId) -> Option<PlayerId> {
        self.state.world.get(id).and_then(|t| t.owner)
    }

    /// Army value on a territory (0 for unknown ids).
    #[must_use]
    pub fn army_value(&self, id: TerritoryId) -> u32 {
        self.state.world.get(id).map_or(0, Territory::army_value)
    }

    /// Events affecting a player.
    #[must_use]
    pub fn active_events(&self, player: PlayerId) -> Vec<&'a ActiveEvent> {
        self.state.events.active_for(player).collect()
    }

    /// Status of every technology for a player.
    #[must_use]
    pub fn tech_status(&self, player: PlayerId) -> Vec<(String, TechStatus)> {
        research::tech_status(self.state, player)
    }

    /// Research queue standing for a player.
    #[must_use]
    pub fn research_progress(&self, player: PlayerId) -> Option<ResearchProgress> {
        research::research_progress(self.state, player)
    }

    /// Effective cost of a technology for a player.
    #[must_use]
    pub fn tech_cost(&self, player: PlayerId, tech: &str) -> Option<u32> {
        research::cost(self.state, player, tech)
    }

    /// Conquest awaiting its army transfer.
    #[must_use]
    pub const fn pending_conquest(&self) -> Option<PendingConquest> {
        self.state.pending
    }

    /// Whether a player must trade cards this turn.
    ///
    /// Decided when the turn begins, so only the current player can be
    /// forced.
    #[must_use]
    pub fn forced_trade(&self, player: PlayerId) -> bool {
        self.state.flags.forced_trade && self.state.current_player() == player
    }

    /// Cards in a player's hand.
    #[must_use]
    pub fn hand(&self, player: PlayerId) -> &'a [CardId] {
        self.state
            .ledger
            .get(player)
            .map_or(&[], |p| p.hand.as_slice())
    }

    /// Retained log entries.
    #[must_use]
    pub fn log(&self) -> &'a [LogEntry] {
        self.state.log.entries()
    }
}

/// The game engine: owns one game's state.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEngine {
    state: GameState,
}

impl GameEngine {
    /// Start a new game.
    ///
    /// Territories are shuffled and dealt round-robin with
    /// `initial_armies` infantry each; player 1 starts turn 1.
    ///
    /// # Errors
    ///
    /// Invalid config, a player count outside 2..=8, or too few territories.
    pub fn new(
        config: GameConfig,
        rules: Rules,
        mut world: World,
        players: &[PlayerSetup],
    ) -> Result<Self, SetupError> {
        config.validate()?;
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players.len()) {
            return Err(SetupError::PlayerCount(players.len()));
        }
        if world.len() < players.len() {
            return Err(SetupError::TooFewTerritories {
                territories: world.len(),
                players: players.len(),
            });
        }

        let mut rng = RngStream::new(config.seed);
        let ledger = Ledger::new(players);

        let mut order: Vec<TerritoryId> = world.territories().iter().map(|t| t.id).collect();
        order.shuffle(&mut rng.fork());
        for t in world.iter_mut() {
            t.owner = None;
            t.units = UnitCounts::default();
        }
        for (i, id) in order.into_iter().enumerate() {
            if let Some(t) = world.get_mut(id) {
                t.owner = ledger.at(i % players.len()).map(|p| p.id);
                t.units = UnitCounts::infantry(config.initial_armies);
            }
        }

        let cards = CardEconomy::new(&world, config.wild_cards, &mut rng);
        let mut state = GameState {
            config,
            rules,
            world,
            ledger,
            cards,
            events: EventRegistry::default(),
            phase: Phase::Reinforcement,
            current: 0,
            turn: 1,
            flags: TurnFlags::default(),
            pending: None,
            game_over: false,
            winner: None,
            victory: None,
            log: EventLog::default(),
            rng,
        };
        state.ledger.rebuild_territories(&state.world);
        state.log(None, format!("game started with {} players", players.len()));
        tracing::info!(players = players.len(), seed = state.rng.seed(), "game started");

        let mut engine = Self { state };
        engine.begin_turn();
        Ok(engine)
    }

    /// Start a game on the built-in map and catalogs with a generated roster.
    ///
    /// # Errors
    ///
    /// As [`GameEngine::new`].
    pub fn builtin(players: usize, config: GameConfig) -> Result<Self, SetupError> {
        let world = MapData::builtin()?.build()?;
        Self::new(config, Rules::builtin()?, world, &PlayerSetup::roster(players))
    }

    /// Wrap an already consistent state.
    pub(crate) fn from_state(state: GameState) -> Self {
        Self { state }
    }

    /// Underlying state.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Consume the engine, returning its state.
    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    /// Read-only view.
    #[must_use]
    pub const fn view(&self) -> GameView<'_> {
        GameView::new(&self.state)
    }

    /// Queue dice faces to be rolled before random ones.
    pub fn load_dice(&mut self, dice: impl IntoIterator<Item = u8>) {
        self.state.rng.load_dice(dice);
    }

    /// Override the turn limit used by simulation runs.
    pub fn set_max_turns(&mut self, max_turns: u32) {
        self.state.config.max_turns = max_turns;
    }

    /// Run the invariant checker.
    #[must_use]
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        check_invariants(&self.state)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Player whose turn it is.
    #[must_use]
    pub fn current_player(&self) -> PlayerId {
        self.state.current_player()
    }

    /// Turn counter.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.state.turn
    }

    /// Whether the game has ended.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.state.game_over
    }

    /// Winning player.
    #[must_use]
    pub const fn winner(&self) -> Option<PlayerId> {
        self.state.winner
    }

    /// How the game was won.
    #[must_use]
    pub const fn victory(&self) -> Option<VictoryType> {
        self.state.victory
    }

    /// Reinforcements left to place this turn.
    #[must_use]
    pub const fn available_reinforcements(&self) -> u32 {
        self.state.flags.reinforcements
    }

    /// Allowance a player would receive at a turn start.
    #[must_use]
    pub fn reinforcement_armies(&self, player: PlayerId) -> u32 {
        self.view().reinforcement_armies(player)
    }

    /// Territory by id.
    #[must_use]
    pub fn territory(&self, id: TerritoryId) -> Option<&Territory> {
        self.state.world.get(id)
    }

    /// Owner of a territory.
    #[must_use]
    pub fn owner(&self, id: TerritoryId) -> Option<PlayerId> {
        self.view().owner(id)
    }

    /// Army value on a territory.
    #[must_use]
    pub fn army_value(&self, id: TerritoryId) -> u32 {
        self.view().army_value(id)
    }

    /// Events affecting a player.
    #[must_use]
    pub fn active_events(&self, player: PlayerId) -> Vec<&ActiveEvent> {
        self.state.events.active_for(player).collect()
    }

    /// Status of every technology for a player.
    #[must_use]
    pub fn tech_status(&self, player: PlayerId) -> Vec<(String, TechStatus)> {
        self.view().tech_status(player)
    }

    /// Research queue standing for a player.
    #[must_use]
    pub fn research_progress(&self, player: PlayerId) -> Option<ResearchProgress> {
        self.view().research_progress(player)
    }

    /// Turns until a technology completes at the projected income.
    #[must_use]
    pub fn turns_to_complete(&self, player: PlayerId, tech: &str) -> Option<u32> {
        research::turns_to_complete(&self.state, player, tech)
    }

    /// Conquest awaiting its army transfer.
    #[must_use]
    pub const fn pending_conquest(&self) -> Option<PendingConquest> {
        self.state.pending
    }

    /// Whether a player must trade cards.
    #[must_use]
    pub fn forced_trade(&self, player: PlayerId) -> bool {
        self.view().forced_trade(player)
    }

    /// Cards in a player's hand.
    #[must_use]
    pub fn hand(&self, player: PlayerId) -> &[CardId] {
        self.state
            .ledger
            .get(player)
            .map_or(&[], |p| p.hand.as_slice())
    }

    /// Retained log entries.
    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        self.state.log.entries()
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    fn ensure_running(&self) -> ActionResult<()> {
        if self.state.game_over {
            return Err(ActionError::GameOver);
        }
        Ok(())
    }

    fn ensure_actor(&self, player: PlayerId) -> ActionResult<()> {
        self.ensure_running()?;
        let p = self
            .state
            .ledger
            .get(player)
            .ok_or(ActionError::UnknownPlayer(player))?;
        if p.eliminated {
            return Err(ActionError::PlayerEliminated(player));
        }
        if player != self.state.current_player() {
            return Err(ActionError::NotYourTurn { player });
        }
        Ok(())
    }

    fn ensure_phase(&self, phase: Phase) -> ActionResult<()> {
        if self.state.phase != phase {
            return Err(ActionError::WrongPhase {
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn ensure_no_pending(&self) -> ActionResult<()> {
        if self.state.pending.is_some() {
            return Err(ActionError::ConquestPending);
        }
        Ok(())
    }

    /// Place reinforcements; moves to the attack phase once none remain.
    ///
    /// Returns the allowance left.
    ///
    /// # Errors
    ///
    /// Actor and phase checks, then [`reinforce::place`] errors.
    pub fn place_reinforcements(
        &mut self,
        player: PlayerId,
        territory: TerritoryId,
        count: u32,
    ) -> ActionResult<u32> {
        self.ensure_actor(player)?;
        self.ensure_phase(Phase::Reinforcement)?;
        let remaining = reinforce::place(&mut self.state, player, territory, count)?;
        if remaining == 0 {
            self.enter_attack();
        }
        Ok(remaining)
    }

    /// Trade three cards for reinforcements.
    ///
    /// # Errors
    ///
    /// Actor and phase checks, then [`cards::trade_cards`] errors.
    pub fn trade_cards(&mut self, player: PlayerId, ids: &[CardId]) -> ActionResult<TradeOutcome> {
        self.ensure_actor(player)?;
        self.ensure_phase(Phase::Reinforcement)?;
        let outcome = cards::trade_cards(&mut self.state, player, ids)?;
        if !cards::forced_trade(&self.state, player) {
            self.state.flags.forced_trade = false;
        }
        Ok(outcome)
    }

    /// Convert infantry into cavalry or artillery.
    ///
    /// # Errors
    ///
    /// Actor and phase checks, then [`reinforce::upgrade`] errors.
    pub fn upgrade_units(
        &mut self,
        player: PlayerId,
        territory: TerritoryId,
        unit: UnitType,
        count: u32,
    ) -> ActionResult<UpgradeOutcome> {
        self.ensure_actor(player)?;
        self.ensure_phase(Phase::Reinforcement)?;
        reinforce::upgrade(&mut self.state, player, territory, unit, count)
    }

    /// Attack a neighbouring territory.
    ///
    /// # Errors
    ///
    /// `ConquestPending`, actor and phase checks, then [`combat::attack`]
    /// errors.
    pub fn attack(
        &mut self,
        player: PlayerId,
        from: TerritoryId,
        to: TerritoryId,
        dice: u8,
    ) -> ActionResult<AttackOutcome> {
        self.ensure_running()?;
        self.ensure_no_pending()?;
        self.ensure_actor(player)?;
        self.ensure_phase(Phase::Attack)?;
        combat::attack(&mut self.state, player, from, to, dice)
    }

    /// Move armies into the territory emptied by the last attack.
    ///
    /// # Errors
    ///
    /// `GameOver`, then [`conquest::resolve`] errors.
    pub fn resolve_conquest(
        &mut self,
        player: PlayerId,
        armies: u32,
    ) -> ActionResult<ConquestOutcome> {
        self.ensure_running()?;
        let outcome = conquest::resolve(&mut self.state, player, armies)?;
        victory::check(&mut self.state);
        Ok(outcome)
    }

    /// Move armies between owned territories.
    ///
    /// With `auto_advance_after_fortify` the turn passes to the next player.
    ///
    /// # Errors
    ///
    /// Actor and phase checks, `AlreadyFortified`, then
    /// [`fortify::fortify`] errors.
    pub fn fortify(
        &mut self,
        player: PlayerId,
        from: TerritoryId,
        to: TerritoryId,
        armies: u32,
    ) -> ActionResult<FortifyOutcome> {
        self.ensure_actor(player)?;
        self.ensure_phase(Phase::Fortification)?;
        if self.state.flags.fortified {
            return Err(ActionError::AlreadyFortified);
        }
        let mut outcome = fortify::fortify(&mut self.state, player, from, to, armies)?;
        if self.state.config.auto_advance_after_fortify {
            outcome.phase_change = Some(self.advance_turn(player));
        }
        Ok(outcome)
    }

    /// Queue a technology.
    ///
    /// # Errors
    ///
    /// Actor check, then [`research::start_research`] errors.
    pub fn start_research(&mut self, player: PlayerId, tech: &str) -> ActionResult<()> {
        self.ensure_actor(player)?;
        research::start_research(&mut self.state, player, tech)
    }

    /// Form an alliance with another player, paying wealth.
    ///
    /// # Errors
    ///
    /// Actor check, `ConquestPending`, `SelfAlliance`,
    /// `InvalidAllianceTarget`, `AlreadyAllied` or `NotEnoughResource`.
    pub fn form_alliance(&mut self, player: PlayerId, other: PlayerId) -> ActionResult<()> {
        self.ensure_actor(player)?;
        self.ensure_no_pending()?;
        if other == player {
            return Err(ActionError::SelfAlliance);
        }
        if self.state.ledger.get(other).is_none_or(|p| p.eliminated) {
            return Err(ActionError::InvalidAllianceTarget(other));
        }
        if self.state.ledger.are_allied(player, other) {
            return Err(ActionError::AlreadyAllied(player, other));
        }
        let cost = self.state.config.alliance_cost;
        let resources = &mut self
            .state
            .ledger
            .get_mut(player)
            .ok_or(ActionError::UnknownPlayer(player))?
            .resources;
        let wealth = resources.wealth;
        if !resources.try_spend(ResourceKind::Wealth, cost) {
            return Err(ActionError::NotEnoughResource {
                resource: ResourceKind::Wealth,
                available: wealth,
                required: cost,
            });
        }
        self.state.ledger.ally(player, other);
        self.state
            .log(Some(player), format!("formed an alliance with player {other}"));
        tracing::info!(player, other, "alliance formed");
        Ok(())
    }

    /// Break an alliance.
    ///
    /// # Errors
    ///
    /// Actor check or `NotAllied`.
    pub fn break_alliance(&mut self, player: PlayerId, other: PlayerId) -> ActionResult<()> {
        self.ensure_actor(player)?;
        if !self.state.ledger.are_allied(player, other) {
            return Err(ActionError::NotAllied(player, other));
        }
        self.state.ledger.unally(player, other);
        self.state
            .log(Some(player), format!("broke the alliance with player {other}"));
        tracing::info!(player, other, "alliance broken");
        Ok(())
    }

    /// End the current phase.
    ///
    /// # Errors
    ///
    /// Actor check, `UnplacedReinforcements` in the reinforcement phase with
    /// armies left, or `ConquestPending` in the attack phase.
    pub fn end_phase(&mut self, player: PlayerId) -> ActionResult<PhaseChange> {
        self.ensure_actor(player)?;
        match self.state.phase {
            Phase::Reinforcement => {
                let remaining = self.state.flags.reinforcements;
                if remaining > 0 {
                    return Err(ActionError::UnplacedReinforcements(remaining));
                }
                self.enter_attack();
                Ok(self.change(player, Phase::Reinforcement, None, false, None))
            }
            Phase::Attack => {
                self.ensure_no_pending()?;
                let card_drawn = if self.state.flags.conquered {
                    self.draw_card(player)
                } else {
                    None
                };
                self.state.phase = Phase::Fortification;
                Ok(self.change(player, Phase::Attack, card_drawn, false, None))
            }
            Phase::Fortification => Ok(self.advance_turn(player)),
        }
    }

    /// Dispatch an [`Action`].
    ///
    /// # Errors
    ///
    /// Whatever the underlying action returns.
    pub fn apply(&mut self, player: PlayerId, action: Action) -> ActionResult<ActionReport> {
        tracing::trace!(player, ?action, "apply");
        Ok(match action {
            Action::PlaceReinforcements { territory, count } => ActionReport::Placed {
                remaining: self.place_reinforcements(player, territory, count)?,
            },
            Action::TradeCards { cards } => ActionReport::Traded(self.trade_cards(player, &cards)?),
            Action::UpgradeUnits {
                territory,
                unit,
                count,
            } => ActionReport::Upgraded(self.upgrade_units(player, territory, unit, count)?),
            Action::Attack { from, to, dice } => {
                ActionReport::Attacked(self.attack(player, from, to, dice)?)
            }
            Action::ResolveConquest { armies } => {
                ActionReport::Conquered(self.resolve_conquest(player, armies)?)
            }
            Action::Fortify { from, to, armies } => {
                ActionReport::Fortified(self.fortify(player, from, to, armies)?)
            }
            Action::StartResearch { tech } => {
                self.start_research(player, &tech)?;
                ActionReport::ResearchStarted
            }
            Action::FormAlliance { with } => {
                self.form_alliance(player, with)?;
                ActionReport::AllianceFormed
            }
            Action::BreakAlliance { with } => {
                self.break_alliance(player, with)?;
                ActionReport::AllianceBroken
            }
            Action::EndPhase => ActionReport::PhaseEnded(self.end_phase(player)?),
        })
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn change(
        &self,
        player: PlayerId,
        from: Phase,
        card_drawn: Option<CardId>,
        round_completed: bool,
        turn_start: Option<TurnStart>,
    ) -> PhaseChange {
        PhaseChange {
            player,
            from,
            to: self.state.phase,
            next_player: self.state.current_player(),
            turn: self.state.turn,
            card_drawn,
            round_completed,
            turn_start,
            game_over: self.state.game_over,
        }
    }

    fn enter_attack(&mut self) {
        self.state.phase = Phase::Attack;
        self.state.flags.conquered = false;
        tracing::debug!(player = self.state.current_player(), "attack phase");
    }

    fn draw_card(&mut self, player: PlayerId) -> Option<CardId> {
        let card = self.state.cards.draw(&mut self.state.rng)?;
        if let Some(p) = self.state.ledger.get_mut(player) {
            p.hand.push(card);
        }
        tracing::debug!(player, card, "card drawn");
        Some(card)
    }

    /// Pass play to the next surviving player, completing a round on wrap.
    fn advance_turn(&mut self, player: PlayerId) -> PhaseChange {
        let from = self.state.phase;
        let old = self.state.current;
        let count = self.state.ledger.len();
        let next = (1..=count)
            .map(|k| (old + k) % count)
            .find(|&i| self.state.ledger.at(i).is_some_and(|p| !p.eliminated));

        let Some(next) = next.filter(|&i| i != old) else {
            victory::check(&mut self.state);
            return self.change(player, from, None, false, None);
        };

        let round_completed = next <= old;
        if round_completed {
            self.state.turn += 1;
            events::expire(&mut self.state);
            victory::update_counters(&mut self.state);
            victory::check(&mut self.state);
        }

        self.state.current = next;
        self.state.phase = Phase::Reinforcement;
        let turn_start = if self.state.game_over {
            None
        } else {
            Some(self.begin_turn())
        };
        self.change(player, from, None, round_completed, turn_start)
    }

    /// Start-of-turn processing for the current player.
    fn begin_turn(&mut self) -> TurnStart {
        let player = self.state.current_player();
        self.state.flags = TurnFlags::default();

        let income = resources::collect(&mut self.state, player);
        let completed = research::progress(&mut self.state, player);
        let event = events::trigger(&mut self.state, player);
        let reinforcements = reinforce::reinforcement_armies(&self.state, player);
        self.state.flags.reinforcements = reinforcements;

        let forced_trade = cards::forced_trade(&self.state, player);
        self.state.flags.forced_trade = forced_trade;
        if forced_trade {
            let held = self.state.ledger.get(player).map_or(0, |p| p.hand.len());
            self.state
                .log(Some(player), format!("must trade cards, holding {held}"));
            tracing::warn!(player, held, "forced trade");
        }
        if !completed.is_empty() {
            victory::check(&mut self.state);
        }

        tracing::debug!(player, turn = self.state.turn, reinforcements, "turn started");
        TurnStart {
            player,
            income,
            completed,
            event,
            reinforcements,
            forced_trade,
        }
    }
}
