//! Random world events and the modifiers they leave behind.
//!
//! An event fires at most once per player turn start. Immediate effects
//! (resource and army deltas, feature changes) apply on trigger; modifiers
//! (combat, movement, resource) last while the event is registered. Events
//! are removed when the turn counter reaches their end turn, and reversible
//! ones restore the feature values they overwrote.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::game::{Feature, GameState, PlayerId, ResourceKind, TerritoryId, UnitType, World};

/// Side of a combat a modifier applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatSide {
    /// Attacking dice.
    Attack,
    /// Defending dice.
    Defense,
}

/// Effect of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEffect {
    /// Immediate change to a resource pool (clamped at zero).
    ResourceDelta {
        /// Resource changed.
        resource: ResourceKind,
        /// Signed amount.
        amount: i32,
    },
    /// Immediate infantry change on each affected territory.
    ArmyDelta {
        /// Signed infantry count.
        amount: i32,
    },
    /// Dice modifier while active.
    CombatModifier {
        /// Side affected (`None` = both).
        #[serde(default)]
        side: Option<CombatSide>,
        /// Added to each die.
        bonus: i32,
    },
    /// Fortification range modifier while active.
    MovementModifier {
        /// Added hops (may be negative).
        hops: i32,
    },
    /// Income percentage modifier while active.
    ResourceModifier {
        /// Resource affected.
        resource: ResourceKind,
        /// Percentage added.
        percent: i32,
    },
    /// Sets a feature flag on each affected territory.
    FeatureChange {
        /// Feature changed.
        feature: Feature,
        /// New value.
        present: bool,
    },
}

/// Who an event affects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScope {
    /// The player whose turn triggered it.
    #[default]
    Player,
    /// Every player.
    All,
}

/// How affected territories are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerritoryTargeting {
    /// No specific territories: area effects cover everything in scope.
    #[default]
    None,
    /// Random territories owned by players in scope.
    Owned {
        /// How many.
        count: u32,
    },
    /// Random territories anywhere.
    Any {
        /// How many.
        count: u32,
    },
}

/// Minimum level of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceThreshold {
    /// Resource checked.
    pub resource: ResourceKind,
    /// Minimum amount in the pool.
    pub amount: u32,
}

/// Conditions on the triggering player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConditions {
    /// Owns at least this many territories.
    pub min_territories: Option<u32>,
    /// Owns at most this many territories.
    pub max_territories: Option<u32>,
    /// Turn counter at least this.
    pub min_turn: Option<u32>,
    /// Owns this technology.
    pub required_tech: Option<String>,
    /// Controls at least one whole continent.
    pub controls_continent: bool,
    /// Holds at least this much of a resource.
    pub min_resource: Option<ResourceThreshold>,
}

/// Catalog entry for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    /// Unique key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What happens.
    pub effect: EventEffect,
    /// Turns the event stays registered (0 = immediate only).
    #[serde(default)]
    pub duration: u32,
    /// Restore overwritten features on expiry.
    #[serde(default)]
    pub reversible: bool,
    /// Maximum times this event may fire per game.
    #[serde(default)]
    pub max_occurrences: Option<u32>,
    /// Who is affected.
    #[serde(default)]
    pub scope: EventScope,
    /// Which territories are affected.
    #[serde(default)]
    pub targeting: TerritoryTargeting,
    /// Trigger conditions.
    #[serde(default)]
    pub conditions: EventConditions,
}

/// Validated event catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<EventDefinition>", into = "Vec<EventDefinition>")]
pub struct EventCatalog {
    events: Vec<EventDefinition>,
}

impl TryFrom<Vec<EventDefinition>> for EventCatalog {
    type Error = DataError;

    fn try_from(events: Vec<EventDefinition>) -> Result<Self, Self::Error> {
        Self::new(events)
    }
}

impl From<EventCatalog> for Vec<EventDefinition> {
    fn from(catalog: EventCatalog) -> Self {
        catalog.events
    }
}

impl EventCatalog {
    /// Build a catalog, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// `Duplicate` on a repeated id.
    pub fn new(events: Vec<EventDefinition>) -> Result<Self, DataError> {
        for (i, event) in events.iter().enumerate() {
            if events[..i].iter().any(|e| e.id == event.id) {
                return Err(DataError::Duplicate(event.id.clone()));
            }
        }
        Ok(Self { events })
    }

    /// All events in catalog order.
    #[must_use]
    pub fn events(&self) -> &[EventDefinition] {
        &self.events
    }

    /// Event by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|e| e.id == id)
    }
}

/// Target of an active event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTarget {
    /// One player.
    Player(PlayerId),
    /// Every player.
    All,
}

impl EventTarget {
    /// Whether the target includes a player.
    #[must_use]
    pub fn includes(self, player: PlayerId) -> bool {
        match self {
            Self::Player(p) => p == player,
            Self::All => true,
        }
    }
}

/// Feature value overwritten by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureUndo {
    /// Territory changed.
    pub territory: TerritoryId,
    /// Feature changed.
    pub feature: Feature,
    /// Value before the event.
    pub previous: bool,
}

/// An event currently in effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEvent {
    /// Instance id, unique per game.
    pub instance: u32,
    /// Catalog id.
    pub event_id: String,
    /// Display name.
    pub name: String,
    /// Who it affects.
    pub target: EventTarget,
    /// Territories it affects.
    pub territories: Vec<TerritoryId>,
    /// Effect payload.
    pub effect: EventEffect,
    /// Turn it fired on.
    pub start_turn: u32,
    /// Turn it is removed on.
    pub end_turn: u32,
    /// Restore features on removal.
    pub reversible: bool,
    /// Overwritten feature values.
    pub undo: Vec<FeatureUndo>,
}

impl ActiveEvent {
    /// Whether the event applies to a player and (optionally) a territory.
    fn applies(&self, player: PlayerId, territory: Option<TerritoryId>) -> bool {
        self.target.includes(player)
            && territory.is_none_or(|t| self.territories.is_empty() || self.territories.contains(&t))
    }
}

/// Active events and occurrence counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRegistry {
    active: Vec<ActiveEvent>,
    occurrences: BTreeMap<String, u32>,
    next_instance: u32,
}

impl EventRegistry {
    /// Events currently registered.
    #[must_use]
    pub fn active(&self) -> &[ActiveEvent] {
        &self.active
    }

    /// Times an event has fired.
    #[must_use]
    pub fn occurrences(&self, id: &str) -> u32 {
        self.occurrences.get(id).copied().unwrap_or(0)
    }

    /// Events affecting a player.
    pub fn active_for(&self, player: PlayerId) -> impl Iterator<Item = &ActiveEvent> {
        self.active.iter().filter(move |e| e.target.includes(player))
    }

    /// Dice modifier for a player fighting from or on a territory.
    #[must_use]
    pub fn combat_modifier(&self, player: PlayerId, territory: TerritoryId, side: CombatSide) -> i32 {
        self.active
            .iter()
            .filter(|e| e.applies(player, Some(territory)))
            .filter_map(|e| match e.effect {
                EventEffect::CombatModifier { side: s, bonus } if s.is_none_or(|s| s == side) => {
                    Some(bonus)
                }
                _ => None,
            })
            .sum()
    }

    /// Fortification range modifier for a player.
    #[must_use]
    pub fn movement_modifier(&self, player: PlayerId) -> i32 {
        self.active
            .iter()
            .filter(|e| e.applies(player, None))
            .filter_map(|e| match e.effect {
                EventEffect::MovementModifier { hops } => Some(hops),
                _ => None,
            })
            .sum()
    }

    /// Income percentage modifier for a player and resource.
    #[must_use]
    pub fn resource_modifier(&self, player: PlayerId, kind: ResourceKind) -> i32 {
        self.active
            .iter()
            .filter(|e| e.applies(player, None))
            .filter_map(|e| match e.effect {
                EventEffect::ResourceModifier { resource, percent } if resource == kind => {
                    Some(percent)
                }
                _ => None,
            })
            .sum()
    }

    /// Register an event. Used by trigger and by tests that need a known event.
    pub fn register(&mut self, mut event: ActiveEvent) -> u32 {
        event.instance = self.next_instance;
        self.next_instance += 1;
        let instance = event.instance;
        self.active.push(event);
        instance
    }

    fn record_occurrence(&mut self, id: &str) {
        *self.occurrences.entry(id.to_string()).or_insert(0) += 1;
    }
}

/// Summary of a triggered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredEvent {
    /// Catalog id.
    pub event_id: String,
    /// Who it affects.
    pub target: EventTarget,
    /// Territories it affects.
    pub territories: Vec<TerritoryId>,
    /// Registered instance, if the event has a duration.
    pub instance: Option<u32>,
}

fn conditions_met(state: &GameState, player: PlayerId, event: &EventDefinition) -> bool {
    if event
        .max_occurrences
        .is_some_and(|cap| state.events.occurrences(&event.id) >= cap)
    {
        return false;
    }
    let Some(p) = state.ledger.get(player) else {
        return false;
    };
    let c = &event.conditions;
    let owned = state.world.count_owned(player);
    if c.min_territories.is_some_and(|min| owned < min) {
        return false;
    }
    if c.max_territories.is_some_and(|max| owned > max) {
        return false;
    }
    if c.min_turn.is_some_and(|min| state.turn < min) {
        return false;
    }
    if c.required_tech.as_ref().is_some_and(|t| !p.has_tech(t)) {
        return false;
    }
    if c.controls_continent && state.world.controlled_continents(player).next().is_none() {
        return false;
    }
    if c
        .min_resource
        .is_some_and(|r| p.resources.get(r.resource) < r.amount)
    {
        return false;
    }
    true
}

fn pick_territories(
    world: &World,
    target: EventTarget,
    targeting: TerritoryTargeting,
    rng: &mut impl Rng,
) -> Vec<TerritoryId> {
    let (candidates, count): (Vec<TerritoryId>, u32) = match targeting {
        TerritoryTargeting::None => return Vec::new(),
        TerritoryTargeting::Owned { count } => (
            world
                .territories()
                .iter()
                .filter(|t| t.owner.is_some_and(|o| target.includes(o)))
                .map(|t| t.id)
                .collect(),
            count,
        ),
        TerritoryTargeting::Any { count } => {
            (world.territories().iter().map(|t| t.id).collect(), count)
        }
    };
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    let mut chosen: Vec<TerritoryId> = candidates.choose_multiple(rng, count).copied().collect();
    chosen.sort_unstable();
    chosen
}

/// Territories an area effect covers when no territories were picked.
fn area(world: &World, target: EventTarget) -> Vec<TerritoryId> {
    world
        .territories()
        .iter()
        .filter(|t| t.owner.is_some_and(|o| target.includes(o)))
        .map(|t| t.id)
        .collect()
}

fn apply_immediate(
    state: &mut GameState,
    effect: &EventEffect,
    target: EventTarget,
    territories: &[TerritoryId],
) -> Vec<FeatureUndo> {
    let mut undo = Vec::new();
    match *effect {
        EventEffect::ResourceDelta { resource, amount } => {
            let ids: Vec<PlayerId> = state
                .ledger
                .active()
                .filter(|p| target.includes(p.id))
                .map(|p| p.id)
                .collect();
            for id in ids {
                if let Some(p) = state.ledger.get_mut(id) {
                    p.resources.apply_delta(resource, amount);
                }
            }
        }
        EventEffect::ArmyDelta { amount } => {
            let covered = if territories.is_empty() {
                area(&state.world, target)
            } else {
                territories.to_vec()
            };
            for id in covered {
                let Some(t) = state.world.get_mut(id) else {
                    continue;
                };
                if amount >= 0 {
                    t.units.add_units(UnitType::Infantry, amount.unsigned_abs());
                } else {
                    // Owned territories keep one unit.
                    let floor = u32::from(t.owner.is_some());
                    let mut losses = amount.unsigned_abs();
                    while losses > 0 && t.units.unit_count() > floor {
                        t.units.remove_casualty();
                        losses -= 1;
                    }
                }
            }
        }
        EventEffect::FeatureChange { feature, present } => {
            let covered = if territories.is_empty() {
                area(&state.world, target)
            } else {
                territories.to_vec()
            };
            for id in covered {
                if let Some(t) = state.world.get_mut(id) {
                    let previous = t.features.set(feature, present);
                    undo.push(FeatureUndo {
                        territory: id,
                        feature,
                        previous,
                    });
                }
            }
        }
        EventEffect::CombatModifier { .. }
        | EventEffect::MovementModifier { .. }
        | EventEffect::ResourceModifier { .. } => {}
    }
    undo
}

/// Roll for and apply an event at the start of a player's turn.
pub fn trigger(state: &mut GameState, player: PlayerId) -> Option<TriggeredEvent> {
    if !state.rng.chance(state.config.event_chance_percent) {
        return None;
    }
    let eligible: Vec<EventDefinition> = state
        .rules
        .events
        .events()
        .iter()
        .filter(|e| conditions_met(state, player, e))
        .cloned()
        .collect();
    let mut rng = state.rng.fork();
    let event = eligible.choose(&mut rng)?.clone();
    let target = match event.scope {
        EventScope::Player => EventTarget::Player(player),
        EventScope::All => EventTarget::All,
    };
    let territories = pick_territories(&state.world, target, event.targeting, &mut rng);
    Some(fire(state, &event, target, territories))
}

/// Apply an event definition directly, bypassing the trigger roll.
pub fn fire(
    state: &mut GameState,
    event: &EventDefinition,
    target: EventTarget,
    territories: Vec<TerritoryId>,
) -> TriggeredEvent {
    let undo = apply_immediate(state, &event.effect, target, &territories);
    state.events.record_occurrence(&event.id);

    let instance = (event.duration > 0).then(|| {
        state.events.register(ActiveEvent {
            instance: 0,
            event_id: event.id.clone(),
            name: event.name.clone(),
            target,
            territories: territories.clone(),
            effect: event.effect,
            start_turn: state.turn,
            end_turn: state.turn.saturating_add(event.duration),
            reversible: event.reversible,
            undo,
        })
    });

    let subject = match target {
        EventTarget::Player(p) => Some(p),
        EventTarget::All => None,
    };
    state.log(subject, format!("event: {}", event.name));
    tracing::info!(event = %event.id, ?target, "world event");

    TriggeredEvent {
        event_id: event.id.clone(),
        target,
        territories,
        instance,
    }
}

/// Remove events whose end turn has been reached, undoing reversible ones.
///
/// Returns the removed events.
pub fn expire(state: &mut GameState) -> Vec<ActiveEvent> {
    let turn = state.turn;
    let (expired, kept): (Vec<ActiveEvent>, Vec<ActiveEvent>) =
        std::mem::take(&mut state.events.active)
            .into_iter()
            .partition(|e| turn >= e.end_turn);
    state.events.active = kept;

    for event in &expired {
        if event.reversible {
            // Newest change first so stacked changes unwind in order.
            for undo in event.undo.iter().rev() {
                if let Some(t) = state.world.get_mut(undo.territory) {
                    t.features.set(undo.feature, undo.previous);
                }
            }
        }
        tracing::debug!(event = %event.event_id, instance = event.instance, "event expired");
    }
    expired
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(effect: EventEffect) -> ActiveEvent {
        ActiveEvent {
            instance: 0,
            event_id: "test".into(),
            name: "Test".into(),
            target: EventTarget::Player(1),
            territories: vec![2],
            effect,
            start_turn: 1,
            end_turn: 3,
            reversible: false,
            undo: Vec::new(),
        }
    }

    #[test]
    fn test_combat_modifier_filters_side_and_territory() {
        let mut registry = EventRegistry::default();
        registry.register(event(EventEffect::CombatModifier {
            side: Some(CombatSide::Defense),
            bonus: 2,
        }));
        assert_eq!(registry.combat_modifier(1, 2, CombatSide::Defense), 2);
        assert_eq!(registry.combat_modifier(1, 2, CombatSide::Attack), 0);
        assert_eq!(registry.combat_modifier(1, 3, CombatSide::Defense), 0);
        assert_eq!(registry.combat_modifier(2, 2, CombatSide::Defense), 0);
    }

    #[test]
    fn test_movement_and_resource_modifiers_sum() {
        let mut registry = EventRegistry::default();
        registry.register(event(EventEffect::MovementModifier { hops: 1 }));
        registry.register(event(EventEffect::MovementModifier { hops: 2 }));
        registry.register(event(EventEffect::ResourceModifier {
            resource: ResourceKind::Food,
            percent: 50,
        }));
        assert_eq!(registry.movement_modifier(1), 3);
        assert_eq!(registry.resource_modifier(1, ResourceKind::Food), 50);
        assert_eq!(registry.resource_modifier(1, ResourceKind::Wealth), 0);
    }

    #[test]
    fn test_register_assigns_instances() {
        let mut registry = EventRegistry::default();
        let a = registry.register(event(EventEffect::MovementModifier { hops: 1 }));
        let b = registry.register(event(EventEffect::MovementModifier { hops: 1 }));
        assert_ne!(a, b);
        assert_eq!(registry.active_for(1).count(), 2);
        assert_eq!(registry.active_for(2).count(), 0);
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let def = EventDefinition {
            id: "x".into(),
            name: "X".into(),
            effect: EventEffect::MovementModifier { hops: 1 },
            duration: 1,
            reversible: false,
            max_occurrences: None,
            scope: EventScope::Player,
            targeting: TerritoryTargeting::None,
            conditions: EventConditions::default(),
        };
        assert!(EventCatalog::new(vec![def.clone(), def]).is_err());
    }

    #[test]
    fn test_reversible_event_expires_and_undoes_once() {
        let mut state = crate::game::engine::tests::two_player_state();
        let def = EventDefinition {
            id: "harbor".into(),
            name: "Harbor".into(),
            effect: EventEffect::FeatureChange {
                feature: Feature::Port,
                present: true,
            },
            duration: 2,
            reversible: true,
            max_occurrences: None,
            scope: EventScope::All,
            targeting: TerritoryTargeting::None,
            conditions: EventConditions::default(),
        };
        let start = state.turn;
        let fired = fire(&mut state, &def, EventTarget::All, vec![0]);
        assert!(fired.instance.is_some());
        assert!(state.world.get(0).unwrap().features.has(Feature::Port));
        assert_eq!(state.events.occurrences("harbor"), 1);

        state.turn = start + 1;
        assert!(expire(&mut state).is_empty());
        assert_eq!(state.events.active.len(), 1);

        state.turn = start + 2;
        let expired = expire(&mut state);
        assert_eq!(expired.len(), 1);
        assert!(state.events.active.is_empty());
        assert!(!state.world.get(0).unwrap().features.has(Feature::Port));

        // A later change to the same flag is left alone.
        state.world.get_mut(0).unwrap().features.set(Feature::Port, true);
        state.turn = start + 3;
        assert!(expire(&mut state).is_empty());
        assert!(state.world.get(0).unwrap().features.has(Feature::Port));
    }

    #[test]
    fn test_trigger_respects_chance() {
        let mut state = crate::game::engine::tests::two_player_state();
        state.config.event_chance_percent = 0;
        for _ in 0..20 {
            assert!(trigger(&mut state, 1).is_none());
        }
        state.config.event_chance_percent = 100;
        let fired = trigger(&mut state, 1).unwrap();
        assert!(state.rules.events.events().iter().any(|e| e.id == fired.event_id));
    }
}
