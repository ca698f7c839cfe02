//! World model: territories, continents and unit counts.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::game::{PlayerId, Resources};

/// Index of a territory in the world table.
pub type TerritoryId = u16;

/// Index of a continent in the world table.
pub type ContinentId = u8;

/// Kind of military unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Worth 1 army value.
    Infantry,
    /// Worth 3 army value.
    Cavalry,
    /// Worth 5 army value.
    Artillery,
}

impl UnitType {
    /// All unit types in casualty/movement priority order.
    pub const PRIORITY: [UnitType; 3] = [UnitType::Infantry, UnitType::Cavalry, UnitType::Artillery];

    /// Army value of a single unit.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            UnitType::Infantry => 1,
            UnitType::Cavalry => 3,
            UnitType::Artillery => 5,
        }
    }
}

/// Unit counts stationed on a territory.
///
/// Counts are unsigned so they can never go negative; every removal
/// saturates at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitCounts {
    /// Infantry units.
    pub infantry: u32,
    /// Cavalry units.
    pub cavalry: u32,
    /// Artillery units.
    pub artillery: u32,
}

impl UnitCounts {
    /// Counts with only infantry.
    #[must_use]
    pub const fn infantry(count: u32) -> Self {
        Self {
            infantry: count,
            cavalry: 0,
            artillery: 0,
        }
    }

    /// Counts with every unit type given explicitly.
    #[must_use]
    pub const fn new(infantry: u32, cavalry: u32, artillery: u32) -> Self {
        Self {
            infantry,
            cavalry,
            artillery,
        }
    }

    /// Weighted army value: `infantry + 3×cavalry + 5×artillery`.
    #[must_use]
    pub const fn army_value(&self) -> u32 {
        self.infantry
            .saturating_add(self.cavalry.saturating_mul(3))
            .saturating_add(self.artillery.saturating_mul(5))
    }

    /// Total number of units regardless of type.
    #[must_use]
    pub const fn unit_count(&self) -> u32 {
        self.infantry
            .saturating_add(self.cavalry)
            .saturating_add(self.artillery)
    }

    /// Number of units of one type.
    #[must_use]
    pub const fn get(&self, unit: UnitType) -> u32 {
        match unit {
            UnitType::Infantry => self.infantry,
            UnitType::Cavalry => self.cavalry,
            UnitType::Artillery => self.artillery,
        }
    }

    fn slot(&mut self, unit: UnitType) -> &mut u32 {
        match unit {
            UnitType::Infantry => &mut self.infantry,
            UnitType::Cavalry => &mut self.cavalry,
            UnitType::Artillery => &mut self.artillery,
        }
    }

    /// Whether at least one unit of this type is present.
    #[must_use]
    pub const fn has(&self, unit: UnitType) -> bool {
        self.get(unit) > 0
    }

    /// Whether all three unit types are present.
    #[must_use]
    pub const fn has_combined_arms(&self) -> bool {
        self.infantry > 0 && self.cavalry > 0 && self.artillery > 0
    }

    /// Add units of one type.
    pub fn add_units(&mut self, unit: UnitType, count: u32) {
        let slot = self.slot(unit);
        *slot = slot.saturating_add(count);
    }

    /// Add every unit of `other`.
    pub fn add(&mut self, other: UnitCounts) {
        self.infantry = self.infantry.saturating_add(other.infantry);
        self.cavalry = self.cavalry.saturating_add(other.cavalry);
        self.artillery = self.artillery.saturating_add(other.artillery);
    }

    /// Remove one casualty in priority order (infantry, cavalry, artillery).
    ///
    /// Returns the unit type removed, or `None` if nothing was left.
    pub fn remove_casualty(&mut self) -> Option<UnitType> {
        for unit in UnitType::PRIORITY {
            let slot = self.slot(unit);
            if *slot > 0 {
                *slot -= 1;
                return Some(unit);
            }
        }
        None
    }

    /// Remove one casualty from a side that must keep a unit standing.
    ///
    /// A lone cavalry or artillery is broken into infantry and one of those
    /// is removed, so the loss is always one army value. Returns `None` only
    /// when a single infantry is left.
    pub fn remove_casualty_keeping_one(&mut self) -> Option<UnitType> {
        match self.unit_count() {
            0 => None,
            1 => {
                let value = self.army_value();
                if value <= 1 {
                    return None;
                }
                *self = Self::infantry(value - 1);
                Some(UnitType::Infantry)
            }
            _ => self.remove_casualty(),
        }
    }

    /// Detach units worth exactly `value` army value.
    ///
    /// Units are taken in priority order. When the remaining value is smaller
    /// than the next unit, that unit is broken into infantry: the taken side
    /// receives the needed infantry and the change stays behind as infantry.
    /// Returns `None` (and leaves `self` unchanged) if `value` exceeds the
    /// available army value.
    pub fn take_value(&mut self, value: u32) -> Option<UnitCounts> {
        if value > self.army_value() {
            return None;
        }

        let mut taken = UnitCounts::default();
        let mut remaining = value;

        for unit in UnitType::PRIORITY {
            if remaining == 0 {
                break;
            }
            let unit_value = unit.value();
            let whole = (remaining / unit_value).min(self.get(unit));
            *self.slot(unit) -= whole;
            taken.add_units(unit, whole);
            remaining -= whole * unit_value;

            let has_larger = UnitType::PRIORITY
                .iter()
                .any(|&u| u.value() > unit_value && self.has(u));
            if remaining > 0 && self.has(unit) && (remaining < unit_value) && !has_larger {
                // Break one unit of this type.
                *self.slot(unit) -= 1;
                taken.infantry += remaining;
                self.infantry += unit_value - remaining;
                remaining = 0;
            }
        }

        if remaining > 0 {
            // Only reachable when a smaller unit was skipped in favour of a
            // larger one; break the smallest remaining larger unit.
            for unit in UnitType::PRIORITY {
                if remaining == 0 {
                    break;
                }
                while remaining > 0 && self.has(unit) {
                    let unit_value = unit.value();
                    *self.slot(unit) -= 1;
                    if remaining >= unit_value {
                        taken.add_units(unit, 1);
                        remaining -= unit_value;
                    } else {
                        taken.infantry += remaining;
                        self.infantry += unit_value - remaining;
                        remaining = 0;
                    }
                }
            }
        }

        debug_assert_eq!(taken.army_value(), value);
        Some(taken)
    }
}

/// A territory feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Produces research and discounts technology.
    ResearchCenter,
    /// Produces production and wealth.
    Capital,
    /// Produces wealth and food.
    Port,
}

/// Feature flags of a territory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// Research center present.
    pub research_center: bool,
    /// Capital present.
    pub capital: bool,
    /// Port present.
    pub port: bool,
}

impl Features {
    /// Whether a feature is present.
    #[must_use]
    pub const fn has(&self, feature: Feature) -> bool {
        match feature {
            Feature::ResearchCenter => self.research_center,
            Feature::Capital => self.capital,
            Feature::Port => self.port,
        }
    }

    /// Set a feature, returning its previous value.
    pub fn set(&mut self, feature: Feature, present: bool) -> bool {
        let slot = match feature {
            Feature::ResearchCenter => &mut self.research_center,
            Feature::Capital => &mut self.capital,
            Feature::Port => &mut self.port,
        };
        std::mem::replace(slot, present)
    }
}

/// A single territory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    /// Index in the world table.
    pub id: TerritoryId,
    /// Display name.
    pub name: String,
    /// Continent this territory belongs to.
    pub continent: ContinentId,
    /// Sorted neighbour ids.
    pub adjacent: Vec<TerritoryId>,
    /// Owning player (`None` = neutral).
    pub owner: Option<PlayerId>,
    /// Stationed units.
    pub units: UnitCounts,
    /// Base resource yield per turn.
    pub yields: Resources,
    /// Feature flags.
    pub features: Features,
}

impl Territory {
    /// Army value stationed here.
    #[must_use]
    pub const fn army_value(&self) -> u32 {
        self.units.army_value()
    }

    /// Whether `other` is a neighbour.
    #[must_use]
    pub fn is_adjacent(&self, other: TerritoryId) -> bool {
        self.adjacent.binary_search(&other).is_ok()
    }
}

/// A continent and its control bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continent {
    /// Index in the world table.
    pub id: ContinentId,
    /// Display name.
    pub name: String,
    /// Member territories.
    pub territories: Vec<TerritoryId>,
    /// Extra reinforcements for owning every member.
    pub bonus: u32,
}

/// The territory graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    territories: Vec<Territory>,
    continents: Vec<Continent>,
}

impl World {
    /// Build a world from already-validated tables.
    #[must_use]
    pub fn new(territories: Vec<Territory>, continents: Vec<Continent>) -> Self {
        Self {
            territories,
            continents,
        }
    }

    /// All territories in id order.
    #[must_use]
    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    /// All continents in id order.
    #[must_use]
    pub fn continents(&self) -> &[Continent] {
        &self.continents
    }

    /// Number of territories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.territories.len()
    }

    /// Whether the world has no territories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }

    /// Get a territory by id.
    #[must_use]
    pub fn get(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(usize::from(id))
    }

    /// Get a mutable territory by id.
    #[must_use]
    pub fn get_mut(&mut self, id: TerritoryId) -> Option<&mut Territory> {
        self.territories.get_mut(usize::from(id))
    }

    /// Get a territory by display name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Territory> {
        self.territories.iter().find(|t| t.name == name)
    }

    /// Iterate mutably over every territory.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Territory> {
        self.territories.iter_mut()
    }

    /// Whether two territories are neighbours.
    #[must_use]
    pub fn are_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.get(a).is_some_and(|t| t.is_adjacent(b))
    }

    /// Territories owned by a player.
    pub fn owned_by(&self, player: PlayerId) -> impl Iterator<Item = &Territory> {
        self.territories
            .iter()
            .filter(move |t| t.owner == Some(player))
    }

    /// Number of territories owned by a player.
    #[must_use]
    pub fn count_owned(&self, player: PlayerId) -> u32 {
        u32::try_from(self.owned_by(player).count()).unwrap_or(u32::MAX)
    }

    /// Total army value a player has on the map.
    #[must_use]
    pub fn total_army_value(&self, player: PlayerId) -> u32 {
        self.owned_by(player)
            .map(Territory::army_value)
            .fold(0, u32::saturating_add)
    }

    /// Whether a player owns every territory of a continent.
    #[must_use]
    pub fn controls_continent(&self, player: PlayerId, continent: ContinentId) -> bool {
        self.continents
            .get(usize::from(continent))
            .is_some_and(|c| {
                !c.territories.is_empty()
                    && c.territories
                        .iter()
                        .all(|&id| self.get(id).is_some_and(|t| t.owner == Some(player)))
            })
    }

    /// Continents fully controlled by a player.
    pub fn controlled_continents(&self, player: PlayerId) -> impl Iterator<Item = &Continent> {
        self.continents
            .iter()
            .filter(move |c| self.controls_continent(player, c.id))
    }

    /// Whether `to` can be reached from `from` in at most `range` hops,
    /// stepping only through territories owned by `player`.
    ///
    /// Both endpoints must be owned by `player`. Breadth-first search bounded
    /// by the hop count.
    #[must_use]
    pub fn reachable_within(
        &self,
        player: PlayerId,
        from: TerritoryId,
        to: TerritoryId,
        range: u32,
    ) -> bool {
        if from == to {
            return true;
        }
        let owned = |id: TerritoryId| self.get(id).is_some_and(|t| t.owner == Some(player));
        if !owned(from) || !owned(to) {
            return false;
        }

        let mut visited = vec![false; self.territories.len()];
        let mut frontier = VecDeque::new();
        visited[usize::from(from)] = true;
        frontier.push_back((from, 0u32));

        while let Some((current, depth)) = frontier.pop_front() {
            if depth >= range {
                continue;
            }
            let Some(territory) = self.get(current) else {
                continue;
            };
            for &next in &territory.adjacent {
                if next == to {
                    return true;
                }
                let idx = usize::from(next);
                if idx < visited.len() && !visited[idx] && owned(next) {
                    visited[idx] = true;
                    frontier.push_back((next, depth + 1));
                }
            }
        }

        false
    }

    /// Ids of enemy (not owned by `player`) neighbours of a territory.
    pub fn hostile_neighbours(
        &self,
        player: PlayerId,
        id: TerritoryId,
    ) -> impl Iterator<Item = TerritoryId> + '_ {
        self.get(id)
            .map(|t| t.adjacent.as_slice())
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(move |&n| self.get(n).is_some_and(|t| t.owner != Some(player)))
    }
}
