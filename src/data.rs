//! Static data tables: map, technologies and events.
//!
//! Tables are JSON. A built-in set is compiled into the crate; custom tables
//! go through the same validation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::game::{
    Continent, ContinentId, EventCatalog, EventDefinition, Features, Resources, TechCatalog,
    Technology, Territory, TerritoryId, UnitCounts, World,
};

const BUILTIN_MAP: &str = include_str!("../data/map.json");
const BUILTIN_TECHS: &str = include_str!("../data/techs.json");
const BUILTIN_EVENTS: &str = include_str!("../data/events.json");

/// Continent entry of a map table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinentData {
    /// Unique name.
    pub name: String,
    /// Control bonus.
    pub bonus: u32,
}

/// Territory entry of a map table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryData {
    /// Unique name.
    pub name: String,
    /// Continent name.
    pub continent: String,
    /// Base yield per turn.
    #[serde(default)]
    pub yields: Resources,
    /// Feature flags.
    #[serde(default)]
    pub features: Features,
}

/// Map table: continents, territories and undirected connections by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    /// Continents.
    pub continents: Vec<ContinentData>,
    /// Territories, in id order.
    pub territories: Vec<TerritoryData>,
    /// Undirected connections.
    pub connections: Vec<(String, String)>,
}

impl MapData {
    /// Built-in map.
    ///
    /// # Errors
    ///
    /// Only if the bundled table is malformed.
    pub fn builtin() -> Result<Self, DataError> {
        Self::from_json(BUILTIN_MAP)
    }

    /// Parse a map table.
    ///
    /// # Errors
    ///
    /// Malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a map table from a file.
    ///
    /// # Errors
    ///
    /// I/O failure or malformed JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Validate the table and build an unowned world.
    ///
    /// # Errors
    ///
    /// Duplicate names, unknown continents or territories, self-connections,
    /// or territories without connections.
    pub fn build(&self) -> Result<World, DataError> {
        let mut continent_ids: BTreeMap<&str, ContinentId> = BTreeMap::new();
        let mut continents = Vec::with_capacity(self.continents.len());
        for (c, id) in self.continents.iter().zip(0..=ContinentId::MAX) {
            if continent_ids.insert(c.name.as_str(), id).is_some() {
                return Err(DataError::Duplicate(c.name.clone()));
            }
            continents.push(Continent {
                id,
                name: c.name.clone(),
                territories: Vec::new(),
                bonus: c.bonus,
            });
        }

        let mut territory_ids: BTreeMap<&str, TerritoryId> = BTreeMap::new();
        let mut territories = Vec::with_capacity(self.territories.len());
        for (t, id) in self.territories.iter().zip(0..=TerritoryId::MAX) {
            if territory_ids.insert(t.name.as_str(), id).is_some() {
                return Err(DataError::Duplicate(t.name.clone()));
            }
            let continent = *continent_ids
                .get(t.continent.as_str())
                .ok_or_else(|| DataError::UnknownContinent(t.continent.clone()))?;
            continents[usize::from(continent)].territories.push(id);
            territories.push(Territory {
                id,
                name: t.name.clone(),
                continent,
                adjacent: Vec::new(),
                owner: None,
                units: UnitCounts::default(),
                yields: t.yields,
                features: t.features,
            });
        }

        let lookup = |name: &String| {
            territory_ids
                .get(name.as_str())
                .copied()
                .ok_or_else(|| DataError::UnknownTerritory(name.clone()))
        };
        for (a, b) in &self.connections {
            let (ia, ib) = (lookup(a)?, lookup(b)?);
            if ia == ib {
                return Err(DataError::SelfLoop(a.clone()));
            }
            territories[usize::from(ia)].adjacent.push(ib);
            territories[usize::from(ib)].adjacent.push(ia);
        }
        for t in &mut territories {
            t.adjacent.sort_unstable();
            t.adjacent.dedup();
            if t.adjacent.is_empty() {
                return Err(DataError::Isolated(t.name.clone()));
            }
        }

        Ok(World::new(territories, continents))
    }
}

/// Technology and event catalogs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    /// Technologies.
    pub techs: TechCatalog,
    /// Events.
    pub events: EventCatalog,
}

impl Rules {
    /// Cross-check catalogs: event conditions must name known technologies.
    ///
    /// # Errors
    ///
    /// `UnknownEventTech`.
    pub fn new(techs: TechCatalog, events: EventCatalog) -> Result<Self, DataError> {
        for event in events.events() {
            if let Some(tech) = &event.conditions.required_tech
                && techs.get(tech).is_none()
            {
                return Err(DataError::UnknownEventTech {
                    event: event.id.clone(),
                    tech: tech.clone(),
                });
            }
        }
        Ok(Self { techs, events })
    }

    /// Built-in catalogs.
    ///
    /// # Errors
    ///
    /// Only if the bundled tables are malformed.
    pub fn builtin() -> Result<Self, DataError> {
        Self::from_json(BUILTIN_TECHS, BUILTIN_EVENTS)
    }

    /// Parse both catalogs.
    ///
    /// # Errors
    ///
    /// Malformed JSON or failed validation.
    pub fn from_json(techs: &str, events: &str) -> Result<Self, DataError> {
        let techs: Vec<Technology> = serde_json::from_str(techs)?;
        let events: Vec<EventDefinition> = serde_json::from_str(events)?;
        Self::new(TechCatalog::new(techs)?, EventCatalog::new(events)?)
    }

    /// Load both catalogs from files.
    ///
    /// # Errors
    ///
    /// I/O failure, malformed JSON or failed validation.
    pub fn from_paths(techs: impl AsRef<Path>, events: impl AsRef<Path>) -> Result<Self, DataError> {
        Self::from_json(
            &std::fs::read_to_string(techs)?,
            &std::fs::read_to_string(events)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_map_is_valid() {
        let world = MapData::builtin().unwrap().build().unwrap();
        assert_eq!(world.len(), 18);
        assert_eq!(world.continents().len(), 4);
        for t in world.territories() {
            for &n in &t.adjacent {
                assert!(world.are_adjacent(n, t.id), "{} <-> {n}", t.name);
            }
        }
        let members: usize = world.continents().iter().map(|c| c.territories.len()).sum();
        assert_eq!(members, 18);
    }

    #[test]
    fn test_builtin_rules_are_valid() {
        let rules = Rules::builtin().unwrap();
        assert_eq!(rules.techs.len(), 15);
        assert!(rules.events.get("new_port").is_some());
    }

    #[test]
    fn test_unknown_continent() {
        let json = r#"{"continents":[],"territories":[{"name":"A","continent":"X"}],"connections":[]}"#;
        let err = MapData::from_json(json).unwrap().build().unwrap_err();
        assert!(matches!(err, DataError::UnknownContinent(c) if c == "X"));
    }

    #[test]
    fn test_isolated_territory() {
        let json = r#"{"continents":[{"name":"C","bonus":1}],
            "territories":[{"name":"A","continent":"C"},{"name":"B","continent":"C"},{"name":"Z","continent":"C"}],
            "connections":[["A","B"]]}"#;
        let err = MapData::from_json(json).unwrap().build().unwrap_err();
        assert!(matches!(err, DataError::Isolated(t) if t == "Z"));
    }

    #[test]
    fn test_self_loop_and_unknown_endpoint() {
        let json = r#"{"continents":[{"name":"C","bonus":1}],
            "territories":[{"name":"A","continent":"C"}],
            "connections":[["A","A"]]}"#;
        let err = MapData::from_json(json).unwrap().build().unwrap_err();
        assert!(matches!(err, DataError::SelfLoop(_)));

        let json = r#"{"continents":[{"name":"C","bonus":1}],
            "territories":[{"name":"A","continent":"C"}],
            "connections":[["A","Nowhere"]]}"#;
        let err = MapData::from_json(json).unwrap().build().unwrap_err();
        assert!(matches!(err, DataError::UnknownTerritory(_)));
    }

    #[test]
    fn test_event_requiring_unknown_tech() {
        let events = r#"[{"id":"e","name":"E","conditions":{"required_tech":"ghost"},
            "effect":{"type":"movement_modifier","hops":1}}]"#;
        let err = Rules::from_json("[]", events).unwrap_err();
        assert!(matches!(err, DataError::UnknownEventTech { .. }));
    }
}
