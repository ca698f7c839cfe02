//! Technology catalog and research progress.
//!
//! The catalog is a DAG of prerequisites checked once at load time. Players
//! queue technologies; at each turn start their research pool is poured into
//! the queue head and completed technologies unlock in order.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ActionResult, DataError};
use crate::game::{GameState, PlayerId, ResourceKind, UnitType, resources};

/// Technology category. Owning a whole category wins the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechCategory {
    /// Combat and movement.
    Military,
    /// Income.
    Economic,
    /// Research.
    Science,
    /// Alliances.
    Diplomacy,
}

/// Effect granted by an owned technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TechEffect {
    /// Dice bonus, optionally only when a unit type is present.
    CombatBonus {
        /// Unit type that must be present (`None` = always).
        #[serde(default)]
        unit: Option<UnitType>,
        /// Added to each attack die.
        #[serde(default)]
        attack: i32,
        /// Added to each defense die.
        #[serde(default)]
        defense: i32,
    },
    /// Dice bonus when a territory holds all three unit types.
    CombinedArms {
        /// Added to each die.
        bonus: i32,
    },
    /// Extra fortification hops.
    MovementRange {
        /// Added hops.
        hops: u32,
    },
    /// Percentage income modifier.
    ResourceMultiplier {
        /// Resource affected.
        resource: ResourceKind,
        /// Percentage added.
        percent: i32,
    },
    /// Extra reinforcements each turn.
    ReinforcementBonus {
        /// Added armies.
        armies: u32,
    },
    /// Enables the economic victory condition.
    EconomicDominance,
    /// Enables the diplomatic victory condition.
    DiplomaticVictory,
}

/// One technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technology {
    /// Unique key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category.
    pub category: TechCategory,
    /// Technologies that must be owned first.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Base research cost.
    pub cost: u32,
    /// Granted effects.
    #[serde(default)]
    pub effects: Vec<TechEffect>,
}

/// Validated technology catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Technology>", into = "Vec<Technology>")]
pub struct TechCatalog {
    techs: Vec<Technology>,
}

impl TryFrom<Vec<Technology>> for TechCatalog {
    type Error = DataError;

    fn try_from(techs: Vec<Technology>) -> Result<Self, Self::Error> {
        Self::new(techs)
    }
}

impl From<TechCatalog> for Vec<Technology> {
    fn from(catalog: TechCatalog) -> Self {
        catalog.techs
    }
}

impl TechCatalog {
    /// Validate and build a catalog.
    ///
    /// # Errors
    ///
    /// Duplicate ids, unknown prerequisites, or a prerequisite cycle.
    pub fn new(techs: Vec<Technology>) -> Result<Self, DataError> {
        let mut index = BTreeMap::new();
        for (i, tech) in techs.iter().enumerate() {
            if index.insert(tech.id.as_str(), i).is_some() {
                return Err(DataError::Duplicate(tech.id.clone()));
            }
        }
        for tech in &techs {
            for prerequisite in &tech.prerequisites {
                if !index.contains_key(prerequisite.as_str()) {
                    return Err(DataError::UnknownPrerequisite {
                        tech: tech.id.clone(),
                        prerequisite: prerequisite.clone(),
                    });
                }
            }
        }

        // Kahn's algorithm: anything left unsorted is on a cycle.
        let mut in_degree: Vec<usize> = techs.iter().map(|t| t.prerequisites.len()).collect();
        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut sorted = 0usize;
        while let Some(i) = queue.pop_front() {
            sorted += 1;
            for (j, tech) in techs.iter().enumerate() {
                let edges = tech.prerequisites.iter().filter(|p| **p == techs[i].id).count();
                if edges > 0 {
                    in_degree[j] -= edges;
                    if in_degree[j] == 0 {
                        queue.push_back(j);
                    }
                }
            }
        }
        if sorted != techs.len() {
            let cycle = techs
                .iter()
                .zip(&in_degree)
                .filter(|(_, d)| **d > 0)
                .map(|(t, _)| t.id.clone())
                .collect();
            return Err(DataError::CyclicPrerequisites(cycle));
        }

        Ok(Self { techs })
    }

    /// Technology by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Technology> {
        self.techs.iter().find(|t| t.id == id)
    }

    /// All technologies in catalog order.
    #[must_use]
    pub fn techs(&self) -> &[Technology] {
        &self.techs
    }

    /// Number of technologies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.techs.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.techs.is_empty()
    }

    /// Technologies of one category.
    pub fn in_category(&self, category: TechCategory) -> impl Iterator<Item = &Technology> {
        self.techs.iter().filter(move |t| t.category == category)
    }
}

/// Research standing of one technology for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechStatus {
    /// Unlocked.
    Owned,
    /// Queued for research.
    Researching,
    /// Every prerequisite owned; may be queued.
    Available,
    /// Some prerequisite missing.
    Locked,
}

/// Research queue standing for a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchProgress {
    /// Queued technologies, head first.
    pub queue: Vec<String>,
    /// Points invested in the head.
    pub progress: u32,
    /// Current cost of the head, if any.
    pub head_cost: Option<u32>,
    /// Research points in the pool.
    pub pool: u32,
}

/// A technology unlocked during progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Player unlocking it.
    pub player: PlayerId,
    /// Technology id.
    pub tech: String,
}

/// Effective cost of a technology for a player.
///
/// `base × (100 + scaling% × owned) / 100`, then reduced by the research
/// center discount (capped), never below 1.
#[must_use]
pub fn cost(state: &GameState, player: PlayerId, tech: &str) -> Option<u32> {
    let base = state.rules.techs.get(tech)?.cost;
    let owned = state.ledger.get(player).map_or(0, |p| p.techs.len());
    let owned = u64::try_from(owned).unwrap_or(u64::MAX);
    let config = &state.config;

    let scaled = u64::from(base)
        * (100 + u64::from(config.tech_cost_scaling_percent).saturating_mul(owned))
        / 100;

    let centers = state
        .world
        .owned_by(player)
        .filter(|t| t.features.research_center)
        .count();
    let discount = u64::from(config.research_center_discount_percent)
        .saturating_mul(u64::try_from(centers).unwrap_or(u64::MAX))
        .min(u64::from(config.max_research_discount_percent))
        .min(100);
    let discounted = scaled * (100 - discount) / 100;

    Some(u32::try_from(discounted).unwrap_or(u32::MAX).max(1))
}

/// Status of every catalog technology for a player.
#[must_use]
pub fn tech_status(state: &GameState, player: PlayerId) -> Vec<(String, TechStatus)> {
    let Some(p) = state.ledger.get(player) else {
        return Vec::new();
    };
    state
        .rules
        .techs
        .techs()
        .iter()
        .map(|tech| {
            let status = if p.has_tech(&tech.id) {
                TechStatus::Owned
            } else if p.research_queue.contains(&tech.id) {
                TechStatus::Researching
            } else if tech.prerequisites.iter().all(|pre| p.has_tech(pre)) {
                TechStatus::Available
            } else {
                TechStatus::Locked
            };
            (tech.id.clone(), status)
        })
        .collect()
}

/// Research queue standing for a player.
#[must_use]
pub fn research_progress(state: &GameState, player: PlayerId) -> Option<ResearchProgress> {
    let p = state.ledger.get(player)?;
    Some(ResearchProgress {
        queue: p.research_queue.clone(),
        progress: p.research_progress,
        head_cost: p
            .research_queue
            .first()
            .and_then(|head| cost(state, player, head)),
        pool: p.resources.research,
    })
}

/// Queue a technology.
///
/// # Errors
///
/// `UnknownTech`, `AlreadyResearched` if owned or queued, or
/// `MissingPrerequisite` if a prerequisite is neither owned nor queued
/// earlier.
pub fn start_research(state: &mut GameState, player: PlayerId, tech: &str) -> ActionResult<()> {
    let definition = state
        .rules
        .techs
        .get(tech)
        .ok_or_else(|| ActionError::UnknownTech(tech.to_string()))?;
    let p = state
        .ledger
        .get(player)
        .ok_or(ActionError::UnknownPlayer(player))?;
    if p.has_or_queued(tech) {
        return Err(ActionError::AlreadyResearched(tech.to_string()));
    }
    if let Some(missing) = definition
        .prerequisites
        .iter()
        .find(|pre| !p.has_or_queued(pre))
    {
        return Err(ActionError::MissingPrerequisite {
            tech: tech.to_string(),
            prerequisite: missing.clone(),
        });
    }

    if let Some(p) = state.ledger.get_mut(player) {
        p.research_queue.push(tech.to_string());
    }
    state.log(Some(player), format!("started researching {tech}"));
    tracing::debug!(player, tech, "research queued");
    Ok(())
}

/// Spend a player's research pool on their queue.
///
/// Returns the technologies completed, in order.
pub fn progress(state: &mut GameState, player: PlayerId) -> Vec<Completion> {
    let mut completed = Vec::new();
    loop {
        let Some(p) = state.ledger.get(player) else {
            break;
        };
        let Some(head) = p.research_queue.first().cloned() else {
            break;
        };
        if p.has_tech(&head) {
            if let Some(p) = state.ledger.get_mut(player) {
                p.research_queue.remove(0);
            }
            continue;
        }
        let pool = p.resources.research;
        let invested = p.research_progress;
        let Some(head_cost) = cost(state, player, &head) else {
            if let Some(p) = state.ledger.get_mut(player) {
                p.research_queue.remove(0);
                p.research_progress = 0;
            }
            continue;
        };

        let needed = head_cost.saturating_sub(invested);
        let spend = pool.min(needed);
        let Some(p) = state.ledger.get_mut(player) else {
            break;
        };
        p.resources.research -= spend;
        p.research_progress = invested + spend;

        if p.research_progress < head_cost {
            break;
        }
        p.research_progress = 0;
        p.research_queue.remove(0);
        p.techs.insert(head.clone());
        state.log(Some(player), format!("completed research of {head}"));
        tracing::info!(player, tech = %head, "technology unlocked");
        completed.push(Completion { player, tech: head });
    }
    completed
}

/// Turns until a technology completes at the projected research income.
///
/// `None` when the income is zero or the technology is unknown.
#[must_use]
pub fn turns_to_complete(state: &GameState, player: PlayerId, tech: &str) -> Option<u32> {
    let total = cost(state, player, tech)?;
    let p = state.ledger.get(player)?;
    if p.has_tech(tech) {
        return Some(0);
    }
    let invested = if p.research_queue.first().is_some_and(|h| h == tech) {
        p.research_progress
    } else {
        0
    };
    let remaining = total.saturating_sub(invested);
    let income = resources::income(state, player).total.research;
    if income == 0 {
        return None;
    }
    Some(remaining.div_ceil(income))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech(id: &str, prerequisites: &[&str]) -> Technology {
        Technology {
            id: id.into(),
            name: id.into(),
            category: TechCategory::Science,
            prerequisites: prerequisites.iter().map(|p| (*p).to_string()).collect(),
            cost: 10,
            effects: Vec::new(),
        }
    }

    #[test]
    fn test_catalog_accepts_dag() {
        let catalog =
            TechCatalog::new(vec![tech("a", &[]), tech("b", &["a"]), tech("c", &["a", "b"])])
                .unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.get("c").is_some());
    }

    #[test]
    fn test_catalog_rejects_cycle() {
        let err = TechCatalog::new(vec![tech("a", &["c"]), tech("b", &["a"]), tech("c", &["b"])])
            .unwrap_err();
        match err {
            DataError::CyclicPrerequisites(ids) => assert_eq!(ids.len(), 3),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_catalog_rejects_unknown_prerequisite() {
        let err = TechCatalog::new(vec![tech("a", &["ghost"])]).unwrap_err();
        assert!(matches!(err, DataError::UnknownPrerequisite { .. }));
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let err = TechCatalog::new(vec![tech("a", &[]), tech("a", &[])]).unwrap_err();
        assert!(matches!(err, DataError::Duplicate(id) if id == "a"));
    }

    #[test]
    fn test_catalog_deserialization_validates() {
        let json = r#"[{"id":"a","name":"A","category":"science","prerequisites":["a"],"cost":1}]"#;
        assert!(serde_json::from_str::<TechCatalog>(json).is_err());
    }

    #[test]
    fn test_effect_json_shape() {
        let json = r#"{"type":"combat_bonus","unit":"cavalry","attack":1}"#;
        let effect: TechEffect = serde_json::from_str(json).unwrap();
        assert_eq!(
            effect,
            TechEffect::CombatBonus {
                unit: Some(UnitType::Cavalry),
                attack: 1,
                defense: 0
            }
        );
    }

    /// Two-player state with every research center removed.
    fn plain_state() -> GameState {
        let mut state = crate::game::engine::tests::two_player_state();
        for t in state.world.iter_mut() {
            t.features.research_center = false;
        }
        state
    }

    #[test]
    fn test_cost_scales_and_discounts() {
        let mut state = plain_state();
        assert_eq!(cost(&state, 1, "printing"), Some(22));
        state.ledger.get_mut(1).unwrap().techs.insert("drill".into());
        assert_eq!(cost(&state, 1, "printing"), Some(24));

        let owned = state.world.owned_by(1).next().unwrap().id;
        state.world.get_mut(owned).unwrap().features.research_center = true;
        assert_eq!(cost(&state, 1, "printing"), Some(22));
        assert_eq!(cost(&state, 1, "ghost"), None);
    }

    #[test]
    fn test_start_research_checks_prerequisites() {
        let mut state = plain_state();
        assert_eq!(
            start_research(&mut state, 1, "ghost"),
            Err(ActionError::UnknownTech("ghost".into()))
        );
        assert!(matches!(
            start_research(&mut state, 1, "academies"),
            Err(ActionError::MissingPrerequisite { .. })
        ));
        start_research(&mut state, 1, "writing").unwrap();
        // Queued earlier counts as satisfied.
        start_research(&mut state, 1, "academies").unwrap();
        assert_eq!(
            start_research(&mut state, 1, "writing"),
            Err(ActionError::AlreadyResearched("writing".into()))
        );
        assert_eq!(
            state.ledger.get(1).unwrap().research_queue,
            vec!["writing".to_string(), "academies".to_string()]
        );
    }

    #[test]
    fn test_progress_carries_leftover_points() {
        let mut state = plain_state();
        start_research(&mut state, 1, "writing").unwrap();
        start_research(&mut state, 1, "academies").unwrap();
        state.ledger.get_mut(1).unwrap().resources.research = 30;

        let completed = progress(&mut state, 1);

        // writing costs 8, academies 14 scaled to 15 by one owned tech
        let techs: Vec<&str> = completed.iter().map(|c| c.tech.as_str()).collect();
        assert_eq!(techs, ["writing", "academies"]);
        let p = state.ledger.get(1).unwrap();
        assert_eq!(p.resources.research, 7);
        assert!(p.research_queue.is_empty());
        assert_eq!(p.research_progress, 0);
    }

    #[test]
    fn test_progress_keeps_partial_investment() {
        let mut state = plain_state();
        start_research(&mut state, 1, "writing").unwrap();
        state.ledger.get_mut(1).unwrap().resources.research = 5;
        assert!(progress(&mut state, 1).is_empty());
        let p = state.ledger.get(1).unwrap();
        assert_eq!(p.research_progress, 5);
        assert_eq!(p.resources.research, 0);
        assert_eq!(
            tech_status(&state, 1)
                .into_iter()
                .find(|(id, _)| id == "writing")
                .map(|(_, status)| status),
            Some(TechStatus::Researching)
        );
    }
}
