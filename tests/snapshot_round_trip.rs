//! Snapshot save/restore tests.
//!
//! A restored game must continue exactly like the original.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use conquest::error::{ActionError, SnapshotError};
use conquest::game::SNAPSHOT_FORMAT;
use conquest::{
    ActionSource, GameConfig, GameEngine, GreedyAgent, MapData, PlayerSetup, Rules, VictoryType,
};

const DUEL_MAP: &str = r#"{
  "continents": [{ "name": "Strait", "bonus": 0 }],
  "territories": [
    { "name": "West", "continent": "Strait" },
    { "name": "East", "continent": "Strait" }
  ],
  "connections": [["West", "East"]]
}"#;

fn config(seed: u64) -> GameConfig {
    GameConfig {
        seed,
        max_turns: 40,
        log_tail: 100_000,
        ..GameConfig::default()
    }
}

/// Let greedy agents play `steps` actions, ending stuck phases.
fn drive(engine: &mut GameEngine, agents: &mut [GreedyAgent], steps: usize) {
    for _ in 0..steps {
        if engine.is_game_over() {
            return;
        }
        let player = engine.current_player();
        let action = agents[usize::from(player) - 1].next_action(&engine.view(), player);
        if engine.apply(player, action).is_err() {
            let _ = engine.end_phase(player);
        }
    }
}

#[test]
fn test_restored_game_continues_identically() {
    for seed in [1, 99, 2024] {
        let mut engine = GameEngine::builtin(3, config(seed)).unwrap();
        let mut agents: Vec<GreedyAgent> = (0..3).map(|i| GreedyAgent::new(seed + i)).collect();
        drive(&mut engine, &mut agents, 150);

        let json = engine.serialize().unwrap();
        let mut restored = GameEngine::deserialize(&json).unwrap();
        assert_eq!(restored, engine);

        let mut restored_agents = agents.clone();
        drive(&mut engine, &mut agents, 300);
        drive(&mut restored, &mut restored_agents, 300);
        assert_eq!(restored, engine);
        assert!(restored.check_invariants().is_empty());
    }
}

#[test]
fn test_save_and_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.json");

    let mut engine = GameEngine::builtin(4, config(5)).unwrap();
    let mut agents: Vec<GreedyAgent> = (0..4).map(GreedyAgent::new).collect();
    drive(&mut engine, &mut agents, 80);

    engine.save(&path).unwrap();
    let loaded = GameEngine::load(&path).unwrap();
    assert_eq!(loaded, engine);
    assert_eq!(loaded.turn(), engine.turn());
    assert_eq!(loaded.current_player(), engine.current_player());
}

#[test]
fn test_rejects_foreign_and_tampered_snapshots() {
    let engine = GameEngine::builtin(2, config(8)).unwrap();
    let json = engine.serialize().unwrap();
    assert!(json.contains(SNAPSHOT_FORMAT));

    let foreign = json.replace(SNAPSHOT_FORMAT, "other-format/9");
    assert!(GameEngine::deserialize(&foreign).is_err());

    assert!(matches!(
        GameEngine::deserialize("{ not json"),
        Err(SnapshotError::Json(_))
    ));
}

#[test]
fn test_open_conquest_survives_restore() {
    let config = GameConfig {
        initial_armies: 1,
        min_reinforcements: 5,
        event_chance_percent: 0,
        ..GameConfig::default()
    };
    let world = MapData::from_json(DUEL_MAP).unwrap().build().unwrap();
    let mut engine = GameEngine::new(
        config,
        Rules::builtin().unwrap(),
        world,
        &PlayerSetup::roster(2),
    )
    .unwrap();
    let mine = if engine.owner(0) == Some(1) { 0 } else { 1 };
    engine.place_reinforcements(1, mine, 5).unwrap();
    engine.load_dice([6, 6, 6, 1]);
    let pending = engine.attack(1, mine, 1 - mine, 3).unwrap().conquest.unwrap();

    let mut restored = GameEngine::deserialize(&engine.serialize().unwrap()).unwrap();
    assert_eq!(restored, engine);
    assert_eq!(restored.pending_conquest(), Some(pending));

    assert_eq!(
        restored.resolve_conquest(1, pending.max_armies + 1),
        Err(ActionError::ConquestOutOfRange {
            min: pending.min_armies,
            max: pending.max_armies,
            requested: pending.max_armies + 1
        })
    );
    let outcome = restored.resolve_conquest(1, pending.min_armies).unwrap();
    assert!(outcome.defender_eliminated);
    assert_eq!(restored.victory(), Some(VictoryType::Military));
}

#[test]
fn test_active_events_survive_restore() {
    let eventful = GameConfig {
        event_chance_percent: 100,
        ..config(31)
    };
    let mut engine = GameEngine::builtin(3, eventful).unwrap();
    let mut agents: Vec<GreedyAgent> = (0..3).map(GreedyAgent::new).collect();
    let has_events = |engine: &GameEngine| (1..=3).any(|p| !engine.active_events(p).is_empty());
    for _ in 0..30 {
        if has_events(&engine) || engine.is_game_over() {
            break;
        }
        drive(&mut engine, &mut agents, 10);
    }
    assert!(has_events(&engine));

    let mut restored = GameEngine::deserialize(&engine.serialize().unwrap()).unwrap();
    assert_eq!(restored, engine);
    for p in 1..=3 {
        assert_eq!(restored.active_events(p), engine.active_events(p));
    }

    // Expiry and undo behave the same after the restore.
    let mut restored_agents = agents.clone();
    drive(&mut engine, &mut agents, 200);
    drive(&mut restored, &mut restored_agents, 200);
    assert_eq!(restored, engine);
}
