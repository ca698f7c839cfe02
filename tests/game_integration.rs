//! End-to-end tests driving the public engine API.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use conquest::error::ActionError;
use conquest::game::CardEconomy;
use conquest::{
    Action, ActionReport, GameConfig, GameEngine, GameSetup, MapData, Phase, PlayerSetup, Rules,
    VictoryType, run_game,
};

const DUEL_MAP: &str = r#"{
  "continents": [{ "name": "Strait", "bonus": 0 }],
  "territories": [
    { "name": "West", "continent": "Strait", "yields": { "food": 1 } },
    { "name": "East", "continent": "Strait", "yields": { "food": 1 } }
  ],
  "connections": [["West", "East"]]
}"#;

/// Two players, one territory each, one army each.
fn duel() -> GameEngine {
    let config = GameConfig {
        initial_armies: 1,
        min_reinforcements: 5,
        event_chance_percent: 0,
        ..GameConfig::default()
    };
    let world = MapData::from_json(DUEL_MAP).unwrap().build().unwrap();
    GameEngine::new(
        config,
        Rules::builtin().unwrap(),
        world,
        &PlayerSetup::roster(2),
    )
    .unwrap()
}

#[test]
fn test_conquest_range_and_military_victory() {
    let mut engine = duel();
    let mine = if engine.owner(0) == Some(1) { 0 } else { 1 };
    let theirs = 1 - mine;

    assert_eq!(engine.available_reinforcements(), 5);
    assert_eq!(engine.place_reinforcements(1, mine, 5).unwrap(), 0);
    assert_eq!(engine.phase(), Phase::Attack);
    assert_eq!(engine.army_value(mine), 6);

    engine.load_dice([6, 6, 6, 1]);
    let outcome = engine.attack(1, mine, theirs, 3).unwrap();
    let pending = outcome.conquest.unwrap();
    assert_eq!((pending.min_armies, pending.max_armies), (3, 5));
    assert_eq!(engine.army_value(theirs), 0);

    // Nothing else is allowed while the conquest is open.
    assert_eq!(
        engine.attack(1, mine, theirs, 1),
        Err(ActionError::ConquestPending)
    );
    assert_eq!(
        engine.end_phase(1).unwrap_err(),
        ActionError::ConquestPending
    );

    for bad in [2, 6] {
        assert_eq!(
            engine.resolve_conquest(1, bad).unwrap_err(),
            ActionError::ConquestOutOfRange {
                min: 3,
                max: 5,
                requested: bad
            }
        );
    }

    let conquered = engine.resolve_conquest(1, 3).unwrap();
    assert!(conquered.defender_eliminated);
    assert_eq!(engine.owner(theirs), Some(1));
    assert_eq!(engine.army_value(theirs), 3);
    assert_eq!(engine.army_value(mine), 3);
    assert!(engine.is_game_over());
    assert_eq!(engine.winner(), Some(1));
    assert_eq!(engine.victory(), Some(VictoryType::Military));
    assert!(engine.check_invariants().is_empty());

    assert_eq!(engine.end_phase(1).unwrap_err(), ActionError::GameOver);
}

#[test]
fn test_apply_reports_match_direct_calls() {
    let mut engine = duel();
    let mine = if engine.owner(0) == Some(1) { 0 } else { 1 };

    let report = engine
        .apply(
            1,
            Action::PlaceReinforcements {
                territory: mine,
                count: 2,
            },
        )
        .unwrap();
    assert!(matches!(report, ActionReport::Placed { remaining: 3 }));

    // Wrong player is rejected without touching the game.
    let before = engine.clone();
    assert!(engine.apply(2, Action::EndPhase).is_err());
    assert_eq!(engine, before);
}

#[test]
fn test_set_rewards_follow_schedule_then_step() {
    let schedule = GameConfig::default().card_rewards;
    let step = GameConfig::default().card_reward_step;
    let rewards: Vec<u32> = (1..=7)
        .map(|n| CardEconomy::set_reward(&schedule, step, n))
        .collect();
    assert_eq!(rewards, vec![4, 6, 8, 10, 12, 15, 20]);
}

#[test]
fn test_run_game_is_deterministic() {
    let config = GameConfig {
        max_turns: 30,
        ..GameConfig::default()
    };
    let setup = GameSetup::builtin(config).unwrap();
    let a = run_game(77, 3, &setup).unwrap();
    let b = run_game(77, 3, &setup).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.seed, 77);
}

#[test]
fn test_full_game_finishes() {
    let config = GameConfig {
        max_turns: 60,
        ..GameConfig::default()
    };
    let setup = GameSetup::builtin(config).unwrap();
    for seed in 0..4 {
        let result = run_game(seed, 2, &setup).unwrap();
        assert!(result.turns_played <= 61);
        assert_eq!(result.player_stats.len(), 2);
        if let Some(winner) = result.winner {
            assert!(result.victory.is_some());
            let stats = &result.player_stats[usize::from(winner) - 1];
            assert!(stats.eliminated_turn.is_none());
        }
    }
}
