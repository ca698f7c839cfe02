//! Property-based tests for game mechanics.
//!
//! These tests verify combat, card, unit and turn-controller properties.
//! Run with: cargo test --release prop_game

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use conquest::game::cards::CardEconomy;
use conquest::game::combat::{Die, compare_dice};
use conquest::game::{ActionSource, UnitCounts};
use conquest::{Action, ErrorKind, GameConfig, GameEngine, GreedyAgent, UnitType};

fn dice(faces: &[u8], bonus: i32) -> Vec<Die> {
    let mut dice: Vec<Die> = faces
        .iter()
        .map(|&raw| Die {
            raw,
            modified: i32::from(raw) + bonus,
        })
        .collect();
    dice.sort_by(|a, b| b.modified.cmp(&a.modified));
    dice
}

fn unit_strategy() -> impl Strategy<Value = UnitType> {
    prop_oneof![
        Just(UnitType::Infantry),
        Just(UnitType::Cavalry),
        Just(UnitType::Artillery),
    ]
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0u16..20, 0u32..12)
            .prop_map(|(territory, count)| Action::PlaceReinforcements { territory, count }),
        1 => prop::collection::vec(0u16..50, 0..5).prop_map(|cards| Action::TradeCards { cards }),
        1 => (0u16..20, unit_strategy(), 0u32..3)
            .prop_map(|(territory, unit, count)| Action::UpgradeUnits { territory, unit, count }),
        6 => (0u16..20, 0u16..20, 0u8..5).prop_map(|(from, to, dice)| Action::Attack { from, to, dice }),
        2 => (0u32..10).prop_map(|armies| Action::ResolveConquest { armies }),
        2 => (0u16..20, 0u16..20, 0u32..8)
            .prop_map(|(from, to, armies)| Action::Fortify { from, to, armies }),
        1 => prop::sample::select(vec!["drill", "agriculture", "writing", "envoys", "printing", "nope"])
            .prop_map(|tech| Action::StartResearch { tech: tech.to_string() }),
        1 => (0u8..5).prop_map(|with| Action::FormAlliance { with }),
        1 => (0u8..5).prop_map(|with| Action::BreakAlliance { with }),
        3 => Just(Action::EndPhase),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Every compared pair removes exactly one unit, and nothing else does.
    #[test]
    fn prop_dice_losses_match_pairs(
        attacker in prop::collection::vec(1u8..=6, 1..=3),
        defender in prop::collection::vec(1u8..=6, 1..=2),
        attack_bonus in -2i32..3,
        defense_bonus in -2i32..3,
    ) {
        let a = dice(&attacker, attack_bonus);
        let d = dice(&defender, defense_bonus);
        let (att, def) = compare_dice(&a, &d);
        let pairs = u32::try_from(attacker.len().min(defender.len())).unwrap();
        prop_assert_eq!(att + def, pairs);
    }

    /// Equal dice always favour the defender.
    #[test]
    fn prop_ties_go_to_defender(faces in prop::collection::vec(1u8..=6, 1..=2)) {
        let a = dice(&faces, 0);
        let d = dice(&faces, 0);
        let (att, def) = compare_dice(&a, &d);
        prop_assert_eq!(def, 0);
        prop_assert_eq!(att, u32::try_from(faces.len()).unwrap());
    }

    /// Set rewards never decrease.
    #[test]
    fn prop_set_rewards_non_decreasing(n in 1u32..200, step in 0u32..10) {
        let schedule = [4, 6, 8, 10, 12, 15];
        let this = CardEconomy::set_reward(&schedule, step, n);
        let next = CardEconomy::set_reward(&schedule, step, n + 1);
        prop_assert!(next >= this);
    }

    /// Detaching army value moves exactly that value and never loses any.
    #[test]
    fn prop_take_value_conserves_army(
        infantry in 0u32..20,
        cavalry in 0u32..6,
        artillery in 0u32..6,
        value in 0u32..80,
    ) {
        let original = UnitCounts::new(infantry, cavalry, artillery);
        let mut remaining = original;
        match remaining.take_value(value) {
            Some(taken) => {
                prop_assert_eq!(taken.army_value(), value);
                prop_assert_eq!(remaining.army_value() + value, original.army_value());
            }
            None => {
                prop_assert!(value > original.army_value());
                prop_assert_eq!(remaining, original);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Arbitrary action sequences keep every invariant, and a rejected action
    /// leaves the game exactly as it was.
    #[test]
    fn prop_actions_are_atomic(
        seed in any::<u64>(),
        players in 2usize..=4,
        actions in prop::collection::vec((action_strategy(), any::<bool>()), 1..150),
    ) {
        let config = GameConfig { seed, ..GameConfig::default() };
        let mut engine = GameEngine::builtin(players, config).unwrap();

        for (action, as_current) in actions {
            if engine.is_game_over() {
                break;
            }
            let player = if as_current {
                engine.current_player()
            } else {
                engine.current_player() % 4 + 1
            };
            let before = engine.clone();
            if engine.apply(player, action).is_err() {
                prop_assert_eq!(&engine, &before);
            }
            let violations = engine.check_invariants();
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }
    }

    /// Greedy play keeps every invariant, turn after turn.
    #[test]
    fn prop_greedy_play_keeps_invariants(seed in any::<u64>(), players in 2usize..=5) {
        let config = GameConfig { seed, max_turns: 15, ..GameConfig::default() };
        let mut engine = GameEngine::builtin(players, config).unwrap();
        let mut agents: Vec<GreedyAgent> =
            (0..players as u64).map(|i| GreedyAgent::new(seed ^ i)).collect();

        for _ in 0..600 {
            if engine.is_game_over() || engine.turn() > 15 {
                break;
            }
            let player = engine.current_player();
            let agent = &mut agents[usize::from(player) - 1];
            let action = agent.next_action(&engine.view(), player);
            let before = engine.clone();
            if engine.apply(player, action).is_err() {
                prop_assert_eq!(&engine, &before);
                // A stuck agent would stall the loop; end the phase for it.
                if let Err(err) = engine.end_phase(player) {
                    prop_assert_eq!(err.kind(), ErrorKind::StateConflict, "{}", err);
                    prop_assert_eq!(&engine, &before);
                }
            }
            let violations = engine.check_invariants();
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }
    }
}
