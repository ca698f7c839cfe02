#![no_main]

use arbitrary::Arbitrary;
use conquest::game::combat::{Die, compare_dice};
use conquest::{GameConfig, GameEngine, MapData, PlayerSetup, Rules};
use libfuzzer_sys::fuzz_target;

const DUEL_MAP: &str = r#"{
  "continents": [{ "name": "Strait", "bonus": 0 }],
  "territories": [
    { "name": "West", "continent": "Strait" },
    { "name": "East", "continent": "Strait" }
  ],
  "connections": [["West", "East"]]
}"#;

/// Structured input for combat fuzzing.
#[derive(Arbitrary, Debug)]
struct CombatInput {
    /// Armies dealt to each territory.
    initial_armies: u8,
    /// Reinforcement floor for the attacker.
    reinforcements: u8,
    /// Scripted dice faces.
    dice: Vec<u8>,
    /// Attack dice requested.
    attack_dice: u8,
    /// Armies moved if a conquest opens.
    move_in: u8,
    /// Extra dice bonuses for the raw comparison.
    attack_bonus: i8,
    defense_bonus: i8,
}

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

fuzz_target!(|input: CombatInput| {
    // Raw comparison: one loss per compared pair
    let faces: Vec<u8> = input.dice.iter().take(5).map(|d| d % 6 + 1).collect();
    let (att, def) = faces.split_at(faces.len().min(3));
    let a = dice(att, input.attack_bonus.into());
    let d = dice(def, input.defense_bonus.into());
    let (att_losses, def_losses) = compare_dice(&a, &d);
    assert_eq!(
        (att_losses + def_losses) as usize,
        a.len().min(d.len()),
        "losses must match compared pairs"
    );

    // Engine attack on a two-territory map
    let config = GameConfig {
        initial_armies: u32::from(input.initial_armies % 40) + 1,
        min_reinforcements: u32::from(input.reinforcements % 40) + 1,
        event_chance_percent: 0,
        ..GameConfig::default()
    };
    let Ok(map) = MapData::from_json(DUEL_MAP) else {
        return;
    };
    let (Ok(world), Ok(rules)) = (map.build(), Rules::builtin()) else {
        return;
    };
    let Ok(mut engine) = GameEngine::new(config, rules, world, &PlayerSetup::roster(2)) else {
        return;
    };
    let mine = if engine.owner(0) == Some(1) { 0 } else { 1 };
    let theirs = 1 - mine;
    let allowance = engine.available_reinforcements();
    if engine.place_reinforcements(1, mine, allowance).is_err() {
        return;
    }

    engine.load_dice(input.dice.iter().take(5).copied());
    let total_before = engine.army_value(mine) + engine.army_value(theirs);
    let before = engine.clone();
    match engine.attack(1, mine, theirs, input.attack_dice) {
        Ok(outcome) => {
            let total_after = engine.army_value(mine) + engine.army_value(theirs);
            assert_eq!(
                total_before,
                total_after + outcome.attacker_value_lost() + outcome.defender_value_lost(),
                "army value not conserved"
            );
            assert!(engine.army_value(mine) >= 1, "attacker emptied its source");
            if let Some(pending) = outcome.conquest {
                assert!(pending.min_armies <= pending.max_armies);
                let _ = engine.resolve_conquest(1, input.move_in.into());
            }
        }
        Err(_) => assert_eq!(engine, before, "rejected attack changed the game"),
    }

    let violations = engine.check_invariants();
    assert!(violations.is_empty(), "invariants violated: {violations:?}");
});
