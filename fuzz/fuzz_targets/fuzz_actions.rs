#![no_main]

use arbitrary::Arbitrary;
use conquest::{Action, GameConfig, GameEngine, UnitType};
use libfuzzer_sys::fuzz_target;

const TECHS: [&str; 6] = ["drill", "agriculture", "writing", "envoys", "printing", "unknown"];

/// Fuzzer-friendly mirror of [`Action`].
#[derive(Arbitrary, Debug)]
enum FuzzAction {
    Place { territory: u8, count: u8 },
    Trade { cards: Vec<u8> },
    Upgrade { territory: u8, artillery: bool, count: u8 },
    Attack { from: u8, to: u8, dice: u8 },
    Resolve { armies: u8 },
    Fortify { from: u8, to: u8, armies: u8 },
    Research { tech: u8 },
    Ally { with: u8 },
    Break { with: u8 },
    EndPhase,
}

impl FuzzAction {
    fn into_action(self) -> Action {
        match self {
            Self::Place { territory, count } => Action::PlaceReinforcements {
                territory: territory.into(),
                count: count.into(),
            },
            Self::Trade { cards } => Action::TradeCards {
                cards: cards.into_iter().take(5).map(u16::from).collect(),
            },
            Self::Upgrade {
                territory,
                artillery,
                count,
            } => Action::UpgradeUnits {
                territory: territory.into(),
                unit: if artillery {
                    UnitType::Artillery
                } else {
                    UnitType::Cavalry
                },
                count: count.into(),
            },
            Self::Attack { from, to, dice } => Action::Attack {
                from: from.into(),
                to: to.into(),
                dice,
            },
            Self::Resolve { armies } => Action::ResolveConquest {
                armies: armies.into(),
            },
            Self::Fortify { from, to, armies } => Action::Fortify {
                from: from.into(),
                to: to.into(),
                armies: armies.into(),
            },
            Self::Research { tech } => Action::StartResearch {
                tech: TECHS[usize::from(tech) % TECHS.len()].to_string(),
            },
            Self::Ally { with } => Action::FormAlliance { with },
            Self::Break { with } => Action::BreakAlliance { with },
            Self::EndPhase => Action::EndPhase,
        }
    }
}

#[derive(Arbitrary, Debug)]
struct ActionsInput {
    seed: u64,
    players: u8,
    actions: Vec<(FuzzAction, bool)>,
}

fuzz_target!(|input: ActionsInput| {
    let players = usize::from(input.players % 7) + 2;
    let config = GameConfig {
        seed: input.seed,
        ..GameConfig::default()
    };
    let Ok(mut engine) = GameEngine::builtin(players, config) else {
        return;
    };

    for (action, as_current) in input.actions.into_iter().take(500) {
        if engine.is_game_over() {
            break;
        }
        let player = if as_current {
            engine.current_player()
        } else {
            engine.current_player() % 8 + 1
        };
        let before = engine.clone();
        if engine.apply(player, action.into_action()).is_err() {
            assert_eq!(engine, before, "rejected action changed the game");
        }
        let violations = engine.check_invariants();
        assert!(violations.is_empty(), "invariants violated: {violations:?}");
    }
});
