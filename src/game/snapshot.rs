//! Snapshot format: the whole game as one JSON document.
//!
//! Derived data (each player's owned-territory set) is not stored; it is
//! rebuilt from the world on restore, and the restored game must pass the
//! invariant checker before an engine is handed back.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::game::{GameEngine, GameState, check_invariants};

/// Format tag written into every snapshot.
pub const SNAPSHOT_FORMAT: &str = "conquest-snapshot/1";

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    format: String,
    state: GameState,
}

impl GameEngine {
    /// Serialize the game to JSON.
    ///
    /// The log is trimmed to the newest `log_tail` entries.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<String, SnapshotError> {
        let mut state = self.state().clone();
        state.log = state.log.tail(state.config.log_tail);
        let snapshot = Snapshot {
            format: SNAPSHOT_FORMAT.to_string(),
            state,
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Restore a game from JSON produced by [`GameEngine::serialize`].
    ///
    /// # Errors
    ///
    /// Malformed JSON, an unknown format tag, an invalid embedded config, or
    /// a state that fails the invariant checker.
    pub fn deserialize(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(SnapshotError::Inconsistent(format!(
                "unsupported format {:?}",
                snapshot.format
            )));
        }
        let mut state = snapshot.state;
        state
            .config
            .validate()
            .map_err(|err| SnapshotError::Inconsistent(err.to_string()))?;
        if state.current >= state.ledger.len() {
            return Err(SnapshotError::Inconsistent(format!(
                "current player index {} out of range",
                state.current
            )));
        }
        state.ledger.rebuild_territories(&state.world);

        let violations = check_invariants(&state);
        if let Some(first) = violations.first() {
            return Err(SnapshotError::Inconsistent(format!(
                "{} ({} total)",
                first.message,
                violations.len()
            )));
        }
        tracing::debug!(turn = state.turn, "snapshot restored");
        Ok(Self::from_state(state))
    }

    /// Write a snapshot to a file.
    ///
    /// # Errors
    ///
    /// Serialization or I/O failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let json = self.serialize()?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a snapshot from a file.
    ///
    /// # Errors
    ///
    /// I/O failure or any [`GameEngine::deserialize`] error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path)?;
        Self::deserialize(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::tests::{lone_enemy_engine, two_player_engine};
    use crate::game::{PendingConquest, Phase, UnitCounts};

    #[test]
    fn test_round_trip_preserves_state() {
        let engine = two_player_engine();
        let json = engine.serialize().unwrap();
        let restored = GameEngine::deserialize(&json).unwrap();
        assert_eq!(restored, engine);
        assert_eq!(restored.serialize().unwrap(), json);
    }

    #[test]
    fn test_restored_rng_continues_the_stream() {
        let engine = two_player_engine();
        let restored = GameEngine::deserialize(&engine.serialize().unwrap()).unwrap();
        let mut a = engine.into_state();
        let mut b = restored.into_state();
        assert_eq!(a.rng.roll_dice(5), b.rng.roll_dice(5));
        assert_eq!(a.rng.draws(), b.rng.draws());
    }

    #[test]
    fn test_rejects_wrong_format() {
        let json = two_player_engine()
            .serialize()
            .unwrap()
            .replace(SNAPSHOT_FORMAT, "other/9");
        assert!(matches!(
            GameEngine::deserialize(&json),
            Err(SnapshotError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            GameEngine::deserialize("{not json"),
            Err(SnapshotError::Json(_))
        ));
    }

    #[test]
    fn test_rejects_inconsistent_state() {
        let engine = two_player_engine();
        let mut state = engine.into_state();
        state.winner = Some(2);
        let json = GameEngine::from_state(state).serialize().unwrap();
        assert!(matches!(
            GameEngine::deserialize(&json),
            Err(SnapshotError::Inconsistent(_))
        ));
    }

    /// Player 1 has emptied territory 0 and owes the transfer.
    fn open_conquest() -> GameState {
        let mut state = lone_enemy_engine(0, 1).into_state();
        let from = state.world.get(0).unwrap().adjacent[0];
        state.world.get_mut(0).unwrap().units = UnitCounts::default();
        state.phase = Phase::Attack;
        state.pending = Some(PendingConquest {
            from,
            to: 0,
            min_armies: 1,
            max_armies: 2,
            attacker: 1,
            defender: Some(2),
        });
        state
    }

    fn restore(state: GameState) -> Result<GameEngine, SnapshotError> {
        let json = GameEngine::from_state(state).serialize().unwrap();
        GameEngine::deserialize(&json)
    }

    #[test]
    fn test_rejects_pending_conquest_off_the_map() {
        let state = open_conquest();
        let restored = restore(state.clone()).unwrap();
        assert_eq!(restored.state().pending, state.pending);

        let mut tampered = state.clone();
        if let Some(pending) = tampered.pending.as_mut() {
            pending.to = 99;
        }
        assert!(matches!(restore(tampered), Err(SnapshotError::Inconsistent(_))));

        // A real territory that is not next to the attacker.
        let mut tampered = state.clone();
        if let Some(pending) = tampered.pending.as_mut() {
            pending.from = 9;
        }
        assert!(matches!(restore(tampered), Err(SnapshotError::Inconsistent(_))));

        let mut tampered = state;
        if let Some(pending) = tampered.pending.as_mut() {
            pending.max_armies = 3;
        }
        assert!(matches!(restore(tampered), Err(SnapshotError::Inconsistent(_))));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut state = two_player_engine().into_state();
        state.config.max_attack_dice = 9;
        let err = restore(state).unwrap_err();
        assert!(
            matches!(&err, SnapshotError::Inconsistent(msg) if msg.contains("max_attack_dice")),
            "{err}"
        );

        let mut state = two_player_engine().into_state();
        state.config.card_rewards.clear();
        assert!(matches!(restore(state), Err(SnapshotError::Inconsistent(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        let engine = two_player_engine();
        engine.save(&path).unwrap();
        assert_eq!(GameEngine::load(&path).unwrap(), engine);
    }
}
