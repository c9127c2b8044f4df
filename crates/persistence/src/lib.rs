#![deny(warnings)]

//! Save-file store for game snapshots.
//!
//! One format: pretty-printed JSON over the [`GameState`] snapshot. The
//! snapshot's free-form extension fields require a self-describing format,
//! which rules out compact binary codecs. The core only guarantees the
//! snapshot round-trips; everything here is collaborator territory.

use sim_core::GameState;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors from reading or writing save files.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn ensure_parent(path: &Path) -> Result<(), SaveError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write a snapshot as pretty-printed JSON, creating parent directories as
/// needed.
pub fn save_snapshot(path: &Path, snapshot: &GameState) -> Result<(), SaveError> {
    ensure_parent(path)?;
    let text = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, text)?;
    info!(path = %path.display(), "snapshot saved");
    Ok(())
}

/// Read a snapshot back.
pub fn load_snapshot(path: &Path) -> Result<GameState, SaveError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{GameConfig, Phase};

    fn sample_state() -> GameState {
        let mut state = GameState::new(&GameConfig::default());
        state.phase = Phase::Alchemy;
        state.gold = 321;
        state
            .extra
            .insert("quest_board".into(), serde_json::json!(["royal_order"]));
        state
    }

    #[test]
    fn roundtrip_preserves_extension_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves/slot1.json");
        let state = sample_state();
        save_snapshot(&path, &state).unwrap();
        let back = load_snapshot(&path).unwrap();
        assert_eq!(back, state);
        assert_eq!(
            back.extra["quest_board"],
            serde_json::json!(["royal_order"])
        );
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c/slot.json");
        save_snapshot(&path, &sample_state()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn load_of_a_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_snapshot(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SaveError::Io(_)));
    }
}
