use crate::app_dirs::AppDirs;
use crate::session::SessionSnapshot;
use chrono::Local;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Save slots kept on disk
const MAX_SAVES: usize = 5;

/// One save-game slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    pub timestamp: String,
    pub mode: String,
    pub state: SessionSnapshot,
}

/// File-backed list of the most recent save games, newest first
#[derive(Debug, Clone)]
pub struct SaveGameStore {
    path: PathBuf,
}

impl SaveGameStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::saved_games_path().unwrap_or_else(|| PathBuf::from("saved_games.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    /// Load all save slots, newest first. Malformed entries and corrupt
    /// files degrade to an empty list.
    pub fn load(&self) -> Vec<SavedGame> {
        let Ok(bytes) = std::fs::read(&self.path) else {
            return Vec::new();
        };
        let Ok(saves) = serde_json::from_slice::<Vec<SavedGame>>(&bytes) else {
            return Vec::new();
        };
        saves
            .into_iter()
            .sorted_by(|a, b| b.timestamp.cmp(&a.timestamp))
            .collect()
    }

    /// Store a snapshot. With `overwrite_timestamp` set, the matching
    /// slot is updated in place (and restamped); a vanished timestamp
    /// falls back to appending a new slot. Keeps the newest five.
    pub fn save_game(
        &self,
        state: SessionSnapshot,
        mode: &str,
        overwrite_timestamp: Option<&str>,
    ) -> std::io::Result<()> {
        let mut saves = self.load();
        let now = Local::now().to_rfc3339();

        let mut updated = false;
        if let Some(timestamp) = overwrite_timestamp {
            if let Some(slot) = saves.iter_mut().find(|g| g.timestamp == timestamp) {
                slot.state = state.clone();
                slot.timestamp = now.clone();
                updated = true;
            }
        }

        if !updated {
            saves.push(SavedGame {
                timestamp: now,
                mode: mode.to_string(),
                state,
            });
        }

        saves.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        saves.truncate(MAX_SAVES);

        self.write(&saves)
    }

    pub fn delete_game(&self, timestamp: &str) -> std::io::Result<()> {
        let saves: Vec<SavedGame> = self
            .load()
            .into_iter()
            .filter(|g| g.timestamp != timestamp)
            .collect();
        self.write(&saves)
    }

    fn write(&self, saves: &[SavedGame]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(saves).unwrap_or_default();
        std::fs::write(&self.path, data)
    }
}
