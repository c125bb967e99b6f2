use crate::app_dirs::AppDirs;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Entries kept on the high score table
const MAX_ENTRIES: usize = 5;

/// One table entry: three initials and a score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScore {
    pub name: String,
    pub score: i64,
}

/// File-backed top-5 high score table
#[derive(Debug, Clone)]
pub struct HighScoreStore {
    path: PathBuf,
}

impl HighScoreStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::highscores_path().unwrap_or_else(|| PathBuf::from("highscores.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    /// Load the table sorted by score descending. Missing or corrupt
    /// files yield an empty table.
    pub fn load(&self) -> Vec<HighScore> {
        let Ok(bytes) = std::fs::read(&self.path) else {
            return Vec::new();
        };
        let Ok(scores) = serde_json::from_slice::<Vec<HighScore>>(&bytes) else {
            return Vec::new();
        };
        scores
            .into_iter()
            .sorted_by_key(|entry| std::cmp::Reverse(entry.score))
            .collect()
    }

    pub fn save(&self, scores: &[HighScore]) -> std::io::Result<()> {
        let top: Vec<&HighScore> = scores
            .iter()
            .sorted_by_key(|entry| std::cmp::Reverse(entry.score))
            .take(MAX_ENTRIES)
            .collect();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&top).unwrap_or_default();
        std::fs::write(&self.path, data)
    }

    /// Whether a finished game's score earns a spot on the table
    pub fn qualifies(&self, score: i64) -> bool {
        let scores = self.load();
        if scores.is_empty() {
            return score > 0;
        }
        scores.len() < MAX_ENTRIES || (score > 0 && score >= scores[scores.len() - 1].score)
    }

    /// Record a new entry under the player's initials (uppercased,
    /// clipped to three letters) and persist the resulting top 5.
    pub fn submit(&self, name: &str, score: i64) -> std::io::Result<()> {
        let initials: String = name.chars().take(3).collect::<String>().to_uppercase();
        let mut scores = self.load();
        scores.push(HighScore {
            name: initials,
            score,
        });
        self.save(&scores)
    }
}
