use crate::app_dirs::AppDirs;
use crate::powerups::PowerUpKind;
use crate::statistics::{FileHistoryStore, HistoryStore, PlayerHistory, StatsSnapshot};
use crate::util::round_to;
use chrono::Local;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Unlock condition, one variant per achievement family.
///
/// A closed set evaluated by a single dispatch function keeps every
/// condition serializable and testable without closures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    WpmAtLeast(f64),
    AccuracyAtLeast { percent: f64, min_keystrokes: u32 },
    DurationAtLeast(f64),
    StreakAtLeast(u32),
    SessionsAtLeast(usize),
    AllPowerUpsUsed,
    BeatsBestWpm,
    Always,
}

impl Condition {
    fn satisfied(
        self,
        snapshot: &StatsSnapshot,
        history: &PlayerHistory,
        powerups_used: &[PowerUpKind],
    ) -> bool {
        match self {
            Condition::WpmAtLeast(target) => snapshot.wpm >= target,
            Condition::AccuracyAtLeast {
                percent,
                min_keystrokes,
            } => snapshot.accuracy >= percent && snapshot.total_keystrokes >= min_keystrokes,
            Condition::DurationAtLeast(secs) => snapshot.session_duration >= secs,
            Condition::StreakAtLeast(target) => snapshot.max_streak >= target,
            Condition::SessionsAtLeast(count) => history.sessions.len() >= count,
            Condition::AllPowerUpsUsed => PowerUpKind::ENHANCED
                .iter()
                .all(|kind| powerups_used.contains(kind)),
            // Checks run after the session was saved, so a session that
            // set the record now matches the stored best.
            Condition::BeatsBestWpm => {
                snapshot.wpm > 0.0 && snapshot.wpm >= history.records.best_wpm
            }
            Condition::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon_color: (u8, u8, u8),
    pub condition: Condition,
    pub reward_points: u32,
    pub unlocked: bool,
    pub unlock_date: Option<String>,
    pub progress: f64,
}

impl Achievement {
    fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        icon_color: (u8, u8, u8),
        condition: Condition,
        reward_points: u32,
    ) -> Self {
        Self {
            id,
            name,
            description,
            icon_color,
            condition,
            reward_points,
            unlocked: false,
            unlock_date: None,
            progress: 0.0,
        }
    }
}

fn build_catalog() -> Vec<Achievement> {
    vec![
        // Speed
        Achievement::new(
            "speed_novice",
            "Novice Typist",
            "Reach 20 WPM in a session",
            (255, 165, 0),
            Condition::WpmAtLeast(20.0),
            50,
        ),
        Achievement::new(
            "speed_runner",
            "Speed Runner",
            "Reach 40 WPM in a session",
            (255, 255, 0),
            Condition::WpmAtLeast(40.0),
            100,
        ),
        Achievement::new(
            "speed_expert",
            "Expert Typist",
            "Reach 60 WPM in a session",
            (0, 255, 255),
            Condition::WpmAtLeast(60.0),
            200,
        ),
        Achievement::new(
            "speed_master",
            "Master Typist",
            "Reach 80 WPM in a session",
            (255, 0, 255),
            Condition::WpmAtLeast(80.0),
            500,
        ),
        // Precision
        Achievement::new(
            "perfectionist",
            "Perfectionist",
            "Finish a full game at 100% accuracy",
            (0, 255, 0),
            Condition::AccuracyAtLeast {
                percent: 100.0,
                min_keystrokes: 50,
            },
            300,
        ),
        Achievement::new(
            "high_precision",
            "High Precision",
            "Hold 95% accuracy over more than 100 keys",
            (100, 255, 100),
            Condition::AccuracyAtLeast {
                percent: 95.0,
                min_keystrokes: 100,
            },
            150,
        ),
        // Endurance
        Achievement::new(
            "marathoner",
            "Marathoner",
            "Play for 30 minutes straight",
            (255, 100, 100),
            Condition::DurationAtLeast(1800.0),
            250,
        ),
        Achievement::new(
            "endurance",
            "Endurance",
            "Play for 10 minutes straight",
            (255, 150, 150),
            Condition::DurationAtLeast(600.0),
            100,
        ),
        // Streaks
        Achievement::new(
            "combo_master",
            "Combo Master",
            "Land 50 correct keys in a row",
            (255, 255, 100),
            Condition::StreakAtLeast(50),
            200,
        ),
        Achievement::new(
            "combo_expert",
            "Combo Expert",
            "Land 25 correct keys in a row",
            (255, 255, 150),
            Condition::StreakAtLeast(25),
            100,
        ),
        // Power-ups
        Achievement::new(
            "collector",
            "Collector",
            "Use every power-up type",
            (150, 100, 255),
            Condition::AllPowerUpsUsed,
            150,
        ),
        // Dedication
        Achievement::new(
            "dedicated",
            "Dedicated Player",
            "Complete 10 game sessions",
            (100, 150, 255),
            Condition::SessionsAtLeast(10),
            200,
        ),
        Achievement::new(
            "veteran",
            "Veteran",
            "Complete 50 game sessions",
            (150, 100, 200),
            Condition::SessionsAtLeast(50),
            500,
        ),
        // Specials
        Achievement::new(
            "first_session",
            "First Steps",
            "Finish your first game",
            (255, 255, 255),
            Condition::Always,
            25,
        ),
        Achievement::new(
            "record_breaker",
            "Record Breaker",
            "Beat your personal best WPM",
            (0, 255, 255),
            Condition::BeatsBestWpm,
            100,
        ),
    ]
}

/// Aggregate achievement counters for the achievements screen
#[derive(Debug, Clone, PartialEq)]
pub struct AchievementSummary {
    pub total_achievements: usize,
    pub unlocked_count: usize,
    pub locked_count: usize,
    pub completion_percentage: f64,
    pub total_points: u32,
    pub recent_unlocks: Vec<Achievement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SavedAchievement {
    #[serde(default)]
    unlocked: bool,
    #[serde(default)]
    unlock_date: Option<String>,
    #[serde(default)]
    progress: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AchievementsFile {
    #[serde(default)]
    total_points: u32,
    #[serde(default)]
    unlocked_count: u32,
    #[serde(default)]
    achievements: HashMap<String, SavedAchievement>,
}

/// Holds the fixed achievement catalog and its unlock state
#[derive(Debug)]
pub struct AchievementsManager {
    pub achievements: Vec<Achievement>,
    pub total_points: u32,
    pub unlocked_count: u32,
    path: PathBuf,
    history: FileHistoryStore,
}

impl AchievementsManager {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::achievements_path().unwrap_or_else(|| PathBuf::from("achievements.json"));
        Self::with_paths(path, FileHistoryStore::new())
    }

    /// Build against explicit storage locations (used by tests)
    pub fn with_paths<P: AsRef<Path>>(path: P, history: FileHistoryStore) -> Self {
        let mut manager = Self {
            achievements: build_catalog(),
            total_points: 0,
            unlocked_count: 0,
            path: path.as_ref().to_path_buf(),
            history,
        };
        manager.load_saved();
        manager
    }

    /// Evaluate every still-locked achievement against the snapshot.
    /// Unlocks are monotonic; persists only when something new unlocked.
    pub fn check_achievements(
        &mut self,
        snapshot: &StatsSnapshot,
        powerups_used: Option<&[PowerUpKind]>,
    ) -> Vec<Achievement> {
        let history = self.history.load();
        let used = powerups_used.unwrap_or(&[]);

        let mut newly_unlocked = Vec::new();
        for achievement in &mut self.achievements {
            if achievement.unlocked {
                continue;
            }
            if achievement.condition.satisfied(snapshot, &history, used) {
                achievement.unlocked = true;
                achievement.unlock_date = Some(Local::now().to_rfc3339());
                achievement.progress = 1.0;
                self.unlocked_count += 1;
                self.total_points += achievement.reward_points;
                newly_unlocked.push(achievement.clone());
            }
        }

        if !newly_unlocked.is_empty() {
            let _ = self.save();
        }

        newly_unlocked
    }

    /// Advisory progress toward one achievement, 0.0 to 1.0. Never gates
    /// unlocking; feeds progress bars only.
    pub fn achievement_progress(&self, id: &str, snapshot: &StatsSnapshot) -> f64 {
        let Some(achievement) = self.get(id) else {
            return 0.0;
        };
        if achievement.unlocked {
            return 1.0;
        }

        match achievement.condition {
            Condition::WpmAtLeast(target) => (snapshot.wpm / target).min(1.0),
            Condition::AccuracyAtLeast { percent, .. } => (snapshot.accuracy / percent).min(1.0),
            Condition::DurationAtLeast(secs) => (snapshot.session_duration / secs).min(1.0),
            Condition::StreakAtLeast(target) => {
                (f64::from(snapshot.max_streak) / f64::from(target)).min(1.0)
            }
            Condition::SessionsAtLeast(count) => {
                (self.history.load().sessions.len() as f64 / count as f64).min(1.0)
            }
            Condition::AllPowerUpsUsed | Condition::BeatsBestWpm | Condition::Always => 0.0,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn unlocked_achievements(&self) -> Vec<&Achievement> {
        self.achievements.iter().filter(|a| a.unlocked).collect()
    }

    pub fn locked_achievements(&self) -> Vec<&Achievement> {
        self.achievements.iter().filter(|a| !a.unlocked).collect()
    }

    pub fn summary(&self) -> AchievementSummary {
        let total = self.achievements.len();
        let unlocked = self.unlocked_achievements();

        let recent_unlocks: Vec<Achievement> = unlocked
            .iter()
            .filter(|a| a.unlock_date.is_some())
            .sorted_by(|a, b| a.unlock_date.cmp(&b.unlock_date))
            .rev()
            .take(5)
            .rev()
            .map(|a| (*a).clone())
            .collect();

        AchievementSummary {
            total_achievements: total,
            unlocked_count: unlocked.len(),
            locked_count: total - unlocked.len(),
            completion_percentage: round_to((unlocked.len() as f64 / total as f64) * 100.0, 1),
            total_points: self.total_points,
            recent_unlocks,
        }
    }

    fn save(&self) -> std::io::Result<()> {
        let mut file = AchievementsFile {
            total_points: self.total_points,
            unlocked_count: self.unlocked_count,
            achievements: HashMap::new(),
        };

        for achievement in &self.achievements {
            file.achievements.insert(
                achievement.id.to_string(),
                SavedAchievement {
                    unlocked: achievement.unlocked,
                    unlock_date: achievement.unlock_date.clone(),
                    progress: achievement.progress,
                },
            );
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&file).unwrap_or_default();
        std::fs::write(&self.path, data)
    }

    fn load_saved(&mut self) {
        let Ok(bytes) = std::fs::read(&self.path) else {
            return;
        };
        let Ok(file) = serde_json::from_slice::<AchievementsFile>(&bytes) else {
            return;
        };

        self.total_points = file.total_points;
        self.unlocked_count = file.unlocked_count;

        for achievement in &mut self.achievements {
            if let Some(saved) = file.achievements.get(achievement.id) {
                achievement.unlocked = saved.unlocked;
                achievement.unlock_date = saved.unlock_date.clone();
                achievement.progress = saved.progress;
            }
        }
    }

    /// Relock everything (testing or full reset)
    pub fn reset(&mut self) {
        for achievement in &mut self.achievements {
            achievement.unlocked = false;
            achievement.unlock_date = None;
            achievement.progress = 0.0;
        }
        self.total_points = 0;
        self.unlocked_count = 0;
        let _ = self.save();
    }
}
