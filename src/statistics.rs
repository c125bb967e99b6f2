use crate::app_dirs::AppDirs;
use crate::util::{mean, round_to};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Sessions kept in the persisted history
const MAX_SESSIONS: usize = 100;

/// Seconds between samples appended to the in-memory WPM history
const WPM_SAMPLE_INTERVAL_SECS: f64 = 60.0;

/// Live per-key counters for the current session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyStat {
    pub correct: u32,
    pub incorrect: u32,
    pub reaction_times: Vec<f64>,
}

/// One WPM/accuracy sample, taken at most once a minute while typing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WpmSample {
    /// Seconds into the session the sample was taken
    pub at: f64,
    pub wpm: f64,
    pub accuracy: f64,
}

/// Strongly-typed snapshot of the live session metrics.
///
/// Built in one place (`StatisticsManager::detailed_stats`) so downstream
/// consumers never index into loosely-typed maps.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub wpm: f64,
    pub accuracy: f64,
    pub total_keystrokes: u32,
    pub correct_keystrokes: u32,
    pub incorrect_keystrokes: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    pub average_reaction_time: f64,
    pub session_duration: f64,
}

/// Persisted snapshot of one completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub timestamp: String,
    pub game_mode: String,
    pub final_score: i64,
    pub session_id: u64,
    pub wpm: f64,
    pub accuracy: f64,
    pub total_keystrokes: u32,
    pub correct_keystrokes: u32,
    pub incorrect_keystrokes: u32,
    pub max_streak: u32,
    pub average_reaction_time: f64,
    pub session_duration: f64,
}

/// Personal bests, only ever overwritten by strictly greater values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecords {
    #[serde(default)]
    pub best_wpm: f64,
    #[serde(default)]
    pub best_wpm_date: Option<String>,
    #[serde(default)]
    pub best_accuracy: f64,
    #[serde(default)]
    pub best_accuracy_date: Option<String>,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub best_streak_date: Option<String>,
    #[serde(default)]
    pub longest_session: f64,
    #[serde(default)]
    pub longest_session_date: Option<String>,
}

/// The on-disk player history document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerHistory {
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    #[serde(default)]
    pub records: PersonalRecords,
}

/// Aggregate view over the persisted history
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSummary {
    pub total_sessions: usize,
    pub average_wpm: f64,
    pub average_accuracy: f64,
    pub total_playtime: f64,
    pub records: PersonalRecords,
    pub recent_sessions: Vec<SessionRecord>,
}

pub trait HistoryStore {
    fn load(&self) -> PlayerHistory;
    fn save(&self, history: &PlayerHistory) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path =
            AppDirs::statistics_path().unwrap_or_else(|| PathBuf::from("player_statistics.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> PlayerHistory {
        if let Ok(bytes) = std::fs::read(&self.path) {
            if let Ok(history) = serde_json::from_slice::<PlayerHistory>(&bytes) {
                return history;
            }
        }
        PlayerHistory::default()
    }

    fn save(&self, history: &PlayerHistory) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(history).unwrap_or_default();
        std::fs::write(&self.path, data)
    }
}

/// Performance bracket for a WPM/accuracy pair.
///
/// Labels are assigned per bracket and the accuracy suffix always applies
/// to the bracket's own label.
pub fn grade_for(wpm: f64, accuracy: f64) -> (String, (u8, u8, u8)) {
    let (label, color) = if wpm >= 80.0 {
        ("Expert", (0, 255, 0))
    } else if wpm >= 60.0 {
        ("Advanced", (0, 255, 255))
    } else if wpm >= 40.0 {
        ("Intermediate", (255, 255, 0))
    } else if wpm >= 20.0 {
        ("Beginner", (255, 165, 0))
    } else {
        ("Novice", (255, 0, 0))
    };

    let label = if accuracy < 85.0 {
        format!("{label} (improve accuracy)")
    } else if accuracy >= 98.0 {
        format!("{label} (excellent accuracy)")
    } else {
        label.to_string()
    };

    (label, color)
}

/// Accumulates raw keystroke events into live and historical metrics
#[derive(Debug)]
pub struct StatisticsManager {
    pub session_start: Instant,
    pub last_wpm_sample: Instant,
    pub total_keystrokes: u32,
    pub correct_keystrokes: u32,
    pub incorrect_keystrokes: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    pub reaction_times: Vec<f64>,
    pub key_stats: HashMap<char, KeyStat>,
    pub wpm_history: Vec<WpmSample>,
    history: PlayerHistory,
    store: FileHistoryStore,
}

impl StatisticsManager {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_store(FileHistoryStore::new())
    }

    pub fn with_store(store: FileHistoryStore) -> Self {
        let history = store.load();
        let now = Instant::now();
        Self {
            session_start: now,
            last_wpm_sample: now,
            total_keystrokes: 0,
            correct_keystrokes: 0,
            incorrect_keystrokes: 0,
            current_streak: 0,
            max_streak: 0,
            reaction_times: Vec::new(),
            key_stats: HashMap::new(),
            wpm_history: Vec::new(),
            history,
            store,
        }
    }

    /// Register one keystroke. Reaction time is in seconds; 0 means unknown
    /// and is not sampled.
    pub fn record_keystroke(&mut self, key: char, is_correct: bool, reaction_time: f64) {
        self.total_keystrokes += 1;
        if is_correct {
            self.correct_keystrokes += 1;
            self.current_streak += 1;
            self.max_streak = self.max_streak.max(self.current_streak);
        } else {
            self.incorrect_keystrokes += 1;
            self.current_streak = 0;
        }

        if reaction_time > 0.0 {
            self.reaction_times.push(reaction_time);
        }

        let entry = self.key_stats.entry(key).or_default();
        if is_correct {
            entry.correct += 1;
        } else {
            entry.incorrect += 1;
        }
        if reaction_time > 0.0 {
            entry.reaction_times.push(reaction_time);
        }

        if self.last_wpm_sample.elapsed().as_secs_f64() >= WPM_SAMPLE_INTERVAL_SECS {
            self.sample_wpm();
        }
    }

    /// WPM over the whole session, 5 characters per word.
    /// Returns 0.0 for the first second to avoid meaningless early spikes.
    pub fn current_wpm(&self) -> f64 {
        let secs = self.session_duration();
        if secs < 1.0 {
            return 0.0;
        }

        let words_typed = f64::from(self.correct_keystrokes) / 5.0;
        let minutes_elapsed = secs / 60.0;

        round_to(words_typed / minutes_elapsed, 1)
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_keystrokes == 0 {
            return 100.0;
        }
        round_to(
            (f64::from(self.correct_keystrokes) / f64::from(self.total_keystrokes)) * 100.0,
            1,
        )
    }

    pub fn average_reaction_time(&self) -> f64 {
        mean(&self.reaction_times)
            .map(|m| round_to(m, 3))
            .unwrap_or(0.0)
    }

    pub fn session_duration(&self) -> f64 {
        self.session_start.elapsed().as_secs_f64()
    }

    pub fn detailed_stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            wpm: self.current_wpm(),
            accuracy: self.accuracy(),
            total_keystrokes: self.total_keystrokes,
            correct_keystrokes: self.correct_keystrokes,
            incorrect_keystrokes: self.incorrect_keystrokes,
            current_streak: self.current_streak,
            max_streak: self.max_streak,
            average_reaction_time: self.average_reaction_time(),
            session_duration: self.session_duration(),
        }
    }

    pub fn performance_grade(&self) -> (String, (u8, u8, u8)) {
        grade_for(self.current_wpm(), self.accuracy())
    }

    fn sample_wpm(&mut self) {
        self.wpm_history.push(WpmSample {
            at: self.session_duration(),
            wpm: self.current_wpm(),
            accuracy: self.accuracy(),
        });
        self.last_wpm_sample = Instant::now();
    }

    /// Snapshot the finished session into the persisted history.
    /// Disk failures are tolerated; live state is unaffected either way.
    pub fn save_session_stats(&mut self, game_mode: &str, final_score: i64) {
        let record = self.build_record(game_mode, final_score);

        self.history.sessions.push(record.clone());
        if self.history.sessions.len() > MAX_SESSIONS {
            let excess = self.history.sessions.len() - MAX_SESSIONS;
            self.history.sessions.drain(..excess);
        }

        Self::update_personal_records(&mut self.history.records, &record);

        let _ = self.store.save(&self.history);
        let _ = self.append_session_log(&record);
    }

    fn build_record(&self, game_mode: &str, final_score: i64) -> SessionRecord {
        let session_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        SessionRecord {
            timestamp: Local::now().to_rfc3339(),
            game_mode: game_mode.to_string(),
            final_score,
            session_id,
            wpm: self.current_wpm(),
            accuracy: self.accuracy(),
            total_keystrokes: self.total_keystrokes,
            correct_keystrokes: self.correct_keystrokes,
            incorrect_keystrokes: self.incorrect_keystrokes,
            max_streak: self.max_streak,
            average_reaction_time: self.average_reaction_time(),
            session_duration: self.session_duration(),
        }
    }

    fn update_personal_records(records: &mut PersonalRecords, session: &SessionRecord) {
        if session.wpm > records.best_wpm {
            records.best_wpm = session.wpm;
            records.best_wpm_date = Some(session.timestamp.clone());
        }

        if session.accuracy > records.best_accuracy {
            records.best_accuracy = session.accuracy;
            records.best_accuracy_date = Some(session.timestamp.clone());
        }

        if session.max_streak > records.best_streak {
            records.best_streak = session.max_streak;
            records.best_streak_date = Some(session.timestamp.clone());
        }

        if session.session_duration > records.longest_session {
            records.longest_session = session.session_duration;
            records.longest_session_date = Some(session.timestamp.clone());
        }
    }

    fn append_session_log(&self, record: &SessionRecord) -> io::Result<()> {
        if let Some(log_path) = AppDirs::session_log_path() {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let needs_header = !log_path.exists();

            let mut log_file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(log_path)?;

            if needs_header {
                writeln!(
                    log_file,
                    "date,mode,score,wpm,accuracy,keystrokes,max_streak,duration_secs"
                )?;
            }

            writeln!(
                log_file,
                "{},{},{},{},{},{},{},{:.2}",
                record.timestamp,
                record.game_mode,
                record.final_score,
                record.wpm,
                record.accuracy,
                record.total_keystrokes,
                record.max_streak,
                record.session_duration,
            )?;
        }

        Ok(())
    }

    pub fn personal_records(&self) -> &PersonalRecords {
        &self.history.records
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.history.sessions
    }

    pub fn historical_summary(&self) -> HistoricalSummary {
        let sessions = &self.history.sessions;

        if sessions.is_empty() {
            return HistoricalSummary {
                total_sessions: 0,
                average_wpm: 0.0,
                average_accuracy: 0.0,
                total_playtime: 0.0,
                records: self.history.records.clone(),
                recent_sessions: Vec::new(),
            };
        }

        let total_wpm: f64 = sessions.iter().map(|s| s.wpm).sum();
        let total_accuracy: f64 = sessions.iter().map(|s| s.accuracy).sum();
        let total_playtime: f64 = sessions.iter().map(|s| s.session_duration).sum();
        let count = sessions.len();

        HistoricalSummary {
            total_sessions: count,
            average_wpm: round_to(total_wpm / count as f64, 1),
            average_accuracy: round_to(total_accuracy / count as f64, 1),
            total_playtime,
            records: self.history.records.clone(),
            recent_sessions: sessions.iter().rev().take(10).rev().cloned().collect(),
        }
    }

    /// Zero the live session state; persisted history is untouched.
    pub fn reset_session(&mut self) {
        self.session_start = Instant::now();
        self.last_wpm_sample = self.session_start;
        self.total_keystrokes = 0;
        self.correct_keystrokes = 0;
        self.incorrect_keystrokes = 0;
        self.current_streak = 0;
        self.max_streak = 0;
        self.reaction_times.clear();
        self.key_stats.clear();
        self.wpm_history.clear();
    }
}
