use crate::achievements::{Achievement, AchievementsManager};
use crate::key_stats::{KeyRecord, KeyStatsDb};
use crate::powerups::{PowerUp, PowerUpKind, PowerUpManager};
use crate::statistics::StatisticsManager;
use chrono::Local;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum_macros::Display;

/// Fall speed in px/s for a speed factor of 1.0 (2 px per frame at the
/// original 60 Hz).
const BASE_FALL_SPEED: f64 = 120.0;

/// Points for typing one letter, before multipliers
const LETTER_POINTS: i64 = 10;

/// Spawn chance per frame at 60 Hz; scaled by wall-clock delta in update
const SPAWN_PROBABILITY: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameMode {
    Arcade,
    Versus,
    Practice,
}

/// Static per-mode tuning selected on the mode screens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameOptions {
    pub players: usize,
    pub initial_speed: f64,
    pub count_wrong_key_faults: bool,
    /// 0.0 means no time limit
    pub time_limit_secs: f64,
    pub fault_limit: u32,
}

impl GameOptions {
    pub fn arcade(fault_limit: u32) -> Self {
        Self {
            players: 1,
            initial_speed: 1.5,
            count_wrong_key_faults: true,
            time_limit_secs: 0.0,
            fault_limit,
        }
    }

    pub fn versus(time_limit_secs: f64) -> Self {
        Self {
            players: 2,
            initial_speed: 2.0,
            count_wrong_key_faults: true,
            time_limit_secs,
            fault_limit: 999,
        }
    }

    pub fn practice() -> Self {
        Self {
            players: 1,
            initial_speed: 1.0,
            count_wrong_key_faults: false,
            time_limit_secs: 0.0,
            fault_limit: 999_999,
        }
    }
}

/// One letter falling down the screen
#[derive(Debug, Clone, PartialEq)]
pub struct FallingLetter {
    pub ch: char,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Seconds into the session this letter appeared
    pub spawned_at: f64,
    /// Velocity cached while a freezer holds
    pub stored_velocity: Option<(f64, f64)>,
}

impl FallingLetter {
    pub fn new(ch: char, x: f64, y: f64, vx: f64, vy: f64, spawned_at: f64) -> Self {
        Self {
            ch,
            x,
            y,
            vx,
            vy,
            spawned_at,
            stored_velocity: None,
        }
    }

    /// Cache the current velocity and stop. Freezing twice keeps the
    /// first cached velocity.
    pub fn freeze(&mut self) {
        if self.stored_velocity.is_none() {
            self.stored_velocity = Some((self.vx, self.vy));
        }
        self.vx = 0.0;
        self.vy = 0.0;
    }

    pub fn thaw(&mut self) {
        if let Some((vx, vy)) = self.stored_velocity.take() {
            self.vx = vx;
            self.vy = vy;
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.stored_velocity.is_some()
    }
}

/// The shared per-frame state every other component reads and mutates:
/// the live entity list, per-player scores, the fault budget and the
/// score multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct Playfield {
    pub width: f64,
    pub height: f64,
    pub letters: Vec<FallingLetter>,
    pub scores: Vec<i64>,
    pub faults: u32,
    pub fault_limit: u32,
    pub score_multiplier: i64,
    pub shielded: bool,
}

impl Playfield {
    pub fn new(width: f64, height: f64, players: usize, fault_limit: u32) -> Self {
        Self {
            width,
            height,
            letters: Vec::new(),
            scores: vec![0; players.max(1)],
            faults: 0,
            fault_limit,
            score_multiplier: 1,
            shielded: false,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub fn add_score(&mut self, player: usize, points: i64) {
        if let Some(score) = self.scores.get_mut(player) {
            *score += points;
        }
    }

    pub fn add_score_all(&mut self, points: i64) {
        for score in &mut self.scores {
            *score += points;
        }
    }

    pub fn best_score(&self) -> i64 {
        self.scores.iter().copied().max().unwrap_or(0)
    }

    pub fn grant_extra_life(&mut self, lives: u32) {
        self.fault_limit += lives;
    }
}

/// Result of one keypress
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyPress {
    Hit { points: i64, reaction: f64 },
    Miss,
}

/// Serializable letter state for save games
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LetterSnapshot {
    pub ch: char,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

/// Typed save-game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub mode: GameMode,
    pub options: GameOptions,
    pub scores: Vec<i64>,
    pub faults: u32,
    pub fault_limit: u32,
    pub score_multiplier: i64,
    pub elapsed: f64,
    pub letters: Vec<LetterSnapshot>,
}

/// One play-through: owns the playfield, the statistics manager and the
/// power-up engine, and translates raw keypresses into game events.
#[derive(Debug)]
pub struct GameSession {
    pub mode: GameMode,
    pub options: GameOptions,
    pub field: Playfield,
    pub stats: StatisticsManager,
    pub powerups: PowerUpManager,
    pub powerups_used: Vec<PowerUpKind>,
    pub elapsed: f64,
    pub spawn_probability: f64,
    pub game_over: bool,
    pub key_db: Option<KeyStatsDb>,
}

impl GameSession {
    pub fn new(mode: GameMode, options: GameOptions, width: f64, height: f64) -> Self {
        let field = Playfield::new(width, height, options.players, options.fault_limit);
        Self {
            mode,
            options,
            field,
            stats: StatisticsManager::new(),
            powerups: PowerUpManager::new(),
            powerups_used: Vec::new(),
            elapsed: 0.0,
            spawn_probability: SPAWN_PROBABILITY,
            game_over: false,
            key_db: KeyStatsDb::new().ok(),
        }
    }

    /// Advance one frame by `dt` wall-clock seconds.
    pub fn update(&mut self, dt: f64) {
        if self.game_over {
            return;
        }

        self.elapsed += dt;
        self.maybe_spawn(dt);

        for letter in &mut self.field.letters {
            letter.x += letter.vx * dt;
            letter.y += letter.vy * dt;
        }

        let bottom = self.field.height;
        let before = self.field.letters.len();
        self.field.letters.retain(|letter| letter.y <= bottom);
        let dropped = before - self.field.letters.len();
        for _ in 0..dropped {
            self.register_fault();
        }

        self.powerups.update_all(&mut self.field, dt);

        if self.options.time_limit_secs > 0.0 && self.elapsed >= self.options.time_limit_secs {
            self.game_over = true;
        }
        self.check_fault_budget();
    }

    fn maybe_spawn(&mut self, dt: f64) {
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() < self.spawn_probability * dt * 60.0 {
            let ch = (b'a' + rng.gen_range(0..26)) as char;
            let x = rng.gen_range(0.0..(self.field.width - 20.0).max(1.0));
            self.spawn_letter(ch, x);
        }
    }

    /// Add a letter at the top of the screen. Letters spawned while a
    /// freezer holds are frozen on entry.
    pub fn spawn_letter(&mut self, ch: char, x: f64) {
        let vy = BASE_FALL_SPEED * self.options.initial_speed;
        let mut letter = FallingLetter::new(ch, x, 0.0, 0.0, vy, self.elapsed);
        if self.powerups.has_active(PowerUpKind::Freezer) {
            letter.freeze();
        }
        self.field.letters.push(letter);
    }

    /// Translate one keypress from `player` into a hit or a miss.
    pub fn handle_key(&mut self, player: usize, key: char) -> KeyPress {
        let target = self
            .field
            .letters
            .iter()
            .enumerate()
            .filter(|(_, letter)| letter.ch == key)
            .max_by(|a, b| a.1.y.partial_cmp(&b.1.y).unwrap_or(Ordering::Equal))
            .map(|(idx, _)| idx);

        match target {
            Some(idx) => {
                let letter = self.field.letters.remove(idx);
                let points = LETTER_POINTS * self.field.score_multiplier;
                self.field.add_score(player, points);

                let reaction = (self.elapsed - letter.spawned_at).max(0.0);
                self.stats.record_keystroke(key, true, reaction);
                self.record_key_db(key, true, reaction);

                KeyPress::Hit { points, reaction }
            }
            None => {
                self.stats.record_keystroke(key, false, 0.0);
                self.record_key_db(key, false, 0.0);

                if self.options.count_wrong_key_faults {
                    self.register_fault();
                    self.check_fault_budget();
                }

                KeyPress::Miss
            }
        }
    }

    fn record_key_db(&self, key: char, was_correct: bool, reaction: f64) {
        if let Some(ref db) = self.key_db {
            let _ = db.record(&KeyRecord {
                key,
                was_correct,
                reaction_ms: (reaction * 1000.0) as u64,
                game_mode: self.mode.to_string(),
                timestamp: Local::now(),
            });
        }
    }

    fn register_fault(&mut self) {
        if self.field.shielded {
            return;
        }
        self.field.faults += 1;
    }

    fn check_fault_budget(&mut self) {
        if self.field.faults >= self.field.fault_limit {
            self.game_over = true;
        }
    }

    /// Activate a picked-up power-up and keep it tracked while it lasts.
    /// Instantaneous effects never enter the active list.
    pub fn pickup(&mut self, mut powerup: PowerUp) {
        if !self.powerups_used.contains(&powerup.kind) {
            self.powerups_used.push(powerup.kind);
        }
        powerup.activate(&mut self.field);
        if powerup.active {
            self.powerups.add(powerup);
        }
    }

    /// End the session: persist the statistics, then evaluate achievements
    /// against the final snapshot. Returns the newly unlocked ones.
    pub fn finish(&mut self, achievements: &mut AchievementsManager) -> Vec<Achievement> {
        self.game_over = true;
        let final_score = self.field.best_score();
        self.stats
            .save_session_stats(&self.mode.to_string(), final_score);

        let snapshot = self.stats.detailed_stats();
        achievements.check_achievements(&snapshot, Some(&self.powerups_used))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            options: self.options,
            scores: self.field.scores.clone(),
            faults: self.field.faults,
            fault_limit: self.field.fault_limit,
            score_multiplier: self.field.score_multiplier,
            elapsed: self.elapsed,
            letters: self
                .field
                .letters
                .iter()
                .map(|l| LetterSnapshot {
                    ch: l.ch,
                    x: l.x,
                    y: l.y,
                    vx: l.vx,
                    vy: l.vy,
                })
                .collect(),
        }
    }

    /// Rebuild a session from a save-game snapshot. Reaction clocks for
    /// restored letters restart at the restored elapsed time.
    pub fn restore(snapshot: &SessionSnapshot, width: f64, height: f64) -> Self {
        let mut session = Self::new(snapshot.mode, snapshot.options, width, height);
        session.elapsed = snapshot.elapsed;
        session.field.scores = snapshot.scores.clone();
        session.field.faults = snapshot.faults;
        session.field.fault_limit = snapshot.fault_limit;
        session.field.score_multiplier = snapshot.score_multiplier;
        session.field.letters = snapshot
            .letters
            .iter()
            .map(|l| FallingLetter::new(l.ch, l.x, l.y, l.vx, l.vy, snapshot.elapsed))
            .collect();
        session
    }
}
