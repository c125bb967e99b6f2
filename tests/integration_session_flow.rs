use letterfall::achievements::AchievementsManager;
use letterfall::powerups::{PowerUp, PowerUpKind};
use letterfall::session::{GameMode, GameOptions, GameSession, KeyPress};
use letterfall::statistics::{FileHistoryStore, HistoryStore, StatisticsManager};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const DT: f64 = 1.0 / 60.0;

fn session_in(dir: &TempDir, mode: GameMode, options: GameOptions) -> GameSession {
    let mut session = GameSession::new(mode, options, 800.0, 600.0);
    session.spawn_probability = 0.0;
    session.key_db = None;
    session.stats = StatisticsManager::with_store(FileHistoryStore::with_path(
        dir.path().join("stats.json"),
    ));
    session
}

fn achievements_in(dir: &TempDir) -> AchievementsManager {
    AchievementsManager::with_paths(
        dir.path().join("achievements.json"),
        FileHistoryStore::with_path(dir.path().join("stats.json")),
    )
}

#[test]
fn arcade_session_runs_to_game_over_and_persists() {
    let dir = TempDir::new().unwrap();
    let mut session = session_in(&dir, GameMode::Arcade, GameOptions::arcade(3));
    let mut achievements = achievements_in(&dir);

    for ch in ['a', 'b', 'c', 'd'] {
        session.spawn_letter(ch, 100.0);
        session.update(DT);
        assert!(matches!(session.handle_key(0, ch), KeyPress::Hit { .. }));
    }
    assert_eq!(session.field.scores[0], 40);

    // Burn through the fault budget with wrong keys
    session.handle_key(0, 'z');
    session.handle_key(0, 'z');
    assert!(!session.game_over);
    session.handle_key(0, 'z');
    assert!(session.game_over);

    // Pin the session clock so the WPM the snapshot reports is stable
    // across the two achievement checks below
    session.stats.session_start = Instant::now()
        .checked_sub(Duration::from_secs(120))
        .expect("clock far enough from boot");

    let unlocked = session.finish(&mut achievements);
    assert!(unlocked.iter().any(|a| a.id == "first_session"));

    // Statistics invariants survived the whole run
    assert_eq!(
        session.stats.correct_keystrokes + session.stats.incorrect_keystrokes,
        session.stats.total_keystrokes
    );
    assert_eq!(session.stats.total_keystrokes, 7);

    // The session landed in the persisted history
    let history = FileHistoryStore::with_path(dir.path().join("stats.json")).load();
    assert_eq!(history.sessions.len(), 1);
    assert_eq!(history.sessions[0].final_score, 40);
    assert_eq!(history.sessions[0].game_mode, "arcade");

    // A second check against the same snapshot unlocks nothing new
    let again = achievements.check_achievements(&session.stats.detailed_stats(), None);
    assert!(again.is_empty());
}

#[test]
fn multiplier_powerup_boosts_scoring_until_it_expires() {
    let dir = TempDir::new().unwrap();
    let mut session = session_in(&dir, GameMode::Practice, GameOptions::practice());

    session.pickup(PowerUp::new(PowerUpKind::Multiplier, 400.0, 300.0));
    session.spawn_letter('m', 100.0);
    assert!(matches!(
        session.handle_key(0, 'm'),
        KeyPress::Hit { points: 30, .. }
    ));

    // Run the 10 second multiplier out
    for _ in 0..(10 * 60 + 1) {
        session.update(DT);
    }
    assert!(!session.powerups.has_active(PowerUpKind::Multiplier));
    assert_eq!(session.field.score_multiplier, 1);

    session.spawn_letter('n', 100.0);
    assert!(matches!(
        session.handle_key(0, 'n'),
        KeyPress::Hit { points: 10, .. }
    ));
    assert_eq!(session.field.scores[0], 40);
}

#[test]
fn time_bomb_clears_the_field_through_the_frame_loop() {
    let dir = TempDir::new().unwrap();
    let mut session = session_in(&dir, GameMode::Practice, GameOptions::practice());

    for (i, ch) in ['x', 'y', 'z'].into_iter().enumerate() {
        session.spawn_letter(ch, 100.0 * (i + 1) as f64);
    }
    session.pickup(PowerUp::new(PowerUpKind::TimeBomb, 400.0, 300.0));

    for _ in 0..200 {
        session.update(DT);
    }

    assert!(session.field.letters.is_empty());
    assert_eq!(session.field.scores[0], 30);
    assert!(!session.powerups.has_active(PowerUpKind::TimeBomb));
}

#[test]
fn freezer_holds_letters_in_place_through_the_frame_loop() {
    let dir = TempDir::new().unwrap();
    let mut session = session_in(&dir, GameMode::Practice, GameOptions::practice());

    session.spawn_letter('f', 100.0);
    session.pickup(PowerUp::new(PowerUpKind::Freezer, 400.0, 300.0));

    for _ in 0..60 {
        session.update(DT);
    }
    assert_eq!(session.field.letters[0].y, 0.0);

    // After the 8 second freeze the letter falls again
    for _ in 0..(8 * 60) {
        session.update(DT);
    }
    assert!(session.field.letters[0].y > 0.0);
}

#[test]
fn collector_achievement_unlocks_after_using_every_enhanced_kind() {
    let dir = TempDir::new().unwrap();
    let mut session = session_in(&dir, GameMode::Practice, GameOptions::practice());
    let mut achievements = achievements_in(&dir);

    for kind in PowerUpKind::ENHANCED {
        session.pickup(PowerUp::new(kind, 400.0, 300.0));
    }

    let unlocked = session.finish(&mut achievements);
    assert!(unlocked.iter().any(|a| a.id == "collector"));
}

#[test]
fn session_count_achievement_arrives_on_the_tenth_run() {
    let dir = TempDir::new().unwrap();
    let mut achievements = achievements_in(&dir);

    for run in 1..=10 {
        let mut session = session_in(&dir, GameMode::Arcade, GameOptions::arcade(5));
        session.spawn_letter('a', 100.0);
        session.handle_key(0, 'a');
        let unlocked = session.finish(&mut achievements);

        let dedicated = unlocked.iter().any(|a| a.id == "dedicated");
        assert_eq!(dedicated, run == 10, "run {run}");
    }
}
