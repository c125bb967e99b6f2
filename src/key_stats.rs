use crate::app_dirs::AppDirs;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::path::PathBuf;

/// One recorded keypress against a falling letter.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    pub key: char,
    pub was_correct: bool,
    pub reaction_ms: u64,
    pub game_mode: String,
    pub timestamp: DateTime<Local>,
}

/// Aggregated historical numbers for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySummary {
    pub key: char,
    pub avg_reaction_ms: f64,
    pub miss_rate: f64,
    pub total_attempts: i64,
}

/// Database of per-key statistics accumulated across sessions
#[derive(Debug)]
pub struct KeyStatsDb {
    conn: Connection,
}

impl KeyStatsDb {
    /// Open the database and create the schema if needed
    pub fn new() -> Result<Self> {
        let db_path = Self::db_path().unwrap_or_else(|| PathBuf::from("letterfall_keys.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(&db_path)?;
        Self::with_connection(conn)
    }

    /// Build on an existing connection (in-memory in tests)
    pub fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS key_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL,
                was_correct BOOLEAN NOT NULL,
                reaction_ms INTEGER NOT NULL,
                game_mode TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_key_stats_key ON key_stats(key)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_key_stats_timestamp ON key_stats(timestamp)",
            [],
        )?;

        Ok(KeyStatsDb { conn })
    }

    fn db_path() -> Option<PathBuf> {
        AppDirs::db_path()
    }

    /// Record one keypress
    pub fn record(&self, rec: &KeyRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO key_stats (key, was_correct, reaction_ms, game_mode, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                rec.key.to_string(),
                rec.was_correct,
                rec.reaction_ms,
                rec.game_mode,
                rec.timestamp.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Record a whole session's keypresses in one transaction
    pub fn record_batch(&mut self, recs: &[KeyRecord]) -> Result<()> {
        let tx = self.conn.transaction()?;

        for rec in recs {
            tx.execute(
                r#"
                INSERT INTO key_stats (key, was_correct, reaction_ms, game_mode, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    rec.key.to_string(),
                    rec.was_correct,
                    rec.reaction_ms,
                    rec.game_mode,
                    rec.timestamp.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Average reaction time over correct presses of a key
    pub fn avg_reaction_ms(&self, key: char) -> Result<Option<f64>> {
        let mut stmt = self.conn.prepare(
            "SELECT AVG(reaction_ms) FROM key_stats WHERE key = ?1 AND was_correct = 1",
        )?;

        let avg: Option<f64> = stmt.query_row([key.to_string()], |row| row.get(0))?;
        Ok(avg)
    }

    /// Percentage of incorrect presses of a key
    pub fn miss_rate(&self, key: char) -> Result<f64> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                COUNT(*) as total,
                SUM(CASE WHEN was_correct = 0 THEN 1 ELSE 0 END) as incorrect
            FROM key_stats
            WHERE key = ?1
            "#,
        )?;

        let (total, incorrect): (i64, i64) = stmt.query_row([key.to_string()], |row| {
            Ok((row.get(0)?, row.get::<_, Option<i64>>(1)?.unwrap_or(0)))
        })?;

        if total == 0 {
            Ok(0.0)
        } else {
            Ok((incorrect as f64 / total as f64) * 100.0)
        }
    }

    /// Per-key aggregates across the whole table, ordered by key
    pub fn all_key_summary(&self) -> Result<Vec<KeySummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                key,
                AVG(CASE WHEN was_correct = 1 THEN reaction_ms END) as avg_reaction,
                (SUM(CASE WHEN was_correct = 0 THEN 1 ELSE 0 END) * 100.0 / COUNT(*)) as miss_rate,
                COUNT(*) as total_attempts
            FROM key_stats
            GROUP BY key
            ORDER BY key
            "#,
        )?;

        let summary_iter = stmt.query_map([], |row| {
            let key_str: String = row.get(0)?;
            let key = key_str.chars().next().unwrap_or('\0');
            let avg_reaction: Option<f64> = row.get(1)?;
            let miss_rate: f64 = row.get(2)?;
            let total_attempts: i64 = row.get(3)?;

            Ok(KeySummary {
                key,
                avg_reaction_ms: avg_reaction.unwrap_or(0.0),
                miss_rate,
                total_attempts,
            })
        })?;

        let mut summary = Vec::new();
        for item in summary_iter {
            summary.push(item?);
        }

        Ok(summary)
    }

    /// Clear all statistics (for testing or reset purposes)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM key_stats", [])?;
        Ok(())
    }

    pub fn database_path() -> Option<PathBuf> {
        Self::db_path()
    }

    pub fn database_exists() -> bool {
        Self::db_path().map(|path| path.exists()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> KeyStatsDb {
        let conn = Connection::open_in_memory().unwrap();
        KeyStatsDb::with_connection(conn).unwrap()
    }

    fn rec(key: char, was_correct: bool, reaction_ms: u64) -> KeyRecord {
        KeyRecord {
            key,
            was_correct,
            reaction_ms,
            game_mode: "arcade".to_string(),
            timestamp: Local::now(),
        }
    }

    #[test]
    fn test_record_and_aggregate() {
        let db = create_test_db();

        db.record(&rec('a', true, 100)).unwrap();
        db.record(&rec('a', true, 200)).unwrap();

        let avg = db.avg_reaction_ms('a').unwrap();
        assert_eq!(avg, Some(150.0));
    }

    #[test]
    fn test_avg_ignores_incorrect_presses() {
        let db = create_test_db();

        db.record(&rec('b', true, 100)).unwrap();
        db.record(&rec('b', false, 900)).unwrap();

        assert_eq!(db.avg_reaction_ms('b').unwrap(), Some(100.0));
    }

    #[test]
    fn test_miss_rate() {
        let db = create_test_db();

        db.record(&rec('t', true, 100)).unwrap();
        db.record(&rec('t', false, 150)).unwrap();
        db.record(&rec('t', true, 120)).unwrap();
        db.record(&rec('t', false, 180)).unwrap();

        let miss_rate = db.miss_rate('t').unwrap();
        assert_eq!(miss_rate, 50.0);
    }

    #[test]
    fn test_miss_rate_unknown_key() {
        let db = create_test_db();
        assert_eq!(db.miss_rate('z').unwrap(), 0.0);
    }

    #[test]
    fn test_all_key_summary() {
        let db = create_test_db();

        db.record(&rec('a', true, 100)).unwrap();
        db.record(&rec('b', false, 300)).unwrap();

        let summary = db.all_key_summary().unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].key, 'a');
        assert_eq!(summary[0].avg_reaction_ms, 100.0);
        assert_eq!(summary[0].miss_rate, 0.0);
        assert_eq!(summary[1].key, 'b');
        assert_eq!(summary[1].miss_rate, 100.0);
        assert_eq!(summary[1].total_attempts, 1);
    }

    #[test]
    fn test_batch_record() {
        let mut db = create_test_db();

        let recs = vec![rec('x', true, 90), rec('y', true, 110), rec('x', false, 95)];
        db.record_batch(&recs).unwrap();

        assert_eq!(db.miss_rate('x').unwrap(), 50.0);
        assert_eq!(db.avg_reaction_ms('y').unwrap(), Some(110.0));
    }

    #[test]
    fn test_clear_all() {
        let db = create_test_db();

        db.record(&rec('q', true, 100)).unwrap();
        db.clear_all().unwrap();

        assert_eq!(db.all_key_summary().unwrap().len(), 0);
    }
}
