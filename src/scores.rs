use crate::app_dirs::AppDirs;
use crate::error::Result;
use chrono::{DateTime, Local};
use itertools::Itertools;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// One winning game on the leaderboard
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub player_name: String,
    pub attempts: u32,
    pub recorded_at: DateTime<Local>,
}

/// Append-only leaderboard persistence.
///
/// Implementations are shared between sessions, so every insert must be atomic.
pub trait ScoreStore: Send + Sync {
    fn record(&self, player_name: &str, attempts: u32) -> Result<ScoreEntry>;

    /// Best `limit` entries, fewest attempts first, older entries first on ties.
    fn top(&self, limit: usize) -> Result<Vec<ScoreEntry>>;

    fn clear(&self) -> Result<()>;
}

impl<T: ScoreStore + ?Sized> ScoreStore for Arc<T> {
    fn record(&self, player_name: &str, attempts: u32) -> Result<ScoreEntry> {
        (**self).record(player_name, attempts)
    }

    fn top(&self, limit: usize) -> Result<Vec<ScoreEntry>> {
        (**self).top(limit)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// SQLite backed leaderboard
#[derive(Debug)]
pub struct SqliteScoreStore {
    conn: Mutex<Connection>,
}

impl SqliteScoreStore {
    /// Open the leaderboard at the default location under $HOME/.local/state/guessr
    pub fn new() -> Result<Self> {
        Self::open(AppDirs::db_path_or_local())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        log::debug!("opening score store at {:?}", path);
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                attempts INTEGER NOT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scores_attempts ON scores(attempts, id)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM scores", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl ScoreStore for SqliteScoreStore {
    fn record(&self, player_name: &str, attempts: u32) -> Result<ScoreEntry> {
        let entry = ScoreEntry {
            player_name: player_name.to_string(),
            attempts,
            recorded_at: Local::now(),
        };
        self.conn().execute(
            "INSERT INTO scores (name, attempts, recorded_at) VALUES (?1, ?2, ?3)",
            params![
                entry.player_name,
                entry.attempts,
                entry.recorded_at.to_rfc3339()
            ],
        )?;
        log::info!("recorded {} attempts for {}", attempts, player_name);
        Ok(entry)
    }

    fn top(&self, limit: usize) -> Result<Vec<ScoreEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT name, attempts, recorded_at
            FROM scores
            ORDER BY attempts ASC, id ASC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let recorded_at: String = row.get(2)?;
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?
                .with_timezone(&Local);

            Ok(ScoreEntry {
                player_name: row.get(0)?,
                attempts: row.get(1)?,
                recorded_at,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    fn clear(&self) -> Result<()> {
        self.conn().execute("DELETE FROM scores", [])?;
        Ok(())
    }
}

/// Leaderboard kept in process memory
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    entries: Mutex<Vec<ScoreEntry>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<ScoreEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn record(&self, player_name: &str, attempts: u32) -> Result<ScoreEntry> {
        let entry = ScoreEntry {
            player_name: player_name.to_string(),
            attempts,
            recorded_at: Local::now(),
        };
        self.entries().push(entry.clone());
        Ok(entry)
    }

    fn top(&self, limit: usize) -> Result<Vec<ScoreEntry>> {
        // sorted_by_key is stable, so insertion order breaks ties
        Ok(self
            .entries()
            .iter()
            .sorted_by_key(|e| e.attempts)
            .take(limit)
            .cloned()
            .collect())
    }

    fn clear(&self) -> Result<()> {
        self.entries().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn names(entries: &[ScoreEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.player_name.as_str()).collect()
    }

    fn check_ordering(store: &dyn ScoreStore) {
        store.record("slow", 9).unwrap();
        store.record("first", 4).unwrap();
        store.record("fast", 1).unwrap();
        store.record("second", 4).unwrap();

        let top = store.top(5).unwrap();
        assert_eq!(names(&top), vec!["fast", "first", "second", "slow"]);
        assert!(top.windows(2).all(|w| w[0].attempts <= w[1].attempts));

        let top2 = store.top(2).unwrap();
        assert_eq!(names(&top2), vec!["fast", "first"]);

        store.record("faster", 0).unwrap();
        assert_eq!(store.top(1).unwrap()[0].player_name, "faster");
    }

    #[test]
    fn sqlite_orders_by_attempts_then_insertion() {
        let store = SqliteScoreStore::open_in_memory().unwrap();
        check_ordering(&store);
    }

    #[test]
    fn memory_orders_by_attempts_then_insertion() {
        let store = MemoryScoreStore::new();
        check_ordering(&store);
    }

    #[test]
    fn top_of_empty_store_is_empty() {
        let store = SqliteScoreStore::open_in_memory().unwrap();
        assert!(store.top(5).unwrap().is_empty());
        assert!(store.is_empty().unwrap());
        assert!(MemoryScoreStore::new().top(5).unwrap().is_empty());
    }

    #[test]
    fn top_zero_returns_nothing() {
        let store = SqliteScoreStore::open_in_memory().unwrap();
        store.record("Ann", 3).unwrap();
        assert!(store.top(0).unwrap().is_empty());
    }

    #[test]
    fn record_returns_the_stored_entry() {
        let store = SqliteScoreStore::open_in_memory().unwrap();
        let entry = store.record("Ann", 3).unwrap();
        let top = store.top(1).unwrap();
        assert_eq!(top[0].player_name, entry.player_name);
        assert_eq!(top[0].attempts, 3);
        assert_eq!(top[0].recorded_at.timestamp(), entry.recorded_at.timestamp());
    }

    #[test]
    fn clear_removes_all_scores() {
        let store = SqliteScoreStore::open_in_memory().unwrap();
        store.record("Ann", 3).unwrap();
        store.record("Bob", 2).unwrap();
        assert_eq!(store.len().unwrap(), 2);

        store.clear().unwrap();
        assert!(store.top(5).unwrap().is_empty());
    }

    #[test]
    fn scores_survive_reopening() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("scores.db");
        {
            let store = SqliteScoreStore::open(&path).unwrap();
            store.record("Ann", 3).unwrap();
        }
        let store = SqliteScoreStore::open(&path).unwrap();
        assert_eq!(names(&store.top(5).unwrap()), vec!["Ann"]);
    }

    #[test]
    fn concurrent_writers_do_not_lose_rows() {
        let store = Arc::new(SqliteScoreStore::open_in_memory().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        store.record(&format!("p{}", t), i).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len().unwrap(), 40);
    }

    #[test]
    fn corrupt_timestamp_surfaces_as_persistence_error() {
        let store = SqliteScoreStore::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO scores (name, attempts, recorded_at) VALUES ('x', 1, 'yesterday')",
                [],
            )
            .unwrap();
        assert_matches!(store.top(5), Err(Error::Persistence(_)));
    }
}
