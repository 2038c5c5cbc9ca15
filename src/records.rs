use chrono::Local;
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("records database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("could not create records directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Store for finished runs. The best time is the longest survival across
/// all recorded runs. Failures never block gameplay; callers fall back to
/// an in-memory best for the session.
pub trait RunRecords: std::fmt::Debug {
    /// Longest recorded survival, if any run has been recorded.
    fn load_best(&self) -> Result<Option<Duration>, RecordsError>;
    /// Append a finished run.
    fn record_run(&mut self, elapsed: Duration) -> Result<(), RecordsError>;
}

/// SQLite-backed run history under the user's state directory.
#[derive(Debug)]
pub struct RecordsDb {
    conn: Connection,
}

impl RecordsDb {
    pub fn new() -> Result<Self, RecordsError> {
        let path = Self::default_db_path().unwrap_or_else(|| PathBuf::from("tablerush_records.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RecordsError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                elapsed_ms INTEGER NOT NULL,
                finished_at TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_elapsed ON runs(elapsed_ms)",
            [],
        )?;

        Ok(RecordsDb { conn })
    }

    /// Database path under $HOME/.local/state/tablerush, with a
    /// system-specific fallback.
    fn default_db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("tablerush");
            Some(state_dir.join("records.db"))
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "tablerush") {
            let state_dir = proj_dirs.data_local_dir();
            Some(state_dir.join("records.db"))
        } else {
            None
        }
    }
}

impl RunRecords for RecordsDb {
    fn load_best(&self) -> Result<Option<Duration>, RecordsError> {
        let best: Option<i64> = self
            .conn
            .query_row("SELECT MAX(elapsed_ms) FROM runs", [], |row| row.get(0))?;
        Ok(best.map(|ms| Duration::from_millis(ms.max(0) as u64)))
    }

    fn record_run(&mut self, elapsed: Duration) -> Result<(), RecordsError> {
        self.conn.execute(
            "INSERT INTO runs (elapsed_ms, finished_at) VALUES (?1, ?2)",
            params![elapsed.as_millis() as i64, Local::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// In-memory fallback used in tests and when the database is unavailable.
#[derive(Debug, Default)]
pub struct MemoryRecords {
    runs: Vec<Duration>,
}

impl RunRecords for MemoryRecords {
    fn load_best(&self) -> Result<Option<Duration>, RecordsError> {
        Ok(self.runs.iter().max().copied())
    }

    fn record_run(&mut self, elapsed: Duration) -> Result<(), RecordsError> {
        self.runs.push(elapsed);
        Ok(())
    }
}
