//! Play-tracker database sync
//!
//! The play tracker is an SQLite database owned by the device firmware. Rows
//! in `rom` are keyed by ROM-root-relative path; `play_activity` rows hang
//! off `rom.id`. Every operation opens the database, does its work inside a
//! single transaction and closes it again.

use crate::LibraryError;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A row of the `rom` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerRecord {
    pub id: i64,
    pub name: String,
    pub file_path: String,
}

/// Handle on the play-tracker database file
#[derive(Debug, Clone)]
pub struct PlayTracker {
    db_path: PathBuf,
}

impl PlayTracker {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Create the tracker schema in a new or existing database
    pub fn create(db_path: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let tracker = Self::new(db_path);
        let conn = Connection::open(&tracker.db_path)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS rom (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                created_at INTEGER DEFAULT (strftime('%s', 'now')),
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );

            CREATE TABLE IF NOT EXISTS play_activity (
                rom_id INTEGER NOT NULL,
                play_time INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER DEFAULT (strftime('%s', 'now')),
                FOREIGN KEY (rom_id) REFERENCES rom(id)
            );

            CREATE INDEX IF NOT EXISTS idx_rom_file_path ON rom(file_path);
            CREATE INDEX IF NOT EXISTS idx_play_activity_rom_id ON play_activity(rom_id);
        "#,
        )?;

        Ok(tracker)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open the existing database; never creates one
    fn connect(&self) -> Result<Connection, LibraryError> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }

    /// Whether any play data is recorded for `file_path`
    ///
    /// Lookup failures read as "no data".
    pub fn has_data(&self, file_path: &str) -> bool {
        match self.record(file_path) {
            Ok(record) => record.is_some(),
            Err(e) => {
                debug!("Tracker lookup for {} failed: {}", file_path, e);
                false
            }
        }
    }

    /// The `rom` row for `file_path`, if any
    pub fn record(&self, file_path: &str) -> Result<Option<TrackerRecord>, LibraryError> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                "SELECT id, name, file_path FROM rom WHERE file_path = ?1",
                params![file_path],
                Self::row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    /// Point the record for `old_path` at `new_path` and rename it
    ///
    /// `TrackerRecordNotFound` when the ROM was never tracked; nothing is
    /// committed in that case.
    pub fn migrate(
        &self,
        old_path: &str,
        new_path: &str,
        new_name: &str,
    ) -> Result<(), LibraryError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let id = Self::find_id(&tx, old_path)?
            .ok_or_else(|| LibraryError::TrackerRecordNotFound(old_path.to_string()))?;

        tx.execute(
            "UPDATE rom SET name = ?1, file_path = ?2 WHERE id = ?3",
            params![new_name, new_path, id],
        )?;
        tx.commit()?;

        info!("Migrated play data {} -> {}", old_path, new_path);
        Ok(())
    }

    /// Delete the record for `file_path` and all of its play activity
    ///
    /// Both deletes share one transaction; either both land or neither.
    pub fn clear(&self, file_path: &str) -> Result<(), LibraryError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let id = Self::find_id(&tx, file_path)?
            .ok_or_else(|| LibraryError::TrackerRecordNotFound(file_path.to_string()))?;

        let activity = tx.execute("DELETE FROM play_activity WHERE rom_id = ?1", params![id])?;
        tx.execute("DELETE FROM rom WHERE id = ?1", params![id])?;
        tx.commit()?;

        info!(
            "Cleared play data for {} ({} activity rows)",
            file_path, activity
        );
        Ok(())
    }

    /// Records whose `file_path` no longer exists under `rom_root`
    ///
    /// Orphans are only reported, never deleted.
    pub fn orphaned_records(&self, rom_root: &Path) -> Result<Vec<TrackerRecord>, LibraryError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT id, name, file_path FROM rom ORDER BY file_path")?;

        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records
            .into_iter()
            .filter(|r| !rom_root.join(&r.file_path).exists())
            .collect())
    }

    fn find_id(conn: &Connection, file_path: &str) -> Result<Option<i64>, LibraryError> {
        let id = conn
            .query_row(
                "SELECT id FROM rom WHERE file_path = ?1",
                params![file_path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TrackerRecord> {
        Ok(TrackerRecord {
            id: row.get("id")?,
            name: row.get("name")?,
            file_path: row.get("file_path")?,
        })
    }
}
