//! SQLite-backed persistence for the ScamShield platform.
//!
//! The database lives at `~/.scamshield/scamshield.db` and is the system of
//! record for every entity the REST surface exposes: personas and calls,
//! scam reports, the fraud number database, forum threads, users and
//! sessions, analytics snapshots, and aggregated scam trends. Per-domain
//! query modules extend `AppDb` with `impl` blocks.

use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags};

pub mod types;
pub use types::*;

pub struct AppDb {
    conn: Connection,
}

impl AppDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, String>
    where
        F: FnOnce(&Self) -> Result<T, String>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| format!("Failed to begin transaction: {e}"))?;
        match f(self) {
            Ok(val) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(|e| format!("Failed to commit transaction: {e}"))?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at `~/.scamshield/scamshield.db` and
    /// apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        // FK enforcement is set after migrations run
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }

    /// Open the database in read-only mode, for ops tooling alongside a
    /// running server.
    pub fn open_readonly_at(path: &std::path::Path) -> Result<Self, DbError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.scamshield/scamshield.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".scamshield").join("scamshield.db"))
    }
}

pub mod analytics;
pub mod calls;
pub mod compliance;
pub mod content;
pub mod forum;
pub mod fraud;
pub mod personas;
pub mod reports;
pub mod users;

// =============================================================================
// Shared test utilities
// =============================================================================

#[cfg(test)]
pub mod test_utils {
    use super::AppDb;

    /// Create a temporary database for testing.
    ///
    /// We leak the `TempDir` so the directory persists for the duration of the
    /// test; test temp dirs are cleaned up by the OS. FK enforcement is
    /// disabled so unit tests can insert rows without satisfying every
    /// foreign key constraint.
    pub fn test_db() -> AppDb {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        let db = AppDb::open_at(path).expect("Failed to open test database");
        db.conn_ref()
            .execute_batch("PRAGMA foreign_keys = OFF;")
            .expect("disable FK for tests");
        db
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::test_db;
    use super::*;

    #[test]
    fn test_open_creates_tables() {
        let db = test_db();
        let count: i32 = db
            .conn
            .query_row("SELECT COUNT(*) FROM personas", [], |row| row.get(0))
            .expect("personas table should exist");
        assert_eq!(count, 0);

        let count: i32 = db
            .conn
            .query_row("SELECT COUNT(*) FROM scam_reports", [], |row| row.get(0))
            .expect("scam_reports table should exist");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_idempotent_schema_application() {
        // Opening the same DB twice should not error (IF NOT EXISTS)
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("idempotent.db");

        let _db1 = AppDb::open_at(path.clone()).expect("first open");
        let _db2 = AppDb::open_at(path).expect("second open should not fail");
    }

    #[test]
    fn test_with_transaction_rolls_back_on_err() {
        let db = test_db();
        let result: Result<(), String> = db.with_transaction(|db| {
            db.conn_ref()
                .execute(
                    "INSERT INTO scam_reports (phone_number, created_at) VALUES ('+15550000001', '2026-01-01T00:00:00Z')",
                    [],
                )
                .map_err(|e| e.to_string())?;
            Err("boom".to_string())
        });
        assert!(result.is_err());

        let count: i32 = db
            .conn
            .query_row("SELECT COUNT(*) FROM scam_reports", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0, "rolled-back insert should not persist");
    }
}
