//! Throwaway study databases for tests, migrated with the production schema.

use rusqlite::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::db::{self, DbPool};

/// Test environment with a migrated study database in a temporary directory.
///
/// The directory is removed when the environment is dropped.
pub struct TestEnv {
    /// Owns the database file; dropping it deletes everything
    pub temp: TempDir,
    /// Connection with the full schema (all migrations)
    pub conn: Connection,
}

impl TestEnv {
    /// Create a test environment using `crate::db::schema::run_migrations()`.
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("study.db"))?;
        db::schema::run_migrations(&conn)?;

        Ok(Self { temp, conn })
    }

    /// Path of the database file, for opening further connections.
    pub fn db_path(&self) -> PathBuf {
        self.temp.path().join("study.db")
    }

    /// A pool over a second connection to the same database file.
    pub fn pool(&self) -> rusqlite::Result<DbPool> {
        db::init_db(&self.db_path())
    }
}
