pub mod schema;
pub mod sessions;
pub mod sets;
pub mod stats;
pub mod study_records;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Result, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::StudyError;

pub use schema::run_migrations;
pub use sessions::*;
pub use sets::*;
pub use stats::*;
pub use study_records::*;

pub type DbPool = Arc<Mutex<Connection>>;

/// Best-effort results: warn and carry on without the value
pub trait LogOnError<T> {
    fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        self.map_err(|e| tracing::warn!("{}: {}", context, e)).ok()
    }
}

/// Lock the shared connection; a poisoned mutex becomes `StudyError::DbLock`
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, StudyError> {
    pool.lock().map_err(|_: PoisonError<_>| {
        tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
        StudyError::DbLock
    })
}

pub fn init_db(path: &Path) -> Result<DbPool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .log_warn(&format!("Could not create {}", parent.display()));
    }

    let conn = Connection::open(path)?;
    run_migrations(&conn)?;
    tracing::info!("Database ready at {}", path.display());
    Ok(Arc::new(Mutex::new(conn)))
}

pub(crate) fn to_sql_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Stored timestamps are RFC 3339 text; anything else fails the row
pub(crate) fn parse_time(idx: usize, s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn time_column(row: &Row, idx: usize) -> Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_time(idx, &raw)
}

pub(crate) fn opt_time_column(row: &Row, idx: usize) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_time(idx, &s)).transpose()
}
