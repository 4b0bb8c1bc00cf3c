//! Error taxonomy shared by the scheduler, storage and study service.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    /// Caller sent something outside the accepted domain (quality rating, title).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("not authorized: {0}")]
    Forbidden(String),
    #[error("database unavailable")]
    DbLock,
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

impl StudyError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }
}

pub type StudyResult<T> = std::result::Result<T, StudyError>;
