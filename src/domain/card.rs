use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::StudyError;

/// Moderation status of a flashcard set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetStatus {
  Pending,
  Approved,
  Rejected,
}

impl SetStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Approved => "approved",
      Self::Rejected => "rejected",
    }
  }

  /// Status a freshly created set starts in: admins skip moderation.
  pub fn for_new_set(owner: &User) -> Self {
    if owner.is_admin {
      Self::Approved
    } else {
      Self::Pending
    }
  }
}

impl FromStr for SetStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(Self::Pending),
      "approved" => Ok(Self::Approved),
      "rejected" => Ok(Self::Rejected),
      _ => Err(format!("Invalid set status: {}", s)),
    }
  }
}

impl ToSql for SetStatus {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(self.as_str()))
  }
}

impl FromSql for SetStatus {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    value
      .as_str()?
      .parse()
      .map_err(|e: String| FromSqlError::Other(e.into()))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardSet {
  pub id: i64,
  pub owner_id: i64,
  pub title: String,
  pub description: Option<String>,
  pub is_public: bool,
  pub status: SetStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl FlashcardSet {
  /// Whether `user` may study this set.
  ///
  /// Admins always can. Everyone else is blocked while the set awaits
  /// approval, and otherwise needs to own the set or have it be public.
  pub fn check_study_access(&self, user: &User) -> Result<(), StudyError> {
    self.check_not_pending(user)?;
    self.check_read_access(user)
  }

  /// Owner, admin, or public set. Moderation status is not considered.
  pub fn check_read_access(&self, user: &User) -> Result<(), StudyError> {
    if user.is_admin || self.owner_id == user.id || self.is_public {
      return Ok(());
    }
    Err(StudyError::Forbidden(format!("set {}", self.id)))
  }

  /// Only the owner or an admin may change the set or its cards.
  pub fn check_write_access(&self, user: &User) -> Result<(), StudyError> {
    if user.is_admin || self.owner_id == user.id {
      return Ok(());
    }
    Err(StudyError::Forbidden(format!("set {}", self.id)))
  }

  /// Pending check only, used where ownership is not required (starting a session).
  pub fn check_not_pending(&self, user: &User) -> Result<(), StudyError> {
    if !user.is_admin && self.status == SetStatus::Pending {
      return Err(StudyError::Forbidden(format!(
        "set {} is awaiting admin approval",
        self.id
      )));
    }
    Ok(())
  }
}

/// Fields accepted when creating a set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSet {
  pub title: String,
  pub description: Option<String>,
  pub is_public: bool,
}

/// Partial update of a set. Only these fields can change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetUpdate {
  pub title: Option<String>,
  pub description: Option<String>,
  pub is_public: Option<bool>,
}

impl SetUpdate {
  pub fn is_empty(&self) -> bool {
    self.title.is_none() && self.description.is_none() && self.is_public.is_none()
  }

  pub fn validate(&self) -> Result<(), StudyError> {
    if let Some(title) = &self.title {
      validate_title(title)?;
    }
    Ok(())
  }

  pub fn apply(&self, set: &mut FlashcardSet) {
    if let Some(title) = &self.title {
      set.title = title.trim().to_string();
    }
    if let Some(description) = &self.description {
      set.description = Some(description.clone());
    }
    if let Some(is_public) = self.is_public {
      set.is_public = is_public;
    }
  }
}

pub fn validate_title(title: &str) -> Result<(), StudyError> {
  if title.trim().is_empty() {
    return Err(StudyError::invalid("set title must not be empty"));
  }
  Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
  pub id: i64,
  pub set_id: i64,
  pub front: String,
  pub back: String,
  pub created_at: DateTime<Utc>,
}
