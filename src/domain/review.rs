use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StudyError;

/// Ease factor every new card starts with
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Algorithmic floor for the ease factor
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Lowest quality that counts as a successful recall
pub const PASSING_QUALITY: u8 = 3;

/// Cards with a longer interval and more correct answers than these count as mastered
pub const MASTERED_MIN_INTERVAL: i64 = 30;
pub const MASTERED_MIN_CORRECT: i64 = 5;

/// Learner's self-assessed recall, 0 (forgot) to 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
  pub const MAX: u8 = 5;

  pub fn new(value: i64) -> Result<Self, StudyError> {
    if (0..=Self::MAX as i64).contains(&value) {
      Ok(Self(value as u8))
    } else {
      Err(StudyError::invalid(format!(
        "quality {} outside 0..={}",
        value,
        Self::MAX
      )))
    }
  }

  pub fn value(self) -> u8 {
    self.0
  }

  /// A lapse resets the repetition streak
  pub fn is_lapse(self) -> bool {
    self.0 < PASSING_QUALITY
  }
}

impl TryFrom<i64> for Quality {
  type Error = StudyError;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl From<Quality> for u8 {
  fn from(q: Quality) -> u8 {
    q.0
  }
}

/// Per-(user, card) scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
  pub id: i64,
  pub user_id: i64,
  pub flashcard_id: i64,

  // SM-2 fields
  pub ease_factor: f64,
  pub interval: i64,
  pub repetitions: i64,
  /// None means never scheduled, which is always due
  pub next_review_date: Option<DateTime<Utc>>,
  pub last_reviewed: Option<DateTime<Utc>>,

  // Stats
  pub total_reviews: i64,
  pub correct_count: i64,
  pub incorrect_count: i64,
}

impl ReviewState {
  pub fn new(user_id: i64, flashcard_id: i64) -> Self {
    Self {
      id: 0,
      user_id,
      flashcard_id,
      ease_factor: INITIAL_EASE_FACTOR,
      interval: 1,
      repetitions: 0,
      next_review_date: None,
      last_reviewed: None,
      total_reviews: 0,
      correct_count: 0,
      incorrect_count: 0,
    }
  }

  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    match self.next_review_date {
      None => true,
      Some(next) => next <= now,
    }
  }

  pub fn is_mastered(&self) -> bool {
    self.interval > MASTERED_MIN_INTERVAL && self.correct_count > MASTERED_MIN_CORRECT
  }

  pub fn has_been_studied(&self) -> bool {
    self.total_reviews > 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn test_quality_accepts_full_range() {
    for v in 0..=5 {
      assert_eq!(Quality::new(v).unwrap().value() as i64, v);
    }
  }

  #[test]
  fn test_quality_rejects_out_of_range() {
    assert!(matches!(Quality::new(-1), Err(StudyError::InvalidInput(_))));
    assert!(matches!(Quality::new(6), Err(StudyError::InvalidInput(_))));
    assert!(Quality::try_from(255).is_err());
  }

  #[test]
  fn test_quality_lapse_threshold() {
    assert!(Quality::new(0).unwrap().is_lapse());
    assert!(Quality::new(2).unwrap().is_lapse());
    assert!(!Quality::new(3).unwrap().is_lapse());
    assert!(!Quality::new(5).unwrap().is_lapse());
  }

  #[test]
  fn test_quality_serde() {
    let q: Quality = serde_json::from_str("4").unwrap();
    assert_eq!(q.value(), 4);
    assert!(serde_json::from_str::<Quality>("9").is_err());
    assert_eq!(serde_json::to_string(&q).unwrap(), "4");
  }

  #[test]
  fn test_new_state_defaults() {
    let state = ReviewState::new(7, 42);
    assert_eq!(state.user_id, 7);
    assert_eq!(state.flashcard_id, 42);
    assert!((state.ease_factor - 2.5).abs() < f64::EPSILON);
    assert_eq!(state.interval, 1);
    assert_eq!(state.repetitions, 0);
    assert!(state.next_review_date.is_none());
    assert!(state.last_reviewed.is_none());
    assert_eq!(state.total_reviews, 0);
  }

  #[test]
  fn test_is_due() {
    let now = Utc::now();
    let mut state = ReviewState::new(1, 1);
    assert!(state.is_due(now));

    state.next_review_date = Some(now);
    assert!(state.is_due(now));

    state.next_review_date = Some(now + Duration::days(1));
    assert!(!state.is_due(now));
  }

  #[test]
  fn test_is_mastered() {
    let mut state = ReviewState::new(1, 1);
    state.interval = 31;
    state.correct_count = 6;
    assert!(state.is_mastered());

    state.interval = 30;
    assert!(!state.is_mastered());

    state.interval = 31;
    state.correct_count = 5;
    assert!(!state.is_mastered());
  }
}
