//! Study session bookkeeping and leaderboard scoring

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StudyError;

const POINTS_PER_CARD: i64 = 10;
const POINTS_PER_CORRECT: i64 = 5;
const POINTS_PER_STREAK_DAY: i64 = 20;

/// Most cards a single session may report
pub const MAX_SESSION_CARDS: i64 = 10_000;

/// Longest session accepted, one week
pub const MAX_SESSION_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
  pub id: i64,
  pub user_id: i64,
  pub set_id: i64,
  pub cards_studied: i64,
  pub cards_correct: i64,
  pub cards_incorrect: i64,
  pub duration_minutes: i64,
  pub started_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
}

impl StudySession {
  /// Every card in the session was answered correctly
  pub fn is_perfect(&self) -> bool {
    self.cards_studied > 0 && self.cards_correct >= self.cards_studied
  }
}

/// Counters reported when a session ends
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionCompletion {
  pub cards_studied: i64,
  pub cards_correct: i64,
  pub cards_incorrect: i64,
  pub duration_minutes: i64,
}

impl SessionCompletion {
  pub fn validate(&self) -> Result<(), StudyError> {
    let cards = [self.cards_studied, self.cards_correct, self.cards_incorrect];
    if cards.iter().any(|&n| !(0..=MAX_SESSION_CARDS).contains(&n)) {
      return Err(StudyError::invalid(format!(
        "session card counts must be within 0..={}",
        MAX_SESSION_CARDS
      )));
    }
    if !(0..=MAX_SESSION_MINUTES).contains(&self.duration_minutes) {
      return Err(StudyError::invalid(format!(
        "session duration must be within 0..={} minutes",
        MAX_SESSION_MINUTES
      )));
    }
    if self.cards_correct + self.cards_incorrect > self.cards_studied {
      return Err(StudyError::invalid(
        "correct and incorrect answers exceed cards studied",
      ));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
  pub user_id: i64,
  pub points: i64,
  pub total_study_time: i64,
  pub total_cards_studied: i64,
  pub total_correct: i64,
  pub streak_days: i64,
  pub last_study_date: Option<DateTime<Utc>>,
}

impl Leaderboard {
  pub fn new(user_id: i64) -> Self {
    Self {
      user_id,
      ..Default::default()
    }
  }

  /// Fold a completed session into the totals.
  ///
  /// Points are computed from the streak as it stood before this session;
  /// the streak is then advanced by calendar day. On overflow nothing changes.
  pub fn record_session(&mut self, completion: &SessionCompletion, now: DateTime<Utc>) -> Result<(), StudyError> {
    let user_id = self.user_id;
    let overflow = || StudyError::invalid(format!("leaderboard totals for user {} out of range", user_id));

    let total_study_time = self
      .total_study_time
      .checked_add(completion.duration_minutes)
      .ok_or_else(overflow)?;
    let total_cards_studied = self
      .total_cards_studied
      .checked_add(completion.cards_studied)
      .ok_or_else(overflow)?;
    let total_correct = self
      .total_correct
      .checked_add(completion.cards_correct)
      .ok_or_else(overflow)?;
    let points = total_cards_studied
      .checked_mul(POINTS_PER_CARD)
      .zip(total_correct.checked_mul(POINTS_PER_CORRECT))
      .and_then(|(cards, correct)| cards.checked_add(correct))
      .zip(self.streak_days.checked_mul(POINTS_PER_STREAK_DAY))
      .and_then(|(base, streak)| base.checked_add(streak))
      .ok_or_else(overflow)?;

    self.total_study_time = total_study_time;
    self.total_cards_studied = total_cards_studied;
    self.total_correct = total_correct;
    self.points = points;

    let today = now.date_naive();
    match self.last_study_date {
      Some(last) => {
        let gap = (today - last.date_naive()).num_days();
        if gap == 1 {
          self.streak_days = self.streak_days.saturating_add(1);
        } else if gap > 1 {
          self.streak_days = 1;
        }
      }
      None => self.streak_days = 1,
    }

    self.last_study_date = Some(now);
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectStreak {
  pub current_streak: i64,
  pub max_streak: i64,
}
