use chrono::{DateTime, Duration, Utc};

use crate::domain::review::{MIN_EASE_FACTOR, Quality, ReviewState};
use crate::error::StudyError;

/// Apply one SM-2 review to `state` and return the updated record.
///
/// `quality` is validated before anything is computed, so an invalid rating
/// leaves the caller with its original state untouched.
pub fn update(state: &ReviewState, quality: i64, now: DateTime<Utc>) -> Result<ReviewState, StudyError> {
  let quality = Quality::new(quality)?;
  Ok(apply_review(state, quality, now))
}

/// SM-2 update for an already validated rating.
pub fn apply_review(state: &ReviewState, quality: Quality, now: DateTime<Utc>) -> ReviewState {
  let mut next = state.clone();

  if quality.is_lapse() {
    next.repetitions = 0;
    next.interval = 1;
    next.incorrect_count += 1;
  } else {
    next.repetitions += 1;
    // Multiplier is the ease factor as it stood before this review
    next.interval = match next.repetitions {
      1 => 1,
      2 => 6,
      _ => ((state.interval as f64) * state.ease_factor).round() as i64,
    };
    next.correct_count += 1;
  }

  next.ease_factor = next_ease_factor(state.ease_factor, quality);

  next.total_reviews += 1;
  next.last_reviewed = Some(now);
  next.next_review_date = Some(schedule_after(now, next.interval));
  next
}

/// `now + interval` days, saturating at the latest representable instant
fn schedule_after(now: DateTime<Utc>, interval_days: i64) -> DateTime<Utc> {
  Duration::try_days(interval_days)
    .and_then(|delta| now.checked_add_signed(delta))
    .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3
pub fn next_ease_factor(current: f64, quality: Quality) -> f64 {
  let miss = (Quality::MAX - quality.value()) as f64;
  let ease_delta = 0.1 - miss * (0.08 + miss * 0.02);
  (current + ease_delta).max(MIN_EASE_FACTOR)
}
