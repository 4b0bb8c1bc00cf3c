//! Per-(user, card) review state persistence

use rusqlite::{params, Connection, OptionalExtension, Result};
use std::collections::HashMap;

use crate::domain::ReviewState;

use super::{opt_time_column, to_sql_time};

const STATE_COLUMNS: &str = "id, user_id, flashcard_id, ease_factor, interval, repetitions, \
   next_review_date, last_reviewed, total_reviews, correct_count, incorrect_count";

pub fn get_review_state(conn: &Connection, user_id: i64, flashcard_id: i64) -> Result<Option<ReviewState>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM study_records WHERE user_id = ?1 AND flashcard_id = ?2",
        STATE_COLUMNS
      ),
      params![user_id, flashcard_id],
      row_to_state,
    )
    .optional()
}

/// Insert a default record for the pair. A record that already exists is
/// left untouched and returned instead, so callers never create duplicates.
pub fn create_review_state(conn: &Connection, user_id: i64, flashcard_id: i64) -> Result<ReviewState> {
  let inserted = conn.execute(
    "INSERT OR IGNORE INTO study_records (user_id, flashcard_id) VALUES (?1, ?2)",
    params![user_id, flashcard_id],
  )?;
  if inserted > 0 {
    tracing::debug!("Created study record for user {} card {}", user_id, flashcard_id);
  }

  get_review_state(conn, user_id, flashcard_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_or_create_review_state(conn: &Connection, user_id: i64, flashcard_id: i64) -> Result<ReviewState> {
  match get_review_state(conn, user_id, flashcard_id)? {
    Some(state) => Ok(state),
    None => create_review_state(conn, user_id, flashcard_id),
  }
}

/// Write the whole record in one statement.
pub fn save_review_state(conn: &Connection, state: &ReviewState) -> Result<()> {
  let updated = conn.execute(
    r#"
    UPDATE study_records
    SET ease_factor = ?1, interval = ?2, repetitions = ?3, next_review_date = ?4,
        last_reviewed = ?5, total_reviews = ?6, correct_count = ?7, incorrect_count = ?8
    WHERE user_id = ?9 AND flashcard_id = ?10
    "#,
    params![
      state.ease_factor,
      state.interval,
      state.repetitions,
      state.next_review_date.map(to_sql_time),
      state.last_reviewed.map(to_sql_time),
      state.total_reviews,
      state.correct_count,
      state.incorrect_count,
      state.user_id,
      state.flashcard_id,
    ],
  )?;

  if updated == 0 {
    return Err(rusqlite::Error::QueryReturnedNoRows);
  }
  Ok(())
}

/// States the user has for cards of one set, keyed by card id
pub fn get_states_for_set(conn: &Connection, user_id: i64, set_id: i64) -> Result<HashMap<i64, ReviewState>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {}
    FROM study_records
    WHERE user_id = ?1
      AND flashcard_id IN (SELECT id FROM flashcards WHERE set_id = ?2)
    "#,
    STATE_COLUMNS
  ))?;

  let states = stmt
    .query_map(params![user_id, set_id], row_to_state)?
    .map(|r| r.map(|s| (s.flashcard_id, s)))
    .collect::<Result<HashMap<_, _>>>()?;

  Ok(states)
}

/// Put every record the user has in a set back to the state of a freshly
/// created one. Returns how many were reset.
pub fn reset_all(conn: &Connection, user_id: i64, set_id: i64) -> Result<usize> {
  let fresh = ReviewState::new(user_id, 0);
  let count = conn.execute(
    r#"
    UPDATE study_records
    SET ease_factor = ?1, interval = ?2, repetitions = ?3, next_review_date = ?4,
        last_reviewed = ?5, total_reviews = ?6, correct_count = ?7, incorrect_count = ?8
    WHERE user_id = ?9
      AND flashcard_id IN (SELECT id FROM flashcards WHERE set_id = ?10)
    "#,
    params![
      fresh.ease_factor,
      fresh.interval,
      fresh.repetitions,
      fresh.next_review_date.map(to_sql_time),
      fresh.last_reviewed.map(to_sql_time),
      fresh.total_reviews,
      fresh.correct_count,
      fresh.incorrect_count,
      user_id,
      set_id,
    ],
  )?;
  Ok(count)
}

fn row_to_state(row: &rusqlite::Row) -> Result<ReviewState> {
  Ok(ReviewState {
    id: row.get(0)?,
    user_id: row.get(1)?,
    flashcard_id: row.get(2)?,
    ease_factor: row.get(3)?,
    interval: row.get(4)?,
    repetitions: row.get(5)?,
    next_review_date: opt_time_column(row, 6)?,
    last_reviewed: opt_time_column(row, 7)?,
    total_reviews: row.get(8)?,
    correct_count: row.get(9)?,
    incorrect_count: row.get(10)?,
  })
}
