//! Study sessions and leaderboard rows

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::collections::BTreeMap;

use crate::domain::{Leaderboard, SessionCompletion, StudySession};

use super::{opt_time_column, time_column, to_sql_time};

const SESSION_COLUMNS: &str = "id, user_id, set_id, cards_studied, cards_correct, cards_incorrect, \
   duration_minutes, started_at, completed_at";

pub fn insert_session(conn: &Connection, user_id: i64, set_id: i64, started_at: DateTime<Utc>) -> Result<StudySession> {
  conn.execute(
    "INSERT INTO study_sessions (user_id, set_id, started_at) VALUES (?1, ?2, ?3)",
    params![user_id, set_id, to_sql_time(started_at)],
  )?;
  Ok(StudySession {
    id: conn.last_insert_rowid(),
    user_id,
    set_id,
    cards_studied: 0,
    cards_correct: 0,
    cards_incorrect: 0,
    duration_minutes: 0,
    started_at,
    completed_at: None,
  })
}

/// Session lookup scoped to its owner
pub fn get_session(conn: &Connection, user_id: i64, session_id: i64) -> Result<Option<StudySession>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM study_sessions WHERE id = ?1 AND user_id = ?2",
        SESSION_COLUMNS
      ),
      params![session_id, user_id],
      row_to_session,
    )
    .optional()
}

pub fn save_session_completion(
  conn: &Connection,
  session_id: i64,
  completion: &SessionCompletion,
  completed_at: DateTime<Utc>,
) -> Result<()> {
  conn.execute(
    r#"
    UPDATE study_sessions
    SET cards_studied = ?1, cards_correct = ?2, cards_incorrect = ?3,
        duration_minutes = ?4, completed_at = ?5
    WHERE id = ?6
    "#,
    params![
      completion.cards_studied,
      completion.cards_correct,
      completion.cards_incorrect,
      completion.duration_minutes,
      to_sql_time(completed_at),
      session_id,
    ],
  )?;
  Ok(())
}

/// Completed sessions oldest first, optionally for one set
pub fn get_completed_sessions(conn: &Connection, user_id: i64, set_id: Option<i64>) -> Result<Vec<StudySession>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {}
    FROM study_sessions
    WHERE user_id = ?1
      AND completed_at IS NOT NULL
      AND (?2 IS NULL OR set_id = ?2)
    ORDER BY started_at ASC, id ASC
    "#,
    SESSION_COLUMNS
  ))?;

  let sessions = stmt
    .query_map(params![user_id, set_id], row_to_session)?
    .collect::<Result<Vec<_>>>()?;

  Ok(sessions)
}

/// Most recent `limit` completed sessions, oldest first
pub fn get_recent_completed_sessions(conn: &Connection, user_id: i64, limit: usize) -> Result<Vec<StudySession>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {}
    FROM study_sessions
    WHERE user_id = ?1 AND completed_at IS NOT NULL
    ORDER BY started_at DESC, id DESC
    LIMIT ?2
    "#,
    SESSION_COLUMNS
  ))?;

  let mut sessions = stmt
    .query_map(params![user_id, limit as i64], row_to_session)?
    .collect::<Result<Vec<_>>>()?;
  sessions.reverse();

  Ok(sessions)
}

/// Latest completion time per set
pub fn get_last_studied(conn: &Connection, user_id: i64) -> Result<BTreeMap<i64, DateTime<Utc>>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT set_id, completed_at
    FROM study_sessions
    WHERE user_id = ?1 AND completed_at IS NOT NULL
    "#,
  )?;

  let mut latest = BTreeMap::new();
  let rows = stmt.query_map(params![user_id], |row| {
    Ok((row.get::<_, i64>(0)?, time_column(row, 1)?))
  })?;
  for row in rows {
    let (set_id, completed_at) = row?;
    latest
      .entry(set_id)
      .and_modify(|t: &mut DateTime<Utc>| *t = (*t).max(completed_at))
      .or_insert(completed_at);
  }

  Ok(latest)
}

/// Cards studied in sessions of one set started at or after `since`
pub fn get_cards_studied_since(conn: &Connection, user_id: i64, set_id: i64, since: DateTime<Utc>) -> Result<i64> {
  let mut stmt = conn.prepare(
    r#"
    SELECT started_at, cards_studied
    FROM study_sessions
    WHERE user_id = ?1 AND set_id = ?2
    "#,
  )?;

  let mut total: i64 = 0;
  let rows = stmt.query_map(params![user_id, set_id], |row| {
    Ok((time_column(row, 0)?, row.get::<_, i64>(1)?))
  })?;
  for row in rows {
    let (started_at, cards) = row?;
    if started_at >= since {
      total = total.saturating_add(cards);
    }
  }

  Ok(total)
}

pub fn get_leaderboard(conn: &Connection, user_id: i64) -> Result<Option<Leaderboard>> {
  conn
    .query_row(
      r#"
      SELECT user_id, points, total_study_time, total_cards_studied, total_correct,
             streak_days, last_study_date
      FROM leaderboard WHERE user_id = ?1
      "#,
      params![user_id],
      |row| {
        Ok(Leaderboard {
          user_id: row.get(0)?,
          points: row.get(1)?,
          total_study_time: row.get(2)?,
          total_cards_studied: row.get(3)?,
          total_correct: row.get(4)?,
          streak_days: row.get(5)?,
          last_study_date: opt_time_column(row, 6)?,
        })
      },
    )
    .optional()
}

pub fn save_leaderboard(conn: &Connection, board: &Leaderboard) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO leaderboard (user_id, points, total_study_time, total_cards_studied,
                             total_correct, streak_days, last_study_date)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(user_id) DO UPDATE SET
      points = excluded.points,
      total_study_time = excluded.total_study_time,
      total_cards_studied = excluded.total_cards_studied,
      total_correct = excluded.total_correct,
      streak_days = excluded.streak_days,
      last_study_date = excluded.last_study_date
    "#,
    params![
      board.user_id,
      board.points,
      board.total_study_time,
      board.total_cards_studied,
      board.total_correct,
      board.streak_days,
      board.last_study_date.map(to_sql_time),
    ],
  )?;
  Ok(())
}

fn row_to_session(row: &rusqlite::Row) -> Result<StudySession> {
  Ok(StudySession {
    id: row.get(0)?,
    user_id: row.get(1)?,
    set_id: row.get(2)?,
    cards_studied: row.get(3)?,
    cards_correct: row.get(4)?,
    cards_incorrect: row.get(5)?,
    duration_minutes: row.get(6)?,
    started_at: time_column(row, 7)?,
    completed_at: opt_time_column(row, 8)?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{insert_set, insert_user};
  use crate::domain::{NewSet, SetStatus};
  use crate::testing::TestEnv;
  use chrono::{Duration, TimeZone};

  fn seed(env: &TestEnv) -> (i64, i64) {
    let user = insert_user(&env.conn, "ana", false).unwrap();
    let new_set = NewSet {
      title: "Deck".into(),
      ..Default::default()
    };
    let set_id = insert_set(&env.conn, user.id, &new_set, SetStatus::Approved).unwrap();
    (user.id, set_id)
  }

  fn done(studied: i64, correct: i64) -> SessionCompletion {
    SessionCompletion {
      cards_studied: studied,
      cards_correct: correct,
      cards_incorrect: studied - correct,
      duration_minutes: 5,
    }
  }

  #[test]
  fn test_session_lifecycle() {
    let env = TestEnv::new().unwrap();
    let (user_id, set_id) = seed(&env);
    let started = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();

    let session = insert_session(&env.conn, user_id, set_id, started).unwrap();
    assert!(get_completed_sessions(&env.conn, user_id, None).unwrap().is_empty());

    save_session_completion(&env.conn, session.id, &done(10, 7), started + Duration::minutes(5)).unwrap();

    let loaded = get_session(&env.conn, user_id, session.id).unwrap().unwrap();
    assert_eq!(loaded.cards_studied, 10);
    assert_eq!(loaded.cards_correct, 7);
    assert_eq!(loaded.completed_at, Some(started + Duration::minutes(5)));
    assert!(get_session(&env.conn, user_id + 1, session.id).unwrap().is_none());

    assert_eq!(get_completed_sessions(&env.conn, user_id, Some(set_id)).unwrap().len(), 1);
    assert!(get_completed_sessions(&env.conn, user_id, Some(set_id + 1)).unwrap().is_empty());
  }

  #[test]
  fn test_recent_sessions_oldest_first() {
    let env = TestEnv::new().unwrap();
    let (user_id, set_id) = seed(&env);
    let base = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();

    for day in 0..4 {
      let started = base + Duration::days(day);
      let s = insert_session(&env.conn, user_id, set_id, started).unwrap();
      save_session_completion(&env.conn, s.id, &done(day + 1, day + 1), started).unwrap();
    }

    let recent = get_recent_completed_sessions(&env.conn, user_id, 2).unwrap();
    assert_eq!(recent.iter().map(|s| s.cards_studied).collect::<Vec<_>>(), vec![3, 4]);
  }

  #[test]
  fn test_last_studied_per_set() {
    let env = TestEnv::new().unwrap();
    let (user_id, set_id) = seed(&env);
    let base = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();

    for offset in [2, 0, 1] {
      let t = base + Duration::hours(offset);
      let s = insert_session(&env.conn, user_id, set_id, t).unwrap();
      save_session_completion(&env.conn, s.id, &done(1, 1), t).unwrap();
    }
    let other = NewSet {
      title: "Unfinished".into(),
      ..Default::default()
    };
    let other_set = insert_set(&env.conn, user_id, &other, SetStatus::Approved).unwrap();
    insert_session(&env.conn, user_id, other_set, base).unwrap();

    let last = get_last_studied(&env.conn, user_id).unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[&set_id], base + Duration::hours(2));
  }

  #[test]
  fn test_leaderboard_upsert() {
    let env = TestEnv::new().unwrap();
    let (user_id, _) = seed(&env);
    assert!(get_leaderboard(&env.conn, user_id).unwrap().is_none());

    let mut board = Leaderboard::new(user_id);
    board.record_session(&done(4, 3), Utc::now()).unwrap();
    save_leaderboard(&env.conn, &board).unwrap();
    board.record_session(&done(2, 2), Utc::now()).unwrap();
    save_leaderboard(&env.conn, &board).unwrap();

    assert_eq!(get_leaderboard(&env.conn, user_id).unwrap(), Some(board));
  }

  #[test]
  fn test_cards_studied_since() {
    let env = TestEnv::new().unwrap();
    let (user_id, set_id) = seed(&env);
    let midnight = Utc.with_ymd_and_hms(2026, 5, 2, 0, 0, 0).unwrap();

    for (t, n) in [(midnight - Duration::hours(1), 9), (midnight + Duration::hours(1), 4), (midnight + Duration::hours(5), 6)] {
      let s = insert_session(&env.conn, user_id, set_id, t).unwrap();
      save_session_completion(&env.conn, s.id, &done(n, n), t).unwrap();
    }

    assert_eq!(get_cards_studied_since(&env.conn, user_id, set_id, midnight).unwrap(), 10);
  }

  #[test]
  fn test_corrupt_completion_time_is_an_error() {
    let env = TestEnv::new().unwrap();
    let (user_id, set_id) = seed(&env);
    let started = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
    let s = insert_session(&env.conn, user_id, set_id, started).unwrap();
    save_session_completion(&env.conn, s.id, &done(2, 2), started).unwrap();

    env.conn
      .execute("UPDATE study_sessions SET completed_at = 'later' WHERE id = ?1", params![s.id])
      .unwrap();
    assert!(get_completed_sessions(&env.conn, user_id, None).is_err());
    assert!(get_last_studied(&env.conn, user_id).is_err());
  }
}
