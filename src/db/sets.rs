//! Users, flashcard sets and their cards

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::domain::{Flashcard, FlashcardSet, NewSet, SetStatus, SetUpdate, User};

use super::{opt_time_column, time_column, to_sql_time};

pub fn insert_user(conn: &Connection, username: &str, is_admin: bool) -> Result<User> {
  conn.execute(
    "INSERT INTO users (username, is_admin) VALUES (?1, ?2)",
    params![username, is_admin],
  )?;
  Ok(User {
    id: conn.last_insert_rowid(),
    username: username.to_string(),
    is_admin,
  })
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>> {
  conn
    .query_row(
      "SELECT id, username, is_admin FROM users WHERE id = ?1",
      params![id],
      |row| {
        Ok(User {
          id: row.get(0)?,
          username: row.get(1)?,
          is_admin: row.get(2)?,
        })
      },
    )
    .optional()
}

pub fn insert_set(conn: &Connection, owner_id: i64, new_set: &NewSet, status: SetStatus) -> Result<i64> {
  conn.execute(
    r#"
    INSERT INTO flashcard_sets (owner_id, title, description, is_public, status, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#,
    params![
      owner_id,
      new_set.title.trim(),
      new_set.description,
      new_set.is_public,
      status,
      to_sql_time(Utc::now()),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_set(conn: &Connection, id: i64) -> Result<Option<FlashcardSet>> {
  conn
    .query_row(
      r#"
      SELECT id, owner_id, title, description, is_public, status, created_at, updated_at
      FROM flashcard_sets WHERE id = ?1
      "#,
      params![id],
      row_to_set,
    )
    .optional()
}

/// Write the fields named in `update`. Returns false if the set does not exist.
pub fn update_set(conn: &Connection, id: i64, update: &SetUpdate) -> Result<bool> {
  let Some(mut set) = get_set(conn, id)? else {
    return Ok(false);
  };
  if update.is_empty() {
    return Ok(true);
  }
  update.apply(&mut set);

  conn.execute(
    r#"
    UPDATE flashcard_sets
    SET title = ?1, description = ?2, is_public = ?3, updated_at = ?4
    WHERE id = ?5
    "#,
    params![set.title, set.description, set.is_public, to_sql_time(Utc::now()), id],
  )?;
  Ok(true)
}

pub fn insert_card(conn: &Connection, set_id: i64, front: &str, back: &str) -> Result<i64> {
  conn.execute(
    "INSERT INTO flashcards (set_id, front, back, created_at) VALUES (?1, ?2, ?3, ?4)",
    params![set_id, front, back, to_sql_time(Utc::now())],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_card(conn: &Connection, id: i64) -> Result<Option<Flashcard>> {
  conn
    .query_row(
      "SELECT id, set_id, front, back, created_at FROM flashcards WHERE id = ?1",
      params![id],
      row_to_card,
    )
    .optional()
}

/// Cards of a set in creation order
pub fn get_set_cards(conn: &Connection, set_id: i64) -> Result<Vec<Flashcard>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT id, set_id, front, back, created_at
    FROM flashcards
    WHERE set_id = ?1
    ORDER BY id ASC
    "#,
  )?;

  let cards = stmt
    .query_map(params![set_id], row_to_card)?
    .collect::<Result<Vec<_>>>()?;

  Ok(cards)
}

fn row_to_set(row: &rusqlite::Row) -> Result<FlashcardSet> {
  Ok(FlashcardSet {
    id: row.get(0)?,
    owner_id: row.get(1)?,
    title: row.get(2)?,
    description: row.get(3)?,
    is_public: row.get(4)?,
    status: row.get(5)?,
    created_at: time_column(row, 6)?,
    updated_at: opt_time_column(row, 7)?,
  })
}

fn row_to_card(row: &rusqlite::Row) -> Result<Flashcard> {
  Ok(Flashcard {
    id: row.get(0)?,
    set_id: row.get(1)?,
    front: row.get(2)?,
    back: row.get(3)?,
    created_at: time_column(row, 4)?,
  })
}
