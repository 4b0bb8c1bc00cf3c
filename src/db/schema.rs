use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Create tables with COMPLETE schema for new databases
  // Migrations below handle upgrades for existing databases
  conn.execute_batch(
    r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      username TEXT NOT NULL UNIQUE,
      is_admin INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS flashcard_sets (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      owner_id INTEGER NOT NULL,
      title TEXT NOT NULL,
      description TEXT,
      is_public INTEGER NOT NULL DEFAULT 0,
      status TEXT NOT NULL DEFAULT 'pending',
      created_at TEXT NOT NULL,
      updated_at TEXT,
      FOREIGN KEY (owner_id) REFERENCES users(id)
    );

    CREATE TABLE IF NOT EXISTS flashcards (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      set_id INTEGER NOT NULL,
      front TEXT NOT NULL,
      back TEXT NOT NULL,
      created_at TEXT NOT NULL,
      FOREIGN KEY (set_id) REFERENCES flashcard_sets(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS study_records (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      user_id INTEGER NOT NULL,
      flashcard_id INTEGER NOT NULL,
      ease_factor REAL NOT NULL DEFAULT 2.5,
      interval INTEGER NOT NULL DEFAULT 1,
      repetitions INTEGER NOT NULL DEFAULT 0,
      next_review_date TEXT,
      last_reviewed TEXT,
      total_reviews INTEGER NOT NULL DEFAULT 0,
      correct_count INTEGER NOT NULL DEFAULT 0,
      incorrect_count INTEGER NOT NULL DEFAULT 0,
      UNIQUE (user_id, flashcard_id),
      FOREIGN KEY (user_id) REFERENCES users(id),
      FOREIGN KEY (flashcard_id) REFERENCES flashcards(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS study_sessions (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      user_id INTEGER NOT NULL,
      set_id INTEGER NOT NULL,
      cards_studied INTEGER NOT NULL DEFAULT 0,
      cards_correct INTEGER NOT NULL DEFAULT 0,
      cards_incorrect INTEGER NOT NULL DEFAULT 0,
      duration_minutes INTEGER NOT NULL DEFAULT 0,
      started_at TEXT NOT NULL,
      completed_at TEXT,
      FOREIGN KEY (user_id) REFERENCES users(id),
      FOREIGN KEY (set_id) REFERENCES flashcard_sets(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS leaderboard (
      user_id INTEGER PRIMARY KEY,
      points INTEGER NOT NULL DEFAULT 0,
      total_study_time INTEGER NOT NULL DEFAULT 0,
      total_cards_studied INTEGER NOT NULL DEFAULT 0,
      total_correct INTEGER NOT NULL DEFAULT 0,
      streak_days INTEGER NOT NULL DEFAULT 0,
      last_study_date TEXT,
      FOREIGN KEY (user_id) REFERENCES users(id)
    );

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_flashcards_set_id ON flashcards(set_id);
    CREATE INDEX IF NOT EXISTS idx_study_records_user ON study_records(user_id);
    CREATE INDEX IF NOT EXISTS idx_study_records_next_review ON study_records(next_review_date);
    CREATE INDEX IF NOT EXISTS idx_study_sessions_user_set ON study_sessions(user_id, set_id);
    CREATE INDEX IF NOT EXISTS idx_study_sessions_started_at ON study_sessions(started_at);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // These are no-ops for new databases (columns already exist)
  // ============================================================

  // Migration: moderation status on sets (older databases predate review)
  let had_status = column_exists(conn, "flashcard_sets", "status");
  add_column_if_missing(conn, "flashcard_sets", "status", "TEXT NOT NULL DEFAULT 'pending'")?;
  if !had_status {
    // Sets that existed before moderation were already visible; keep them so
    conn.execute("UPDATE flashcard_sets SET status = 'approved'", [])?;
  }

  // Migration: split correct/incorrect counters on study records
  add_column_if_missing(conn, "study_records", "incorrect_count", "INTEGER NOT NULL DEFAULT 0")?;

  Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_migrations_are_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    run_migrations(&conn).unwrap();
    assert!(column_exists(&conn, "study_records", "incorrect_count"));
    assert!(column_exists(&conn, "flashcard_sets", "status"));
  }

  #[test]
  fn test_legacy_sets_become_approved() {
    let conn = Connection::open_in_memory().unwrap();
    conn
      .execute_batch(
        r#"
        CREATE TABLE flashcard_sets (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          owner_id INTEGER NOT NULL,
          title TEXT NOT NULL,
          description TEXT,
          is_public INTEGER NOT NULL DEFAULT 0,
          created_at TEXT NOT NULL,
          updated_at TEXT
        );
        INSERT INTO flashcard_sets (owner_id, title, created_at) VALUES (1, 'Old', '2024-01-01T00:00:00Z');
        "#,
      )
      .unwrap();

    run_migrations(&conn).unwrap();

    let status: String = conn
      .query_row("SELECT status FROM flashcard_sets WHERE title = 'Old'", [], |row| row.get(0))
      .unwrap();
    assert_eq!(status, "approved");
  }

  #[test]
  fn test_duplicate_record_rejected() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    conn
      .execute_batch(
        r#"
        INSERT INTO users (id, username) VALUES (1, 'ana');
        INSERT INTO flashcard_sets (id, owner_id, title, created_at) VALUES (1, 1, 'S', '2024-01-01T00:00:00Z');
        INSERT INTO flashcards (id, set_id, front, back, created_at) VALUES (1, 1, 'a', 'b', '2024-01-01T00:00:00Z');
        INSERT INTO study_records (user_id, flashcard_id) VALUES (1, 1);
        "#,
      )
      .unwrap();

    let dup = conn.execute("INSERT INTO study_records (user_id, flashcard_id) VALUES (1, 1)", []);
    assert!(dup.is_err());
  }
}
