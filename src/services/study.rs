//! Study flow: the caller side of the scheduler.
//!
//! `StudyService` owns nothing global. It receives the database handle and
//! the resolved [`Config`] at construction and performs every operation
//! against those.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{Config, STREAK_LOOKBACK_SESSIONS};
use crate::db::{self, ActivityDataPoint, DbPool, SessionDataPoint, SetCounts};
use crate::domain::card::validate_title;
use crate::domain::{
  CorrectStreak, Flashcard, FlashcardSet, Leaderboard, NewSet, Quality, ReviewState,
  SessionCompletion, SetStatus, SetUpdate, StudySession, User,
};
use crate::error::{StudyError, StudyResult};
use crate::srs;

/// A card together with the learner's scheduling state for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardWithProgress {
  pub card: Flashcard,
  pub ease_factor: f64,
  pub interval: i64,
  pub next_review_date: Option<DateTime<Utc>>,
  pub total_reviews: i64,
  pub correct_count: i64,
  pub incorrect_count: i64,
}

impl CardWithProgress {
  fn new(card: Flashcard, state: &ReviewState) -> Self {
    Self {
      card,
      ease_factor: state.ease_factor,
      interval: state.interval,
      next_review_date: state.next_review_date,
      total_reviews: state.total_reviews,
      correct_count: state.correct_count,
      incorrect_count: state.incorrect_count,
    }
  }
}

/// Result of grading one answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOutcome {
  pub ease_factor: f64,
  pub interval: i64,
  pub repetitions: i64,
  pub next_review_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyProgress {
  pub total_cards: i64,
  pub cards_to_review: i64,
  pub cards_mastered: i64,
  pub cards_studied: i64,
  pub cards_correct: i64,
  pub daily_goal: i64,
  pub daily_progress: i64,
  pub streak_days: i64,
}

#[derive(Clone)]
pub struct StudyService {
  pool: DbPool,
  config: Config,
}

impl StudyService {
  pub fn new(pool: DbPool, config: Config) -> Self {
    Self { pool, config }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  // ==================== Deck collaborator ====================

  pub fn add_user(&self, username: &str, is_admin: bool) -> StudyResult<User> {
    if username.trim().is_empty() {
      return Err(StudyError::invalid("username must not be empty"));
    }
    let conn = db::try_lock(&self.pool)?;
    let user = db::insert_user(&conn, username.trim(), is_admin)?;
    tracing::info!("Added user {} (admin: {})", user.username, user.is_admin);
    Ok(user)
  }

  pub fn create_set(&self, user_id: i64, new_set: &NewSet) -> StudyResult<FlashcardSet> {
    validate_title(&new_set.title)?;
    let conn = db::try_lock(&self.pool)?;
    let owner = load_user(&conn, user_id)?;
    let status = SetStatus::for_new_set(&owner);
    let id = db::insert_set(&conn, owner.id, new_set, status)?;
    tracing::info!("User {} created set {} ({})", owner.id, id, status.as_str());
    load_set(&conn, id)
  }

  pub fn update_set(&self, user_id: i64, set_id: i64, update: &SetUpdate) -> StudyResult<FlashcardSet> {
    update.validate()?;
    let conn = db::try_lock(&self.pool)?;
    let user = load_user(&conn, user_id)?;
    load_set(&conn, set_id)?.check_write_access(&user)?;
    db::update_set(&conn, set_id, update)?;
    load_set(&conn, set_id)
  }

  pub fn add_card(&self, user_id: i64, set_id: i64, front: &str, back: &str) -> StudyResult<Flashcard> {
    if front.trim().is_empty() || back.trim().is_empty() {
      return Err(StudyError::invalid("card front and back must not be empty"));
    }
    let conn = db::try_lock(&self.pool)?;
    let user = load_user(&conn, user_id)?;
    load_set(&conn, set_id)?.check_write_access(&user)?;
    let id = db::insert_card(&conn, set_id, front, back)?;
    db::get_card(&conn, id)?.ok_or_else(|| StudyError::not_found(format!("flashcard {}", id)))
  }

  // ==================== Scheduling ====================

  /// Cards to present now, with their state. Falls back to the whole set
  /// when nothing is due. States are created for every card returned.
  pub fn due_cards(&self, user_id: i64, set_id: i64) -> StudyResult<Vec<CardWithProgress>> {
    let now = Utc::now();
    let mut conn = db::try_lock(&self.pool)?;
    let user = load_user(&conn, user_id)?;
    load_set(&conn, set_id)?.check_study_access(&user)?;

    let cards = db::get_set_cards(&conn, set_id)?;
    let states = db::get_states_for_set(&conn, user_id, set_id)?;
    let selected = srs::due_or_all(&cards, &states, now);

    let tx = conn.transaction()?;
    let mut result = Vec::with_capacity(selected.len());
    for card in selected {
      let state = match states.get(&card.id) {
        Some(state) => state.clone(),
        None => db::create_review_state(&tx, user_id, card.id)?,
      };
      result.push(CardWithProgress::new(card, &state));
    }
    tx.commit()?;

    tracing::debug!(
      "User {} set {}: {} of {} cards to study",
      user_id,
      set_id,
      result.len(),
      cards.len()
    );
    Ok(result)
  }

  /// Grade an answer, creating the card's state if this is the first encounter.
  pub fn submit_answer(&self, user_id: i64, flashcard_id: i64, quality: i64) -> StudyResult<AnswerOutcome> {
    self.review(user_id, flashcard_id, quality, true)
  }

  /// Grade an answer for a card the learner already has state for.
  /// A missing state is reported as `NotFound` instead of being created.
  pub fn review_existing(&self, user_id: i64, flashcard_id: i64, quality: i64) -> StudyResult<AnswerOutcome> {
    self.review(user_id, flashcard_id, quality, false)
  }

  fn review(&self, user_id: i64, flashcard_id: i64, quality: i64, create_missing: bool) -> StudyResult<AnswerOutcome> {
    // Reject bad ratings before touching storage
    let quality = Quality::new(quality)?;
    let now = Utc::now();

    let mut conn = db::try_lock(&self.pool)?;
    let user = load_user(&conn, user_id)?;
    let card = db::get_card(&conn, flashcard_id)?
      .ok_or_else(|| StudyError::not_found(format!("flashcard {}", flashcard_id)))?;
    if let Some(set) = db::get_set(&conn, card.set_id)? {
      set.check_not_pending(&user)?;
    }

    let tx = conn.transaction()?;
    let state = if create_missing {
      db::get_or_create_review_state(&tx, user_id, flashcard_id)?
    } else {
      db::get_review_state(&tx, user_id, flashcard_id)?.ok_or_else(|| {
        StudyError::not_found(format!("review state for user {} card {}", user_id, flashcard_id))
      })?
    };
    let updated = srs::apply_review(&state, quality, now);
    db::save_review_state(&tx, &updated)?;
    tx.commit()?;

    tracing::info!(
      "User {} card {} graded {}: interval {}d, ease {:.2}",
      user_id,
      flashcard_id,
      quality.value(),
      updated.interval,
      updated.ease_factor
    );

    Ok(AnswerOutcome {
      ease_factor: updated.ease_factor,
      interval: updated.interval,
      repetitions: updated.repetitions,
      next_review_date: updated.next_review_date,
    })
  }

  /// Return every state the user has in the set to its initial values.
  pub fn reset_progress(&self, user_id: i64, set_id: i64) -> StudyResult<usize> {
    let mut conn = db::try_lock(&self.pool)?;
    let user = load_user(&conn, user_id)?;
    load_set(&conn, set_id)?.check_read_access(&user)?;

    let tx = conn.transaction()?;
    let cards_reset = db::reset_all(&tx, user_id, set_id)?;
    tx.commit()?;

    tracing::info!("User {} reset {} cards in set {}", user_id, cards_reset, set_id);
    Ok(cards_reset)
  }

  pub fn progress(&self, user_id: i64, set_id: i64) -> StudyResult<StudyProgress> {
    let now = Utc::now();
    let conn = db::try_lock(&self.pool)?;
    load_set(&conn, set_id)?;

    let cards = db::get_set_cards(&conn, set_id)?;
    let states = db::get_states_for_set(&conn, user_id, set_id)?;
    let counts = SetCounts::from_states(states.values());

    let midnight = now
      .date_naive()
      .and_hms_opt(0, 0, 0)
      .map(|t| t.and_utc())
      .unwrap_or(now);
    let daily_progress = db::get_cards_studied_since(&conn, user_id, set_id, midnight)?;
    let streak_days = db::get_leaderboard(&conn, user_id)?.map_or(0, |b| b.streak_days);

    Ok(StudyProgress {
      total_cards: cards.len() as i64,
      cards_to_review: srs::count_due(&cards, &states, now) as i64,
      cards_mastered: counts.cards_mastered,
      cards_studied: counts.cards_studied,
      cards_correct: counts.cards_correct,
      daily_goal: self.config.daily_goal,
      daily_progress,
      streak_days,
    })
  }

  // ==================== Sessions ====================

  pub fn start_session(&self, user_id: i64, set_id: i64) -> StudyResult<StudySession> {
    let conn = db::try_lock(&self.pool)?;
    let user = load_user(&conn, user_id)?;
    load_set(&conn, set_id)?.check_not_pending(&user)?;
    let session = db::insert_session(&conn, user_id, set_id, Utc::now())?;
    tracing::info!("User {} started session {} on set {}", user_id, session.id, set_id);
    Ok(session)
  }

  /// Record a finished session and fold it into the user's leaderboard row.
  pub fn complete_session(
    &self,
    user_id: i64,
    session_id: i64,
    completion: &SessionCompletion,
  ) -> StudyResult<StudySession> {
    completion.validate()?;
    let now = Utc::now();

    let mut conn = db::try_lock(&self.pool)?;
    db::get_session(&conn, user_id, session_id)?
      .ok_or_else(|| StudyError::not_found(format!("study session {}", session_id)))?;

    let tx = conn.transaction()?;
    db::save_session_completion(&tx, session_id, completion, now)?;
    let mut board = db::get_leaderboard(&tx, user_id)?.unwrap_or_else(|| Leaderboard::new(user_id));
    board.record_session(completion, now)?;
    db::save_leaderboard(&tx, &board)?;
    tx.commit()?;

    tracing::info!(
      "User {} completed session {}: {}/{} correct, streak {}d",
      user_id,
      session_id,
      completion.cards_correct,
      completion.cards_studied,
      board.streak_days
    );

    db::get_session(&conn, user_id, session_id)?
      .ok_or_else(|| StudyError::not_found(format!("study session {}", session_id)))
  }

  pub fn sessions(&self, user_id: i64, set_id: Option<i64>) -> StudyResult<Vec<StudySession>> {
    let conn = db::try_lock(&self.pool)?;
    Ok(db::get_completed_sessions(&conn, user_id, set_id)?)
  }

  pub fn last_studied(&self, user_id: i64) -> StudyResult<BTreeMap<i64, DateTime<Utc>>> {
    let conn = db::try_lock(&self.pool)?;
    Ok(db::get_last_studied(&conn, user_id)?)
  }

  pub fn correct_streak(&self, user_id: i64) -> StudyResult<CorrectStreak> {
    let conn = db::try_lock(&self.pool)?;
    let all = db::get_completed_sessions(&conn, user_id, None)?;
    let recent = db::get_recent_completed_sessions(&conn, user_id, STREAK_LOOKBACK_SESSIONS)?;
    Ok(db::correct_streak(&all, &recent))
  }

  pub fn session_history(&self, user_id: i64, days: i64) -> StudyResult<Vec<SessionDataPoint>> {
    let conn = db::try_lock(&self.pool)?;
    let sessions = db::get_completed_sessions(&conn, user_id, None)?;
    db::session_history(&sessions, Utc::now().date_naive(), days)
  }

  pub fn activity(&self, user_id: i64, days: i64) -> StudyResult<Vec<ActivityDataPoint>> {
    let conn = db::try_lock(&self.pool)?;
    let sessions = db::get_completed_sessions(&conn, user_id, None)?;
    db::activity(&sessions, Utc::now().date_naive(), days)
  }
}

fn load_user(conn: &rusqlite::Connection, user_id: i64) -> StudyResult<User> {
  db::get_user(conn, user_id)?.ok_or_else(|| StudyError::not_found(format!("user {}", user_id)))
}

fn load_set(conn: &rusqlite::Connection, set_id: i64) -> StudyResult<FlashcardSet> {
  db::get_set(conn, set_id)?.ok_or_else(|| StudyError::not_found(format!("flashcard set {}", set_id)))
}
