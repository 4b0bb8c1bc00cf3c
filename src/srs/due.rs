//! Due-card selection for a deck.
//!
//! A card is due when the learner has never seen it, when it has never been
//! scheduled, or when its next review date has passed. Study sessions use
//! [`due_or_all`]: if nothing is due the whole deck is offered so the learner
//! can study ahead instead of being blocked.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::{Flashcard, ReviewState};

/// Shared due predicate. `None` means no state exists yet.
pub fn is_due(state: Option<&ReviewState>, now: DateTime<Utc>) -> bool {
  state.map_or(true, |s| s.is_due(now))
}

/// Cards that should be reviewed now, in input order.
pub fn select_due(
  cards: &[Flashcard],
  states: &HashMap<i64, ReviewState>,
  now: DateTime<Utc>,
) -> Vec<Flashcard> {
  cards
    .iter()
    .filter(|card| is_due(states.get(&card.id), now))
    .cloned()
    .collect()
}

/// Due cards, or every card when none are due.
pub fn due_or_all(
  cards: &[Flashcard],
  states: &HashMap<i64, ReviewState>,
  now: DateTime<Utc>,
) -> Vec<Flashcard> {
  let due = select_due(cards, states, now);
  if due.is_empty() {
    tracing::debug!("No cards due out of {}, offering whole deck", cards.len());
    cards.to_vec()
  } else {
    due
  }
}

/// Number of due cards without materializing them
pub fn count_due(cards: &[Flashcard], states: &HashMap<i64, ReviewState>, now: DateTime<Utc>) -> usize {
  cards
    .iter()
    .filter(|card| is_due(states.get(&card.id), now))
    .count()
}
