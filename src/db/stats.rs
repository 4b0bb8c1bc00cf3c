//! Progress counters and session aggregates for dashboards

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{CorrectStreak, ReviewState, StudySession};
use crate::error::{StudyError, StudyResult};

/// Longest window the history and activity views accept
pub const MAX_WINDOW_DAYS: i64 = 3660;

/// Per-set counters over a learner's review states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCounts {
    pub cards_mastered: i64,
    pub cards_studied: i64,
    pub cards_correct: i64,
}

impl SetCounts {
    pub fn from_states<'a>(states: impl IntoIterator<Item = &'a ReviewState>) -> Self {
        let mut counts = Self::default();
        for state in states {
            if state.is_mastered() {
                counts.cards_mastered += 1;
            }
            if state.has_been_studied() {
                counts.cards_studied += 1;
            }
            if state.correct_count > 0 {
                counts.cards_correct += 1;
            }
        }
        counts
    }
}

/// One day of session history for charts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDataPoint {
    pub date: String,
    pub cards_studied: i64,
    pub cards_correct: i64,
    /// Percentage, two decimals
    pub accuracy: f64,
    pub sessions_count: i64,
}

/// One day of the activity heatmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDataPoint {
    pub date: String,
    pub cards_studied: i64,
    /// 0 (nothing) to 4 (busiest day)
    pub intensity: u8,
}

#[derive(Default)]
struct DayTotals {
    cards_studied: i64,
    cards_correct: i64,
    sessions: i64,
}

fn totals_by_day(sessions: &[StudySession], start: NaiveDate, end: NaiveDate) -> BTreeMap<NaiveDate, DayTotals> {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for session in sessions.iter().filter(|s| s.completed_at.is_some()) {
        let day = session.started_at.date_naive();
        if day < start || day > end {
            continue;
        }
        let totals = days.entry(day).or_default();
        totals.cards_studied = totals.cards_studied.saturating_add(session.cards_studied);
        totals.cards_correct = totals.cards_correct.saturating_add(session.cards_correct);
        totals.sessions += 1;
    }
    days
}

/// First day of a window ending at `end`
fn window_start(end: NaiveDate, days: i64) -> StudyResult<NaiveDate> {
    if !(0..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(StudyError::invalid(format!(
            "days {} outside 0..={}",
            days, MAX_WINDOW_DAYS
        )));
    }
    end.checked_sub_signed(Duration::days(days))
        .ok_or_else(|| StudyError::invalid(format!("window of {} days before {} is out of range", days, end)))
}

fn each_day(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Daily history from `end - days` to `end`, zero-filled
pub fn session_history(sessions: &[StudySession], end: NaiveDate, days: i64) -> StudyResult<Vec<SessionDataPoint>> {
    let start = window_start(end, days)?;
    let totals = totals_by_day(sessions, start, end);

    Ok(each_day(start, end)
        .map(|day| {
            let t = totals.get(&day);
            let cards_studied = t.map_or(0, |t| t.cards_studied);
            let cards_correct = t.map_or(0, |t| t.cards_correct);
            let accuracy = if cards_studied > 0 {
                (cards_correct as f64 / cards_studied as f64 * 100.0 * 100.0).round() / 100.0
            } else {
                0.0
            };
            SessionDataPoint {
                date: day.format("%Y-%m-%d").to_string(),
                cards_studied,
                cards_correct,
                accuracy,
                sessions_count: t.map_or(0, |t| t.sessions),
            }
        })
        .collect())
}

/// Heatmap cells from `end - days` to `end`, intensity relative to the busiest day
pub fn activity(sessions: &[StudySession], end: NaiveDate, days: i64) -> StudyResult<Vec<ActivityDataPoint>> {
    let start = window_start(end, days)?;
    let totals = totals_by_day(sessions, start, end);
    let max_cards = totals.values().map(|t| t.cards_studied).max().unwrap_or(1);

    Ok(each_day(start, end)
        .map(|day| {
            let cards_studied = totals.get(&day).map_or(0, |t| t.cards_studied);
            let intensity = if cards_studied <= 0 || max_cards <= 0 {
                0
            } else {
                ((cards_studied as f64 / max_cards as f64 * 4.0) as i64 + 1).min(4) as u8
            };
            ActivityDataPoint {
                date: day.format("%Y-%m-%d").to_string(),
                cards_studied,
                intensity,
            }
        })
        .collect())
}

/// Consecutive correct answers across perfect sessions.
///
/// `all` drives the best-ever run; `recent` (oldest first) yields the current
/// run, which stops at the first session with a miss.
pub fn correct_streak(all: &[StudySession], recent: &[StudySession]) -> CorrectStreak {
    let mut running: i64 = 0;
    let mut max_streak = 0;
    for session in all.iter().filter(|s| s.cards_studied > 0) {
        if session.is_perfect() {
            running = running.saturating_add(session.cards_correct);
            max_streak = max_streak.max(running);
        } else {
            running = 0;
        }
    }

    let mut current_streak: i64 = 0;
    for session in recent.iter().filter(|s| s.cards_studied > 0) {
        if !session.is_perfect() {
            break;
        }
        current_streak = current_streak.saturating_add(session.cards_correct);
    }

    CorrectStreak {
        current_streak,
        max_streak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_review_state, get_states_for_set, insert_card, insert_set, insert_user, save_review_state};
    use crate::domain::{NewSet, SetStatus};
    use crate::testing::TestEnv;
    use chrono::{DateTime, TimeZone, Utc};

    fn session(started_at: DateTime<Utc>, studied: i64, correct: i64) -> StudySession {
        StudySession {
            id: 0,
            user_id: 1,
            set_id: 1,
            cards_studied: studied,
            cards_correct: correct,
            cards_incorrect: studied - correct,
            duration_minutes: 1,
            started_at,
            completed_at: Some(started_at),
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, d, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_history_zero_fills_window() {
        let sessions = vec![session(day(9), 10, 7), session(day(9), 5, 5), session(day(1), 3, 3)];
        let history = session_history(&sessions, day(10).date_naive(), 3).unwrap();

        assert_eq!(history.len(), 4);
        assert_eq!(history[0].date, "2026-06-07");
        assert_eq!(history[0].cards_studied, 0);
        assert_eq!(history[0].accuracy, 0.0);

        let ninth = &history[2];
        assert_eq!(ninth.date, "2026-06-09");
        assert_eq!(ninth.cards_studied, 15);
        assert_eq!(ninth.cards_correct, 12);
        assert_eq!(ninth.sessions_count, 2);
        assert!((ninth.accuracy - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_rounds_accuracy() {
        let history = session_history(&[session(day(5), 3, 2)], day(5).date_naive(), 0).unwrap();
        assert_eq!(history.len(), 1);
        assert!((history[0].accuracy - 66.67).abs() < 1e-9);
    }

    #[test]
    fn test_history_ignores_unfinished_sessions() {
        let mut open = session(day(5), 4, 4);
        open.completed_at = None;
        let history = session_history(&[open], day(5).date_naive(), 0).unwrap();
        assert_eq!(history[0].sessions_count, 0);
    }

    #[test]
    fn test_activity_intensity() {
        let sessions = vec![session(day(1), 20, 10), session(day(2), 10, 10), session(day(3), 1, 1)];
        let cells = activity(&sessions, day(4).date_naive(), 3).unwrap();

        let intensities: Vec<u8> = cells.iter().map(|c| c.intensity).collect();
        // 20/20 -> min(4, 5), 10/20 -> 3, 1/20 -> 1, empty -> 0
        assert_eq!(intensities, vec![4, 3, 1, 0]);
    }

    #[test]
    fn test_activity_without_sessions() {
        let cells = activity(&[], day(4).date_naive(), 2).unwrap();
        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|c| c.intensity == 0 && c.cards_studied == 0));
    }

    #[test]
    fn test_window_bounds() {
        let end = day(4).date_naive();
        assert!(matches!(session_history(&[], end, -1), Err(StudyError::InvalidInput(_))));
        assert!(matches!(activity(&[], end, i64::MAX), Err(StudyError::InvalidInput(_))));
        assert!(matches!(activity(&[], NaiveDate::MIN, 1), Err(StudyError::InvalidInput(_))));
        assert_eq!(activity(&[], end, MAX_WINDOW_DAYS).unwrap().len(), MAX_WINDOW_DAYS as usize + 1);
    }

    #[test]
    fn test_huge_sessions_saturate() {
        let sessions = vec![session(day(2), i64::MAX, i64::MAX), session(day(2), 5, 5)];
        let history = session_history(&sessions, day(2).date_naive(), 0).unwrap();
        assert_eq!(history[0].cards_studied, i64::MAX);
        assert_eq!(correct_streak(&sessions, &sessions).max_streak, i64::MAX);
    }

    #[test]
    fn test_correct_streak() {
        let all = vec![
            session(day(1), 5, 5),
            session(day(2), 4, 4),
            session(day(3), 3, 2),
            session(day(4), 0, 0),
            session(day(5), 2, 2),
        ];
        let streak = correct_streak(&all, &all);
        assert_eq!(streak.max_streak, 9);
        // current run starts at the oldest recent session and stops at the first miss
        assert_eq!(streak.current_streak, 9);

        let recent = &all[3..];
        assert_eq!(correct_streak(&all, recent).current_streak, 2);
    }

    #[test]
    fn test_set_counts() {
        let env = TestEnv::new().unwrap();
        let user = insert_user(&env.conn, "ana", false).unwrap();
        let new_set = NewSet {
            title: "Deck".into(),
            ..Default::default()
        };
        let set_id = insert_set(&env.conn, user.id, &new_set, SetStatus::Approved).unwrap();
        let cards: Vec<i64> = (0..4)
            .map(|i| insert_card(&env.conn, set_id, &format!("q{}", i), "a").unwrap())
            .collect();

        // mastered
        let mut s = create_review_state(&env.conn, user.id, cards[0]).unwrap();
        s.interval = 45;
        s.correct_count = 8;
        s.total_reviews = 9;
        s.incorrect_count = 1;
        save_review_state(&env.conn, &s).unwrap();

        // studied, only wrong answers
        let mut s = create_review_state(&env.conn, user.id, cards[1]).unwrap();
        s.total_reviews = 2;
        s.incorrect_count = 2;
        save_review_state(&env.conn, &s).unwrap();

        // seen but never answered
        create_review_state(&env.conn, user.id, cards[2]).unwrap();

        let states = get_states_for_set(&env.conn, user.id, set_id).unwrap();
        let counts = SetCounts::from_states(states.values());
        assert_eq!(
            counts,
            SetCounts {
                cards_mastered: 1,
                cards_studied: 2,
                cards_correct: 1,
            }
        );
    }
}
