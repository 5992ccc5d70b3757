//! Session reconciliation.
//!
//! Folds one finished session into a user's lifetime statistics:
//! - XP accumulates and the level is recomputed from it
//! - Accuracy is recomputed from the lifetime counters
//! - The streak follows calendar-day continuity in the caller's time zone

use crate::config::DayBoundary;
use crate::leveling::calculate_level;
use crate::{SessionOutcome, UserProgress};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

/// Lifetime accuracy as a percentage, 0 when nothing was asked
pub fn accuracy(correct: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    }
}

/// Streak after a session on `today`
///
/// Same day keeps the streak, the following day extends it, anything else
/// (a gap or a date in the future) starts over at 1.
pub fn next_streak(prior_streak: u32, last_active: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_active {
        None => 1,
        Some(last) if last == today => prior_streak,
        Some(last) if today.pred_opt() == Some(last) => prior_streak.saturating_add(1),
        Some(_) => 1,
    }
}

/// Calendar date of `instant` under the given day boundary
pub fn calendar_date(instant: DateTime<Utc>, boundary: DayBoundary) -> NaiveDate {
    match boundary {
        DayBoundary::Local => instant.with_timezone(&Local).date_naive(),
        DayBoundary::Utc => instant.date_naive(),
    }
}

/// Produce the statistics that follow `prior` once `outcome` is recorded
///
/// Calendar dates are taken in the zone of `now`, for both today and the
/// previous activity instant.
pub fn reconcile<Tz: TimeZone>(
    prior: &UserProgress,
    outcome: &SessionOutcome,
    now: &DateTime<Tz>,
) -> UserProgress {
    let zone = now.timezone();
    let today = now.date_naive();
    let last_active = prior
        .last_active_date
        .map(|at| at.with_timezone(&zone).date_naive());

    let xp = prior.xp.saturating_add(outcome.points);
    let total_correct = prior.total_correct_all_time.saturating_add(outcome.correct);
    let total_questions = prior.total_questions_all_time.saturating_add(outcome.total);
    let streak = next_streak(prior.streak_days, last_active, today);

    let next = UserProgress {
        xp,
        current_level: calculate_level(xp).current_level,
        streak_days: streak,
        personal_best_streak: prior.personal_best_streak.max(streak),
        total_sessions: prior.total_sessions.saturating_add(1),
        total_correct_all_time: total_correct,
        total_questions_all_time: total_questions,
        accuracy_average: accuracy(total_correct, total_questions),
        last_active_date: Some(now.with_timezone(&Utc)),
        revision: prior.revision + 1,
    };

    tracing::debug!(
        "Reconciled session: xp {} -> {}, level {} -> {}, streak {} -> {}",
        prior.xp,
        next.xp,
        prior.current_level,
        next.current_level,
        prior.streak_days,
        next.streak_days
    );

    next
}

/// Reconcile against a UTC instant, resolving dates with `boundary`
pub fn reconcile_at(
    prior: &UserProgress,
    outcome: &SessionOutcome,
    now: DateTime<Utc>,
    boundary: DayBoundary,
) -> UserProgress {
    match boundary {
        DayBoundary::Local => reconcile(prior, outcome, &now.with_timezone(&Local)),
        DayBoundary::Utc => reconcile(prior, outcome, &now),
    }
}
