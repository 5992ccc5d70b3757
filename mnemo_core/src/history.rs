//! Session and activity history views.
//!
//! - Recent sessions merged from the journal and the CSV archive
//! - A zero-filled per-day activity window for the dashboard chart

use crate::csv_rollup::CsvRow;
use crate::store::ProgressStore;
use crate::{Error, Result, SessionRecord, TrainingModule, UserId};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

impl TryFrom<CsvRow> for SessionRecord {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::Other(format!("Invalid UUID: {}", e)))?;

        let completed_at = DateTime::parse_from_rfc3339(&row.completed_at)
            .map_err(|e| Error::Other(format!("Invalid date: {}", e)))?
            .with_timezone(&Utc);

        let module = match row.module.as_deref() {
            None | Some("") => None,
            Some(name) => Some(
                TrainingModule::parse(name)
                    .ok_or_else(|| Error::Other(format!("Unknown module: {}", name)))?,
            ),
        };

        Ok(SessionRecord {
            id,
            user: UserId::parse(&row.user)?,
            module,
            points: row.points,
            correct: row.correct,
            total: row.total,
            completed_at,
        })
    }
}

/// Longest activity window the dashboard will draw
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Load sessions from the last `days` days from both journal and CSV
///
/// Returns sessions newest first, deduplicated by id. Negative or
/// unrepresentable look-backs are rejected.
pub fn load_recent_sessions(
    journal_path: &Path,
    csv_path: &Path,
    days: i64,
) -> Result<Vec<SessionRecord>> {
    if days < 0 {
        return Err(Error::InvalidInput(format!(
            "history window must not be negative, got {} days",
            days
        )));
    }
    let cutoff = Duration::try_days(days)
        .and_then(|span| Utc::now().checked_sub_signed(span))
        .ok_or_else(|| {
            Error::InvalidInput(format!("history window of {} days is out of range", days))
        })?;
    let mut sessions = Vec::new();
    let mut seen_ids = HashSet::new();

    if journal_path.exists() {
        for record in crate::wal::read_sessions(journal_path)? {
            if record.completed_at >= cutoff && seen_ids.insert(record.id) {
                sessions.push(record);
            }
        }
        tracing::debug!("Loaded {} sessions from journal", sessions.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for record in load_sessions_from_csv(csv_path)? {
            if record.completed_at >= cutoff && seen_ids.insert(record.id) {
                sessions.push(record);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} sessions from CSV", csv_count);
    }

    sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    tracing::info!(
        "Loaded {} total sessions from last {} days",
        sessions.len(),
        days
    );

    Ok(sessions)
}

/// Load all sessions from a CSV archive, skipping unreadable rows
fn load_sessions_from_csv(path: &Path) -> Result<Vec<SessionRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut sessions = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match SessionRecord::try_from(row) {
                Ok(record) => sessions.push(record),
                Err(e) => tracing::warn!("Failed to parse CSV row: {}", e),
            },
            Err(e) => tracing::warn!("Failed to deserialize CSV row: {}", e),
        }
    }

    Ok(sessions)
}

/// One bar of the dashboard activity chart
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub score: u64,
    pub sessions_count: u32,
}

/// The `days` calendar days ending at `today`, oldest first
///
/// Days without an activity entry are reported with zero score. A window
/// of 0 days is widened to 1; more than [`MAX_WINDOW_DAYS`] is rejected.
pub fn activity_window<S: ProgressStore + ?Sized>(
    store: &S,
    user: &UserId,
    today: NaiveDate,
    days: u32,
) -> Result<Vec<DayActivity>> {
    if days > MAX_WINDOW_DAYS {
        return Err(Error::InvalidInput(format!(
            "activity window must be at most {} days, got {}",
            MAX_WINDOW_DAYS, days
        )));
    }
    let days = days.max(1);
    let from = today
        .checked_sub_signed(Duration::days(i64::from(days) - 1))
        .ok_or_else(|| {
            Error::InvalidInput(format!("activity window before {} is out of range", today))
        })?;
    let entries = store.get_activity(user, from, today)?;

    let window = from
        .iter_days()
        .take(days as usize)
        .map(|date| {
            let found = entries.iter().find(|e| e.date == date);
            DayActivity {
                date,
                weekday: date.weekday(),
                score: found.map_or(0, |e| e.score),
                sessions_count: found.map_or(0, |e| e.sessions_count),
            }
        })
        .collect();

    Ok(window)
}
