//! Progression engine: records finished sessions against a store.
//!
//! Recording a session:
//! 1. Load prior progress (missing means zeroed defaults)
//! 2. Reconcile it with the session outcome
//! 3. Write it back under the revision check, reloading on conflict
//! 4. Add the session to today's activity entry
//! 5. Append the session to the journal, if one is attached

use crate::config::{Config, DayBoundary};
use crate::history::{activity_window, DayActivity};
use crate::leveling::{calculate_level, LevelInfo};
use crate::progression::{calendar_date, reconcile_at};
use crate::store::ProgressStore;
use crate::wal::SessionSink;
use crate::{
    ActivityDelta, ActivityEntry, Error, Result, SessionOutcome, SessionRecord, UserId,
    UserProgress,
};
use chrono::{DateTime, NaiveDate, Utc};

/// Everything the caller needs to show after a session
#[derive(Clone, Debug)]
pub struct SessionReport {
    pub progress: UserProgress,
    pub level: LevelInfo,
    pub activity: ActivityEntry,
    pub leveled_up: bool,
    pub record: SessionRecord,
}

/// Session recording over an injected store
pub struct ProgressionEngine<S: ProgressStore> {
    store: S,
    journal: Option<Box<dyn SessionSink + Send>>,
    day_boundary: DayBoundary,
    max_conflict_retries: u32,
    activity_window_days: u32,
}

impl<S: ProgressStore> ProgressionEngine<S> {
    /// Engine with default settings and no journal
    pub fn new(store: S) -> Self {
        Self::from_config(store, &Config::default())
    }

    pub fn from_config(store: S, config: &Config) -> Self {
        Self {
            store,
            journal: None,
            day_boundary: config.progression.day_boundary,
            max_conflict_retries: config.progression.max_conflict_retries,
            activity_window_days: config.dashboard.activity_window_days,
        }
    }

    /// Journal every recorded session to `sink`
    pub fn with_journal(mut self, sink: impl SessionSink + Send + 'static) -> Self {
        self.journal = Some(Box::new(sink));
        self
    }

    pub fn with_day_boundary(mut self, boundary: DayBoundary) -> Self {
        self.day_boundary = boundary;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Today's calendar date under the configured day boundary
    pub fn today(&self) -> NaiveDate {
        calendar_date(Utc::now(), self.day_boundary)
    }

    /// Load a user's progress, creating a zeroed record on first sign-in
    pub fn sign_in(&self, user: &UserId) -> Result<UserProgress> {
        if let Some(progress) = self.store.get_progress(user)? {
            tracing::info!("Welcome back, {} (level {})", user, progress.current_level);
            return Ok(progress);
        }

        let fresh = UserProgress {
            revision: 1,
            ..UserProgress::default()
        };
        match self.store.upsert_progress(user, &fresh) {
            Ok(()) => {
                tracing::info!("Created progress for new user {}", user);
                Ok(fresh)
            }
            // Someone else created the record first
            Err(Error::Conflict { .. }) => self.store.get_progress(user)?.ok_or_else(|| {
                Error::StorageUnavailable(format!("progress for {} vanished", user))
            }),
            Err(e) => Err(e),
        }
    }

    /// Current progress, zeroed defaults if the user was never stored
    pub fn progress(&self, user: &UserId) -> Result<UserProgress> {
        Ok(self.store.get_progress(user)?.unwrap_or_default())
    }

    /// Record a session finished now
    pub fn record_session(
        &mut self,
        user: &UserId,
        outcome: &SessionOutcome,
    ) -> Result<SessionReport> {
        self.record_session_at(user, outcome, Utc::now())
    }

    /// Record a session finished at `now`
    ///
    /// Storage failures are returned as-is and never retried here; only
    /// revision conflicts are retried, by reloading and reconciling again.
    pub fn record_session_at(
        &mut self,
        user: &UserId,
        outcome: &SessionOutcome,
        now: DateTime<Utc>,
    ) -> Result<SessionReport> {
        let mut attempt = 0;
        let (prior, progress) = loop {
            let prior = self.store.get_progress(user)?.unwrap_or_default();
            let next = reconcile_at(&prior, outcome, now, self.day_boundary);

            match self.store.upsert_progress(user, &next) {
                Ok(()) => break (prior, next),
                Err(Error::Conflict { expected, found }) if attempt < self.max_conflict_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Progress for {} changed underneath us (expected revision {}, found {}), retry {}/{}",
                        user,
                        expected,
                        found,
                        attempt,
                        self.max_conflict_retries
                    );
                }
                Err(e) => {
                    tracing::error!("Failed to store progress for {}: {}", user, e);
                    return Err(e);
                }
            }
        };

        let today = calendar_date(now, self.day_boundary);
        let activity = self
            .store
            .upsert_activity_entry(user, today, ActivityDelta::session(outcome.points))
            .map_err(|e| {
                tracing::error!(
                    "Progress for {} stored but activity for {} was not: {}",
                    user,
                    today,
                    e
                );
                e
            })?;

        let record = SessionRecord::new(user, outcome, now);
        if let Some(journal) = self.journal.as_mut() {
            if let Err(e) = journal.append(&record) {
                // Progress and activity are already committed
                tracing::warn!("Failed to journal session {}: {}", record.id, e);
            }
        }

        let level = calculate_level(progress.xp);
        let leveled_up = level.current_level > calculate_level(prior.xp).current_level;

        tracing::info!(
            "Recorded session for {}: +{} XP (total {}, level {}), streak {}",
            user,
            outcome.points,
            progress.xp,
            level.current_level,
            progress.streak_days
        );

        Ok(SessionReport {
            progress,
            level,
            activity,
            leveled_up,
            record,
        })
    }

    /// Zero-filled activity for the configured window ending at `today`
    pub fn weekly_activity(&self, user: &UserId, today: NaiveDate) -> Result<Vec<DayActivity>> {
        activity_window(&self.store, user, today, self.activity_window_days)
    }

    /// Every active date, newest first
    pub fn active_days(&self, user: &UserId) -> Result<Vec<NaiveDate>> {
        self.store.active_days(user)
    }
}
