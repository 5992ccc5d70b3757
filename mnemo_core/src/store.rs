//! Storage seam for progress and activity records.
//!
//! The engine only talks to a [`ProgressStore`]; [`MemoryStore`] backs
//! tests and [`crate::state::FileStore`] backs the CLI.

use crate::{ActivityDelta, ActivityEntry, Error, Result, UserId, UserProgress};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Persistence contract for the progression engine
pub trait ProgressStore {
    /// `Ok(None)` when the user has never been stored
    fn get_progress(&self, user: &UserId) -> Result<Option<UserProgress>>;

    /// Write `progress` if the stored revision is exactly one behind it
    ///
    /// Fails with [`Error::Conflict`] otherwise; an absent record counts
    /// as revision 0.
    fn upsert_progress(&self, user: &UserId, progress: &UserProgress) -> Result<()>;

    /// Activity entries with `from <= date <= to`, oldest first
    fn get_activity(&self, user: &UserId, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<ActivityEntry>>;

    /// Add `delta` to the entry for `date`, creating it if needed
    fn upsert_activity_entry(
        &self,
        user: &UserId,
        date: NaiveDate,
        delta: ActivityDelta,
    ) -> Result<ActivityEntry>;

    /// Every date with activity, newest first
    fn active_days(&self, user: &UserId) -> Result<Vec<NaiveDate>>;
}

/// Optimistic concurrency check shared by the store implementations
pub fn check_revision(stored: Option<&UserProgress>, incoming: &UserProgress) -> Result<()> {
    if incoming.revision == 0 {
        return Err(Error::InvalidInput(
            "progress written without a revision".into(),
        ));
    }
    let expected = incoming.revision - 1;
    let found = stored.map_or(0, |p| p.revision);
    if found != expected {
        return Err(Error::Conflict { expected, found });
    }
    Ok(())
}

#[derive(Default)]
struct MemoryInner {
    progress: HashMap<UserId, UserProgress>,
    activity: HashMap<UserId, BTreeMap<NaiveDate, ActivityEntry>>,
}

/// In-process store with switchable write failures
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    fail_progress_writes: AtomicBool,
    fail_activity_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every progress upsert fail with `StorageUnavailable`
    pub fn fail_progress_writes(&self, fail: bool) {
        self.fail_progress_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every activity upsert fail with `StorageUnavailable`
    pub fn fail_activity_writes(&self, fail: bool) {
        self.fail_activity_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| Error::StorageUnavailable("memory store lock poisoned".into()))
    }
}

impl ProgressStore for MemoryStore {
    fn get_progress(&self, user: &UserId) -> Result<Option<UserProgress>> {
        Ok(self.lock()?.progress.get(user).cloned())
    }

    fn upsert_progress(&self, user: &UserId, progress: &UserProgress) -> Result<()> {
        if self.fail_progress_writes.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable("progress write refused".into()));
        }
        let mut inner = self.lock()?;
        check_revision(inner.progress.get(user), progress)?;
        inner.progress.insert(user.clone(), progress.clone());
        Ok(())
    }

    fn get_activity(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ActivityEntry>> {
        if from > to {
            return Ok(Vec::new());
        }
        let inner = self.lock()?;
        Ok(inner
            .activity
            .get(user)
            .map(|days| days.range(from..=to).map(|(_, e)| e.clone()).collect())
            .unwrap_or_default())
    }

    fn upsert_activity_entry(
        &self,
        user: &UserId,
        date: NaiveDate,
        delta: ActivityDelta,
    ) -> Result<ActivityEntry> {
        if self.fail_activity_writes.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable("activity write refused".into()));
        }
        let mut inner = self.lock()?;
        let entry = inner
            .activity
            .entry(user.clone())
            .or_default()
            .entry(date)
            .and_modify(|e| e.apply(delta))
            .or_insert_with(|| ActivityEntry::new(date, delta));
        Ok(entry.clone())
    }

    fn active_days(&self, user: &UserId) -> Result<Vec<NaiveDate>> {
        let inner = self.lock()?;
        Ok(inner
            .activity
            .get(user)
            .map(|days| days.keys().rev().copied().collect())
            .unwrap_or_default())
    }
}
