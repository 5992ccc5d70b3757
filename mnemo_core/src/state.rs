//! File-backed progress store with per-user locking.
//!
//! Each user owns a directory under `<data_dir>/users/<key>/` holding
//! `progress.json`, `activity.json` and a `.lock` file. Every
//! read-modify-write happens under an exclusive lock on `.lock`, and files
//! are replaced atomically through a temp file in the same directory.

use crate::flashcards::Deck;
use crate::store::{check_revision, ProgressStore};
use crate::{ActivityDelta, ActivityEntry, Error, Result, UserId, UserProgress};
use chrono::{NaiveDate, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const PROGRESS_FILE: &str = "progress.json";
const ACTIVITY_FILE: &str = "activity.json";
const DECK_FILE: &str = "flashcards.json";
const LOCK_FILE: &str = ".lock";

/// Progress store rooted at a data directory
#[derive(Clone, Debug)]
pub struct FileStore {
    users_dir: PathBuf,
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

impl FileStore {
    /// Store under `<data_dir>/users`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            users_dir: data_dir.as_ref().join("users"),
        }
    }

    pub fn user_dir(&self, user: &UserId) -> PathBuf {
        self.users_dir.join(user.storage_key())
    }

    /// Run `f` on the user's directory while holding its lock file
    ///
    /// Shared locks on a user that has never been written return `None`
    /// without creating anything.
    fn with_user_lock<T>(
        &self,
        user: &UserId,
        mode: LockMode,
        f: impl FnOnce(&Path) -> Result<T>,
    ) -> Result<Option<T>> {
        let dir = self.user_dir(user);
        if matches!(mode, LockMode::Shared) && !dir.join(LOCK_FILE).exists() {
            return Ok(None);
        }
        std::fs::create_dir_all(&dir)?;

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;

        match mode {
            LockMode::Shared => lock.lock_shared()?,
            LockMode::Exclusive => lock.lock_exclusive()?,
        }

        let result = f(&dir);
        lock.unlock()?;
        result.map(Some)
    }
}

/// Read a JSON document, treating missing or corrupted files as absent
///
/// Under an exclusive lock a corrupted file is moved aside first so the
/// write that follows cannot destroy it.
fn read_json<T: DeserializeOwned>(path: &Path, mode: LockMode) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;

    match serde_json::from_str::<T>(&contents) {
        Ok(value) => {
            tracing::debug!("Loaded {:?}", path);
            Ok(Some(value))
        }
        Err(e) => match mode {
            LockMode::Shared => {
                tracing::warn!("Failed to parse {:?}: {}. Treating as empty.", path, e);
                Ok(None)
            }
            LockMode::Exclusive => {
                let kept = quarantine(path)?;
                tracing::error!(
                    "Failed to parse {:?}: {}. Moved it to {:?} and starting fresh.",
                    path,
                    e,
                    kept
                );
                Ok(None)
            }
        },
    }
}

/// Rename `path` to `<name>.corrupt-<timestamp>` next to it
fn quarantine(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let target = path.with_file_name(format!("{}.corrupt-{}", name, stamp));
    std::fs::rename(path, &target)?;
    Ok(target)
}

/// Atomically replace `path` with the JSON encoding of `value`
///
/// 1. Write to a temp file in the same directory
/// 2. Sync it to disk
/// 3. Rename it over the original
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
    })?;
    let temp = NamedTempFile::new_in(parent)?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string(value)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Saved {:?}", path);
    Ok(())
}

fn read_activity(dir: &Path, mode: LockMode) -> Result<BTreeMap<NaiveDate, ActivityEntry>> {
    let entries: Vec<ActivityEntry> =
        read_json(&dir.join(ACTIVITY_FILE), mode)?.unwrap_or_default();
    Ok(entries.into_iter().map(|e| (e.date, e)).collect())
}

impl ProgressStore for FileStore {
    fn get_progress(&self, user: &UserId) -> Result<Option<UserProgress>> {
        self.with_user_lock(user, LockMode::Shared, |dir| {
            read_json::<UserProgress>(&dir.join(PROGRESS_FILE), LockMode::Shared)
        })
        .map(Option::flatten)
        .map_err(Error::into_storage)
    }

    fn upsert_progress(&self, user: &UserId, progress: &UserProgress) -> Result<()> {
        self.with_user_lock(user, LockMode::Exclusive, |dir| {
            let path = dir.join(PROGRESS_FILE);
            let stored = read_json::<UserProgress>(&path, LockMode::Exclusive)?;
            check_revision(stored.as_ref(), progress)?;
            write_json_atomic(&path, progress)
        })
        .map(|_| ())
        .map_err(Error::into_storage)?;

        tracing::debug!("Stored progress for {} at revision {}", user, progress.revision);
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
        self.with_user_lock(user, LockMode::Shared, |dir| {
            let days = read_activity(dir, LockMode::Shared)?;
            Ok(days.range(from..=to).map(|(_, e)| e.clone()).collect())
        })
        .map(Option::unwrap_or_default)
        .map_err(Error::into_storage)
    }

    fn upsert_activity_entry(
        &self,
        user: &UserId,
        date: NaiveDate,
        delta: ActivityDelta,
    ) -> Result<ActivityEntry> {
        self.with_user_lock(user, LockMode::Exclusive, |dir| {
            let mut days = read_activity(dir, LockMode::Exclusive)?;
            let entry = days
                .entry(date)
                .and_modify(|e| e.apply(delta))
                .or_insert_with(|| ActivityEntry::new(date, delta))
                .clone();
            let ordered: Vec<&ActivityEntry> = days.values().collect();
            write_json_atomic(&dir.join(ACTIVITY_FILE), &ordered)?;
            Ok(entry)
        })
        .map_err(Error::into_storage)?
        .ok_or_else(|| Error::StorageUnavailable("activity write produced no entry".into()))
    }

    fn active_days(&self, user: &UserId) -> Result<Vec<NaiveDate>> {
        self.with_user_lock(user, LockMode::Shared, |dir| {
            Ok(read_activity(dir, LockMode::Shared)?.keys().rev().copied().collect())
        })
        .map(Option::unwrap_or_default)
        .map_err(Error::into_storage)
    }
}

impl FileStore {
    /// The user's flashcard deck, empty if none was saved yet
    pub fn load_deck(&self, user: &UserId) -> Result<Deck> {
        self.with_user_lock(user, LockMode::Shared, |dir| {
            Ok(read_json::<Deck>(&dir.join(DECK_FILE), LockMode::Shared)?.unwrap_or_default())
        })
        .map(Option::unwrap_or_default)
        .map_err(Error::into_storage)
    }

    /// Load, change and save the deck under the user's exclusive lock
    ///
    /// Nothing is written when `f` fails.
    pub fn update_deck<T>(
        &self,
        user: &UserId,
        f: impl FnOnce(&mut Deck) -> Result<T>,
    ) -> Result<T> {
        self.with_user_lock(user, LockMode::Exclusive, |dir| {
            let path = dir.join(DECK_FILE);
            let mut deck = read_json::<Deck>(&path, LockMode::Exclusive)?.unwrap_or_default();
            let value = f(&mut deck)?;
            write_json_atomic(&path, &deck)?;
            Ok(value)
        })
        .map_err(Error::into_storage)?
        .ok_or_else(|| Error::StorageUnavailable("deck write produced no result".into()))
    }
}
