//! Core domain types for the Mnemo progression engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - User identity (validated display names)
//! - Persisted progress and per-day activity records
//! - Session outcomes reported by training modules
//! - Journal records of completed sessions

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identity
// ============================================================================

/// Shortest accepted display name, in characters
pub const MIN_NAME_CHARS: usize = 2;

/// Longest accepted display name, in characters
pub const MAX_NAME_CHARS: usize = 20;

/// A validated display name; the sole key for a user's records
///
/// Deserializing goes through [`UserId::parse`], so journal and store
/// records cannot smuggle in an invalid name.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Trim and validate a display name (2 to 20 characters)
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if len < MIN_NAME_CHARS {
            return Err(Error::InvalidInput(format!(
                "name must be at least {} characters",
                MIN_NAME_CHARS
            )));
        }
        if len > MAX_NAME_CHARS {
            return Err(Error::InvalidInput(format!(
                "name must be {} characters or less",
                MAX_NAME_CHARS
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe key: lowercase hex of the UTF-8 bytes.
    ///
    /// Names differing only in case map to different keys even on
    /// case-insensitive filesystems.
    pub fn storage_key(&self) -> String {
        self.0.bytes().map(|b| format!("{:02x}", b)).collect()
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<UserId> for String {
    fn from(user: UserId) -> Self {
        user.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Training Modules
// ============================================================================

/// The exercise that produced a session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrainingModule {
    Numbers,
    Words,
    Faces,
    Images,
    Flashcards,
}

impl TrainingModule {
    pub const ALL: [TrainingModule; 5] = [
        TrainingModule::Numbers,
        TrainingModule::Words,
        TrainingModule::Faces,
        TrainingModule::Images,
        TrainingModule::Flashcards,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingModule::Numbers => "numbers",
            TrainingModule::Words => "words",
            TrainingModule::Faces => "faces",
            TrainingModule::Images => "images",
            TrainingModule::Flashcards => "flashcards",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|m| m.as_str() == needle)
    }
}

impl fmt::Display for TrainingModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Progress and Activity
// ============================================================================

/// Lifetime statistics for one user
///
/// `current_level` and `accuracy_average` are projections of the counters
/// and are only ever written by the reconciler.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub xp: u64,
    pub current_level: u32,
    pub streak_days: u32,
    pub personal_best_streak: u32,
    pub total_sessions: u64,
    pub total_correct_all_time: u64,
    pub total_questions_all_time: u64,
    pub accuracy_average: f64,
    pub last_active_date: Option<DateTime<Utc>>,
    /// Write counter for optimistic concurrency
    #[serde(default)]
    pub revision: u64,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            xp: 0,
            current_level: 1,
            streak_days: 0,
            personal_best_streak: 0,
            total_sessions: 0,
            total_correct_all_time: 0,
            total_questions_all_time: 0,
            accuracy_average: 0.0,
            last_active_date: None,
            revision: 0,
        }
    }
}

/// Aggregate of one user's sessions on one calendar day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub date: NaiveDate,
    pub score: u64,
    pub sessions_count: u32,
}

/// Increment applied to a day's activity entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivityDelta {
    pub score: u64,
    pub sessions: u32,
}

impl ActivityDelta {
    /// One completed session worth `points`
    pub fn session(points: u64) -> Self {
        Self {
            score: points,
            sessions: 1,
        }
    }
}

impl ActivityEntry {
    /// Fresh entry for `date` holding a single delta
    pub fn new(date: NaiveDate, delta: ActivityDelta) -> Self {
        Self {
            date,
            score: delta.score,
            sessions_count: delta.sessions,
        }
    }

    pub fn apply(&mut self, delta: ActivityDelta) {
        self.score = self.score.saturating_add(delta.score);
        self.sessions_count = self.sessions_count.saturating_add(delta.sessions);
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// What a training module reports when a session finishes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    pub points: u64,
    pub correct: u64,
    pub total: u64,
    pub module: Option<TrainingModule>,
}

impl SessionOutcome {
    /// Validate counts; `correct` may not exceed `total`
    pub fn new(points: u64, correct: u64, total: u64) -> Result<Self> {
        if correct > total {
            return Err(Error::InvalidInput(format!(
                "correct answers ({}) exceed questions asked ({})",
                correct, total
            )));
        }
        Ok(Self {
            points,
            correct,
            total,
            module: None,
        })
    }

    /// Validate signed counts coming from an untyped boundary
    pub fn from_signed(points: i64, correct: i64, total: i64) -> Result<Self> {
        let non_negative = |name: &str, v: i64| {
            u64::try_from(v)
                .map_err(|_| Error::InvalidInput(format!("{} must not be negative, got {}", name, v)))
        };
        Self::new(
            non_negative("points", points)?,
            non_negative("correct", correct)?,
            non_negative("total", total)?,
        )
    }

    /// Score a session with the module's own rules
    pub fn scored(module: TrainingModule, correct: u64, total: u64) -> Result<Self> {
        let mut outcome = Self::new(module.points(correct, total), correct, total)?;
        outcome.module = Some(module);
        Ok(outcome)
    }

    pub fn with_module(mut self, module: TrainingModule) -> Self {
        self.module = Some(module);
        self
    }
}

/// A completed session as written to the journal
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user: UserId,
    pub module: Option<TrainingModule>,
    pub points: u64,
    pub correct: u64,
    pub total: u64,
    pub completed_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user: &UserId, outcome: &SessionOutcome, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.clone(),
            module: outcome.module,
            points: outcome.points,
            correct: outcome.correct,
            total: outcome.total,
            completed_at,
        }
    }
}
