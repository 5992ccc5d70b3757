#![forbid(unsafe_code)]

//! Core domain model and business logic for Mnemo, a memory-training
//! progression tracker.
//!
//! This crate provides:
//! - Domain types (users, progress, activity, sessions)
//! - The tiered leveling curve
//! - Session reconciliation (XP, accuracy, streaks)
//! - Storage (trait, in-memory fake, locked JSON files)
//! - Session journal and CSV archive
//! - Scoring rules, accuracy ranks and coaching advice
//! - A spaced-repetition flashcard deck

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod leveling;
pub mod progression;
pub mod store;
pub mod state;
pub mod wal;
pub mod csv_rollup;
pub mod history;
pub mod scoring;
pub mod rank;
pub mod coach;
pub mod flashcards;
pub mod login;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, DayBoundary};
pub use leveling::{calculate_level, LevelInfo};
pub use progression::reconcile;
pub use store::{MemoryStore, ProgressStore};
pub use state::FileStore;
pub use wal::{JsonlSink, SessionSink};
pub use history::{load_recent_sessions, DayActivity};
pub use rank::AccuracyRank;
pub use coach::{advice_or_fallback, Coach, TipsCoach};
pub use flashcards::{Deck, Flashcard, ReviewGrade};
pub use engine::{ProgressionEngine, SessionReport};
