//! Flashcard deck with spaced-repetition review.
//!
//! Each card keeps an SM-2 style schedule: a recalled card (quality 3 or
//! more) has its interval multiplied by its ease factor, a forgotten card
//! drops back to an interval of one. Mastery grows by `quality * 5` per
//! review and is capped at 100.
//!
//! Decks are stored per user by [`crate::FileStore`] and can be exported
//! to or imported from a plain JSON array of cards.

use crate::{Error, Result, SessionOutcome, TrainingModule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MAX_MASTERY: u8 = 100;

/// Lowest quality that counts as recalled
const RECALL_THRESHOLD: u8 = 3;

const ID_LEN: usize = 8;

// ============================================================================
// Grades
// ============================================================================

/// How well a card was remembered
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewGrade {
    Again,
    Hard,
    Good,
    Easy,
}

impl ReviewGrade {
    pub const ALL: [ReviewGrade; 4] = [
        ReviewGrade::Again,
        ReviewGrade::Hard,
        ReviewGrade::Good,
        ReviewGrade::Easy,
    ];

    /// Review quality on the 0-5 SM-2 scale
    pub fn quality(self) -> u8 {
        match self {
            ReviewGrade::Again => 1,
            ReviewGrade::Hard => 2,
            ReviewGrade::Good => 4,
            ReviewGrade::Easy => 5,
        }
    }

    pub fn is_recalled(self) -> bool {
        self.quality() >= RECALL_THRESHOLD
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewGrade::Again => "again",
            ReviewGrade::Hard => "hard",
            ReviewGrade::Good => "good",
            ReviewGrade::Easy => "easy",
        }
    }

    /// Parse a grade name or its quality number
    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == needle || g.quality().to_string() == needle)
    }
}

// ============================================================================
// Cards
// ============================================================================

/// One card and its review schedule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub front: String,
    pub back: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Stored as epoch milliseconds so exported decks stay portable
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_reviewed: Option<DateTime<Utc>>,
    /// Days until the card is due again
    pub interval: f64,
    pub ease_factor: f64,
    pub mastery: u8,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Flashcard {
    /// A fresh, never reviewed card
    pub fn new(id: String, front: &str, back: &str, category: &str) -> Result<Self> {
        let front = front.trim();
        let back = back.trim();
        if front.is_empty() || back.is_empty() {
            return Err(Error::InvalidInput(
                "a card needs both a front and a back".into(),
            ));
        }
        let category = match category.trim() {
            "" => DEFAULT_CATEGORY,
            c => c,
        };

        Ok(Self {
            id,
            front: front.to_string(),
            back: back.to_string(),
            category: category.to_string(),
            last_reviewed: None,
            interval: 1.0,
            ease_factor: DEFAULT_EASE_FACTOR,
            mastery: 0,
        })
    }

    /// Apply one review at `at`
    pub fn review(&mut self, grade: ReviewGrade, at: DateTime<Utc>) {
        self.interval = if grade.is_recalled() {
            self.interval * self.ease_factor
        } else {
            1.0
        };
        self.last_reviewed = Some(at);
        self.mastery = self
            .mastery
            .saturating_add(grade.quality() * 5)
            .min(MAX_MASTERY);
    }

    /// Whether an imported card can be scheduled
    fn is_usable(&self) -> bool {
        !self.id.trim().is_empty()
            && !self.front.trim().is_empty()
            && !self.back.trim().is_empty()
            && self.interval.is_finite()
            && self.interval > 0.0
            && self.ease_factor.is_finite()
            && self.ease_factor > 0.0
    }
}

// ============================================================================
// Deck
// ============================================================================

/// A user's cards, in study order
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Deck {
    cards: Vec<Flashcard>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    fn fresh_id(&self) -> String {
        loop {
            let mut id = Uuid::new_v4().simple().to_string();
            id.truncate(ID_LEN);
            if !self.cards.iter().any(|c| c.id == id) {
                return id;
            }
        }
    }

    /// Append a new card and return it
    pub fn add(&mut self, front: &str, back: &str, category: &str) -> Result<&Flashcard> {
        let card = Flashcard::new(self.fresh_id(), front, back, category)?;
        self.cards.push(card);
        let added = self.cards.len() - 1;
        Ok(&self.cards[added])
    }

    /// Delete a card; returns whether it existed
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.cards.len();
        self.cards.retain(|c| c.id != id);
        self.cards.len() != before
    }

    /// Add cards from `other` whose ids are not in this deck yet
    ///
    /// Unusable cards are logged and skipped. Returns how many were added.
    pub fn merge(&mut self, other: Deck) -> usize {
        let mut seen: HashSet<String> = self.cards.iter().map(|c| c.id.clone()).collect();
        let mut added = 0;

        for mut card in other.cards {
            if !card.is_usable() {
                tracing::warn!("Skipping unusable card {:?}", card.id);
                continue;
            }
            if !seen.insert(card.id.clone()) {
                tracing::debug!("Card {} already in deck", card.id);
                continue;
            }
            card.mastery = card.mastery.min(MAX_MASTERY);
            self.cards.push(card);
            added += 1;
        }

        added
    }

    /// Review every card once, in deck order, and score the run
    ///
    /// `grades` must hold one grade per card. The session awards one XP
    /// per card; cards graded good or easy count as correct.
    pub fn study(&mut self, grades: &[ReviewGrade], at: DateTime<Utc>) -> Result<SessionOutcome> {
        if self.cards.is_empty() {
            return Err(Error::InvalidInput("the deck has no cards to study".into()));
        }
        if grades.len() != self.cards.len() {
            return Err(Error::InvalidInput(format!(
                "expected {} grades (one per card), got {}",
                self.cards.len(),
                grades.len()
            )));
        }

        for (card, grade) in self.cards.iter_mut().zip(grades) {
            card.review(*grade, at);
        }

        let correct = grades.iter().filter(|g| g.is_recalled()).count() as u64;
        let total = grades.len() as u64;
        tracing::debug!("Studied {} cards, {} recalled", total, correct);

        SessionOutcome::scored(TrainingModule::Flashcards, correct, total)
    }

    /// Write the deck as a pretty-printed JSON array
    pub fn export_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        tracing::info!("Exported {} cards to {:?}", self.cards.len(), path);
        Ok(())
    }

    /// Read a deck previously written by [`Deck::export_to`]
    pub fn import_from(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let deck: Deck = serde_json::from_reader(reader)?;
        tracing::info!("Read {} cards from {:?}", deck.cards.len(), path);
        Ok(deck)
    }
}
