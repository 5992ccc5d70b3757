//! Coaching advice boundary.
//!
//! Advice text comes from an opaque [`Coach`]. Callers go through
//! [`advice_or_fallback`], which always yields something to show.

use crate::leveling::calculate_level;
use crate::{Result, UserProgress};

/// Shown whenever a coach fails
pub const FALLBACK_ADVICE: &str =
    "Focus on short, frequent practice sessions to optimize neural consolidation.";

/// Source of free-text coaching advice
pub trait Coach {
    fn advise(&self, progress: &UserProgress) -> Result<String>;
}

/// Ask `coach` for advice, falling back to a fixed tip on error or silence
pub fn advice_or_fallback<C: Coach + ?Sized>(coach: &C, progress: &UserProgress) -> String {
    match coach.advise(progress) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            tracing::warn!("Coach returned empty advice, using fallback");
            FALLBACK_ADVICE.to_string()
        }
        Err(e) => {
            tracing::warn!("Coach failed: {}. Using fallback.", e);
            FALLBACK_ADVICE.to_string()
        }
    }
}

/// Offline coach built from simple rules over the statistics
#[derive(Clone, Copy, Debug, Default)]
pub struct TipsCoach;

impl Coach for TipsCoach {
    fn advise(&self, progress: &UserProgress) -> Result<String> {
        let mut tips = Vec::new();

        if progress.total_sessions == 0 {
            tips.push("Start with a short numbers drill to get a baseline.".to_string());
        }
        if progress.streak_days < 3 {
            tips.push(
                "Train a little every day; a 3-day streak builds the habit.".to_string(),
            );
        } else if progress.streak_days >= progress.personal_best_streak {
            tips.push(format!(
                "Day {} is your best streak yet. Keep it alive tomorrow.",
                progress.streak_days
            ));
        }
        if progress.total_questions_all_time > 0 && progress.accuracy_average < 60.0 {
            tips.push(
                "Slow down while memorizing: link each item to a vivid image.".to_string(),
            );
        } else if progress.accuracy_average >= 90.0 {
            tips.push("Accuracy is excellent. Try longer sequences.".to_string());
        }

        let level = calculate_level(progress.xp);
        tips.push(format!(
            "{} XP to reach level {}.",
            level.xp_to_next_level(),
            level.current_level + 1
        ));

        Ok(tips
            .iter()
            .map(|tip| format!("- {}", tip))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
