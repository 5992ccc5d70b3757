//! Per-module XP rules.
//!
//! Each training module turns its own result into points before handing
//! the session to the engine:
//! - Numbers: 20 XP per digit, only for a perfect recall
//! - Words: 50 XP per word recalled
//! - Faces: 100 XP per name matched
//! - Images: 1 XP per tile placed correctly
//! - Flashcards: 1 XP per card reviewed

use crate::TrainingModule;

pub const XP_PER_DIGIT: u64 = 20;
pub const XP_PER_WORD: u64 = 50;
pub const XP_PER_FACE: u64 = 100;

impl TrainingModule {
    /// Points earned for `correct` out of `total`
    pub fn points(&self, correct: u64, total: u64) -> u64 {
        match self {
            TrainingModule::Numbers => {
                if total > 0 && correct == total {
                    total.saturating_mul(XP_PER_DIGIT)
                } else {
                    0
                }
            }
            TrainingModule::Words => correct.saturating_mul(XP_PER_WORD),
            TrainingModule::Faces => correct.saturating_mul(XP_PER_FACE),
            TrainingModule::Images => correct,
            TrainingModule::Flashcards => total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_all_or_nothing() {
        assert_eq!(TrainingModule::Numbers.points(8, 8), 160);
        assert_eq!(TrainingModule::Numbers.points(7, 8), 0);
        assert_eq!(TrainingModule::Numbers.points(0, 0), 0);
    }

    #[test]
    fn test_per_item_modules() {
        assert_eq!(TrainingModule::Words.points(6, 10), 300);
        assert_eq!(TrainingModule::Faces.points(3, 5), 300);
        assert_eq!(TrainingModule::Images.points(7, 9), 7);
    }

    #[test]
    fn test_flashcards_reward_every_card() {
        assert_eq!(TrainingModule::Flashcards.points(2, 12), 12);
    }
}
