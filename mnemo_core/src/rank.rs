//! Lifetime accuracy ranks.

use serde::Serialize;

/// A named tier of lifetime accuracy
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyRank {
    MemoryNoob,
    SleepyHead,
    AverageJoe,
    SharpMind,
    MentalAthlete,
    Master,
    ProfessionalMnemonist,
}

impl AccuracyRank {
    /// Rank for a percentage; upper bounds are exclusive
    pub fn for_accuracy(pct: f64) -> Self {
        match pct {
            p if p < 20.0 => AccuracyRank::MemoryNoob,
            p if p < 40.0 => AccuracyRank::SleepyHead,
            p if p < 60.0 => AccuracyRank::AverageJoe,
            p if p < 80.0 => AccuracyRank::SharpMind,
            p if p < 85.0 => AccuracyRank::MentalAthlete,
            p if p < 90.0 => AccuracyRank::Master,
            _ => AccuracyRank::ProfessionalMnemonist,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AccuracyRank::MemoryNoob => "Memory Noob",
            AccuracyRank::SleepyHead => "Sleepy Head",
            AccuracyRank::AverageJoe => "Average Joe",
            AccuracyRank::SharpMind => "Sharp Mind",
            AccuracyRank::MentalAthlete => "Mental Athlete",
            AccuracyRank::Master => "Master",
            AccuracyRank::ProfessionalMnemonist => "Professional Mnemonist",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AccuracyRank::MemoryNoob => "Are you even trying? Focus!",
            AccuracyRank::SleepyHead => "Wake up! Your brain needs coffee.",
            AccuracyRank::AverageJoe => "Perfectly balanced. But you can do better.",
            AccuracyRank::SharpMind => "Getting stronger! Your neurons are firing.",
            AccuracyRank::MentalAthlete => "Great job! Keep practicing.",
            AccuracyRank::Master => "Incredible focus! You are dangerous.",
            AccuracyRank::ProfessionalMnemonist => "Unbelievable! You are a human supercomputer!",
        }
    }
}

/// Accuracy as shown next to a rank: whole numbers at 0 and 100, two
/// decimals otherwise
pub fn format_accuracy(pct: f64) -> String {
    if pct == 0.0 || pct == 100.0 {
        format!("{}", pct as u32)
    } else {
        format!("{:.2}", pct)
    }
}
