//! Tiered leveling curve.
//!
//! Levels come in tiers of ten. Advancing from level L costs
//! `floor((L - 1) / 10) * 100 + 100` XP: 100 per level for levels 1-10,
//! 200 for 11-20, 300 for 21-30 and so on.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Levels per tier
pub const LEVELS_PER_TIER: u32 = 10;

/// XP cost increase per tier
pub const TIER_STEP_XP: u64 = 100;

/// Where a lifetime XP total lands on the curve
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub current_level: u32,
    /// Floor of the percentage through the current level, 0..=99
    pub progress_pct: u8,
    /// Cost of the current level
    pub xp_for_next_level: u64,
    /// XP already earned inside the current level
    pub current_level_xp: u64,
}

impl LevelInfo {
    /// XP still needed to reach the next level
    pub fn xp_to_next_level(&self) -> u64 {
        self.xp_for_next_level - self.current_level_xp
    }
}

/// XP needed to advance from `level` to `level + 1`
pub fn xp_cost_for_level(level: u32) -> u64 {
    let tier = u64::from(level.max(1) - 1) / u64::from(LEVELS_PER_TIER);
    tier * TIER_STEP_XP + TIER_STEP_XP
}

/// Cumulative XP at which `level` begins, saturating at `u64::MAX`
pub fn xp_at_level_start(level: u32) -> u64 {
    let done = u128::from(level.max(1) - 1);
    let full_tiers = done / u128::from(LEVELS_PER_TIER);
    let partial = done % u128::from(LEVELS_PER_TIER);
    let step = u128::from(TIER_STEP_XP);
    let tier_total = step * u128::from(LEVELS_PER_TIER);
    let start = tier_total * full_tiers * (full_tiers + 1) / 2 + partial * step * (full_tiers + 1);
    u64::try_from(start).unwrap_or(u64::MAX)
}

/// Number of complete tiers covered by `total_xp`
fn full_tiers(total_xp: u64) -> u64 {
    let tier_total = u128::from(TIER_STEP_XP) * u128::from(LEVELS_PER_TIER);
    let cumulative = |f: u64| tier_total * u128::from(f) * (u128::from(f) + 1) / 2;
    let xp = u128::from(total_xp);

    // Float estimate of the quadratic root, corrected in both directions
    let estimate = ((1.0 + 8.0 * total_xp as f64 / tier_total as f64).sqrt() - 1.0) / 2.0;
    let mut tiers = estimate.max(0.0) as u64;
    while tiers > 0 && cumulative(tiers) > xp {
        tiers -= 1;
    }
    while cumulative(tiers + 1) <= xp {
        tiers += 1;
    }
    tiers
}

/// Map a lifetime XP total to a level
///
/// Whole tiers are consumed in closed form, then single levels inside the
/// last tier, so the result is cheap even for very large totals.
pub fn calculate_level(total_xp: u64) -> LevelInfo {
    let tiers = full_tiers(total_xp);
    let mut level = 1 + tiers as u32 * LEVELS_PER_TIER;
    let mut remaining = total_xp - xp_at_level_start(level);

    let mut cost = xp_cost_for_level(level);
    while remaining >= cost {
        remaining -= cost;
        level += 1;
        cost = xp_cost_for_level(level);
    }

    LevelInfo {
        current_level: level,
        progress_pct: (remaining * 100 / cost) as u8,
        xp_for_next_level: cost,
        current_level_xp: remaining,
    }
}

/// Signed entry point; negative totals are rejected rather than clamped
pub fn level_for_signed(total_xp: i64) -> Result<LevelInfo> {
    let xp = u64::try_from(total_xp).map_err(|_| {
        Error::InvalidInput(format!("XP total must not be negative, got {}", total_xp))
    })?;
    Ok(calculate_level(xp))
}
