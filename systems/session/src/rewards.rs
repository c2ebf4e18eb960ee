//! Reward rules applied when a level ends.

use crystal_miner_core::{LevelDefinition, LevelId, PowerUpKind};
use rand::{seq::SliceRandom, Rng};

/// Experience added per earned star on success.
pub const STAR_XP_BONUS: u32 = 20;
/// Every level whose id is a multiple of this grants a power-up on success.
pub const GRANT_LEVEL_INTERVAL: u32 = 3;

/// Star rating for a finished level: 3 for no mistakes, 2 for at most two,
/// 1 otherwise, and 0 when the level was lost.
#[must_use]
pub fn star_rating(success: bool, mistakes: u32) -> u8 {
    match (success, mistakes) {
        (false, _) => 0,
        (true, 0) => 3,
        (true, 1..=2) => 2,
        (true, _) => 1,
    }
}

/// Experience awarded for a finished level.
#[must_use]
pub fn xp_reward(level: &LevelDefinition, success: bool, stars: u8) -> u32 {
    if success {
        level.base_xp() + u32::from(stars) * STAR_XP_BONUS
    } else {
        level.base_xp() / 2
    }
}

/// Rolls the power-ups granted for a finished level.
///
/// A win on every third level and a three-star win each grant one random
/// kind; both can fire for the same level.
pub fn roll_grants<R: Rng + ?Sized>(
    level: LevelId,
    success: bool,
    stars: u8,
    rng: &mut R,
) -> Vec<PowerUpKind> {
    if !success {
        return Vec::new();
    }

    let rolls = usize::from(level.get() % GRANT_LEVEL_INTERVAL == 0) + usize::from(stars == 3);
    (0..rolls)
        .filter_map(|_| PowerUpKind::ALL.choose(rng).copied())
        .collect()
}
