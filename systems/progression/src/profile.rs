//! Durable player profile and its normalization rules.

use std::collections::{BTreeMap, BTreeSet};

use crystal_miner_core::{AchievementKey, LevelId, PowerUpKind, MAX_STARS};
use serde_json::Value;
use tracing::warn;

use crate::snapshot::{
    ProfileSnapshot, ACHIEVEMENTS_KEY, PLAYER_LEVEL_KEY, POWERUPS_KEY, STARS_KEY,
    TUTORIALS_SEEN_KEY, XP_KEY,
};

/// Experience required per player level; level `n` needs `n * XP_PER_LEVEL`.
pub const XP_PER_LEVEL: u32 = 100;
/// Stock assigned to a power-up that is missing from a stored inventory.
pub const DEFAULT_POWERUP_STOCK: u32 = 1;

/// Player progress that survives sessions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerProfile {
    level: u32,
    xp: u32,
    stars: BTreeMap<LevelId, u8>,
    achievements: BTreeSet<AchievementKey>,
    powerups: BTreeMap<PowerUpKind, u32>,
    tutorials_seen: BTreeSet<PowerUpKind>,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            stars: BTreeMap::new(),
            achievements: BTreeSet::new(),
            powerups: PowerUpKind::ALL
                .into_iter()
                .map(|kind| (kind, DEFAULT_POWERUP_STOCK))
                .collect(),
            tutorials_seen: BTreeSet::new(),
        }
    }
}

impl PlayerProfile {
    /// Rebuilds a profile from a stored snapshot, substituting defaults for
    /// anything absent or malformed.
    ///
    /// Excess experience is converted into levels so that the stored XP is
    /// always below the next threshold, and every power-up kind is present.
    #[must_use]
    pub fn from_snapshot(snapshot: &ProfileSnapshot) -> Self {
        let mut profile = Self {
            level: snapshot.number(PLAYER_LEVEL_KEY).unwrap_or(1).max(1),
            ..Self::default()
        };
        let _ = profile.add_xp(snapshot.number(XP_KEY).unwrap_or(0));

        for (key, value) in snapshot.object(STARS_KEY) {
            let level = key.trim().parse::<u32>().ok().filter(|level| *level > 0);
            match (level, value.as_u64()) {
                (Some(level), Some(stars)) => {
                    let stars = stars.min(u64::from(MAX_STARS)) as u8;
                    let _ = profile.stars.insert(LevelId::new(level), stars);
                }
                _ => warn!(%key, %value, "dropping unreadable star record"),
            }
        }

        profile.achievements = flags(snapshot.object(ACHIEVEMENTS_KEY), AchievementKey::from_key);
        profile.tutorials_seen = flags(snapshot.object(TUTORIALS_SEEN_KEY), PowerUpKind::from_key);

        let stored = snapshot.object(POWERUPS_KEY);
        for kind in PowerUpKind::ALL {
            let count = match stored.get(kind.key()) {
                None => DEFAULT_POWERUP_STOCK,
                Some(value) => value.as_u64().map_or_else(
                    || {
                        warn!(kind = kind.key(), %value, "resetting unreadable power-up count");
                        DEFAULT_POWERUP_STOCK
                    },
                    |count| u32::try_from(count).unwrap_or(u32::MAX),
                ),
            };
            let _ = profile.powerups.insert(kind, count);
        }

        profile
    }

    /// Encodes the profile into its durable key-value form.
    #[must_use]
    pub fn to_snapshot(&self) -> ProfileSnapshot {
        let mut snapshot = ProfileSnapshot::new();
        snapshot.set(PLAYER_LEVEL_KEY, self.level.to_string());
        snapshot.set(XP_KEY, self.xp.to_string());

        let stars: BTreeMap<String, u8> = self
            .stars
            .iter()
            .map(|(level, stars)| (level.get().to_string(), *stars))
            .collect();
        snapshot.set_object(STARS_KEY, &stars);

        let achievements: BTreeMap<&str, bool> = self
            .achievements
            .iter()
            .map(|key| (key.key(), true))
            .collect();
        snapshot.set_object(ACHIEVEMENTS_KEY, &achievements);

        let powerups: BTreeMap<&str, u32> = self
            .powerups
            .iter()
            .map(|(kind, count)| (kind.key(), *count))
            .collect();
        snapshot.set_object(POWERUPS_KEY, &powerups);

        let tutorials: BTreeMap<&str, bool> = self
            .tutorials_seen
            .iter()
            .map(|kind| (kind.key(), true))
            .collect();
        snapshot.set_object(TUTORIALS_SEEN_KEY, &tutorials);

        snapshot
    }

    /// Current player level, starting at one.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Experience carried towards the next level.
    #[must_use]
    pub fn xp(&self) -> u32 {
        self.xp
    }

    /// Experience needed to reach the next level.
    #[must_use]
    pub fn xp_threshold(&self) -> u32 {
        self.level.saturating_mul(XP_PER_LEVEL)
    }

    /// Adds experience and returns how many levels were gained.
    pub fn add_xp(&mut self, amount: u32) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        let mut gained = 0;
        while self.xp >= self.xp_threshold() {
            let Some(next) = self.level.checked_add(1) else {
                self.xp = self.xp_threshold() - 1;
                break;
            };
            self.xp -= self.xp_threshold();
            self.level = next;
            gained += 1;
        }
        gained
    }

    /// Best star rating recorded for `level`.
    #[must_use]
    pub fn stars(&self, level: LevelId) -> u8 {
        self.stars.get(&level).copied().unwrap_or(0)
    }

    /// Best star ratings keyed by level.
    #[must_use]
    pub fn star_record(&self) -> &BTreeMap<LevelId, u8> {
        &self.stars
    }

    /// Stores `stars` for `level` when it beats the recorded value.
    ///
    /// Returns whether the record changed.
    pub fn record_stars(&mut self, level: LevelId, stars: u8) -> bool {
        let stars = stars.min(MAX_STARS);
        if stars <= self.stars(level) {
            return false;
        }
        let _ = self.stars.insert(level, stars);
        true
    }

    /// Reports whether `level` is still locked; the first level never is.
    #[must_use]
    pub fn is_level_locked(&self, level: LevelId) -> bool {
        level.get() > 1 && self.stars(LevelId::new(level.get() - 1)) == 0
    }

    /// Reports whether an achievement has been unlocked.
    #[must_use]
    pub fn is_unlocked(&self, key: AchievementKey) -> bool {
        self.achievements.contains(&key)
    }

    /// Unlocked achievements.
    #[must_use]
    pub fn unlocked(&self) -> &BTreeSet<AchievementKey> {
        &self.achievements
    }

    /// Unlocks an achievement; returns `false` when it already was.
    pub fn unlock(&mut self, key: AchievementKey) -> bool {
        self.achievements.insert(key)
    }

    /// Stock of a power-up.
    #[must_use]
    pub fn inventory(&self, kind: PowerUpKind) -> u32 {
        self.powerups.get(&kind).copied().unwrap_or(0)
    }

    /// Adds `amount` charges of a power-up.
    pub fn grant(&mut self, kind: PowerUpKind, amount: u32) {
        let count = self.powerups.entry(kind).or_insert(0);
        *count = count.saturating_add(amount);
    }

    /// Removes one charge; returns `false` when none were left.
    pub fn consume(&mut self, kind: PowerUpKind) -> bool {
        match self.powerups.get_mut(&kind) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Restocks every power-up to the default when all of them ran out.
    ///
    /// Returns whether a refill happened.
    pub fn refill_if_depleted(&mut self) -> bool {
        if self.powerups.values().any(|count| *count > 0) {
            return false;
        }
        for kind in PowerUpKind::ALL {
            let _ = self.powerups.insert(kind, DEFAULT_POWERUP_STOCK);
        }
        true
    }

    /// Reports whether the one-time tutorial for a power-up was acknowledged.
    #[must_use]
    pub fn has_seen_tutorial(&self, kind: PowerUpKind) -> bool {
        self.tutorials_seen.contains(&kind)
    }

    /// Records the tutorial acknowledgement; returns `false` when already recorded.
    pub fn mark_tutorial_seen(&mut self, kind: PowerUpKind) -> bool {
        self.tutorials_seen.insert(kind)
    }
}

fn flags<K, F>(map: BTreeMap<String, Value>, parse: F) -> BTreeSet<K>
where
    K: Ord,
    F: Fn(&str) -> Option<K>,
{
    map.into_iter()
        .filter(|(_, value)| value.as_bool() == Some(true))
        .filter_map(|(key, _)| parse(&key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(&str, &str)]) -> ProfileSnapshot {
        let mut snapshot = ProfileSnapshot::new();
        for (key, value) in entries {
            snapshot.set(*key, *value);
        }
        snapshot
    }

    #[test]
    fn empty_snapshot_yields_documented_defaults() {
        let profile = PlayerProfile::from_snapshot(&ProfileSnapshot::new());
        assert_eq!(profile, PlayerProfile::default());
        assert_eq!(profile.level(), 1);
        assert_eq!(profile.xp(), 0);
        for kind in PowerUpKind::ALL {
            assert_eq!(profile.inventory(kind), 1);
        }
    }

    #[test]
    fn empty_power_up_object_fills_every_kind() {
        let profile = PlayerProfile::from_snapshot(&snapshot(&[(POWERUPS_KEY, "{}")]));
        for kind in PowerUpKind::ALL {
            assert_eq!(profile.inventory(kind), 1);
        }
    }

    #[test]
    fn partial_inventory_keeps_stored_counts() {
        let profile = PlayerProfile::from_snapshot(&snapshot(&[(
            POWERUPS_KEY,
            r#"{"lightning": 4, "time": 0, "dynamite": "lots"}"#,
        )]));
        assert_eq!(profile.inventory(PowerUpKind::Lightning), 4);
        assert_eq!(profile.inventory(PowerUpKind::Time), 0);
        assert_eq!(profile.inventory(PowerUpKind::Magnifier), 1);
        assert_eq!(profile.inventory(PowerUpKind::Dynamite), 1);
    }

    #[test]
    fn malformed_entries_are_normalized() {
        let profile = PlayerProfile::from_snapshot(&snapshot(&[
            (PLAYER_LEVEL_KEY, "0"),
            (XP_KEY, "-5"),
            (STARS_KEY, r#"{"1": 7, "x": 2, "2": "three"}"#),
            (ACHIEVEMENTS_KEY, r#"{"rich": true, "flawless": false, "mystery": true}"#),
            (TUTORIALS_SEEN_KEY, "true"),
        ]));

        assert_eq!(profile.level(), 1);
        assert_eq!(profile.xp(), 0);
        assert_eq!(profile.stars(LevelId::new(1)), 3);
        assert_eq!(profile.star_record().len(), 1);
        assert_eq!(
            profile.unlocked().iter().copied().collect::<Vec<_>>(),
            vec![AchievementKey::Rich]
        );
        assert!(!profile.has_seen_tutorial(PowerUpKind::Time));
    }

    #[test]
    fn excess_xp_rolls_into_levels() {
        let profile =
            PlayerProfile::from_snapshot(&snapshot(&[(PLAYER_LEVEL_KEY, "2"), (XP_KEY, "550")]));
        assert_eq!(profile.level(), 4);
        assert_eq!(profile.xp(), 50);
        assert!(profile.xp() < profile.xp_threshold());
    }

    #[test]
    fn top_level_absorbs_excess_xp() {
        let profile = PlayerProfile::from_snapshot(&snapshot(&[
            (PLAYER_LEVEL_KEY, "4294967295"),
            (XP_KEY, "4294967295"),
        ]));

        assert_eq!(profile.level(), u32::MAX);
        assert_eq!(profile.xp(), u32::MAX - 1);
        assert!(profile.xp() < profile.xp_threshold());
    }

    #[test]
    fn add_xp_levels_up_with_growing_threshold() {
        let mut profile = PlayerProfile::default();
        assert_eq!(profile.add_xp(60), 0);
        assert_eq!(profile.add_xp(60), 1);
        assert_eq!((profile.level(), profile.xp()), (2, 20));
        assert_eq!(profile.add_xp(180), 1);
        assert_eq!((profile.level(), profile.xp()), (3, 0));
    }

    #[test]
    fn star_record_never_decreases() {
        let mut profile = PlayerProfile::default();
        assert!(profile.record_stars(LevelId::new(1), 2));
        assert!(!profile.record_stars(LevelId::new(1), 1));
        assert!(!profile.record_stars(LevelId::new(1), 0));
        assert!(profile.record_stars(LevelId::new(1), 3));
        assert_eq!(profile.stars(LevelId::new(1)), 3);
    }

    #[test]
    fn levels_unlock_after_previous_star() {
        let mut profile = PlayerProfile::default();
        assert!(!profile.is_level_locked(LevelId::new(1)));
        assert!(profile.is_level_locked(LevelId::new(2)));
        let _ = profile.record_stars(LevelId::new(1), 1);
        assert!(!profile.is_level_locked(LevelId::new(2)));
        assert!(profile.is_level_locked(LevelId::new(3)));
    }

    #[test]
    fn consume_stops_at_zero() {
        let mut profile = PlayerProfile::default();
        assert!(profile.consume(PowerUpKind::Time));
        assert!(!profile.consume(PowerUpKind::Time));
        assert_eq!(profile.inventory(PowerUpKind::Time), 0);
    }

    #[test]
    fn refill_only_when_everything_ran_out() {
        let mut profile = PlayerProfile::default();
        for kind in [PowerUpKind::Lightning, PowerUpKind::Magnifier, PowerUpKind::Time] {
            assert!(profile.consume(kind));
        }
        assert!(!profile.refill_if_depleted());
        assert!(profile.consume(PowerUpKind::Dynamite));
        assert!(profile.refill_if_depleted());
        assert_eq!(profile.inventory(PowerUpKind::Time), 1);
    }

    #[test]
    fn snapshot_round_trip_preserves_progress() {
        let mut profile = PlayerProfile::default();
        let _ = profile.add_xp(250);
        let _ = profile.record_stars(LevelId::new(1), 3);
        let _ = profile.record_stars(LevelId::new(2), 1);
        let _ = profile.unlock(AchievementKey::FirstDig);
        profile.grant(PowerUpKind::Dynamite, 2);
        let _ = profile.mark_tutorial_seen(PowerUpKind::Lightning);

        let snapshot = profile.to_snapshot();
        assert_eq!(snapshot.get(STARS_KEY), Some(r#"{"1":3,"2":1}"#));
        assert_eq!(PlayerProfile::from_snapshot(&snapshot), profile);
    }
}
