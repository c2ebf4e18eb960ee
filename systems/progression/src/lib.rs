#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Progression store that keeps the player profile durable.
//!
//! [`Progression`] owns the live [`PlayerProfile`] and writes a fresh
//! [`ProfileSnapshot`] through its [`ProfileStore`] after every mutation.
//! Storage failures never interrupt play: unreadable data is replaced by
//! defaults at load time and failed writes are logged. A store that could
//! not be read is never written, so the stored profile survives for repair.

use std::io;

use crystal_miner_core::{AchievementKey, LevelId, PowerUpKind};
use thiserror::Error;
use tracing::{debug, info, warn};

mod profile;
mod snapshot;

pub use profile::{PlayerProfile, DEFAULT_POWERUP_STOCK, XP_PER_LEVEL};
pub use snapshot::{
    ProfileSnapshot, ACHIEVEMENTS_KEY, PLAYER_LEVEL_KEY, POWERUPS_KEY, STARS_KEY,
    TUTORIALS_SEEN_KEY, XP_KEY,
};

/// Persistence collaborator that loads and saves profile snapshots.
pub trait ProfileStore {
    /// Loads the stored snapshot; an absent profile is an empty snapshot.
    fn load(&mut self) -> Result<ProfileSnapshot, StoreError>;

    /// Replaces the stored snapshot.
    fn save(&mut self, snapshot: &ProfileSnapshot) -> Result<(), StoreError>;
}

/// Errors raised by profile storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium could not be read or written.
    #[error("profile storage i/o failed: {0}")]
    Io(#[from] io::Error),
    /// The stored document could not be decoded.
    #[error("profile storage holds malformed data: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The backend refused the operation.
    #[error("profile storage unavailable: {0}")]
    Unavailable(String),
}

/// In-memory store used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: ProfileSnapshot,
    saves: usize,
    reject_saves: bool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: ProfileSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    /// Makes every subsequent save fail.
    #[must_use]
    pub fn rejecting_saves(mut self) -> Self {
        self.reject_saves = true;
        self
    }

    /// Last snapshot written.
    #[must_use]
    pub fn snapshot(&self) -> &ProfileSnapshot {
        &self.snapshot
    }

    /// Number of successful saves.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl ProfileStore for MemoryStore {
    fn load(&mut self) -> Result<ProfileSnapshot, StoreError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        if self.reject_saves {
            return Err(StoreError::Unavailable("saves disabled".to_owned()));
        }
        self.snapshot = snapshot.clone();
        self.saves += 1;
        Ok(())
    }
}

/// Live player profile bound to its store.
#[derive(Debug)]
pub struct Progression<S> {
    profile: PlayerProfile,
    store: S,
    read_only: bool,
}

impl<S: ProfileStore> Progression<S> {
    /// Loads and normalizes the stored profile, then writes it back.
    ///
    /// An inventory in which every power-up reached zero is restocked here, so
    /// a player can never be locked out of power-ups across launches. When the
    /// store cannot be read, play continues on a fresh profile that is kept in
    /// memory only.
    pub fn open(mut store: S) -> Self {
        let (snapshot, read_only) = match store.load() {
            Ok(snapshot) => (snapshot, false),
            Err(error) => {
                warn!(%error, "falling back to a fresh profile; it will not be saved");
                (ProfileSnapshot::new(), true)
            }
        };
        let mut profile = PlayerProfile::from_snapshot(&snapshot);
        if profile.refill_if_depleted() {
            info!("power-up inventory was empty; restocked every kind");
        }
        debug!(level = profile.level(), xp = profile.xp(), "profile loaded");

        let mut progression = Self {
            profile,
            store,
            read_only,
        };
        progression.persist();
        progression
    }

    /// Current profile.
    #[must_use]
    pub fn profile(&self) -> &PlayerProfile {
        &self.profile
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Records a star rating if it improves the stored best.
    pub fn record_stars(&mut self, level: LevelId, stars: u8) -> bool {
        let improved = self.profile.record_stars(level, stars);
        if improved {
            self.persist();
        }
        improved
    }

    /// Adds experience; returns how many player levels were gained.
    pub fn add_xp(&mut self, amount: u32) -> u32 {
        let gained = self.profile.add_xp(amount);
        if gained > 0 {
            info!(level = self.profile.level(), "player levelled up");
        }
        self.persist();
        gained
    }

    /// Unlocks an achievement; returns `false` when it was already unlocked.
    pub fn unlock(&mut self, key: AchievementKey) -> bool {
        if !self.profile.unlock(key) {
            return false;
        }
        info!(achievement = key.key(), "achievement unlocked");
        self.persist();
        true
    }

    /// Adds one charge of a power-up.
    pub fn grant_power_up(&mut self, kind: PowerUpKind) {
        self.profile.grant(kind, 1);
        info!(kind = kind.key(), "power-up granted");
        self.persist();
    }

    /// Spends one charge of a power-up; returns `false` when none were left.
    pub fn consume_power_up(&mut self, kind: PowerUpKind) -> bool {
        if !self.profile.consume(kind) {
            return false;
        }
        self.persist();
        true
    }

    /// Records that the player acknowledged a power-up tutorial.
    pub fn mark_tutorial_seen(&mut self, kind: PowerUpKind) {
        if self.profile.mark_tutorial_seen(kind) {
            self.persist();
        }
    }

    fn persist(&mut self) {
        if self.read_only {
            debug!("stored profile was unreadable; skipping save");
            return;
        }
        if let Err(error) = self.store.save(&self.profile.to_snapshot()) {
            warn!(%error, "failed to persist player profile");
        }
    }
}
