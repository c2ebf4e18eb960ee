#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Crystal Miner engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative board, and pure systems. Controllers submit [`Command`] values
//! describing desired board mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems and
//! presenters to react to deterministically. Collaborators living outside the
//! rules engine are reached exclusively through the [`Presenter`] and
//! [`FeedbackSink`] traits.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod primes;

pub use primes::compute_primes;

/// Canonical title shown when the experience boots.
pub const GAME_TITLE: &str = "Crystal Miner";

/// Highest star rating a level can award.
pub const MAX_STARS: u8 = 3;

/// Commands that express all permissible board mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Discards the current board and lays out a fresh grid numbered `1..=max_number`.
    ConfigureBoard {
        /// Highest tile value on the new board.
        max_number: u32,
    },
    /// Reports that the player tapped the tile carrying `value`.
    SelectTile {
        /// Value printed on the tapped tile.
        value: TileValue,
    },
    /// Eliminates every remaining multiple of the active prime at a flat rate.
    ClearMultiples,
    /// Points out the smallest prime that still waits to be selected.
    RevealNextPrime,
    /// Eliminates the provided tiles without awarding points.
    ///
    /// The world ignores any target that is a prime, is no longer normal, or is
    /// a multiple of the active prime.
    Demolish {
        /// Tiles chosen for demolition.
        targets: Vec<TileValue>,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a fresh board was laid out.
    BoardConfigured {
        /// Highest tile value on the board.
        max_number: u32,
        /// Number of prime tiles the player must complete.
        prime_count: usize,
    },
    /// Announces that a prime tile became the active prime.
    PrimeSelected {
        /// Value of the selected prime.
        value: TileValue,
    },
    /// Announces that the active prime was tapped again and released.
    PrimeReleased {
        /// Value of the released prime.
        value: TileValue,
    },
    /// Confirms that a multiple of the active prime was eliminated by the player.
    TileEliminated {
        /// Value of the eliminated tile.
        value: TileValue,
        /// Base points awarded for the elimination.
        points: u32,
        /// Consecutive correct eliminations including this one.
        combo: u32,
    },
    /// Announces that the combo counter reached a bonus threshold.
    ComboBurst {
        /// Combo count that triggered the burst.
        combo: u32,
        /// Bonus points added on top of the base award.
        bonus: u32,
    },
    /// Reports a wrong tap; the combo counter was reset.
    MistakeMade {
        /// Value of the wrongly tapped tile.
        value: TileValue,
    },
    /// Reports the running score after any change.
    ScoreChanged {
        /// Score accumulated in the current session.
        score: u32,
    },
    /// Confirms that the remaining multiples of a prime were cleared at once.
    MultiplesCleared {
        /// Prime whose multiples were cleared.
        prime: TileValue,
        /// Tiles eliminated by the clearing pass in ascending order.
        tiles: Vec<TileValue>,
        /// Total points awarded for the pass.
        points: u32,
    },
    /// Points out the smallest prime still waiting to be selected.
    PrimeRevealed {
        /// Value of the revealed prime.
        value: TileValue,
    },
    /// Confirms that tiles were demolished without scoring.
    TilesDemolished {
        /// Tiles that were eliminated in ascending order.
        tiles: Vec<TileValue>,
    },
    /// Announces that every multiple of a prime has been eliminated.
    PhaseCompleted {
        /// Prime whose phase finished.
        prime: TileValue,
    },
    /// Announces that no prime remains to be selected; the level is won.
    BoardCleared,
}

/// Value printed on a board tile, starting at one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileValue(u32);

impl TileValue {
    /// Creates a new tile value wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the underlying number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether this value is a multiple of `divisor`.
    ///
    /// A zero divisor never divides anything.
    #[must_use]
    pub const fn is_multiple_of(&self, divisor: TileValue) -> bool {
        divisor.0 != 0 && self.0 % divisor.0 == 0
    }
}

impl fmt::Display for TileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single tile within a session.
///
/// Tiles move `Normal -> Prime -> Completed` for selected primes and
/// `Normal -> Eliminated` for multiples and demolished stones. `Eliminated`
/// and `Completed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileState {
    /// Untouched tile.
    Normal,
    /// Prime tile currently selected as the active prime.
    Prime,
    /// Tile removed from play.
    Eliminated,
    /// Prime tile whose multiples were all eliminated.
    Completed,
}

impl TileState {
    /// Reports whether the tile can no longer change within the session.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Eliminated | Self::Completed)
    }
}

/// Identifier of a level within the campaign, starting at one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelId(u32);

impl LevelId {
    /// Creates a new level identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static description of a single level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
    id: LevelId,
    max_number: u32,
    time_limit_secs: u32,
    base_xp: u32,
}

impl LevelDefinition {
    /// Creates a new level definition.
    #[must_use]
    pub const fn new(id: LevelId, max_number: u32, time_limit_secs: u32, base_xp: u32) -> Self {
        Self {
            id,
            max_number,
            time_limit_secs,
            base_xp,
        }
    }

    /// Identifier of the level.
    #[must_use]
    pub const fn id(&self) -> LevelId {
        self.id
    }

    /// Highest tile value laid out on the board.
    #[must_use]
    pub const fn max_number(&self) -> u32 {
        self.max_number
    }

    /// Countdown length in whole seconds.
    #[must_use]
    pub const fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    /// Countdown length as a duration.
    #[must_use]
    pub const fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs as u64)
    }

    /// Experience awarded before star bonuses.
    #[must_use]
    pub const fn base_xp(&self) -> u32 {
        self.base_xp
    }
}

/// Built-in level table used when no campaign configuration is supplied.
pub const DEFAULT_LEVELS: [LevelDefinition; 6] = [
    LevelDefinition::new(LevelId::new(1), 50, 180, 100),
    LevelDefinition::new(LevelId::new(2), 100, 300, 200),
    LevelDefinition::new(LevelId::new(3), 150, 360, 300),
    LevelDefinition::new(LevelId::new(4), 200, 420, 400),
    LevelDefinition::new(LevelId::new(5), 250, 480, 500),
    LevelDefinition::new(LevelId::new(6), 300, 540, 600),
];

/// Validated, immutable level table ordered by difficulty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Campaign {
    levels: Vec<LevelDefinition>,
}

impl Campaign {
    /// Validates the provided levels and wraps them into a campaign.
    ///
    /// Identifiers must run contiguously from one, boards must hold at least
    /// one prime and grow strictly with the identifier, and every level needs a
    /// positive countdown.
    pub fn new(levels: Vec<LevelDefinition>) -> Result<Self, CampaignError> {
        if levels.is_empty() {
            return Err(CampaignError::Empty);
        }

        let mut previous_max = 0;
        for (index, level) in levels.iter().enumerate() {
            let expected = LevelId::new(index as u32 + 1);
            if level.id != expected {
                return Err(CampaignError::NonContiguousId {
                    expected,
                    found: level.id,
                });
            }
            if level.max_number < 2 {
                return Err(CampaignError::BoardTooSmall { level: level.id });
            }
            if level.max_number <= previous_max {
                return Err(CampaignError::NonIncreasingBoard { level: level.id });
            }
            if level.time_limit_secs == 0 {
                return Err(CampaignError::ZeroTimeLimit { level: level.id });
            }
            previous_max = level.max_number;
        }

        Ok(Self { levels })
    }

    /// Levels in ascending identifier order.
    #[must_use]
    pub fn levels(&self) -> &[LevelDefinition] {
        &self.levels
    }

    /// Looks up the level with the provided identifier.
    #[must_use]
    pub fn level(&self, id: LevelId) -> Option<&LevelDefinition> {
        let index = usize::try_from(id.get()).ok()?.checked_sub(1)?;
        self.levels.get(index)
    }

    /// Identifier of the last level in the campaign.
    #[must_use]
    pub fn final_level(&self) -> LevelId {
        LevelId::new(self.levels.len() as u32)
    }

    /// Level that follows `id`, saturating at the final level.
    #[must_use]
    pub fn next_after(&self, id: LevelId) -> LevelId {
        LevelId::new(id.get().saturating_add(1).min(self.final_level().get()))
    }
}

impl Default for Campaign {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS.to_vec(),
        }
    }
}

/// Reasons a level table may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CampaignError {
    /// The table contains no levels.
    #[error("campaign must contain at least one level")]
    Empty,
    /// Identifiers do not run contiguously from one.
    #[error("expected level {expected}, found level {found}")]
    NonContiguousId {
        /// Identifier required at this position.
        expected: LevelId,
        /// Identifier present at this position.
        found: LevelId,
    },
    /// The board holds no prime at all.
    #[error("level {level} needs a board of at least 2 tiles")]
    BoardTooSmall {
        /// Offending level.
        level: LevelId,
    },
    /// The board does not grow compared to the previous level.
    #[error("level {level} must have a larger board than the level before it")]
    NonIncreasingBoard {
        /// Offending level.
        level: LevelId,
    },
    /// The countdown is zero seconds long.
    #[error("level {level} must have a positive time limit")]
    ZeroTimeLimit {
        /// Offending level.
        level: LevelId,
    },
}

/// Consumable power-ups stocked in the player's inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerUpKind {
    /// Clears every remaining multiple of the active prime.
    Lightning,
    /// Highlights the smallest prime still to be selected.
    Magnifier,
    /// Adds time to the countdown.
    Time,
    /// Blasts random stones that are safe to remove.
    Dynamite,
}

impl PowerUpKind {
    /// Every power-up kind in display order.
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::Lightning,
        PowerUpKind::Magnifier,
        PowerUpKind::Time,
        PowerUpKind::Dynamite,
    ];

    /// Stable key used in persisted profiles.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Lightning => "lightning",
            Self::Magnifier => "magnifier",
            Self::Time => "time",
            Self::Dynamite => "dynamite",
        }
    }

    /// Parses a persisted key back into a kind.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Short label shown on buttons and in tutorials.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Lightning => "⚡ Lightning",
            Self::Magnifier => "🔍 Magnifier",
            Self::Time => "⏰ Time",
            Self::Dynamite => "💣 Dynamite",
        }
    }

    /// One-time explanation shown before the first use.
    #[must_use]
    pub const fn tutorial(self) -> &'static str {
        match self {
            Self::Lightning => {
                "Collects ALL multiples of the selected crystal automatically. \
                 Ideal for quick points when you do not need a combo."
            }
            Self::Magnifier => "Outlines the smallest prime you still have to find.",
            Self::Time => "Adds +30 seconds to the clock instantly.",
            Self::Dynamite => {
                "Blasts 5 random stones so you have fewer chances to slip. \
                 Never harms a crystal."
            }
        }
    }
}

/// Achievements that can be unlocked across sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKey {
    /// Complete any level.
    FirstDig,
    /// Earn three stars on a level.
    Perfect,
    /// Reach a combo of ten.
    FastHands,
    /// Complete a level without mistakes.
    Flawless,
    /// Reach 100 points in a session.
    Rich,
    /// Complete the final level with every level starred.
    Mountain,
    /// Complete a level within thirty seconds.
    Lightning,
}

impl AchievementKey {
    /// Every achievement in catalog order.
    pub const ALL: [AchievementKey; 7] = [
        AchievementKey::FirstDig,
        AchievementKey::Perfect,
        AchievementKey::FastHands,
        AchievementKey::Flawless,
        AchievementKey::Rich,
        AchievementKey::Mountain,
        AchievementKey::Lightning,
    ];

    /// Stable key used in persisted profiles.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::FirstDig => "first_dig",
            Self::Perfect => "perfect",
            Self::FastHands => "fast_hands",
            Self::Flawless => "flawless",
            Self::Rich => "rich",
            Self::Mountain => "mountain",
            Self::Lightning => "lightning",
        }
    }

    /// Parses a persisted key back into an achievement.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|achievement| achievement.key() == key)
    }

    /// Catalog entry describing the achievement.
    #[must_use]
    pub const fn info(self) -> AchievementInfo {
        match self {
            Self::FirstDig => AchievementInfo::new("⛏️", "First Dig", "Find your first crystal"),
            Self::Perfect => AchievementInfo::new("💎", "Perfect Miner", "Earn 3 stars on a dig"),
            Self::FastHands => {
                AchievementInfo::new("⚡", "Fast Hands", "Collect 10 stones in a row")
            }
            Self::Flawless => {
                AchievementInfo::new("🔮", "Flawless Dig", "Finish a dig without a mistake")
            }
            Self::Rich => AchievementInfo::new("💰", "Rich Miner", "Reach 100 points"),
            Self::Mountain => {
                AchievementInfo::new("🏔️", "Mountain Conqueror", "Explore every layer")
            }
            Self::Lightning => {
                AchievementInfo::new("🚀", "Lightning Miner", "Finish a dig in 30 seconds")
            }
        }
    }
}

/// Display metadata of an achievement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AchievementInfo {
    /// Emoji icon.
    pub icon: &'static str,
    /// Short title.
    pub title: &'static str,
    /// Unlock condition phrased for players.
    pub description: &'static str,
}

impl AchievementInfo {
    const fn new(icon: &'static str, title: &'static str, description: &'static str) -> Self {
        Self {
            icon,
            title,
            description,
        }
    }
}

/// Audio cues requested from the feedback collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeedbackCue {
    /// A crystal was selected or a stone collected.
    Crystal,
    /// A combo bonus fired.
    Combo,
    /// An achievement unlocked or the player levelled up.
    Achievement,
    /// A level ended.
    Complete,
    /// A wrong tap or a refused power-up.
    Error,
    /// A power-up took effect.
    PowerUp,
}

/// Where floating text should appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAnchor {
    /// Above the tile carrying the value.
    Tile(TileValue),
    /// Centre of the play area.
    Center,
}

/// Rendering collaborator driven by the session controller.
pub trait Presenter {
    /// Updates the visual state of a single tile.
    fn set_tile_state(&mut self, value: TileValue, state: TileState);

    /// Draws a transient highlight around a tile.
    fn highlight_tile(&mut self, value: TileValue, duration: Duration);

    /// Shows short-lived text such as awarded points.
    fn show_floating_text(&mut self, anchor: TextAnchor, text: &str);

    /// Redraws the level selection list.
    fn render_level_list(
        &mut self,
        levels: &[LevelDefinition],
        stars: &BTreeMap<LevelId, u8>,
        locked: &dyn Fn(LevelId) -> bool,
    );

    /// Redraws the achievement catalog with unlock markers.
    fn render_achievement_list(
        &mut self,
        catalog: &[AchievementKey],
        unlocked: &BTreeSet<AchievementKey>,
    );
}

/// Fire-and-forget audio collaborator.
pub trait FeedbackSink {
    /// Plays the requested cue without blocking.
    fn play_cue(&mut self, cue: FeedbackCue);
}
