#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure achievement evaluator that maps board events and level outcomes to unlocks.

use std::{collections::BTreeSet, time::Duration};

use crystal_miner_core::{AchievementKey, Event};

/// Combo count that unlocks [`AchievementKey::FastHands`].
pub const FAST_HANDS_COMBO: u32 = 10;
/// Session score that unlocks [`AchievementKey::Rich`].
pub const RICH_SCORE: u32 = 100;
/// Longest completion time that unlocks [`AchievementKey::Lightning`].
pub const LIGHTNING_WINDOW: Duration = Duration::from_secs(30);

/// Facts about a finished level used by the completion predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Whether the board was cleared before the countdown expired.
    pub success: bool,
    /// Wrong taps made during the session.
    pub mistakes: u32,
    /// Star rating awarded for the session.
    pub stars: u8,
    /// Wall-clock time between level start and end.
    pub duration: Duration,
    /// Whether the finished level is the last one in the campaign.
    pub final_level: bool,
    /// Whether every level in the campaign holds at least one star,
    /// counting the result just recorded.
    pub every_level_starred: bool,
}

/// Achievement unlocked by a single board event, if any.
#[must_use]
pub fn event_unlock(event: &Event) -> Option<AchievementKey> {
    match event {
        Event::TileEliminated { combo, .. } if *combo >= FAST_HANDS_COMBO => {
            Some(AchievementKey::FastHands)
        }
        Event::ScoreChanged { score } if *score >= RICH_SCORE => Some(AchievementKey::Rich),
        _ => None,
    }
}

/// Achievements earned by a finished level, in catalog order.
#[must_use]
pub fn completion_unlocks(completion: &Completion) -> Vec<AchievementKey> {
    if !completion.success {
        return Vec::new();
    }

    let mut unlocks = vec![AchievementKey::FirstDig];
    if completion.stars == 3 {
        unlocks.push(AchievementKey::Perfect);
    }
    if completion.mistakes == 0 {
        unlocks.push(AchievementKey::Flawless);
    }
    if completion.final_level && completion.every_level_starred {
        unlocks.push(AchievementKey::Mountain);
    }
    if completion.duration <= LIGHTNING_WINDOW {
        unlocks.push(AchievementKey::Lightning);
    }
    unlocks
}

/// Achievement system that reports each unlock at most once per session.
///
/// Whether an achievement was already unlocked in an earlier session is the
/// progression store's concern; this system only filters repeats within the
/// session it observes.
#[derive(Debug, Default)]
pub struct Achievements {
    reported: BTreeSet<AchievementKey>,
}

impl Achievements {
    /// Creates a new achievement system with an empty session record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the unlocks reported for the previous session.
    pub fn begin_session(&mut self) {
        self.reported.clear();
    }

    /// Consumes board events and emits newly earned achievements.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<AchievementKey>) {
        for event in events {
            if let Some(key) = event_unlock(event) {
                self.report(key, out);
            }
        }
    }

    /// Evaluates a finished level and emits newly earned achievements.
    pub fn handle_completion(&mut self, completion: &Completion, out: &mut Vec<AchievementKey>) {
        for key in completion_unlocks(completion) {
            self.report(key, out);
        }
    }

    fn report(&mut self, key: AchievementKey, out: &mut Vec<AchievementKey>) {
        if self.reported.insert(key) {
            out.push(key);
        }
    }
}
