#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session controller that runs one level at a time.
//!
//! [`Game`] owns the board, the countdown and the player's progression. It
//! turns player input into board commands, routes the resulting events to the
//! presenter, feedback and achievement collaborators, and settles rewards
//! exactly once when a level ends.

pub mod rewards;
pub mod timer;

use std::time::Duration;

use crystal_miner_core::{
    AchievementKey, Campaign, Command, Event, FeedbackCue, FeedbackSink, LevelDefinition,
    LevelId, PowerUpKind, Presenter, TextAnchor, TileState, TileValue,
};
use crystal_miner_system_achievements::{Achievements, Completion};
use crystal_miner_system_powerups::{
    ConfirmationToken, Effect, Gate, PowerUpError, PowerUps, Request, HIGHLIGHT_DURATION,
};
use crystal_miner_system_progression::{PlayerProfile, ProfileStore, Progression};
use crystal_miner_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

pub use rewards::{roll_grants, star_rating, xp_reward};
pub use timer::{Clock, ManualClock, TickHandle};

/// Interval between countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const DEFAULT_SEED: u64 = 0x6c72_7973_7461_6c21;

/// Static configuration of a [`Game`].
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Levels available to the player.
    pub campaign: Campaign,
    /// Seed for every random choice the game makes.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            campaign: Campaign::default(),
            seed: DEFAULT_SEED,
        }
    }
}

/// Lifecycle of the current session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No level is being played.
    Idle,
    /// The countdown is running and the board accepts input.
    Running,
    /// The countdown is suspended and input is ignored.
    Paused,
    /// The board was cleared in time.
    Succeeded,
    /// The countdown expired.
    Failed,
}

impl SessionPhase {
    /// Whether a level is in progress, paused or not.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

/// Errors returned by session operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The campaign has no level with this id.
    #[error("level {0} does not exist")]
    UnknownLevel(LevelId),
    /// The previous level has not been completed yet.
    #[error("level {0} is locked")]
    LevelLocked(LevelId),
    /// The operation needs a running level.
    #[error("no level is running")]
    NotRunning,
    /// No level has been started yet.
    #[error("no level has been played yet")]
    NoLevelPlayed,
    /// The tapped value is not on the board.
    #[error("tile {0} is not on the board")]
    OffBoard(TileValue),
    /// A power-up tutorial is waiting for an answer.
    #[error("answer the {} tutorial first", .0.key())]
    AwaitingConfirmation(PowerUpKind),
}

/// Answer to a power-up request made through the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerUpOutcome {
    /// The power-up took effect and one charge was spent.
    Executed {
        /// Kind that fired.
        kind: PowerUpKind,
        /// Charges of that kind left afterwards.
        remaining: u32,
    },
    /// The tutorial must be confirmed or declined first.
    NeedsConfirmation(ConfirmationToken),
    /// Nothing happened.
    Rejected(PowerUpError),
}

/// Summary of a finished level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelReport {
    /// Level that was played.
    pub level: LevelId,
    /// Whether the board was cleared in time.
    pub success: bool,
    /// Star rating awarded.
    pub stars: u8,
    /// Final score.
    pub score: u32,
    /// Wrong taps made.
    pub mistakes: u32,
    /// Experience awarded.
    pub xp_gained: u32,
    /// Player levels gained from that experience.
    pub levels_gained: u32,
    /// Power-ups granted.
    pub grants: Vec<PowerUpKind>,
    /// Achievements newly unlocked during the session.
    pub unlocked: Vec<AchievementKey>,
    /// Time between level start and end.
    pub duration: Duration,
}

#[derive(Debug)]
struct Session {
    level: LevelDefinition,
    time_left_secs: u32,
    started_at: Duration,
    countdown: Option<TickHandle>,
    unlocked: Vec<AchievementKey>,
}

/// Owner of the active session and the collaborators it drives.
#[derive(Debug)]
pub struct Game<C, S, P, F> {
    campaign: Campaign,
    clock: C,
    progression: Progression<S>,
    presenter: P,
    feedback: F,
    world: World,
    phase: SessionPhase,
    session: Option<Session>,
    achievements: Achievements,
    power_ups: PowerUps,
    rng: ChaCha8Rng,
    report: Option<LevelReport>,
}

impl<C, S, P, F> Game<C, S, P, F>
where
    C: Clock,
    S: ProfileStore,
    P: Presenter,
    F: FeedbackSink,
{
    /// Opens the profile in `store` and shows the menus.
    pub fn new(config: GameConfig, clock: C, store: S, presenter: P, feedback: F) -> Self {
        let mut game = Self {
            campaign: config.campaign,
            clock,
            progression: Progression::open(store),
            presenter,
            feedback,
            world: World::new(),
            phase: SessionPhase::Idle,
            session: None,
            achievements: Achievements::new(),
            power_ups: PowerUps::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            report: None,
        };
        game.render_menus();
        game
    }

    /// Starts `id` on a fresh board, abandoning whatever was in progress.
    pub fn start_level(&mut self, id: LevelId) -> Result<(), SessionError> {
        let level = *self
            .campaign
            .level(id)
            .ok_or(SessionError::UnknownLevel(id))?;
        if self.progression.profile().is_level_locked(id) {
            return Err(SessionError::LevelLocked(id));
        }

        self.stop_countdown();
        self.power_ups.cancel_pending();
        self.achievements.begin_session();
        self.report = None;

        self.world = World::new();
        self.submit(Command::ConfigureBoard {
            max_number: level.max_number(),
        });

        let countdown = self.clock.schedule_tick(TICK_INTERVAL);
        self.session = Some(Session {
            level,
            time_left_secs: level.time_limit_secs(),
            started_at: self.clock.now(),
            countdown: Some(countdown),
            unlocked: Vec::new(),
        });
        self.phase = SessionPhase::Running;
        info!(
            level = id.get(),
            max_number = level.max_number(),
            time_limit = level.time_limit_secs(),
            "level started"
        );
        Ok(())
    }

    /// Starts the current level again.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        let id = self.current_level().ok_or(SessionError::NoLevelPlayed)?;
        self.start_level(id)
    }

    /// Starts the level after the current one, staying on the final level.
    pub fn next_level(&mut self) -> Result<(), SessionError> {
        let id = self.current_level().ok_or(SessionError::NoLevelPlayed)?;
        let next = self.campaign.next_after(id);
        self.start_level(next)
    }

    /// Abandons the session and returns to the menus.
    pub fn leave(&mut self) {
        self.stop_countdown();
        self.power_ups.cancel_pending();
        self.session = None;
        self.phase = SessionPhase::Idle;
        self.render_menus();
    }

    /// Suspends the countdown; returns whether a running level was paused.
    pub fn pause(&mut self) -> bool {
        if self.phase != SessionPhase::Running {
            return false;
        }
        self.stop_countdown();
        self.phase = SessionPhase::Paused;
        debug!("session paused");
        true
    }

    /// Restarts the countdown; returns whether a paused level resumed.
    pub fn resume(&mut self) -> bool {
        if self.phase != SessionPhase::Paused {
            return false;
        }
        let handle = self.clock.schedule_tick(TICK_INTERVAL);
        if let Some(session) = self.session.as_mut() {
            session.countdown = Some(handle);
        }
        self.phase = SessionPhase::Running;
        debug!("session resumed");
        true
    }

    /// Delivers one countdown tick; ticks from cancelled streams are ignored.
    pub fn tick(&mut self, handle: TickHandle) {
        if self.phase != SessionPhase::Running {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.countdown != Some(handle) {
            debug!(handle = handle.get(), "ignoring stale tick");
            return;
        }

        session.time_left_secs = session.time_left_secs.saturating_sub(1);
        if session.time_left_secs == 0 {
            self.end_game(false);
        }
    }

    /// Handles a tap on the tile carrying `value`. Taps are refused while a
    /// tutorial confirmation is open.
    pub fn tap(&mut self, value: TileValue) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Running {
            return Err(SessionError::NotRunning);
        }
        if let Some(token) = self.power_ups.pending() {
            return Err(SessionError::AwaitingConfirmation(token.kind()));
        }
        if !query::contains(&self.world, value) {
            return Err(SessionError::OffBoard(value));
        }
        self.submit(Command::SelectTile { value });
        Ok(())
    }

    /// Asks for a power-up; tutorials are confirmed through
    /// [`Game::confirm_power_up`].
    pub fn request_power_up(&mut self, kind: PowerUpKind) -> Result<PowerUpOutcome, SessionError> {
        if self.phase != SessionPhase::Running {
            return Err(SessionError::NotRunning);
        }

        let profile = self.progression.profile();
        let gate = Gate {
            stock: profile.inventory(kind),
            time_left: self.time_left(),
            tutorial_seen: profile.has_seen_tutorial(kind),
        };
        let effect = match self
            .power_ups
            .request(kind, gate, &self.world, &mut self.rng)
        {
            Request::Execute(effect) => effect,
            Request::NeedsConfirmation(token) => {
                return Ok(PowerUpOutcome::NeedsConfirmation(token));
            }
            Request::Rejected(error) => {
                self.feedback.play_cue(FeedbackCue::Error);
                self.presenter
                    .show_floating_text(TextAnchor::Center, &error.to_string());
                return Ok(PowerUpOutcome::Rejected(error));
            }
        };

        let _ = self.progression.consume_power_up(kind);
        let remaining = self.progression.profile().inventory(kind);
        info!(kind = kind.key(), remaining, "power-up used");
        self.feedback.play_cue(FeedbackCue::PowerUp);
        match effect {
            Effect::Board(command) => self.submit(command),
            Effect::ExtendCountdown(extra) => self.extend_countdown(extra),
        }
        Ok(PowerUpOutcome::Executed { kind, remaining })
    }

    /// Acknowledges a tutorial and re-issues the request it interrupted.
    pub fn confirm_power_up(
        &mut self,
        token: ConfirmationToken,
    ) -> Result<PowerUpOutcome, SessionError> {
        if self.phase != SessionPhase::Running {
            return Err(SessionError::NotRunning);
        }
        let kind = match self.power_ups.confirm(token) {
            Ok(kind) => kind,
            Err(error) => return Ok(PowerUpOutcome::Rejected(error)),
        };
        self.progression.mark_tutorial_seen(kind);
        self.request_power_up(kind)
    }

    /// Dismisses a tutorial without using the power-up.
    pub fn decline_power_up(&mut self, token: ConfirmationToken) -> bool {
        self.power_ups.decline(token)
    }

    /// Ends the running level. Calling it again has no effect.
    pub fn end_game(&mut self, success: bool) {
        if !self.phase.is_live() {
            return;
        }
        self.stop_countdown();
        self.power_ups.cancel_pending();
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let level = session.level;
        let duration = self.clock.now().saturating_sub(session.started_at);
        self.phase = if success {
            SessionPhase::Succeeded
        } else {
            SessionPhase::Failed
        };

        let mistakes = query::mistakes(&self.world);
        let score = query::score(&self.world);
        let stars = star_rating(success, mistakes);
        let _ = self.progression.record_stars(level.id(), stars);

        let profile = self.progression.profile();
        let completion = Completion {
            success,
            mistakes,
            stars,
            duration,
            final_level: level.id() == self.campaign.final_level(),
            every_level_starred: self
                .campaign
                .levels()
                .iter()
                .all(|definition| profile.stars(definition.id()) > 0),
        };
        let mut unlocks = Vec::new();
        self.achievements.handle_completion(&completion, &mut unlocks);
        for key in unlocks {
            self.unlock(key);
        }

        let xp_gained = xp_reward(&level, success, stars);
        let levels_gained = self.progression.add_xp(xp_gained);
        if levels_gained > 0 {
            self.feedback.play_cue(FeedbackCue::Achievement);
        }
        let grants = roll_grants(level.id(), success, stars, &mut self.rng);
        for kind in &grants {
            self.progression.grant_power_up(*kind);
        }

        self.feedback.play_cue(FeedbackCue::Complete);
        self.render_menus();
        info!(
            level = level.id().get(),
            success,
            stars,
            score,
            xp_gained,
            "level finished"
        );
        self.report = Some(LevelReport {
            level: level.id(),
            success,
            stars,
            score,
            mistakes,
            xp_gained,
            levels_gained,
            grants,
            unlocked: self
                .session
                .as_ref()
                .map(|session| session.unlocked.clone())
                .unwrap_or_default(),
            duration,
        });
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Level of the current or most recent session.
    #[must_use]
    pub fn current_level(&self) -> Option<LevelId> {
        self.session.as_ref().map(|session| session.level.id())
    }

    /// Countdown remaining in the current session.
    #[must_use]
    pub fn time_left(&self) -> Duration {
        self.session
            .as_ref()
            .map_or(Duration::ZERO, |session| {
                Duration::from_secs(u64::from(session.time_left_secs))
            })
    }

    /// Summary of the most recently finished level.
    #[must_use]
    pub fn report(&self) -> Option<&LevelReport> {
        self.report.as_ref()
    }

    /// Confirmation waiting for an answer, if any.
    #[must_use]
    pub fn pending_confirmation(&self) -> Option<ConfirmationToken> {
        self.power_ups.pending()
    }

    /// Board of the current session.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Player profile.
    #[must_use]
    pub fn profile(&self) -> &PlayerProfile {
        self.progression.profile()
    }

    /// Persistent progression and its store.
    #[must_use]
    pub fn progression(&self) -> &Progression<S> {
        &self.progression
    }

    /// Levels on offer.
    #[must_use]
    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    /// Whether `id` may be started.
    #[must_use]
    pub fn is_level_locked(&self, id: LevelId) -> bool {
        self.progression.profile().is_level_locked(id)
    }

    /// Clock driving the countdown.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Mutable access to the clock, used by drivers to advance time.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Presentation collaborator.
    #[must_use]
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Mutable access to the presentation collaborator.
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Feedback collaborator.
    #[must_use]
    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    /// Mutable access to the feedback collaborator.
    pub fn feedback_mut(&mut self) -> &mut F {
        &mut self.feedback
    }

    fn submit(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        for event in &events {
            self.present(event);
        }

        let mut unlocks = Vec::new();
        self.achievements.handle(&events, &mut unlocks);
        for key in unlocks {
            self.unlock(key);
        }

        if events.contains(&Event::BoardCleared) {
            self.end_game(true);
        }
    }

    fn present(&mut self, event: &Event) {
        match event {
            Event::BoardConfigured { max_number, .. } => {
                for value in 1..=*max_number {
                    self.presenter
                        .set_tile_state(TileValue::new(value), TileState::Normal);
                }
            }
            Event::PrimeSelected { value } => {
                self.presenter.set_tile_state(*value, TileState::Prime);
                self.feedback.play_cue(FeedbackCue::Crystal);
            }
            Event::PrimeReleased { value } => {
                self.presenter.set_tile_state(*value, TileState::Normal);
            }
            Event::TileEliminated { value, points, .. } => {
                self.presenter.set_tile_state(*value, TileState::Eliminated);
                self.presenter
                    .show_floating_text(TextAnchor::Tile(*value), &format!("+{points}"));
                self.feedback.play_cue(FeedbackCue::Crystal);
            }
            Event::ComboBurst { combo, bonus } => {
                self.presenter.show_floating_text(
                    TextAnchor::Center,
                    &format!("Combo x{combo}! +{bonus}"),
                );
                self.feedback.play_cue(FeedbackCue::Combo);
            }
            Event::MistakeMade { value } => {
                self.presenter
                    .show_floating_text(TextAnchor::Tile(*value), "Oops!");
                self.feedback.play_cue(FeedbackCue::Error);
            }
            Event::MultiplesCleared { tiles, points, .. } => {
                for value in tiles {
                    self.presenter.set_tile_state(*value, TileState::Eliminated);
                }
                self.presenter
                    .show_floating_text(TextAnchor::Center, &format!("+{points}"));
            }
            Event::PrimeRevealed { value } => {
                self.presenter.highlight_tile(*value, HIGHLIGHT_DURATION);
            }
            Event::TilesDemolished { tiles } => {
                for value in tiles {
                    self.presenter.set_tile_state(*value, TileState::Eliminated);
                }
            }
            Event::PhaseCompleted { prime } => {
                self.presenter.set_tile_state(*prime, TileState::Completed);
            }
            Event::ScoreChanged { .. } | Event::BoardCleared => {}
        }
    }

    fn unlock(&mut self, key: AchievementKey) {
        if !self.progression.unlock(key) {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.unlocked.push(key);
        }
        let info = key.info();
        self.presenter.show_floating_text(
            TextAnchor::Center,
            &format!("{} {}", info.icon, info.title),
        );
        self.feedback.play_cue(FeedbackCue::Achievement);
        self.presenter
            .render_achievement_list(&AchievementKey::ALL, self.progression.profile().unlocked());
    }

    fn extend_countdown(&mut self, extra: Duration) {
        if let Some(session) = self.session.as_mut() {
            let extra = u32::try_from(extra.as_secs()).unwrap_or(u32::MAX);
            session.time_left_secs = session.time_left_secs.saturating_add(extra);
        }
    }

    fn stop_countdown(&mut self) {
        let handle = self
            .session
            .as_mut()
            .and_then(|session| session.countdown.take());
        if let Some(handle) = handle {
            self.clock.cancel(handle);
        }
    }

    fn render_menus(&mut self) {
        let profile = self.progression.profile();
        self.presenter.render_level_list(
            self.campaign.levels(),
            profile.star_record(),
            &|id| profile.is_level_locked(id),
        );
        self.presenter
            .render_achievement_list(&AchievementKey::ALL, profile.unlocked());
    }
}
