#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Power-up system that turns player requests into board commands.
//!
//! Each [`PowerUpKind`] maps to a handler in a closed table. Handlers inspect
//! the board through read-only queries and either describe the [`Effect`] to
//! apply or explain why the power-up cannot fire. The system never mutates
//! the board or the inventory itself; the session controller applies the
//! effect and spends the charge only after a successful request.

use std::time::Duration;

use crystal_miner_core::{Command, PowerUpKind};
use crystal_miner_world::{query, World};
use rand::{seq::SliceRandom, RngCore};
use thiserror::Error;
use tracing::debug;

/// Seconds added by the time power-up.
pub const TIME_BONUS: Duration = Duration::from_secs(30);
/// Largest number of stones a single dynamite charge demolishes.
pub const DYNAMITE_BLAST: usize = 5;
/// How long the magnifier keeps its highlight on screen.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_secs(3);

/// Outcome of a successful power-up handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Mutation to submit to the board.
    Board(Command),
    /// Time to add to the running countdown.
    ExtendCountdown(Duration),
}

/// Reasons a power-up request is refused. Refusals never spend a charge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PowerUpError {
    /// The inventory holds no charge of the requested kind.
    #[error("No charges left!")]
    Depleted,
    /// The countdown already reached zero.
    #[error("Time is up!")]
    SessionOver,
    /// Lightning needs an active prime.
    #[error("Select a crystal first!")]
    NoActivePrime,
    /// Every multiple of the active prime is already gone.
    #[error("Nothing left to collect!")]
    NoMultiplesLeft,
    /// No prime waits to be selected.
    #[error("No crystals left!")]
    NoPrimesLeft,
    /// Every remaining tile is a prime or protected.
    #[error("Only crystals left!")]
    OnlyPrimesLeft,
    /// The board offers nothing to demolish.
    #[error("No targets!")]
    NoTargets,
    /// The confirmation token does not match the pending request.
    #[error("That request is no longer pending.")]
    StaleConfirmation,
}

/// Preconditions supplied by the controller for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gate {
    /// Charges of the requested kind in the inventory.
    pub stock: u32,
    /// Time remaining on the countdown.
    pub time_left: Duration,
    /// Whether the one-time tutorial for the kind was acknowledged.
    pub tutorial_seen: bool,
}

/// Ticket identifying a request that waits for tutorial confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConfirmationToken {
    kind: PowerUpKind,
    serial: u64,
}

impl ConfirmationToken {
    /// Power-up the confirmation applies to.
    #[must_use]
    pub const fn kind(&self) -> PowerUpKind {
        self.kind
    }
}

/// Answer to a power-up request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// The effect is ready to apply; the controller spends one charge.
    Execute(Effect),
    /// The player must acknowledge the tutorial before the request is re-issued.
    NeedsConfirmation(ConfirmationToken),
    /// The request was refused without side effects.
    Rejected(PowerUpError),
}

/// Signature shared by every entry of the handler table.
pub type Handler = fn(&World, &mut dyn RngCore) -> Result<Effect, PowerUpError>;

/// Looks up the handler responsible for `kind`.
#[must_use]
pub fn handler(kind: PowerUpKind) -> Handler {
    match kind {
        PowerUpKind::Lightning => lightning,
        PowerUpKind::Magnifier => magnifier,
        PowerUpKind::Time => time,
        PowerUpKind::Dynamite => dynamite,
    }
}

fn lightning(world: &World, _rng: &mut dyn RngCore) -> Result<Effect, PowerUpError> {
    let prime = query::active_prime(world).ok_or(PowerUpError::NoActivePrime)?;
    if query::remaining_multiples(world, prime).is_empty() {
        return Err(PowerUpError::NoMultiplesLeft);
    }
    Ok(Effect::Board(Command::ClearMultiples))
}

fn magnifier(world: &World, _rng: &mut dyn RngCore) -> Result<Effect, PowerUpError> {
    if query::next_prime_target(world).is_none() {
        return Err(PowerUpError::NoPrimesLeft);
    }
    Ok(Effect::Board(Command::RevealNextPrime))
}

fn time(_world: &World, _rng: &mut dyn RngCore) -> Result<Effect, PowerUpError> {
    Ok(Effect::ExtendCountdown(TIME_BONUS))
}

fn dynamite(world: &World, rng: &mut dyn RngCore) -> Result<Effect, PowerUpError> {
    let candidates = query::demolition_candidates(world);
    if candidates.is_empty() {
        let primes_left = query::primes_remaining(world);
        debug!(primes_left, "dynamite found no targets");
        return Err(if primes_left > 0 {
            PowerUpError::OnlyPrimesLeft
        } else {
            PowerUpError::NoTargets
        });
    }

    let mut targets: Vec<_> = candidates
        .choose_multiple(rng, DYNAMITE_BLAST)
        .copied()
        .collect();
    targets.sort_unstable();
    Ok(Effect::Board(Command::Demolish { targets }))
}

/// Power-up system that gates requests behind inventory, time and tutorials.
#[derive(Debug, Default)]
pub struct PowerUps {
    pending: Option<ConfirmationToken>,
    serial: u64,
}

impl PowerUps {
    /// Creates a new power-up system with no pending confirmation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates a request for `kind` against the gate and the board.
    ///
    /// A kind whose tutorial has not been acknowledged yields a
    /// [`Request::NeedsConfirmation`] token and replaces any older pending
    /// token; nothing else happens until the controller confirms it and
    /// issues the request again.
    pub fn request<R: RngCore>(
        &mut self,
        kind: PowerUpKind,
        gate: Gate,
        world: &World,
        rng: &mut R,
    ) -> Request {
        if gate.stock == 0 {
            return Request::Rejected(PowerUpError::Depleted);
        }
        if gate.time_left.is_zero() {
            return Request::Rejected(PowerUpError::SessionOver);
        }
        if !gate.tutorial_seen {
            self.serial += 1;
            let token = ConfirmationToken {
                kind,
                serial: self.serial,
            };
            self.pending = Some(token);
            debug!(kind = kind.key(), "power-up awaits tutorial confirmation");
            return Request::NeedsConfirmation(token);
        }

        match handler(kind)(world, rng) {
            Ok(effect) => Request::Execute(effect),
            Err(error) => {
                debug!(kind = kind.key(), %error, "power-up refused");
                Request::Rejected(error)
            }
        }
    }

    /// Accepts a pending confirmation and returns the kind to re-issue.
    pub fn confirm(&mut self, token: ConfirmationToken) -> Result<PowerUpKind, PowerUpError> {
        if self.pending != Some(token) {
            return Err(PowerUpError::StaleConfirmation);
        }
        self.pending = None;
        Ok(token.kind)
    }

    /// Drops a pending confirmation; returns whether `token` was pending.
    pub fn decline(&mut self, token: ConfirmationToken) -> bool {
        if self.pending != Some(token) {
            return false;
        }
        self.pending = None;
        true
    }

    /// Confirmation currently waiting for an answer.
    #[must_use]
    pub fn pending(&self) -> Option<ConfirmationToken> {
        self.pending
    }

    /// Forgets any pending confirmation, e.g. when the session ends.
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn open_gate() -> Gate {
        Gate {
            stock: 1,
            time_left: Duration::from_secs(10),
            tutorial_seen: true,
        }
    }

    #[test]
    fn gate_checks_run_before_the_tutorial() {
        let mut power_ups = PowerUps::new();
        let world = World::new();
        let mut rng = StepRng::new(0, 1);

        let depleted = Gate {
            stock: 0,
            tutorial_seen: false,
            ..open_gate()
        };
        assert_eq!(
            power_ups.request(PowerUpKind::Time, depleted, &world, &mut rng),
            Request::Rejected(PowerUpError::Depleted)
        );

        let expired = Gate {
            time_left: Duration::ZERO,
            tutorial_seen: false,
            ..open_gate()
        };
        assert_eq!(
            power_ups.request(PowerUpKind::Time, expired, &world, &mut rng),
            Request::Rejected(PowerUpError::SessionOver)
        );
        assert_eq!(power_ups.pending(), None);
    }

    #[test]
    fn unseen_tutorial_yields_single_use_token() {
        let mut power_ups = PowerUps::new();
        let world = World::new();
        let mut rng = StepRng::new(0, 1);
        let gate = Gate {
            tutorial_seen: false,
            ..open_gate()
        };

        let Request::NeedsConfirmation(token) =
            power_ups.request(PowerUpKind::Time, gate, &world, &mut rng)
        else {
            panic!("expected a confirmation request");
        };
        assert_eq!(token.kind(), PowerUpKind::Time);
        assert_eq!(power_ups.confirm(token), Ok(PowerUpKind::Time));
        assert_eq!(
            power_ups.confirm(token),
            Err(PowerUpError::StaleConfirmation)
        );
    }

    #[test]
    fn newer_request_supersedes_pending_token() {
        let mut power_ups = PowerUps::new();
        let world = World::new();
        let mut rng = StepRng::new(0, 1);
        let gate = Gate {
            tutorial_seen: false,
            ..open_gate()
        };

        let Request::NeedsConfirmation(first) =
            power_ups.request(PowerUpKind::Time, gate, &world, &mut rng)
        else {
            panic!("expected a confirmation request");
        };
        let Request::NeedsConfirmation(second) =
            power_ups.request(PowerUpKind::Dynamite, gate, &world, &mut rng)
        else {
            panic!("expected a confirmation request");
        };

        assert!(!power_ups.decline(first));
        assert!(power_ups.decline(second));
        assert_eq!(power_ups.pending(), None);
    }

    #[test]
    fn time_always_extends_the_countdown() {
        let world = World::new();
        let mut rng = StepRng::new(0, 1);
        assert_eq!(
            handler(PowerUpKind::Time)(&world, &mut rng),
            Ok(Effect::ExtendCountdown(TIME_BONUS))
        );
    }
}
