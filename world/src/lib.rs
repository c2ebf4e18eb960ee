#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative board state for Crystal Miner.
//!
//! The board owns every tile of the current session together with the active
//! prime, score, combo and mistake counters. It only changes through [`apply`],
//! which reports each transition as an [`Event`].

use crystal_miner_core::{compute_primes, Command, Event, TileState, TileValue};

const ELIMINATION_POINTS: u32 = 10;
const COMBO_BURST_INTERVAL: u32 = 3;
const COMBO_BONUS_FACTOR: u32 = 2;
const CLEARING_POINTS_PER_TILE: u32 = 5;

/// Single numbered tile on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    value: TileValue,
    is_prime: bool,
    state: TileState,
}

impl Tile {
    /// Value printed on the tile.
    #[must_use]
    pub const fn value(&self) -> TileValue {
        self.value
    }

    /// Reports whether the tile carries a prime.
    #[must_use]
    pub const fn is_prime(&self) -> bool {
        self.is_prime
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TileState {
        self.state
    }
}

/// Represents the authoritative Crystal Miner board.
#[derive(Clone, Debug, Default)]
pub struct World {
    max_number: u32,
    tiles: Vec<Tile>,
    primes: Vec<TileValue>,
    active_prime: Option<TileValue>,
    score: u32,
    combo: u32,
    mistakes: u32,
}

impl World {
    /// Creates an empty board; configure it before the first tap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn configure(&mut self, max_number: u32, out_events: &mut Vec<Event>) {
        let primes = compute_primes(max_number);
        let mut tiles: Vec<Tile> = (1..=max_number)
            .map(|value| Tile {
                value: TileValue::new(value),
                is_prime: false,
                state: TileState::Normal,
            })
            .collect();
        for prime in &primes {
            tiles[*prime as usize - 1].is_prime = true;
        }

        *self = Self {
            max_number,
            tiles,
            primes: primes.into_iter().map(TileValue::new).collect(),
            ..Self::default()
        };
        out_events.push(Event::BoardConfigured {
            max_number,
            prime_count: self.primes.len(),
        });
    }

    fn index(&self, value: TileValue) -> usize {
        assert!(
            (1..=self.max_number).contains(&value.get()),
            "tile {value} lies outside the board 1..={}",
            self.max_number
        );
        value.get() as usize - 1
    }

    fn tile(&self, value: TileValue) -> &Tile {
        &self.tiles[self.index(value)]
    }

    fn tile_mut(&mut self, value: TileValue) -> &mut Tile {
        let index = self.index(value);
        &mut self.tiles[index]
    }

    fn remaining_multiples(&self, prime: TileValue) -> impl Iterator<Item = TileValue> + '_ {
        let step = prime.get().max(1) as usize;
        (prime.get() as usize * 2..=self.max_number as usize)
            .step_by(step)
            .map(|value| TileValue::new(value as u32))
            .filter(move |value| self.tile(*value).state != TileState::Eliminated)
    }

    fn select(&mut self, value: TileValue, out_events: &mut Vec<Event>) {
        let tile = *self.tile(value);
        if tile.state.is_terminal() {
            return;
        }

        match self.active_prime {
            None if tile.is_prime => {
                self.tile_mut(value).state = TileState::Prime;
                self.active_prime = Some(value);
                out_events.push(Event::PrimeSelected { value });
                self.check_phase(out_events);
            }
            None => self.record_mistake(value, out_events),
            Some(active) if active == value => {
                self.tile_mut(value).state = TileState::Normal;
                self.active_prime = None;
                out_events.push(Event::PrimeReleased { value });
            }
            Some(active) if value.is_multiple_of(active) => {
                self.eliminate(value, out_events);
                self.check_phase(out_events);
            }
            Some(_) => self.record_mistake(value, out_events),
        }
    }

    fn eliminate(&mut self, value: TileValue, out_events: &mut Vec<Event>) {
        self.tile_mut(value).state = TileState::Eliminated;
        self.combo += 1;
        self.score += ELIMINATION_POINTS;
        out_events.push(Event::TileEliminated {
            value,
            points: ELIMINATION_POINTS,
            combo: self.combo,
        });

        if self.combo % COMBO_BURST_INTERVAL == 0 {
            let bonus = self.combo * COMBO_BONUS_FACTOR;
            self.score += bonus;
            out_events.push(Event::ComboBurst {
                combo: self.combo,
                bonus,
            });
        }
        out_events.push(Event::ScoreChanged { score: self.score });
    }

    fn record_mistake(&mut self, value: TileValue, out_events: &mut Vec<Event>) {
        self.mistakes += 1;
        self.combo = 0;
        out_events.push(Event::MistakeMade { value });
    }

    fn clear_multiples(&mut self, out_events: &mut Vec<Event>) {
        let Some(prime) = self.active_prime else {
            return;
        };

        let tiles: Vec<TileValue> = self.remaining_multiples(prime).collect();
        if tiles.is_empty() {
            return;
        }

        for value in &tiles {
            self.tile_mut(*value).state = TileState::Eliminated;
        }
        let points = CLEARING_POINTS_PER_TILE * tiles.len() as u32;
        self.score += points;
        out_events.push(Event::MultiplesCleared {
            prime,
            tiles,
            points,
        });
        out_events.push(Event::ScoreChanged { score: self.score });
        self.check_phase(out_events);
    }

    fn demolish(&mut self, mut targets: Vec<TileValue>, out_events: &mut Vec<Event>) {
        targets.sort_unstable();
        targets.dedup();
        targets.retain(|value| self.is_demolishable(*value));
        if targets.is_empty() {
            return;
        }

        for value in &targets {
            self.tile_mut(*value).state = TileState::Eliminated;
        }
        out_events.push(Event::TilesDemolished { tiles: targets });
    }

    fn is_demolishable(&self, value: TileValue) -> bool {
        let tile = self.tile(value);
        if tile.is_prime || tile.state != TileState::Normal {
            return false;
        }
        self.active_prime
            .map_or(true, |prime| !value.is_multiple_of(prime))
    }

    fn check_phase(&mut self, out_events: &mut Vec<Event>) {
        let Some(prime) = self.active_prime else {
            return;
        };
        if self.remaining_multiples(prime).next().is_some() {
            return;
        }

        self.tile_mut(prime).state = TileState::Completed;
        self.active_prime = None;
        out_events.push(Event::PhaseCompleted { prime });

        if self.normal_primes().next().is_none() {
            out_events.push(Event::BoardCleared);
        }
    }

    fn normal_primes(&self) -> impl Iterator<Item = TileValue> + '_ {
        self.primes
            .iter()
            .copied()
            .filter(|prime| self.tile(*prime).state == TileState::Normal)
    }
}

/// Applies the provided command to the board, mutating state deterministically.
///
/// # Panics
///
/// Panics when a command names a tile outside `1..=max_number`; adapters must
/// validate player input before issuing commands.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureBoard { max_number } => world.configure(max_number, out_events),
        Command::SelectTile { value } => world.select(value, out_events),
        Command::ClearMultiples => world.clear_multiples(out_events),
        Command::RevealNextPrime => {
            if let Some(value) = world.normal_primes().next() {
                out_events.push(Event::PrimeRevealed { value });
            }
        }
        Command::Demolish { targets } => world.demolish(targets, out_events),
    }
}

/// Query functions that provide read-only access to the board state.
pub mod query {
    use super::{Tile, World};
    use crystal_miner_core::{TileState, TileValue};

    /// Highest tile value on the board, zero before configuration.
    #[must_use]
    pub fn max_number(world: &World) -> u32 {
        world.max_number
    }

    /// Reports whether `value` names a tile on the board.
    #[must_use]
    pub fn contains(world: &World, value: TileValue) -> bool {
        (1..=world.max_number).contains(&value.get())
    }

    /// All tiles in ascending value order.
    #[must_use]
    pub fn tiles(world: &World) -> &[Tile] {
        &world.tiles
    }

    /// State of the tile carrying `value`.
    ///
    /// # Panics
    ///
    /// Panics when `value` lies outside the board.
    #[must_use]
    pub fn tile_state(world: &World, value: TileValue) -> TileState {
        world.tile(value).state
    }

    /// Every prime on the board in ascending order.
    #[must_use]
    pub fn primes(world: &World) -> &[TileValue] {
        &world.primes
    }

    /// Prime whose multiples are currently being collected.
    #[must_use]
    pub fn active_prime(world: &World) -> Option<TileValue> {
        world.active_prime
    }

    /// Score accumulated in the session.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.score
    }

    /// Consecutive correct eliminations since the last mistake.
    #[must_use]
    pub fn combo(world: &World) -> u32 {
        world.combo
    }

    /// Wrong taps recorded in the session.
    #[must_use]
    pub fn mistakes(world: &World) -> u32 {
        world.mistakes
    }

    /// Multiples of `prime` that have not been eliminated yet, ascending.
    #[must_use]
    pub fn remaining_multiples(world: &World, prime: TileValue) -> Vec<TileValue> {
        world.remaining_multiples(prime).collect()
    }

    /// Smallest prime that still waits to be selected.
    #[must_use]
    pub fn next_prime_target(world: &World) -> Option<TileValue> {
        world.normal_primes().next()
    }

    /// Number of primes that still wait to be selected.
    #[must_use]
    pub fn primes_remaining(world: &World) -> usize {
        world.normal_primes().count()
    }

    /// Number of primes whose phase has been completed.
    #[must_use]
    pub fn primes_completed(world: &World) -> usize {
        world
            .primes
            .iter()
            .filter(|prime| world.tile(**prime).state == TileState::Completed)
            .count()
    }

    /// Stones that may be demolished without touching a needed tile, ascending.
    #[must_use]
    pub fn demolition_candidates(world: &World) -> Vec<TileValue> {
        world
            .tiles
            .iter()
            .map(Tile::value)
            .filter(|value| world.is_demolishable(*value))
            .collect()
    }

    /// Reports whether every prime phase on a configured board is complete.
    #[must_use]
    pub fn is_cleared(world: &World) -> bool {
        world.max_number > 0 && world.active_prime.is_none() && primes_remaining(world) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(max_number: u32) -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, Command::ConfigureBoard { max_number }, &mut events);
        world
    }

    fn tap(world: &mut World, value: u32) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::SelectTile {
                value: TileValue::new(value),
            },
            &mut events,
        );
        events
    }

    #[test]
    fn configure_marks_primes() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, Command::ConfigureBoard { max_number: 20 }, &mut events);

        assert_eq!(
            events,
            vec![Event::BoardConfigured {
                max_number: 20,
                prime_count: 8
            }]
        );
        let primes: Vec<u32> = query::tiles(&world)
            .iter()
            .filter(|tile| tile.is_prime())
            .map(|tile| tile.value().get())
            .collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19]);
        assert!(query::tiles(&world)
            .iter()
            .all(|tile| tile.state() == TileState::Normal));
    }

    #[test]
    fn reconfigure_discards_previous_session() {
        let mut world = board(20);
        let _ = tap(&mut world, 4);
        let _ = tap(&mut world, 5);
        let mut events = Vec::new();
        apply(&mut world, Command::ConfigureBoard { max_number: 30 }, &mut events);

        assert_eq!(query::mistakes(&world), 0);
        assert_eq!(query::active_prime(&world), None);
        assert_eq!(query::tiles(&world).len(), 30);
    }

    #[test]
    fn terminal_tiles_ignore_taps() {
        let mut world = board(20);
        let _ = tap(&mut world, 5);
        let _ = tap(&mut world, 10);
        assert!(tap(&mut world, 10).is_empty());
        assert_eq!(query::mistakes(&world), 0);
    }

    #[test]
    fn combo_burst_on_every_third_elimination() {
        let mut world = board(50);
        let _ = tap(&mut world, 2);
        let _ = tap(&mut world, 4);
        let _ = tap(&mut world, 6);
        let events = tap(&mut world, 8);

        assert!(events.contains(&Event::ComboBurst { combo: 3, bonus: 6 }));
        assert_eq!(query::score(&world), 36);
    }

    #[test]
    #[should_panic(expected = "outside the board")]
    fn tapping_outside_the_board_is_a_contract_violation() {
        let mut world = board(20);
        let _ = tap(&mut world, 21);
    }

    #[test]
    fn reveal_points_at_smallest_open_prime() {
        let mut world = board(20);
        let _ = tap(&mut world, 2);
        let mut events = Vec::new();
        apply(&mut world, Command::RevealNextPrime, &mut events);
        assert_eq!(
            events,
            vec![Event::PrimeRevealed {
                value: TileValue::new(3)
            }]
        );
    }
}
