use crystal_miner_core::{Command, Event, TileState, TileValue};
use crystal_miner_world::{self as world, query, World};

fn configured(max_number: u32) -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(&mut world, Command::ConfigureBoard { max_number }, &mut events);
    world
}

fn tap(world: &mut World, value: u32) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::SelectTile {
            value: TileValue::new(value),
        },
        &mut events,
    );
    events
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

#[test]
fn non_prime_without_selection_is_a_mistake() {
    let mut world = configured(50);
    let events = tap(&mut world, 12);

    assert_eq!(
        events,
        vec![Event::MistakeMade {
            value: TileValue::new(12)
        }]
    );
    assert_eq!(query::mistakes(&world), 1);
    assert_eq!(query::score(&world), 0);
    assert_eq!(query::tile_state(&world, TileValue::new(12)), TileState::Normal);
}

#[test]
fn clearing_all_multiples_of_seven_scores_with_combo_bonuses() {
    let mut world = configured(50);
    let _ = tap(&mut world, 7);
    assert_eq!(query::active_prime(&world), Some(TileValue::new(7)));

    let order = [49, 14, 35, 21, 42, 28];
    let mut bursts = Vec::new();
    for (index, value) in order.iter().enumerate() {
        let events = tap(&mut world, *value);
        bursts.extend(events.iter().filter_map(|event| match event {
            Event::ComboBurst { combo, bonus } => Some((*combo, *bonus)),
            _ => None,
        }));

        let completed = events.contains(&Event::PhaseCompleted {
            prime: TileValue::new(7),
        });
        assert_eq!(
            completed,
            index == order.len() - 1,
            "phase must complete exactly after the sixth tap"
        );
    }

    assert_eq!(bursts, vec![(3, 6), (6, 12)]);
    assert_eq!(query::score(&world), 78);
    for value in order {
        assert_eq!(
            query::tile_state(&world, TileValue::new(value)),
            TileState::Eliminated
        );
    }
    assert_eq!(query::tile_state(&world, TileValue::new(7)), TileState::Completed);
    assert_eq!(query::active_prime(&world), None);
    assert_eq!(query::tile_state(&world, TileValue::new(13)), TileState::Normal);
}

#[test]
fn wrong_tap_with_active_prime_keeps_selection_and_resets_combo() {
    let mut world = configured(30);
    let _ = tap(&mut world, 5);
    let _ = tap(&mut world, 10);
    let _ = tap(&mut world, 15);
    assert_eq!(query::combo(&world), 2);

    let events = tap(&mut world, 12);
    assert_eq!(
        events,
        vec![Event::MistakeMade {
            value: TileValue::new(12)
        }]
    );
    assert_eq!(query::combo(&world), 0);
    assert_eq!(query::mistakes(&world), 1);
    assert_eq!(query::active_prime(&world), Some(TileValue::new(5)));
    assert_eq!(query::score(&world), 20);
}

#[test]
fn tapping_active_prime_again_releases_it_without_penalty() {
    let mut world = configured(30);
    let _ = tap(&mut world, 3);
    let events = tap(&mut world, 3);

    assert_eq!(
        events,
        vec![Event::PrimeReleased {
            value: TileValue::new(3)
        }]
    );
    assert_eq!(query::active_prime(&world), None);
    assert_eq!(query::tile_state(&world, TileValue::new(3)), TileState::Normal);
    assert_eq!(query::mistakes(&world), 0);
}

#[test]
fn prime_without_open_multiples_completes_on_selection() {
    let mut world = configured(20);
    let events = tap(&mut world, 11);

    assert_eq!(
        events,
        vec![
            Event::PrimeSelected {
                value: TileValue::new(11)
            },
            Event::PhaseCompleted {
                prime: TileValue::new(11)
            },
        ]
    );
    assert_eq!(query::tile_state(&world, TileValue::new(11)), TileState::Completed);
}

#[test]
fn completing_the_last_prime_clears_the_board() {
    let mut world = configured(5);
    let _ = tap(&mut world, 2);
    let _ = tap(&mut world, 4);
    let _ = tap(&mut world, 3);
    let events = tap(&mut world, 5);

    assert_eq!(events.last(), Some(&Event::BoardCleared));
    assert!(query::is_cleared(&world));
}

#[test]
fn clearing_multiples_awards_flat_points() {
    let mut world = configured(20);
    let _ = tap(&mut world, 5);
    let events = run(&mut world, Command::ClearMultiples);

    assert_eq!(
        events[0],
        Event::MultiplesCleared {
            prime: TileValue::new(5),
            tiles: vec![TileValue::new(10), TileValue::new(15), TileValue::new(20)],
            points: 15,
        }
    );
    assert!(events.contains(&Event::PhaseCompleted {
        prime: TileValue::new(5)
    }));
    assert_eq!(query::score(&world), 15);
    assert_eq!(query::combo(&world), 0);
}

#[test]
fn clearing_without_active_prime_changes_nothing() {
    let mut world = configured(20);
    assert!(run(&mut world, Command::ClearMultiples).is_empty());
    assert_eq!(query::score(&world), 0);
}

#[test]
fn demolition_spares_primes_and_active_multiples() {
    let mut world = configured(30);
    let _ = tap(&mut world, 3);
    let targets = [1, 4, 6, 7, 9, 10, 4]
        .into_iter()
        .map(TileValue::new)
        .collect();
    let events = run(&mut world, Command::Demolish { targets });

    assert_eq!(
        events,
        vec![Event::TilesDemolished {
            tiles: vec![TileValue::new(1), TileValue::new(4), TileValue::new(10)],
        }]
    );
    assert_eq!(query::tile_state(&world, TileValue::new(6)), TileState::Normal);
    assert_eq!(query::tile_state(&world, TileValue::new(7)), TileState::Normal);
    assert_eq!(query::score(&world), 0);
}

#[test]
fn demolition_candidates_exclude_completed_phase_tiles() {
    let mut world = configured(10);
    let _ = tap(&mut world, 5);
    let _ = tap(&mut world, 10);
    assert_eq!(query::tile_state(&world, TileValue::new(5)), TileState::Completed);

    let candidates: Vec<u32> = query::demolition_candidates(&world)
        .into_iter()
        .map(|value| value.get())
        .collect();
    assert_eq!(candidates, vec![1, 4, 6, 8, 9]);

    let _ = tap(&mut world, 2);
    let candidates: Vec<u32> = query::demolition_candidates(&world)
        .into_iter()
        .map(|value| value.get())
        .collect();
    assert_eq!(candidates, vec![1, 9]);
}
