use crystal_miner_core::{AchievementKey, LevelId, PowerUpKind};
use crystal_miner_system_progression::{
    MemoryStore, PlayerProfile, ProfileSnapshot, ProfileStore, Progression, StoreError,
    POWERUPS_KEY, STARS_KEY, XP_KEY,
};

fn store_with(entries: &[(&str, &str)]) -> MemoryStore {
    let mut snapshot = ProfileSnapshot::new();
    for (key, value) in entries {
        snapshot.set(*key, *value);
    }
    MemoryStore::with_snapshot(snapshot)
}

#[test]
fn opening_writes_normalized_profile_back() {
    let progression = Progression::open(store_with(&[(POWERUPS_KEY, "{}")]));

    assert_eq!(progression.store().saves(), 1);
    let stored = PlayerProfile::from_snapshot(progression.store().snapshot());
    assert_eq!(&stored, progression.profile());
    for kind in PowerUpKind::ALL {
        assert_eq!(progression.profile().inventory(kind), 1);
    }
}

#[test]
fn all_zero_inventory_is_refilled_on_open() {
    let progression = Progression::open(store_with(&[(
        POWERUPS_KEY,
        r#"{"lightning":0,"magnifier":0,"time":0,"dynamite":0}"#,
    )]));

    for kind in PowerUpKind::ALL {
        assert_eq!(progression.profile().inventory(kind), 1);
    }
    assert_eq!(
        progression.store().snapshot().get(POWERUPS_KEY),
        Some(r#"{"dynamite":1,"lightning":1,"magnifier":1,"time":1}"#)
    );
}

#[test]
fn partially_spent_inventory_is_left_alone() {
    let progression = Progression::open(store_with(&[(
        POWERUPS_KEY,
        r#"{"lightning":0,"magnifier":2,"time":0,"dynamite":0}"#,
    )]));
    assert_eq!(progression.profile().inventory(PowerUpKind::Lightning), 0);
    assert_eq!(progression.profile().inventory(PowerUpKind::Magnifier), 2);
}

#[test]
fn every_mutation_is_persisted_immediately() {
    let mut progression = Progression::open(MemoryStore::new());
    let baseline = progression.store().saves();

    assert!(progression.record_stars(LevelId::new(1), 2));
    assert_eq!(progression.store().saves(), baseline + 1);
    assert_eq!(progression.store().snapshot().get(STARS_KEY), Some(r#"{"1":2}"#));

    assert!(!progression.record_stars(LevelId::new(1), 1));
    assert_eq!(progression.store().saves(), baseline + 1);

    assert_eq!(progression.add_xp(130), 1);
    assert_eq!(progression.store().snapshot().get(XP_KEY), Some("30"));

    assert!(progression.unlock(AchievementKey::FirstDig));
    assert!(!progression.unlock(AchievementKey::FirstDig));
    assert_eq!(progression.store().saves(), baseline + 3);

    assert!(progression.consume_power_up(PowerUpKind::Time));
    assert!(!progression.consume_power_up(PowerUpKind::Time));
    progression.grant_power_up(PowerUpKind::Time);
    progression.mark_tutorial_seen(PowerUpKind::Time);
    progression.mark_tutorial_seen(PowerUpKind::Time);
    assert_eq!(progression.store().saves(), baseline + 6);

    let reloaded = Progression::open(MemoryStore::with_snapshot(
        progression.store().snapshot().clone(),
    ));
    assert_eq!(reloaded.profile(), progression.profile());
}

struct BrokenStore;

impl ProfileStore for BrokenStore {
    fn load(&mut self) -> Result<ProfileSnapshot, StoreError> {
        Err(StoreError::Unavailable("disk missing".to_owned()))
    }

    fn save(&mut self, _snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk missing".to_owned()))
    }
}

#[test]
fn storage_failures_fall_back_to_defaults() {
    let mut progression = Progression::open(BrokenStore);
    assert_eq!(progression.profile(), &PlayerProfile::default());
    assert!(progression.unlock(AchievementKey::Rich));
    assert!(progression.profile().is_unlocked(AchievementKey::Rich));
}

#[test]
fn rejected_saves_keep_the_live_profile() {
    let mut progression = Progression::open(MemoryStore::new().rejecting_saves());
    assert_eq!(progression.add_xp(50), 0);
    assert_eq!(progression.profile().xp(), 50);
    assert_eq!(progression.store().saves(), 0);
}

#[derive(Default)]
struct UnreadableStore {
    saves: usize,
}

impl ProfileStore for UnreadableStore {
    fn load(&mut self) -> Result<ProfileSnapshot, StoreError> {
        Err(StoreError::Unavailable("corrupt profile".to_owned()))
    }

    fn save(&mut self, _snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        self.saves += 1;
        Ok(())
    }
}

#[test]
fn unreadable_store_is_never_overwritten() {
    let mut progression = Progression::open(UnreadableStore::default());
    assert_eq!(progression.add_xp(30), 0);
    assert!(progression.unlock(AchievementKey::FirstDig));

    assert_eq!(progression.profile().xp(), 30);
    assert_eq!(progression.store().saves, 0);
}
