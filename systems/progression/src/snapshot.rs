//! Key-value snapshot that persists a player profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Key holding the player level as a decimal number.
pub const PLAYER_LEVEL_KEY: &str = "player_level";
/// Key holding the experience carried towards the next level.
pub const XP_KEY: &str = "xp";
/// Key holding a JSON object of best star ratings keyed by level id.
pub const STARS_KEY: &str = "stars";
/// Key holding a JSON object of unlocked achievement flags.
pub const ACHIEVEMENTS_KEY: &str = "achievements";
/// Key holding a JSON object of power-up counts.
pub const POWERUPS_KEY: &str = "powerups";
/// Key holding a JSON object of acknowledged power-up tutorials.
pub const TUTORIALS_SEEN_KEY: &str = "tutorials_seen";

/// Versionless key-value representation of a player profile.
///
/// Values are plain strings; composite values hold JSON text. Absent or
/// unreadable entries fall back to defaults when the profile is rebuilt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileSnapshot {
    entries: BTreeMap<String, String>,
}

impl ProfileSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.entries.insert(key.into(), value.into());
    }

    /// Reports whether the snapshot holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub(crate) fn number(&self, key: &str) -> Option<u32> {
        let raw = self.get(key)?;
        match raw.trim().parse::<u32>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, raw, "discarding unreadable profile number");
                None
            }
        }
    }

    pub(crate) fn object(&self, key: &str) -> BTreeMap<String, Value> {
        let Some(raw) = self.get(key) else {
            return BTreeMap::new();
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            Ok(Value::Null) => BTreeMap::new(),
            Ok(_) | Err(_) => {
                warn!(key, raw, "discarding malformed profile entry");
                BTreeMap::new()
            }
        }
    }

    pub(crate) fn set_object<K, V>(&mut self, key: &str, map: &BTreeMap<K, V>)
    where
        K: Serialize + Ord,
        V: Serialize,
    {
        match serde_json::to_string(map) {
            Ok(json) => self.set(key, json),
            Err(error) => warn!(key, %error, "failed to encode profile entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_tolerate_whitespace_and_reject_garbage() {
        let mut snapshot = ProfileSnapshot::new();
        snapshot.set(XP_KEY, " 42 ");
        snapshot.set(PLAYER_LEVEL_KEY, "two");
        assert_eq!(snapshot.number(XP_KEY), Some(42));
        assert_eq!(snapshot.number(PLAYER_LEVEL_KEY), None);
        assert_eq!(snapshot.number(STARS_KEY), None);
    }

    #[test]
    fn objects_fall_back_to_empty() {
        let mut snapshot = ProfileSnapshot::new();
        snapshot.set(STARS_KEY, "[1, 2]");
        snapshot.set(POWERUPS_KEY, "{not json");
        snapshot.set(ACHIEVEMENTS_KEY, "null");
        assert!(snapshot.object(STARS_KEY).is_empty());
        assert!(snapshot.object(POWERUPS_KEY).is_empty());
        assert!(snapshot.object(ACHIEVEMENTS_KEY).is_empty());
        assert!(snapshot.object(TUTORIALS_SEEN_KEY).is_empty());
    }

    #[test]
    fn serializes_as_flat_string_map() {
        let mut snapshot = ProfileSnapshot::new();
        snapshot.set(XP_KEY, "10");
        let json = serde_json::to_string(&snapshot).expect("serialize");
        assert_eq!(json, r#"{"xp":"10"}"#);
    }
}
