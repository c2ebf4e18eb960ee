use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crystal_miner_system_progression::{ProfileSnapshot, ProfileStore, StoreError};
use serde_json::Value;
use tracing::warn;

/// Profile store backed by a single JSON document on disk.
#[derive(Debug)]
pub(crate) struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for JsonFileStore {
    fn load(&mut self) -> Result<ProfileSnapshot, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok(ProfileSnapshot::new());
            }
            Err(error) => return Err(error.into()),
        };
        let entries: BTreeMap<String, Value> = serde_json::from_str(&contents)?;
        Ok(snapshot_from_entries(entries))
    }

    fn save(&mut self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Keeps every entry it can read as text; the profile normalizes values.
fn snapshot_from_entries(entries: BTreeMap<String, Value>) -> ProfileSnapshot {
    let mut snapshot = ProfileSnapshot::new();
    for (key, value) in entries {
        match value {
            Value::String(text) => snapshot.set(key, text),
            Value::Null => warn!(%key, "dropping empty profile entry"),
            other => {
                warn!(%key, "profile entry is not text; reading it as JSON");
                snapshot.set(key, other.to_string());
            }
        }
    }
    snapshot
}
