//! City persistence.
//!
//! The engine saves through the [`CityStore`] trait at tick boundaries and on
//! exit. Two stores ship with the crate: an in-memory map for tests and hosts
//! that persist elsewhere, and a directory of versioned JSON files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use city_model::{City, GameState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current save file version.
pub const SAVE_VERSION: u32 = 1;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// A saved city with the session state needed to resume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCity {
    /// Save format version for compatibility checking.
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub city: City,
    #[serde(default)]
    pub game_state: GameState,
}

impl SavedCity {
    pub fn new(city: &City, game_state: &GameState, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at,
            city: city.clone(),
            game_state: game_state.clone(),
        }
    }
}

/// Where cities are kept between runs.
pub trait CityStore {
    fn save(&mut self, saved: &SavedCity) -> Result<(), StoreError>;

    fn load(&self, city_id: &str) -> Result<Option<SavedCity>, StoreError>;

    /// Explicit removal; cities are never deleted implicitly.
    fn remove(&mut self, city_id: &str) -> Result<bool, StoreError>;

    /// Ids of every stored city, sorted.
    fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// Keeps saves in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saves: BTreeMap<String, SavedCity>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.saves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saves.is_empty()
    }
}

impl CityStore for MemoryStore {
    fn save(&mut self, saved: &SavedCity) -> Result<(), StoreError> {
        self.saves.insert(saved.city.id.clone(), saved.clone());
        Ok(())
    }

    fn load(&self, city_id: &str) -> Result<Option<SavedCity>, StoreError> {
        Ok(self.saves.get(city_id).cloned())
    }

    fn remove(&mut self, city_id: &str) -> Result<bool, StoreError> {
        Ok(self.saves.remove(city_id).is_some())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.saves.keys().cloned().collect())
    }
}

/// One pretty-printed JSON file per city in a directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, city_id: &str) -> PathBuf {
        let safe: String = city_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl CityStore for JsonDirStore {
    fn save(&mut self, saved: &SavedCity) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(saved)?;
        let path = self.path_for(&saved.city.id);
        // Readers only ever see a complete file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, city_id: &str) -> Result<Option<SavedCity>, StoreError> {
        let path = self.path_for(city_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let saved: SavedCity = serde_json::from_str(&content)?;
        if saved.version != SAVE_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }
        Ok(Some(saved))
    }

    fn remove(&mut self, city_id: &str) -> Result<bool, StoreError> {
        let path = self.path_for(city_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
