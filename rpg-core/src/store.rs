//! Character storage used for hit point write-back.

use crate::character::{Character, CharacterId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Errors from character storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Character not found: {0}")]
    NotFound(CharacterId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Character store is unavailable")]
    Unavailable,
}

/// Read and write access to persistent character sheets.
///
/// Calls are synchronous; implementations are expected to hit local storage.
pub trait CharacterStore: Send + Sync {
    fn get_character(&self, id: CharacterId) -> Result<Character, StoreError>;
    fn save_character(&self, character: &Character) -> Result<(), StoreError>;
}

/// One pretty-printed JSON file per character under a directory.
#[derive(Debug, Clone)]
pub struct JsonCharacterStore {
    dir: PathBuf,
}

impl JsonCharacterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: CharacterId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl CharacterStore for JsonCharacterStore {
    fn get_character(&self, id: CharacterId) -> Result<Character, StoreError> {
        let content = match std::fs::read_to_string(self.path_for(id)) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn save_character(&self, character: &Character) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(character)?;
        std::fs::write(self.path_for(character.id), content)?;
        Ok(())
    }
}

/// In-process store, handy for tests and for hosts that own persistence.
#[derive(Debug, Default)]
pub struct MemoryCharacterStore {
    characters: RwLock<HashMap<CharacterId, Character>>,
}

impl MemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_characters(characters: impl IntoIterator<Item = Character>) -> Self {
        Self {
            characters: RwLock::new(characters.into_iter().map(|c| (c.id, c)).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.characters.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CharacterStore for MemoryCharacterStore {
    fn get_character(&self, id: CharacterId) -> Result<Character, StoreError> {
        let characters = self.characters.read().map_err(|_| StoreError::Unavailable)?;
        characters.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn save_character(&self, character: &Character) -> Result<(), StoreError> {
        let mut characters = self.characters.write().map_err(|_| StoreError::Unavailable)?;
        characters.insert(character.id, character.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::create_sample_fighter;

    #[test]
    fn test_json_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCharacterStore::new(dir.path().join("characters"));

        let fighter = create_sample_fighter("Thorin");
        store.save_character(&fighter).unwrap();

        let loaded = store.get_character(fighter.id).unwrap();
        assert_eq!(loaded, fighter);
        assert!(store.path_for(fighter.id).exists());
    }

    #[test]
    fn test_json_store_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCharacterStore::new(dir.path());
        let id = CharacterId::new();
        assert!(matches!(store.get_character(id), Err(StoreError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn test_memory_store() {
        let fighter = create_sample_fighter("Thorin");
        let store = MemoryCharacterStore::with_characters([fighter.clone()]);
        assert_eq!(store.len(), 1);

        let mut changed = store.get_character(fighter.id).unwrap();
        changed.combat_stats.current_hit_points = 3;
        store.save_character(&changed).unwrap();

        assert_eq!(
            store
                .get_character(fighter.id)
                .unwrap()
                .combat_stats
                .current_hit_points,
            3
        );
    }
}
