//! Combat state persistence.
//!
//! One pretty-printed JSON file per session under `{data_dir}/combat/`.
//! Saves carry a revision number so two writers working from the same
//! snapshot cannot silently overwrite each other. The revision check and the
//! write happen under a per-session lock shared by every clone of a store.

use crate::combat::CombatState;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;

/// Errors from saving or deleting combat state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Combat state was modified concurrently: expected revision {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },
}

/// Why a saved combat could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No combat found for session {0}")]
    NotFound(String),

    #[error("Saved combat for session {session} is unreadable: {reason}")]
    Corrupt { session: String, reason: String },
}

/// Fields read without deserializing a whole combat.
#[derive(Deserialize)]
struct Header {
    #[serde(default = "assume_active")]
    is_active: bool,
    #[serde(default)]
    revision: u64,
}

fn assume_active() -> bool {
    true
}

type SessionLocks = Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>;

/// File-backed store of combat state, keyed by session id.
#[derive(Debug, Clone)]
pub struct CombatStateStore {
    dir: PathBuf,
    locks: Arc<SessionLocks>,
}

impl CombatStateStore {
    /// Store files directly inside `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Arc::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the save file for a session.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        let sanitized: String = session_id
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{sanitized}_combat.json"))
    }

    /// Write `state`, bumping its revision.
    ///
    /// Fails with [`PersistError::Conflict`] if the file on disk is at a
    /// different revision than `state` was loaded at. An unreadable file on
    /// disk is overwritten.
    pub async fn save(&self, session_id: &str, state: &mut CombatState) -> Result<(), PersistError> {
        let path = self.path_for(session_id);
        let lock = self.lock_for(&path);
        let _guard = lock.lock().await;
        self.check_revision(session_id, &path, state.revision).await?;

        fs::create_dir_all(&self.dir).await?;
        state.revision += 1;
        let written = async {
            let content = serde_json::to_string_pretty(&*state)?;
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, content).await?;
            fs::rename(&tmp, &path).await?;
            Ok::<(), PersistError>(())
        }
        .await;

        if written.is_err() {
            state.revision -= 1;
        } else {
            tracing::debug!(session_id, revision = state.revision, "combat state saved");
        }
        written
    }

    /// Load a session's combat, telling a missing file apart from a bad one.
    pub async fn load(&self, session_id: &str) -> Result<CombatState, LoadError> {
        let path = self.path_for(session_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(session_id.to_string()))
            }
            Err(e) => {
                return Err(LoadError::Corrupt {
                    session: session_id.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_str(&content).map_err(|e| LoadError::Corrupt {
            session: session_id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load a session's combat, treating a corrupt file as no combat.
    pub async fn load_optional(&self, session_id: &str) -> Option<CombatState> {
        match self.load(session_id).await {
            Ok(state) => Some(state),
            Err(LoadError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "ignoring unreadable combat state");
                None
            }
        }
    }

    /// Remove a session's saved combat. Missing files are fine.
    pub async fn delete(&self, session_id: &str) -> Result<(), PersistError> {
        let path = self.path_for(session_id);
        let lock = self.lock_for(&path);
        let _guard = lock.lock().await;
        self.remove(session_id, &path).await
    }

    /// Remove a session's saved combat, unless someone saved over `state`
    /// since it was loaded.
    pub async fn discard(&self, session_id: &str, state: &CombatState) -> Result<(), PersistError> {
        let path = self.path_for(session_id);
        let lock = self.lock_for(&path);
        let _guard = lock.lock().await;
        self.check_revision(session_id, &path, state.revision).await?;
        self.remove(session_id, &path).await
    }

    async fn remove(&self, session_id: &str, path: &Path) -> Result<(), PersistError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(session_id, "combat state deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// True if a readable save exists and its combat is still running.
    pub async fn has_active_combat(&self, session_id: &str) -> bool {
        matches!(
            self.read_header(&self.path_for(session_id)).await,
            Ok(Some(Header { is_active: true, .. }))
        )
    }

    /// The write lock for one save file.
    fn lock_for(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    /// Fail unless the file on disk is absent or at `revision`.
    async fn check_revision(
        &self,
        session_id: &str,
        path: &Path,
        revision: u64,
    ) -> Result<(), PersistError> {
        match self.read_header(path).await? {
            Some(header) if header.revision != revision => {
                tracing::warn!(
                    session_id,
                    expected = revision,
                    found = header.revision,
                    "refusing to overwrite newer combat state"
                );
                Err(PersistError::Conflict {
                    expected: revision,
                    found: header.revision,
                })
            }
            _ => Ok(()),
        }
    }

    /// Peek at the header of a save file. `None` if the file is absent or
    /// unreadable.
    async fn read_header(&self, path: &Path) -> Result<Option<Header>, PersistError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Header>(&content) {
            Ok(header) => Ok(Some(header)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable combat state header");
                Ok(None)
            }
        }
    }
}
