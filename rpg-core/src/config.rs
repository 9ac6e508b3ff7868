//! Engine configuration.

use std::path::{Path, PathBuf};

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "RPG_DATA_DIR";

/// Data directory used when nothing else is configured.
pub const DEFAULT_DATA_DIR: &str = "gamedata";

/// Configuration for the combat engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Root directory; combat saves and character sheets live below it.
    pub data_dir: PathBuf,

    /// Number of log entries included in a combat summary.
    pub summary_log_len: usize,

    /// Hit points for participants that do not specify any.
    pub default_hp: i32,

    /// Armor class for participants that do not specify one.
    pub default_ac: i32,
}

impl EngineConfig {
    /// Create a config rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            summary_log_len: 5,
            default_hp: 10,
            default_ac: 10,
        }
    }

    /// Build from `RPG_DATA_DIR`, falling back to `gamedata`.
    pub fn from_env() -> Self {
        let dir = std::env::var(DATA_DIR_ENV)
            .ok()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        Self::new(dir)
    }

    /// Set how many log entries summaries carry.
    pub fn with_summary_log_len(mut self, len: usize) -> Self {
        self.summary_log_len = len;
        self
    }

    /// Set the fallback hit points.
    pub fn with_default_hp(mut self, hp: i32) -> Self {
        self.default_hp = hp;
        self
    }

    /// Set the fallback armor class.
    pub fn with_default_ac(mut self, ac: i32) -> Self {
        self.default_ac = ac;
        self
    }

    pub fn combat_dir(&self) -> PathBuf {
        self.data_dir.join("combat")
    }

    pub fn characters_dir(&self) -> PathBuf {
        self.data_dir.join("characters")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
