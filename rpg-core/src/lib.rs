//! Turn-based combat engine for an LLM-run tabletop RPG.
//!
//! This crate provides:
//! - A combat state model (participants, initiative, turns, rounds, log)
//! - A rules service resolving attacks, damage, healing and end of combat
//! - Player hit point write-back to persistent character sheets
//! - Per-session persistence of combat state with conflict detection
//! - A JSON tool surface for a game-master agent
//!
//! # Quick Start
//!
//! ```ignore
//! use rpg_core::{CombatTools, EngineConfig, ToolSession};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let tools = CombatTools::from_config(EngineConfig::from_env());
//!     let session = ToolSession::new("campaign-42");
//!
//!     let started = tools
//!         .execute(&session, "start_combat", &json!({
//!             "location": "Old Mill",
//!             "participants": [
//!                 { "name": "Aria", "role": "player", "hp": 24, "ac": 15 },
//!                 { "name": "Goblin", "role": "enemy", "hp": 7, "ac": 13 }
//!             ]
//!         }))
//!         .await;
//!     println!("{}", started["message"]);
//!
//!     let attack = tools
//!         .execute(&session, "execute_attack", &json!({
//!             "attacker_id": "Aria",
//!             "target_id": "Goblin"
//!         }))
//!         .await;
//!     println!("{}", attack["message"]);
//! }
//! ```

pub mod character;
pub mod combat;
pub mod config;
pub mod dice;
pub mod persist;
pub mod store;
pub mod testing;
pub mod tools;

// Re-export for convenience
pub use rpg_macros::Tool;

// Primary public API
pub use character::{Character, CharacterId, Npc};
pub use combat::{CombatError, CombatService, CombatState, CombatSummary, ParticipantDescriptor};
pub use config::EngineConfig;
pub use dice::{roll_dice, DiceRoller, RandomRoller};
pub use persist::{CombatStateStore, LoadError, PersistError};
pub use store::{CharacterStore, JsonCharacterStore, MemoryCharacterStore};
pub use tools::{CombatTools, ToolError, ToolSession};
