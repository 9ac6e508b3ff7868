//! Testing utilities for the combat engine.
//!
//! This module provides:
//! - `ScriptedRoller` for deterministic dice
//! - `TestHarness` wiring a service, stores and a temporary data directory
//! - Assertion helpers for verifying combat state

use crate::character::{create_sample_fighter, Character};
use crate::combat::{CombatService, CombatState, Combatant, ParticipantDescriptor};
use crate::config::EngineConfig;
use crate::dice::DiceRoller;
use crate::persist::CombatStateStore;
use crate::store::{CharacterStore, JsonCharacterStore};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A roller that replays a fixed sequence of values, cycling when exhausted.
///
/// Values are clamped into the requested range, so a scripted 20 used for a
/// d6 comes out as 6. Clones share the same script.
#[derive(Debug, Clone)]
pub struct ScriptedRoller {
    script: Arc<Mutex<Script>>,
}

#[derive(Debug)]
struct Script {
    values: Vec<i32>,
    draws: usize,
}

impl ScriptedRoller {
    pub fn new(values: impl IntoIterator<Item = i32>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                values: values.into_iter().collect(),
                draws: 0,
            })),
        }
    }

    /// Number of values drawn so far.
    pub fn draws(&self) -> usize {
        self.script.lock().map(|s| s.draws).unwrap_or(0)
    }
}

impl DiceRoller for ScriptedRoller {
    fn roll(&self, min: i32, max: i32) -> i32 {
        let Ok(mut script) = self.script.lock() else {
            return min;
        };
        if script.values.is_empty() {
            return min;
        }
        let value = script.values[script.draws % script.values.len()];
        script.draws += 1;
        value.clamp(min, max.max(min))
    }
}

/// Test harness for running combat scenarios against real storage.
pub struct TestHarness {
    pub service: CombatService,
    pub characters: Arc<JsonCharacterStore>,
    pub combats: CombatStateStore,
    pub roller: ScriptedRoller,
    pub hero: Character,
}

impl TestHarness {
    /// Harness rooted at `data_dir` with a saved sample fighter.
    pub fn new(data_dir: &Path, rolls: impl IntoIterator<Item = i32>) -> Self {
        let config = EngineConfig::new(data_dir);
        let characters = Arc::new(JsonCharacterStore::new(config.characters_dir()));
        let hero = create_sample_fighter("Test Hero");
        if let Err(e) = characters.save_character(&hero) {
            panic!("could not seed test character: {e}");
        }

        let roller = ScriptedRoller::new(rolls);
        let service = CombatService::new(characters.clone())
            .with_roller(roller.clone())
            .with_config(config.clone());

        Self {
            service,
            characters,
            combats: CombatStateStore::new(config.combat_dir()),
            roller,
            hero,
        }
    }

    /// Start a fight between the sample hero and the given enemies.
    pub fn start(&self, enemies: &[ParticipantDescriptor]) -> CombatState {
        let mut participants = vec![ParticipantDescriptor::player(self.hero.name.clone())];
        participants.extend_from_slice(enemies);
        self.service.start_combat(&participants, Some(&self.hero))
    }

    /// The hero's hit points as currently stored on disk.
    pub fn stored_hero_hp(&self) -> i32 {
        match self.characters.get_character(self.hero.id) {
            Ok(c) => c.combat_stats.current_hit_points,
            Err(e) => panic!("hero missing from store: {e}"),
        }
    }
}

/// Look a combatant up by name, panicking with context if absent.
#[track_caller]
pub fn combatant<'a>(state: &'a CombatState, name: &str) -> &'a Combatant {
    match state.find_by_name(name) {
        Some(c) => c,
        None => panic!("Expected combatant '{name}' in combat"),
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert a combatant's hit points.
#[track_caller]
pub fn assert_hp(state: &CombatState, name: &str, current: i32, max: i32) {
    let c = combatant(state, name);
    assert_eq!(
        (c.current_hit_points, c.max_hit_points),
        (current, max),
        "Expected {name} at {current}/{max} HP, got {}/{}",
        c.current_hit_points,
        c.max_hit_points
    );
}

/// Assert some log entry contains `needle`.
#[track_caller]
pub fn assert_logged(state: &CombatState, needle: &str) {
    assert!(
        state.log.iter().any(|entry| entry.contains(needle)),
        "Expected a log entry containing '{needle}', log was:\n{}",
        state.log.join("\n")
    );
}

/// Assert the fight is still running.
#[track_caller]
pub fn assert_active(state: &CombatState) {
    assert!(state.is_active, "Expected combat to be active");
}

/// Assert the fight is over.
#[track_caller]
pub fn assert_ended(state: &CombatState) {
    assert!(!state.is_active, "Expected combat to have ended");
}
