//! Combat state: participants, turn order, rounds and the event log.
//!
//! These types hold no rules. Everything that changes a fight goes through
//! [`CombatService`](super::CombatService).

use crate::character::{Character, Npc, Weapon};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a combat instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatId(pub Uuid);

impl CombatId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a combatant within a fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CombatantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(CombatantId)
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// Which camp a combatant fights for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    #[default]
    NonPlayer,
}

/// The sheet behind a combatant. Players are written back to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backing {
    Player(Character),
    #[serde(rename = "npc")]
    NonPlayer(Npc),
}

impl Backing {
    pub fn side(&self) -> Side {
        match self {
            Backing::Player(_) => Side::Player,
            Backing::NonPlayer(_) => Side::NonPlayer,
        }
    }

    pub fn attack_bonus(&self) -> i32 {
        match self {
            Backing::Player(c) => c.combat_stats.attack_bonus,
            Backing::NonPlayer(n) => n.combat_stats.attack_bonus,
        }
    }

    pub fn initiative_bonus(&self) -> i32 {
        match self {
            Backing::Player(c) => c.calculate_initiative(),
            Backing::NonPlayer(n) => n.initiative_bonus(),
        }
    }

    /// First carried weapon, or an unarmed strike.
    pub fn weapon(&self) -> Weapon {
        let equipment = match self {
            Backing::Player(c) => &c.equipment,
            Backing::NonPlayer(n) => &n.equipment,
        };
        equipment.primary_weapon().cloned().unwrap_or_else(Weapon::unarmed)
    }
}

/// One participant in a fight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub current_hit_points: i32,
    pub max_hit_points: i32,
    pub armor_class: i32,
    #[serde(default)]
    pub initiative_roll: i32,
    pub backing: Backing,
}

impl Combatant {
    pub fn new(
        name: impl Into<String>,
        current_hit_points: i32,
        max_hit_points: i32,
        armor_class: i32,
        backing: Backing,
    ) -> Self {
        Self {
            id: CombatantId::new(),
            name: name.into(),
            current_hit_points,
            max_hit_points,
            armor_class,
            initiative_roll: 0,
            backing,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current_hit_points > 0
    }

    pub fn side(&self) -> Side {
        self.backing.side()
    }

    pub fn is_player(&self) -> bool {
        self.side() == Side::Player
    }

    /// Reduce hit points, never below zero. Returns the damage actually taken.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.current_hit_points;
        self.current_hit_points = before.saturating_sub(amount.max(0)).max(0);
        before.saturating_sub(self.current_hit_points)
    }

    /// Restore hit points up to the maximum. Returns the amount restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current_hit_points;
        self.current_hit_points = before
            .saturating_add(amount.max(0))
            .min(self.max_hit_points.max(before));
        self.current_hit_points.saturating_sub(before)
    }
}

// ============================================================================
// Combat State
// ============================================================================

/// The whole of one fight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    #[serde(rename = "combat_id")]
    pub id: CombatId,
    /// In creation order, not turn order.
    pub participants: Vec<Combatant>,
    #[serde(default)]
    pub turn_order: Vec<CombatantId>,
    #[serde(default)]
    pub current_turn_combatant_id: Option<CombatantId>,
    #[serde(default = "first_round")]
    pub round_number: u32,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub log: Vec<String>,
    /// Bumped on every save; used to detect concurrent writers.
    #[serde(default)]
    pub revision: u64,
}

fn first_round() -> u32 {
    1
}

fn active() -> bool {
    true
}

impl CombatState {
    pub fn new(participants: Vec<Combatant>) -> Self {
        Self {
            id: CombatId::new(),
            participants,
            turn_order: Vec::new(),
            current_turn_combatant_id: None,
            round_number: first_round(),
            is_active: true,
            log: Vec::new(),
            revision: 0,
        }
    }

    /// Append an entry prefixed with the current round.
    pub fn add_log_entry(&mut self, entry: impl AsRef<str>) {
        self.log
            .push(format!("Round {} - {}", self.round_number, entry.as_ref()));
    }

    pub fn get_combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.participants.iter().find(|c| c.id == id)
    }

    pub fn get_combatant_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.participants.iter_mut().find(|c| c.id == id)
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Combatant> {
        self.participants
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn current_combatant(&self) -> Option<&Combatant> {
        self.current_turn_combatant_id
            .and_then(|id| self.get_combatant(id))
    }

    pub fn living(&self) -> impl Iterator<Item = &Combatant> {
        self.participants.iter().filter(|c| c.is_alive())
    }

    pub fn fallen(&self) -> impl Iterator<Item = &Combatant> {
        self.participants.iter().filter(|c| !c.is_alive())
    }

    /// True if at least one combatant on `side` can still fight.
    pub fn side_standing(&self, side: Side) -> bool {
        self.living().any(|c| c.side() == side)
    }

    /// Most recent `n` log entries, oldest first.
    pub fn recent_log(&self, n: usize) -> &[String] {
        let start = self.log.len().saturating_sub(n);
        &self.log[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{create_sample_fighter, synthesize_npc};

    fn goblin(hp: i32) -> Combatant {
        Combatant::new(
            "Goblin",
            hp,
            7,
            13,
            Backing::NonPlayer(synthesize_npc("Goblin", None, 7, 13)),
        )
    }

    #[test]
    fn test_take_damage_clamps() {
        let mut c = goblin(7);
        assert_eq!(c.take_damage(3), 3);
        assert_eq!(c.current_hit_points, 4);
        assert_eq!(c.take_damage(10), 4);
        assert_eq!(c.current_hit_points, 0);
        assert!(!c.is_alive());
        assert_eq!(c.take_damage(5), 0);
    }

    #[test]
    fn test_negative_damage_is_ignored() {
        let mut c = goblin(5);
        assert_eq!(c.take_damage(-3), 0);
        assert_eq!(c.current_hit_points, 5);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut c = goblin(2);
        assert_eq!(c.heal(3), 3);
        assert_eq!(c.heal(10), 2);
        assert_eq!(c.current_hit_points, 7);
    }

    #[test]
    fn test_hp_arithmetic_saturates() {
        let mut c = goblin(7);
        c.max_hit_points = i32::MAX;
        c.current_hit_points = 2_147_483_000;
        assert_eq!(c.heal(10_000), 647);
        assert_eq!(c.current_hit_points, i32::MAX);
        assert_eq!(c.heal(i32::MAX), 0);
        assert_eq!(c.take_damage(i32::MAX), i32::MAX);
        assert_eq!(c.current_hit_points, 0);
    }

    #[test]
    fn test_log_prefix_tracks_round() {
        let mut state = CombatState::new(vec![goblin(7)]);
        state.add_log_entry("Combat started.");
        state.round_number = 3;
        state.add_log_entry("Something happened.");
        assert_eq!(state.log[0], "Round 1 - Combat started.");
        assert_eq!(state.log[1], "Round 3 - Something happened.");
    }

    #[test]
    fn test_backing_serializes_with_type_tag() {
        let fighter = create_sample_fighter("Thorin");
        let c = Combatant::new("Thorin", 28, 28, 16, Backing::Player(fighter));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["backing"]["type"], "player");

        let g = goblin(7);
        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["backing"]["type"], "npc");
        let back: Combatant = serde_json::from_value(json).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn test_state_defaults_for_missing_fields() {
        let g = goblin(7);
        let json = serde_json::json!({
            "combat_id": CombatId::new(),
            "participants": [g],
        });
        let state: CombatState = serde_json::from_value(json).unwrap();
        assert_eq!(state.round_number, 1);
        assert!(state.is_active);
        assert!(state.turn_order.is_empty());
        assert_eq!(state.revision, 0);
    }

    #[test]
    fn test_recent_log() {
        let mut state = CombatState::new(Vec::new());
        for i in 0..7 {
            state.add_log_entry(format!("event {i}"));
        }
        let recent = state.recent_log(5);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0], "Round 1 - event 2");
        assert_eq!(state.recent_log(50).len(), 7);
    }

    #[test]
    fn test_combatant_id_parse() {
        let id = CombatantId::new();
        assert_eq!(id.to_string().parse::<CombatantId>().unwrap(), id);
        assert!("not-an-id".parse::<CombatantId>().is_err());
    }
}
