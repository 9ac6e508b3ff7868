//! Combat resolution.
//!
//! [`CombatService`] owns no fight state. Each operation takes a
//! [`CombatState`] by mutable reference and applies one rules step to it:
//! initiative, attacks, damage, healing, turn advancement and ending.
//!
//! Failures caused by bad input (unknown ids, downed combatants, acting after
//! the fight is over) come back as [`CombatError`] values whose text is fit to
//! show the agent. Nothing in here panics on content data.

use super::state::{Backing, CombatState, Combatant, CombatantId, Side};
use super::summary::{CombatSummary, EndReason};
use crate::character::{synthesize_npc, Character, CharacterId, CombatStats, Npc, Weapon};
use crate::config::EngineConfig;
use crate::dice::{roll_dice_with_mode, DiceRoller, RandomRoller, RollMode};
use crate::store::{CharacterStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Soft failures of combat operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CombatError {
    #[error("Invalid combatant reference: '{0}'")]
    InvalidReference(String),

    #[error("{0} is down and cannot attack!")]
    AttackerDown(String),

    #[error("{0} is already down.")]
    TargetDown(String),

    #[error("Combat has already ended.")]
    CombatEnded,
}

/// Ceiling on hit points a descriptor may ask for.
const MAX_HIT_POINTS: i32 = 1_000_000;

/// Ceiling on armor class a descriptor may ask for.
const MAX_ARMOR_CLASS: i32 = 100;

/// Attack and initiative bonuses from descriptors stay within this magnitude.
const MAX_BONUS: i32 = 100;

fn clamp_bonus(bonus: i32) -> i32 {
    bonus.clamp(-MAX_BONUS, MAX_BONUS)
}

// ============================================================================
// Participant Descriptors
// ============================================================================

/// Loose description of someone joining a fight.
///
/// Anything left unset falls back to the referenced sheet, then to engine
/// defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantDescriptor {
    pub name: String,
    pub side: Side,
    pub hp: Option<i32>,
    pub max_hp: Option<i32>,
    pub armor_class: Option<i32>,
    /// Initiative bonus override; only honoured for non-players.
    pub initiative: Option<i32>,
    pub attack_bonus: Option<i32>,
    pub archetype: Option<String>,
    pub character_id: Option<CharacterId>,
    pub character: Option<Character>,
    pub npc: Option<Npc>,
}

impl ParticipantDescriptor {
    pub fn player(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            side: Side::Player,
            ..Self::default()
        }
    }

    pub fn enemy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            side: Side::NonPlayer,
            ..Self::default()
        }
    }

    pub fn with_hp(mut self, hp: i32, max_hp: i32) -> Self {
        self.hp = Some(hp);
        self.max_hp = Some(max_hp);
        self
    }

    pub fn with_armor_class(mut self, ac: i32) -> Self {
        self.armor_class = Some(ac);
        self
    }

    pub fn with_attack_bonus(mut self, bonus: i32) -> Self {
        self.attack_bonus = Some(bonus);
        self
    }

    pub fn with_initiative(mut self, bonus: i32) -> Self {
        self.initiative = Some(bonus);
        self
    }

    pub fn with_character(mut self, character: Character) -> Self {
        self.character = Some(character);
        self
    }

    pub fn with_npc(mut self, npc: Npc) -> Self {
        self.npc = Some(npc);
        self
    }

    /// Read a descriptor from agent-supplied JSON.
    ///
    /// Unknown or mistyped fields are ignored rather than rejected.
    pub fn from_json(input: &Value) -> Self {
        let int = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| input[*k].as_i64())
                .map(|v| v.clamp(-(MAX_HIT_POINTS as i64), MAX_HIT_POINTS as i64) as i32)
        };
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| input[*k].as_str())
                .map(str::to_string)
        };

        let side = match text(&["camp", "role", "side", "type"]) {
            Some(label) => side_from_label(&label),
            None if input["is_player"].as_bool() == Some(true) => Side::Player,
            None => Side::NonPlayer,
        };

        Self {
            name: text(&["name"]).unwrap_or_default(),
            side,
            hp: int(&["hp", "current_hp", "current_hit_points"]),
            max_hp: int(&["max_hp", "max_hit_points"]),
            armor_class: int(&["ac", "armor_class"]),
            initiative: int(&["initiative", "initiative_bonus"]),
            attack_bonus: int(&["attack_bonus"]),
            archetype: text(&["archetype"]),
            character_id: text(&["character_id"])
                .and_then(|s| uuid::Uuid::parse_str(s.trim()).ok())
                .map(CharacterId),
            character: serde_json::from_value(input["character"].clone()).ok(),
            npc: serde_json::from_value(input["npc"].clone()).ok(),
        }
    }
}

fn side_from_label(label: &str) -> Side {
    match label.trim().to_lowercase().as_str() {
        "player" | "players" | "ally" | "allies" | "pc" | "hero" | "party" => Side::Player,
        _ => Side::NonPlayer,
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Where damage came from, for the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DamageSource {
    Attack,
    #[default]
    Effect,
}

impl fmt::Display for DamageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageSource::Attack => write!(f, "Attack"),
            DamageSource::Effect => write!(f, "Effect"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    pub target_id: CombatantId,
    pub target_name: String,
    pub requested: i32,
    pub actual: i32,
    pub remaining_hp: i32,
    pub max_hp: i32,
    pub defeated: bool,
}

impl DamageReport {
    /// True if the target had fewer hit points than the requested damage.
    pub fn clamped(&self) -> bool {
        self.requested != self.actual
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealReport {
    pub target_id: CombatantId,
    pub target_name: String,
    pub requested: i32,
    pub healed: i32,
    pub remaining_hp: i32,
    pub max_hp: i32,
}

/// How an attack roll landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    /// Natural 1.
    Fumble,
    Miss,
    Hit,
    /// Natural 20.
    Critical,
}

impl HitKind {
    pub fn is_hit(self) -> bool {
        matches!(self, HitKind::Hit | HitKind::Critical)
    }
}

/// Natural 20 always hits, natural 1 always misses, otherwise meet the AC.
pub fn determine_hit(natural: i32, attack_bonus: i32, armor_class: i32) -> HitKind {
    match natural {
        20 => HitKind::Critical,
        1 => HitKind::Fumble,
        n if n.saturating_add(attack_bonus) >= armor_class => HitKind::Hit,
        _ => HitKind::Miss,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub attacker_id: CombatantId,
    pub target_id: CombatantId,
    pub weapon: String,
    pub natural_roll: i32,
    pub attack_total: i32,
    pub result: HitKind,
    pub damage: Option<DamageReport>,
    pub narrative: String,
}

/// What an attacker brings to a swing.
struct AttackProfile {
    name: String,
    weapon: Weapon,
    attack_bonus: i32,
}

impl AttackProfile {
    fn of(combatant: &Combatant) -> Self {
        Self {
            name: combatant.name.clone(),
            weapon: combatant.backing.weapon(),
            attack_bonus: combatant.backing.attack_bonus(),
        }
    }
}

// ============================================================================
// Combat Service
// ============================================================================

/// Applies combat rules to a [`CombatState`].
pub struct CombatService {
    roller: Box<dyn DiceRoller>,
    characters: Arc<dyn CharacterStore>,
    config: EngineConfig,
}

impl CombatService {
    /// Create a service with a random roller and default config.
    pub fn new(characters: Arc<dyn CharacterStore>) -> Self {
        Self {
            roller: Box::new(RandomRoller),
            characters,
            config: EngineConfig::default(),
        }
    }

    /// Replace the dice source.
    pub fn with_roller(mut self, roller: impl DiceRoller + 'static) -> Self {
        self.roller = Box::new(roller);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Start & initiative
    // ------------------------------------------------------------------------

    /// Build a fight from participant descriptors and roll initiative.
    ///
    /// The session character plays at most one player descriptor: the one
    /// named after it, or else the first player with no sheet of its own.
    pub fn start_combat(
        &self,
        participants: &[ParticipantDescriptor],
        session_character: Option<&Character>,
    ) -> CombatState {
        let slot = session_character.and_then(|c| session_slot(participants, c));
        let combatants = participants
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let sheet = if slot == Some(i) { session_character } else { None };
                self.build_combatant(i, d, sheet)
            })
            .collect();

        let mut state = CombatState::new(combatants);
        state.add_log_entry("Combat started.");
        tracing::info!(
            combat_id = %state.id,
            participants = state.participants.len(),
            "combat started"
        );
        self.roll_initiative(&mut state);
        state
    }

    /// `session_character` is only passed for the descriptor the session's
    /// own character plays; other players without a sheet get a fresh one
    /// that has no stored record.
    fn build_combatant(
        &self,
        index: usize,
        d: &ParticipantDescriptor,
        session_character: Option<&Character>,
    ) -> Combatant {
        match d.side {
            Side::Player => {
                let character = d
                    .character
                    .clone()
                    .or_else(|| d.character_id.and_then(|id| self.load_character(id)))
                    .or_else(|| session_character.cloned());
                let sheet = character
                    .as_ref()
                    .map(|c| c.combat_stats.clone())
                    .unwrap_or_else(|| {
                        CombatStats::new(self.config.default_hp, self.config.default_ac)
                    });
                let name = display_name(&d.name, character.as_ref().map(|c| c.name.as_str()), index);
                let (current, max, ac) = self.vitals(d, &sheet);

                let mut character = character.unwrap_or_else(|| {
                    let mut c = Character::new(name.clone());
                    c.combat_stats = CombatStats::new(max, ac);
                    c
                });
                if let Some(bonus) = d.attack_bonus {
                    character.combat_stats.attack_bonus = clamp_bonus(bonus);
                }
                Combatant::new(name, current, max, ac, Backing::Player(character))
            }
            Side::NonPlayer => {
                let name = display_name(&d.name, d.npc.as_ref().map(|n| n.name.as_str()), index);
                let (current, max, ac) = match &d.npc {
                    Some(npc) => self.vitals(d, &npc.combat_stats),
                    None => self.vitals(
                        d,
                        &CombatStats::new(self.config.default_hp, self.config.default_ac),
                    ),
                };

                let mut npc = d
                    .npc
                    .clone()
                    .unwrap_or_else(|| synthesize_npc(&name, d.archetype.as_deref(), max, ac));
                if let Some(bonus) = d.attack_bonus {
                    npc.combat_stats.attack_bonus = clamp_bonus(bonus);
                }
                if let Some(bonus) = d.initiative {
                    npc.initiative_bonus = Some(clamp_bonus(bonus));
                }
                Combatant::new(name, current, max, ac, Backing::NonPlayer(npc))
            }
        }
    }

    /// Current hit points, maximum hit points and armor class for a descriptor.
    fn vitals(&self, d: &ParticipantDescriptor, sheet: &CombatStats) -> (i32, i32, i32) {
        let max = d
            .max_hp
            .or(d.hp)
            .unwrap_or(sheet.max_hit_points)
            .clamp(1, MAX_HIT_POINTS);
        let current = d
            .hp
            .unwrap_or(sheet.current_hit_points)
            .clamp(0, MAX_HIT_POINTS);
        let ac = d
            .armor_class
            .unwrap_or(sheet.armor_class)
            .clamp(1, MAX_ARMOR_CLASS);
        (current, max, ac)
    }

    fn load_character(&self, id: CharacterId) -> Option<Character> {
        match self.characters.get_character(id) {
            Ok(character) => Some(character),
            Err(e) => {
                tracing::warn!(character_id = %id, error = %e, "could not load participant character");
                None
            }
        }
    }

    /// Roll initiative for everyone and fix the turn order.
    ///
    /// Order is initiative total descending, then initiative bonus
    /// descending, then participant order.
    pub fn roll_initiative(&self, state: &mut CombatState) {
        let mut entries = Vec::with_capacity(state.participants.len());
        let mut bonuses = Vec::with_capacity(state.participants.len());
        for combatant in &mut state.participants {
            let bonus = combatant.backing.initiative_bonus();
            let roll = self.roller.roll(1, 20);
            combatant.initiative_roll = roll.saturating_add(bonus);
            bonuses.push(bonus);
            entries.push(format!(
                "{} rolls initiative: {} {:+} = {}",
                combatant.name, roll, bonus, combatant.initiative_roll
            ));
        }
        for entry in entries {
            state.add_log_entry(entry);
        }

        let mut order: Vec<usize> = (0..state.participants.len()).collect();
        order.sort_by(|&a, &b| {
            let (pa, pb) = (&state.participants[a], &state.participants[b]);
            pb.initiative_roll
                .cmp(&pa.initiative_roll)
                .then(bonuses[b].cmp(&bonuses[a]))
        });

        state.turn_order = order.iter().map(|&i| state.participants[i].id).collect();
        state.current_turn_combatant_id = state.turn_order.first().copied();

        if let Some(first) = state.current_combatant() {
            let names: Vec<&str> = state
                .turn_order
                .iter()
                .filter_map(|id| state.get_combatant(*id))
                .map(|c| c.name.as_str())
                .collect();
            let entry = format!("Turn order: {}. {} acts first.", names.join(", "), first.name);
            state.add_log_entry(entry);
        }
    }

    // ------------------------------------------------------------------------
    // Attacks
    // ------------------------------------------------------------------------

    /// Resolve one weapon attack.
    ///
    /// Ids may be combatant UUIDs or display names.
    pub fn execute_attack(
        &self,
        state: &mut CombatState,
        attacker_ref: &str,
        target_ref: &str,
    ) -> Result<AttackOutcome, CombatError> {
        if !state.is_active {
            return Err(CombatError::CombatEnded);
        }
        let attacker_id = resolve_ref(state, attacker_ref)?;
        let target_id = resolve_ref(state, target_ref)?;

        let (profile, attacker_alive) = match state.get_combatant(attacker_id) {
            Some(a) => (AttackProfile::of(a), a.is_alive()),
            None => return Err(CombatError::InvalidReference(attacker_ref.to_string())),
        };
        if !attacker_alive {
            tracing::debug!(attacker = %profile.name, "downed combatant tried to attack");
            return Err(CombatError::AttackerDown(profile.name));
        }
        let (target_name, target_ac) = match state.get_combatant(target_id) {
            Some(t) if !t.is_alive() => return Err(CombatError::TargetDown(t.name.clone())),
            Some(t) => (t.name.clone(), t.armor_class),
            None => return Err(CombatError::InvalidReference(target_ref.to_string())),
        };

        // Roll, then decide.
        let natural = self.roller.roll(1, 20);
        let total = natural.saturating_add(profile.attack_bonus);
        let result = determine_hit(natural, profile.attack_bonus, target_ac);
        let breakdown = format!(
            "{} {:+} = {} vs AC {}",
            natural, profile.attack_bonus, total, target_ac
        );

        if !result.is_hit() {
            let narrative = match result {
                HitKind::Fumble => format!(
                    "Miss! {} fumbles against {} with {} (natural 1).",
                    profile.name, target_name, profile.weapon.name
                ),
                _ => format!(
                    "Miss! {} attacks {} with {} ({}).",
                    profile.name, target_name, profile.weapon.name, breakdown
                ),
            };
            state.add_log_entry(&narrative);
            return Ok(AttackOutcome {
                attacker_id,
                target_id,
                weapon: profile.weapon.name,
                natural_roll: natural,
                attack_total: total,
                result,
                damage: None,
                narrative,
            });
        }

        let damage = self.roll_damage(&profile, result == HitKind::Critical);
        let label = if result == HitKind::Critical {
            "Critical hit!"
        } else {
            "Hit!"
        };
        state.add_log_entry(format!(
            "{} {} strikes {} with {} ({}).",
            label, profile.name, target_name, profile.weapon.name, breakdown
        ));

        let report = self.apply_damage_to(state, target_id, damage, DamageSource::Attack)?;
        let mut narrative = format!(
            "{} {} strikes {} with {} ({}) for {} damage.",
            label, profile.name, target_name, profile.weapon.name, breakdown, report.actual
        );
        if report.defeated {
            narrative.push_str(&format!(" {target_name} is defeated!"));
        }

        Ok(AttackOutcome {
            attacker_id,
            target_id,
            weapon: profile.weapon.name,
            natural_roll: natural,
            attack_total: total,
            result,
            damage: Some(report),
            narrative,
        })
    }

    /// Weapon dice (doubled on a critical) plus the attack bonus, at least 1.
    fn roll_damage(&self, profile: &AttackProfile, critical: bool) -> i32 {
        let mode = if critical {
            RollMode::Critical
        } else {
            RollMode::Normal
        };
        let rolled = roll_dice_with_mode(&profile.weapon.damage, self.roller.as_ref(), mode);
        rolled.saturating_add(profile.attack_bonus).max(1)
    }

    // ------------------------------------------------------------------------
    // Damage & healing
    // ------------------------------------------------------------------------

    /// Deal `amount` damage to a combatant. Hit points stop at zero.
    pub fn apply_direct_damage(
        &self,
        state: &mut CombatState,
        target_ref: &str,
        amount: i32,
        source: DamageSource,
    ) -> Result<DamageReport, CombatError> {
        if !state.is_active {
            return Err(CombatError::CombatEnded);
        }
        let target_id = resolve_ref(state, target_ref)?;
        self.apply_damage_to(state, target_id, amount, source)
    }

    fn apply_damage_to(
        &self,
        state: &mut CombatState,
        target_id: CombatantId,
        amount: i32,
        source: DamageSource,
    ) -> Result<DamageReport, CombatError> {
        let requested = amount.max(0);
        let Some(target) = state.get_combatant_mut(target_id) else {
            return Err(CombatError::InvalidReference(target_id.to_string()));
        };

        let was_alive = target.is_alive();
        let actual = target.take_damage(requested);
        if actual > 0 && target.is_player() {
            self.sync_player_hp(target);
        }

        let report = DamageReport {
            target_id,
            target_name: target.name.clone(),
            requested,
            actual,
            remaining_hp: target.current_hit_points,
            max_hp: target.max_hit_points,
            defeated: !target.is_alive(),
        };

        let clamp_note = if report.clamped() {
            format!(" ({requested} requested)")
        } else {
            String::new()
        };
        state.add_log_entry(format!(
            "{}: {} takes {} damage{} ({}/{} HP).",
            source, report.target_name, actual, clamp_note, report.remaining_hp, report.max_hp
        ));
        if was_alive && report.defeated {
            state.add_log_entry(format!("{} is defeated!", report.target_name));
            tracing::info!(target = %report.target_name, "combatant defeated");
        }

        Ok(report)
    }

    /// Restore hit points to a living combatant, up to its maximum.
    pub fn apply_healing(
        &self,
        state: &mut CombatState,
        target_ref: &str,
        amount: i32,
    ) -> Result<HealReport, CombatError> {
        if !state.is_active {
            return Err(CombatError::CombatEnded);
        }
        let target_id = resolve_ref(state, target_ref)?;
        let Some(target) = state.get_combatant_mut(target_id) else {
            return Err(CombatError::InvalidReference(target_ref.to_string()));
        };

        let requested = amount.max(0);
        let healed = if target.is_alive() {
            target.heal(requested)
        } else {
            0
        };
        if healed > 0 && target.is_player() {
            self.sync_player_hp(target);
        }

        let report = HealReport {
            target_id,
            target_name: target.name.clone(),
            requested,
            healed,
            remaining_hp: target.current_hit_points,
            max_hp: target.max_hit_points,
        };
        let entry = if report.remaining_hp == 0 {
            format!("{} is down and cannot be healed.", report.target_name)
        } else {
            format!(
                "{} recovers {} HP ({}/{} HP).",
                report.target_name, healed, report.remaining_hp, report.max_hp
            )
        };
        state.add_log_entry(entry);
        Ok(report)
    }

    /// Write a player's current hit points through to their stored sheet.
    ///
    /// Failures are logged; the in-memory value stays authoritative.
    fn sync_player_hp(&self, combatant: &mut Combatant) {
        let Combatant {
            current_hit_points,
            backing,
            ..
        } = combatant;
        let Backing::Player(character) = backing else {
            return;
        };

        let mut fresh = match self.characters.get_character(character.id) {
            Ok(fresh) => fresh,
            Err(StoreError::NotFound(id)) => {
                tracing::debug!(character_id = %id, "hp sync: no stored sheet, skipping");
                return;
            }
            Err(e) => {
                tracing::warn!(character_id = %character.id, error = %e, "hp sync: load failed");
                return;
            }
        };
        fresh.combat_stats.current_hit_points = *current_hit_points;
        match self.characters.save_character(&fresh) {
            Ok(()) => {
                tracing::debug!(
                    character_id = %fresh.id,
                    hp = *current_hit_points,
                    "hp synced"
                );
                *character = fresh;
            }
            Err(e) => {
                tracing::warn!(character_id = %character.id, error = %e, "hp sync: save failed");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Turns & ending
    // ------------------------------------------------------------------------

    /// Pass the turn to the next combatant in turn order.
    ///
    /// Returns whose turn it now is, or `None` when there is no turn order.
    pub fn end_turn(&self, state: &mut CombatState) -> Option<CombatantId> {
        let len = state.turn_order.len();
        if len == 0 {
            return None;
        }

        let position = state
            .current_turn_combatant_id
            .and_then(|id| state.turn_order.iter().position(|t| *t == id));
        let next = match position {
            Some(i) => (i + 1) % len,
            None => {
                tracing::debug!("current combatant missing from turn order, restarting");
                0
            }
        };

        if position.is_some() && next == 0 {
            state.round_number += 1;
            let entry = format!("Round {} started.", state.round_number);
            state.add_log_entry(entry);
        }

        let next_id = state.turn_order[next];
        state.current_turn_combatant_id = Some(next_id);
        if let Some(c) = state.get_combatant(next_id) {
            let entry = if c.is_alive() {
                format!("It is now {}'s turn.", c.name)
            } else {
                format!("It is now {}'s turn ({} is down).", c.name, c.name)
            };
            state.add_log_entry(entry);
        }
        Some(next_id)
    }

    /// True once either side has nobody left standing.
    pub fn check_combat_end(&self, state: &CombatState) -> bool {
        self.end_reason(state).is_some()
    }

    /// Which way the fight went, if it is over. A double knockout is a defeat.
    pub fn end_reason(&self, state: &CombatState) -> Option<EndReason> {
        if !state.side_standing(Side::Player) {
            Some(EndReason::Defeat)
        } else if !state.side_standing(Side::NonPlayer) {
            Some(EndReason::Victory)
        } else {
            None
        }
    }

    /// Close the fight and make sure every player's sheet has their final HP.
    pub fn end_combat(&self, state: &mut CombatState, reason: &str) {
        state.is_active = false;
        state.add_log_entry(format!("Combat ended: {reason}"));
        for combatant in state.participants.iter_mut().filter(|c| c.is_player()) {
            self.sync_player_hp(combatant);
        }
        tracing::info!(combat_id = %state.id, reason, rounds = state.round_number, "combat ended");
    }

    pub fn get_combat_summary(&self, state: &CombatState) -> CombatSummary {
        CombatSummary::of(state, self.config.summary_log_len)
    }
}

/// Resolve a combatant given by UUID or, failing that, by name.
fn resolve_ref(state: &CombatState, raw: &str) -> Result<CombatantId, CombatError> {
    let found = match raw.parse::<CombatantId>() {
        Ok(id) => state.get_combatant(id).map(|c| c.id),
        Err(_) => state.find_by_name(raw).map(|c| c.id),
    };
    found.ok_or_else(|| {
        tracing::warn!(reference = raw, "unknown combatant reference");
        CombatError::InvalidReference(raw.to_string())
    })
}

/// Which player descriptor the session's own character plays.
///
/// A descriptor carrying the sheet's name wins, otherwise the first player
/// without a sheet reference of its own.
fn session_slot(participants: &[ParticipantDescriptor], character: &Character) -> Option<usize> {
    let open = |d: &ParticipantDescriptor| {
        d.side == Side::Player && d.character.is_none() && d.character_id.is_none()
    };
    participants
        .iter()
        .position(|d| open(d) && d.name.trim().eq_ignore_ascii_case(character.name.trim()))
        .or_else(|| participants.iter().position(open))
}

fn display_name(given: &str, sheet: Option<&str>, index: usize) -> String {
    let given = given.trim();
    if !given.is_empty() {
        return given.to_string();
    }
    match sheet {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => format!("Combatant {}", index + 1),
    }
}
