//! Serializable snapshots of a fight.

use super::state::{CombatId, CombatState, Combatant, CombatantId, Side};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatStatus {
    Ongoing,
    Ended,
}

impl fmt::Display for CombatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombatStatus::Ongoing => write!(f, "ongoing"),
            CombatStatus::Ended => write!(f, "ended"),
        }
    }
}

/// Why a fight finished on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// No non-player combatant is standing.
    Victory,
    /// No player combatant is standing.
    Defeat,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Victory => "victory",
            EndReason::Defeat => "defeat",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: CombatantId,
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub armor_class: i32,
    pub side: Side,
    pub alive: bool,
}

impl From<&Combatant> for ParticipantSummary {
    fn from(c: &Combatant) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            hp: c.current_hit_points,
            max_hp: c.max_hit_points,
            armor_class: c.armor_class,
            side: c.side(),
            alive: c.is_alive(),
        }
    }
}

/// Read-only view of a fight, safe to hand to the agent at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSummary {
    pub combat_id: CombatId,
    pub round_number: u32,
    pub participants: Vec<ParticipantSummary>,
    pub turn_order: Vec<CombatantId>,
    pub current_turn: Option<CombatantId>,
    pub status: CombatStatus,
    pub recent_log: Vec<String>,
}

impl CombatSummary {
    pub fn of(state: &CombatState, log_len: usize) -> Self {
        Self {
            combat_id: state.id,
            round_number: state.round_number,
            participants: state.participants.iter().map(ParticipantSummary::from).collect(),
            turn_order: state.turn_order.clone(),
            current_turn: state.current_turn_combatant_id,
            status: if state.is_active {
                CombatStatus::Ongoing
            } else {
                CombatStatus::Ended
            },
            recent_log: state.recent_log(log_len).to_vec(),
        }
    }
}
