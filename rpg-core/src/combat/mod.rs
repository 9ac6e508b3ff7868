//! Turn-based combat: state model, rules and summaries.

mod resolver;
mod state;
mod summary;

pub use resolver::{
    determine_hit, AttackOutcome, CombatError, CombatService, DamageReport, DamageSource,
    HealReport, HitKind, ParticipantDescriptor,
};
pub use state::{Backing, CombatId, CombatState, Combatant, CombatantId, Side};
pub use summary::{CombatStatus, CombatSummary, EndReason, ParticipantSummary};
