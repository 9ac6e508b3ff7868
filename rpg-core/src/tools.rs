//! Tools the game-master agent calls to run a fight.
//!
//! Each tool loads the session's saved combat, applies one
//! [`CombatService`] operation, persists the result and answers with a JSON
//! object. Failures come back as `{"error": "..."}` so the agent can work
//! them into the story.

use crate::character::Character;
use crate::combat::{
    CombatError, CombatService, CombatState, DamageSource, ParticipantDescriptor,
};
use crate::config::EngineConfig;
use crate::persist::{CombatStateStore, LoadError, PersistError};
use crate::store::JsonCharacterStore;
use rpg_macros::Tool;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to the agent as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid input for {tool}: {reason}")]
    InvalidInput { tool: String, reason: String },

    #[error("A combat is already in progress for session {0}")]
    AlreadyActive(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("Could not encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

// ============================================================================
// Tool Inputs
// ============================================================================

/// Start a new combat encounter for the current session
#[derive(Debug, Clone, Tool, Deserialize)]
#[tool(name = "start_combat")]
pub struct StartCombat {
    /// Where the fight takes place
    pub location: String,
    /// Short description of how the fight begins
    #[serde(default)]
    pub description: Option<String>,
    /// Participants: name, role ("player"/"ally" or "enemy"), and optional hp, max_hp, ac, initiative, attack_bonus, archetype
    pub participants: Vec<Value>,
}

/// Re-roll initiative and rebuild the turn order
#[derive(Debug, Clone, Default, Tool, Deserialize)]
#[tool(name = "roll_initiative")]
pub struct RollInitiative {}

/// Resolve a weapon attack from one combatant against another
#[derive(Debug, Clone, Tool, Deserialize)]
#[tool(name = "execute_attack")]
pub struct ExecuteAttack {
    /// Id or name of the attacking combatant
    pub attacker_id: String,
    /// Id or name of the combatant being attacked
    pub target_id: String,
}

/// Deal damage to a combatant outside of a weapon attack (spells, traps, falls)
#[derive(Debug, Clone, Tool, Deserialize)]
#[tool(name = "apply_direct_damage")]
pub struct ApplyDirectDamage {
    /// Id or name of the combatant taking damage
    pub target_id: String,
    /// Hit points to remove
    pub amount: i32,
    /// What caused the damage
    #[serde(default)]
    pub reason: Option<String>,
}

/// Restore hit points to a combatant
#[derive(Debug, Clone, Tool, Deserialize)]
#[tool(name = "apply_healing")]
pub struct ApplyHealing {
    /// Id or name of the combatant being healed
    pub target_id: String,
    /// Hit points to restore
    pub amount: i32,
}

/// End the current combatant's turn and pass to the next in initiative order
#[derive(Debug, Clone, Default, Tool, Deserialize)]
#[tool(name = "end_turn")]
pub struct EndTurn {}

/// Check whether one side has been defeated, and close the combat if so
#[derive(Debug, Clone, Default, Tool, Deserialize)]
#[tool(name = "check_combat_end")]
pub struct CheckCombatEnd {}

/// Force the combat to end (flight, surrender, truce)
#[derive(Debug, Clone, Tool, Deserialize)]
#[tool(name = "end_combat")]
pub struct EndCombat {
    /// Why the combat ended
    pub reason: String,
}

/// Get the current combat status: hit points, turn order and recent events
#[derive(Debug, Clone, Default, Tool, Deserialize)]
#[tool(name = "get_combat_status")]
pub struct GetCombatStatus {}

/// A parsed tool call.
#[derive(Debug, Clone)]
pub enum ToolCall {
    StartCombat(StartCombat),
    RollInitiative,
    ExecuteAttack(ExecuteAttack),
    ApplyDirectDamage(ApplyDirectDamage),
    ApplyHealing(ApplyHealing),
    EndTurn,
    CheckCombatEnd,
    EndCombat(EndCombat),
    GetCombatStatus,
}

impl ToolCall {
    /// Parse a tool call by name. A `null` input counts as `{}`.
    pub fn parse(name: &str, input: &Value) -> Result<Self, ToolError> {
        Ok(match name {
            "start_combat" => ToolCall::StartCombat(args(name, input)?),
            "roll_initiative" => ToolCall::RollInitiative,
            "execute_attack" => ToolCall::ExecuteAttack(args(name, input)?),
            "apply_direct_damage" | "apply_damage" => ToolCall::ApplyDirectDamage(args(name, input)?),
            "apply_healing" => ToolCall::ApplyHealing(args(name, input)?),
            "end_turn" => ToolCall::EndTurn,
            "check_combat_end" => ToolCall::CheckCombatEnd,
            "end_combat" => ToolCall::EndCombat(args(name, input)?),
            "get_combat_status" => ToolCall::GetCombatStatus,
            other => return Err(ToolError::UnknownTool(other.to_string())),
        })
    }
}

fn args<T: DeserializeOwned>(tool: &str, input: &Value) -> Result<T, ToolError> {
    let input = if input.is_null() { json!({}) } else { input.clone() };
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Who is calling: the session key and, if known, its player character.
#[derive(Debug, Clone)]
pub struct ToolSession {
    pub session_id: String,
    pub character: Option<Character>,
}

impl ToolSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            character: None,
        }
    }

    pub fn with_character(mut self, character: Character) -> Self {
        self.character = Some(character);
        self
    }
}

/// Combat tools bound to a service and a state store.
pub struct CombatTools {
    service: CombatService,
    store: CombatStateStore,
}

impl CombatTools {
    pub fn new(service: CombatService, store: CombatStateStore) -> Self {
        Self { service, store }
    }

    /// File-backed tools with random dice, rooted at the config's data directory.
    pub fn from_config(config: EngineConfig) -> Self {
        let characters = Arc::new(JsonCharacterStore::new(config.characters_dir()));
        let store = CombatStateStore::new(config.combat_dir());
        let service = CombatService::new(characters).with_config(config);
        Self::new(service, store)
    }

    /// Definitions of every tool, for the agent's tool list.
    pub fn definitions() -> Vec<Value> {
        vec![
            StartCombat::definition(),
            RollInitiative::definition(),
            ExecuteAttack::definition(),
            ApplyDirectDamage::definition(),
            ApplyHealing::definition(),
            EndTurn::definition(),
            CheckCombatEnd::definition(),
            EndCombat::definition(),
            GetCombatStatus::definition(),
        ]
    }

    pub fn service(&self) -> &CombatService {
        &self.service
    }

    pub fn store(&self) -> &CombatStateStore {
        &self.store
    }

    /// Run a tool by name. Always returns a JSON object.
    pub async fn execute(&self, session: &ToolSession, name: &str, input: &Value) -> Value {
        let result = match ToolCall::parse(name, input) {
            Ok(call) => self.dispatch(session, call).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(session_id = %session.session_id, tool = name, error = %e, "tool call failed");
            json!({ "error": e.to_string() })
        })
    }

    pub async fn dispatch(&self, session: &ToolSession, call: ToolCall) -> Result<Value, ToolError> {
        let session_id = session.session_id.as_str();
        tracing::debug!(session_id, ?call, "dispatching combat tool");
        match call {
            ToolCall::StartCombat(input) => self.start_combat(session, input).await,
            ToolCall::RollInitiative => {
                let mut state = self.store.load(session_id).await?;
                self.service.roll_initiative(&mut state);
                let message = match state.current_combatant() {
                    Some(first) => format!("Initiative rolled. {} acts first.", first.name),
                    None => "Initiative rolled, but nobody is fighting.".to_string(),
                };
                self.store.save(session_id, &mut state).await?;
                Ok(json!({ "message": message, "summary": self.summary(&state)? }))
            }
            ToolCall::ExecuteAttack(input) => {
                let mut state = self.store.load(session_id).await?;
                let outcome =
                    self.service
                        .execute_attack(&mut state, &input.attacker_id, &input.target_id)?;
                let auto_ended = self.finish_or_save(session_id, &mut state).await?;
                Ok(json!({
                    "message": outcome.narrative,
                    "attack": outcome,
                    "summary": self.summary(&state)?,
                    "auto_ended": auto_ended,
                }))
            }
            ToolCall::ApplyDirectDamage(input) => {
                let mut state = self.store.load(session_id).await?;
                let report = self.service.apply_direct_damage(
                    &mut state,
                    &input.target_id,
                    input.amount,
                    DamageSource::Effect,
                )?;
                let auto_ended = self.finish_or_save(session_id, &mut state).await?;
                let cause = input
                    .reason
                    .as_deref()
                    .map(|r| format!(" ({r})"))
                    .unwrap_or_default();
                Ok(json!({
                    "message": format!(
                        "Applied {} damage to {}{}. {}/{} HP remaining.",
                        report.actual, report.target_name, cause, report.remaining_hp, report.max_hp
                    ),
                    "damage_applied": report.actual,
                    "target": report.target_name,
                    "summary": self.summary(&state)?,
                    "auto_ended": auto_ended,
                }))
            }
            ToolCall::ApplyHealing(input) => {
                let mut state = self.store.load(session_id).await?;
                let report = self
                    .service
                    .apply_healing(&mut state, &input.target_id, input.amount)?;
                self.store.save(session_id, &mut state).await?;
                Ok(json!({
                    "message": format!(
                        "{} recovers {} HP. {}/{} HP.",
                        report.target_name, report.healed, report.remaining_hp, report.max_hp
                    ),
                    "healed": report.healed,
                    "target": report.target_name,
                    "summary": self.summary(&state)?,
                }))
            }
            ToolCall::EndTurn => {
                let mut state = self.store.load(session_id).await?;
                let message = match self.service.end_turn(&mut state) {
                    Some(id) => {
                        let name = state
                            .get_combatant(id)
                            .map(|c| c.name.as_str())
                            .unwrap_or("nobody");
                        format!("Turn ended. It is now {name}'s turn (round {}).", state.round_number)
                    }
                    None => "Turn ended. There is no turn order.".to_string(),
                };
                self.store.save(session_id, &mut state).await?;
                Ok(json!({ "message": message, "summary": self.summary(&state)? }))
            }
            ToolCall::CheckCombatEnd => {
                let mut state = self.store.load(session_id).await?;
                match self.service.end_reason(&state) {
                    Some(reason) => {
                        self.close(session_id, &mut state, reason.as_str()).await?;
                        Ok(json!({
                            "combat_ended": true,
                            "status": "ended",
                            "end_reason": reason,
                            "summary": self.summary(&state)?,
                        }))
                    }
                    None => Ok(json!({ "combat_ended": false, "status": "ongoing" })),
                }
            }
            ToolCall::EndCombat(input) => {
                let mut state = self.store.load(session_id).await?;
                self.close(session_id, &mut state, &input.reason).await?;
                let mut result = self.summary(&state)?;
                result["message"] = json!(format!("Combat ended: {}", input.reason));
                Ok(result)
            }
            ToolCall::GetCombatStatus => {
                let state = self.store.load(session_id).await?;
                let mut result = self.summary(&state)?;
                result["current_participant"] = json!(state.current_combatant().map(|c| &c.name));
                result["alive_participants"] =
                    json!(state.living().map(|c| &c.name).collect::<Vec<_>>());
                result["dead_participants"] =
                    json!(state.fallen().map(|c| &c.name).collect::<Vec<_>>());
                Ok(result)
            }
        }
    }

    async fn start_combat(&self, session: &ToolSession, input: StartCombat) -> Result<Value, ToolError> {
        let session_id = session.session_id.as_str();
        if self.store.has_active_combat(session_id).await {
            return Err(ToolError::AlreadyActive(session_id.to_string()));
        }
        if input.participants.is_empty() {
            return Err(ToolError::InvalidInput {
                tool: StartCombat::tool_name().to_string(),
                reason: "at least one participant is required".to_string(),
            });
        }
        // Clear out a finished fight that was never deleted.
        self.store.delete(session_id).await?;

        let descriptors: Vec<ParticipantDescriptor> = input
            .participants
            .iter()
            .map(ParticipantDescriptor::from_json)
            .collect();
        let mut state = self
            .service
            .start_combat(&descriptors, session.character.as_ref());
        state.add_log_entry(match &input.description {
            Some(description) => format!("Location: {}. {}", input.location, description),
            None => format!("Location: {}.", input.location),
        });
        self.store.save(session_id, &mut state).await?;

        let first = state
            .current_combatant()
            .map(|c| format!(" {} acts first.", c.name))
            .unwrap_or_default();
        Ok(json!({
            "combat_id": state.id,
            "message": format!("Combat started at {}.{}", input.location, first),
            "summary": self.summary(&state)?,
        }))
    }

    /// End the fight if a side is down, otherwise save it.
    async fn finish_or_save(
        &self,
        session_id: &str,
        state: &mut CombatState,
    ) -> Result<Option<Value>, ToolError> {
        match self.service.end_reason(state) {
            Some(reason) => {
                self.close(session_id, state, reason.as_str()).await?;
                Ok(Some(json!({ "ended": true, "reason": reason })))
            }
            None => {
                self.store.save(session_id, state).await?;
                Ok(None)
            }
        }
    }

    async fn close(&self, session_id: &str, state: &mut CombatState, reason: &str) -> Result<(), ToolError> {
        self.service.end_combat(state, reason);
        self.store.discard(session_id, state).await?;
        Ok(())
    }

    fn summary(&self, state: &CombatState) -> Result<Value, ToolError> {
        Ok(serde_json::to_value(self.service.get_combat_summary(state))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions() {
        let defs = CombatTools::definitions();
        assert_eq!(defs.len(), 9);
        let names: Vec<_> = defs.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert!(names.contains(&"start_combat"));
        assert!(names.contains(&"get_combat_status"));
    }

    #[test]
    fn test_schema_required_fields() {
        let schema = ApplyDirectDamage::input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["amount"]["type"], "integer");
        assert_eq!(schema["properties"]["reason"]["type"], "string");
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("target_id")));
        assert!(required.contains(&json!("amount")));
        assert!(!required.contains(&json!("reason")));

        let schema = StartCombat::input_schema();
        assert_eq!(schema["properties"]["participants"]["type"], "array");
        assert_eq!(
            StartCombat::tool_description(),
            "Start a new combat encounter for the current session"
        );
    }

    #[test]
    fn test_empty_tool_schema() {
        let schema = EndTurn::input_schema();
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(schema["required"], json!([]));
    }

    #[test]
    fn test_parse_tool_calls() {
        assert!(matches!(
            ToolCall::parse("end_turn", &Value::Null),
            Ok(ToolCall::EndTurn)
        ));
        assert!(matches!(
            ToolCall::parse("apply_damage", &json!({"target_id": "x", "amount": 3})),
            Ok(ToolCall::ApplyDirectDamage(ApplyDirectDamage { amount: 3, .. }))
        ));
        assert!(matches!(
            ToolCall::parse("execute_attack", &json!({"attacker_id": "a"})),
            Err(ToolError::InvalidInput { .. })
        ));
        assert!(matches!(
            ToolCall::parse("cast_fireball", &json!({})),
            Err(ToolError::UnknownTool(_))
        ));
    }
}
