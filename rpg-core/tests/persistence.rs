//! Saving, resuming and clearing a session's fight on disk.

use rpg_core::combat::{DamageSource, ParticipantDescriptor};
use rpg_core::testing::{assert_hp, assert_logged, TestHarness};
use rpg_core::{CombatStateStore, EngineConfig, LoadError};

#[tokio::test]
async fn test_fight_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [12]);
    let mut state = harness.start(&[ParticipantDescriptor::enemy("Bandit")
        .with_hp(11, 11)
        .with_armor_class(12)]);
    harness
        .service
        .apply_direct_damage(&mut state, "Bandit", 4, DamageSource::Effect)
        .unwrap();
    harness.combats.save("table-7", &mut state).await.unwrap();

    let expected = EngineConfig::new(dir.path())
        .combat_dir()
        .join("table-7_combat.json");
    assert!(expected.exists());

    // A fresh store over the same directory picks the fight back up.
    let reopened = CombatStateStore::new(EngineConfig::new(dir.path()).combat_dir());
    assert!(reopened.has_active_combat("table-7").await);
    let mut resumed = reopened.load("table-7").await.unwrap();
    assert_eq!(resumed, state);
    assert_hp(&resumed, "Bandit", 7, 11);

    harness.service.end_turn(&mut resumed);
    reopened.save("table-7", &mut resumed).await.unwrap();
    assert_eq!(resumed.revision, 2);

    let again = reopened.load("table-7").await.unwrap();
    assert_eq!(again.current_turn_combatant_id, resumed.current_turn_combatant_id);
    assert_logged(&again, "It is now");
}

#[tokio::test]
async fn test_saved_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [12]);
    let mut state = harness.start(&[ParticipantDescriptor::enemy("Wolf")]);
    harness.combats.save("s", &mut state).await.unwrap();

    let raw = std::fs::read_to_string(harness.combats.path_for("s")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["combat_id"], serde_json::json!(state.id));
    assert_eq!(json["round_number"], 1);
    assert_eq!(json["is_active"], true);
    assert_eq!(json["participants"][0]["backing"]["type"], "player");
    assert_eq!(json["participants"][1]["backing"]["type"], "npc");
    assert_eq!(json["turn_order"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_ended_fight_is_not_active() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [12]);
    let mut state = harness.start(&[ParticipantDescriptor::enemy("Rat")]);
    harness.service.end_combat(&mut state, "the rat flees");
    harness.combats.save("s", &mut state).await.unwrap();

    assert!(!harness.combats.has_active_combat("s").await);
    let loaded = harness.combats.load("s").await.unwrap();
    assert!(!loaded.is_active);

    harness.combats.delete("s").await.unwrap();
    assert!(matches!(
        harness.combats.load("s").await,
        Err(LoadError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [12]);
    let mut first = harness.start(&[ParticipantDescriptor::enemy("Skeleton")]);
    let mut second = harness.start(&[ParticipantDescriptor::enemy("Zombie")]);

    harness.combats.save("a", &mut first).await.unwrap();
    harness.combats.save("b", &mut second).await.unwrap();
    harness.combats.delete("a").await.unwrap();

    assert!(!harness.combats.has_active_combat("a").await);
    let kept = harness.combats.load("b").await.unwrap();
    assert!(kept.find_by_name("Zombie").is_some());
}
