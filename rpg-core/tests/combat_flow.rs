//! End-to-end fights driven through the combat service.
//!
//! Run with: `cargo test -p rpg-core --test combat_flow`

use rpg_core::combat::{CombatError, DamageSource, EndReason, HitKind, ParticipantDescriptor};
use rpg_core::testing::{
    assert_active, assert_ended, assert_hp, assert_logged, combatant, TestHarness,
};

fn goblins() -> Vec<ParticipantDescriptor> {
    vec![
        ParticipantDescriptor::enemy("Goblin 1")
            .with_hp(18, 18)
            .with_armor_class(13),
        ParticipantDescriptor::enemy("Goblin 2")
            .with_hp(18, 18)
            .with_armor_class(13),
    ]
}

// =============================================================================
// TEST 1: A full fight to victory
// =============================================================================

#[test]
fn test_fight_until_victory() {
    let dir = tempfile::tempdir().unwrap();
    // Every d20 lands on 15; every d8 clamps to 8.
    let harness = TestHarness::new(dir.path(), [15]);
    let mut state = harness.start(&goblins());

    // Hero: 15 + 1 beats both goblins' 15 + 0.
    let hero = combatant(&state, "Test Hero");
    assert_eq!(state.current_turn_combatant_id, Some(hero.id));
    assert_eq!(state.turn_order.len(), 3);

    let service = &harness.service;
    let mut swings = 0;
    while !service.check_combat_end(&state) {
        swings += 1;
        assert!(swings <= 10, "fight should be over by now");

        let target = state
            .participants
            .iter()
            .find(|c| !c.is_player() && c.is_alive())
            .map(|c| c.name.clone())
            .unwrap();
        let outcome = service.execute_attack(&mut state, "Test Hero", &target).unwrap();
        assert_eq!(outcome.result, HitKind::Hit);
        assert_eq!(outcome.damage.as_ref().unwrap().actual, 13);

        // Goblins hit for 15 + 0 against AC 16 and miss.
        service.end_turn(&mut state);
        for _ in 0..2 {
            if let Some(goblin) = state.current_combatant().filter(|c| c.is_alive()) {
                let name = goblin.name.clone();
                let outcome = service.execute_attack(&mut state, &name, "Test Hero").unwrap();
                assert_eq!(outcome.result, HitKind::Miss);
            }
            service.end_turn(&mut state);
        }
    }

    assert_eq!(swings, 4);
    assert_eq!(service.end_reason(&state), Some(EndReason::Victory));
    assert_logged(&state, "Goblin 1 is defeated!");
    assert_logged(&state, "Goblin 2 is defeated!");
    assert_hp(&state, "Goblin 2", 0, 18);
    assert_active(&state);

    service.end_combat(&mut state, "victory");
    assert_ended(&state);
    assert_logged(&state, "Combat ended: victory");
    assert_eq!(harness.stored_hero_hp(), 28);

    let summary = service.get_combat_summary(&state);
    assert_eq!(summary.participants.len(), 3);
    assert!(summary.recent_log.len() <= 5);
    assert!(summary.recent_log.last().unwrap().ends_with("Combat ended: victory"));
}

// =============================================================================
// TEST 2: Rounds advance when the turn order wraps
// =============================================================================

#[test]
fn test_rounds_advance_on_wrap() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [10]);
    let mut state = harness.start(&goblins());
    let service = &harness.service;

    assert_eq!(state.round_number, 1);
    for _ in 0..3 {
        service.end_turn(&mut state);
    }
    assert_eq!(state.round_number, 2);
    assert_logged(&state, "Round 2 - Round 2 started.");
    assert_eq!(state.current_turn_combatant_id, state.turn_order.first().copied());
}

// =============================================================================
// TEST 3: Defeat, and a downed player cannot act
// =============================================================================

#[test]
fn test_player_defeat() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [10]);
    let mut state = harness.start(&goblins());
    let service = &harness.service;

    let report = service
        .apply_direct_damage(&mut state, "Test Hero", 40, DamageSource::Effect)
        .unwrap();
    assert_eq!(report.actual, 28);
    assert!(report.defeated);
    assert_logged(&state, "takes 28 damage (40 requested) (0/28 HP).");
    assert_logged(&state, "Test Hero is defeated!");
    assert_eq!(harness.stored_hero_hp(), 0);

    let err = service
        .execute_attack(&mut state, "Test Hero", "Goblin 1")
        .unwrap_err();
    assert!(matches!(err, CombatError::AttackerDown(_)));
    assert_eq!(err.to_string(), "Test Hero is down and cannot attack!");

    assert!(service.check_combat_end(&state));
    assert_eq!(service.end_reason(&state), Some(EndReason::Defeat));
    service.end_combat(&mut state, "defeat");
    assert_ended(&state);

    let err = service
        .apply_direct_damage(&mut state, "Goblin 1", 3, DamageSource::Effect)
        .unwrap_err();
    assert!(matches!(err, CombatError::CombatEnded));
}

// =============================================================================
// TEST 4: Bad references are rejected without touching the fight
// =============================================================================

#[test]
fn test_invalid_references() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [10]);
    let mut state = harness.start(&goblins());
    let before = state.clone();

    let err = harness
        .service
        .execute_attack(&mut state, "Test Hero", "Dragon")
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid combatant reference: 'Dragon'");

    let missing = uuid::Uuid::new_v4().to_string();
    assert!(harness
        .service
        .apply_direct_damage(&mut state, &missing, 5, DamageSource::Effect)
        .is_err());
    assert_eq!(state, before);
}
