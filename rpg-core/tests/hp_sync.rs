//! Player hit points are written through to the character store as they change.

use rpg_core::combat::{DamageSource, ParticipantDescriptor};
use rpg_core::testing::{assert_hp, TestHarness};
use rpg_core::CharacterStore;

fn start(harness: &TestHarness) -> rpg_core::CombatState {
    harness.start(&[ParticipantDescriptor::enemy("Orc")
        .with_hp(15, 15)
        .with_armor_class(13)])
}

#[test]
fn test_damage_is_synced_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [10]);
    let mut state = start(&harness);

    harness
        .service
        .apply_direct_damage(&mut state, "Test Hero", 10, DamageSource::Effect)
        .unwrap();

    assert_hp(&state, "Test Hero", 18, 28);
    assert_eq!(harness.stored_hero_hp(), 18);
}

#[test]
fn test_healing_is_synced() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [10]);
    let mut state = start(&harness);
    let service = &harness.service;

    service
        .apply_direct_damage(&mut state, "Test Hero", 12, DamageSource::Effect)
        .unwrap();
    let report = service.apply_healing(&mut state, "Test Hero", 20).unwrap();
    assert_eq!(report.healed, 12);
    assert_eq!(harness.stored_hero_hp(), 28);
}

#[test]
fn test_sync_keeps_other_sheet_changes() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [10]);
    let mut state = start(&harness);

    // Someone else levels the hero up mid-fight.
    let mut sheet = harness.characters.get_character(harness.hero.id).unwrap();
    sheet.level = 2;
    harness.characters.save_character(&sheet).unwrap();

    harness
        .service
        .apply_direct_damage(&mut state, "Test Hero", 5, DamageSource::Effect)
        .unwrap();

    let stored = harness.characters.get_character(harness.hero.id).unwrap();
    assert_eq!(stored.level, 2);
    assert_eq!(stored.combat_stats.current_hit_points, 23);
}

#[test]
fn test_missing_sheet_does_not_break_combat() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [10]);
    let mut state = start(&harness);
    std::fs::remove_file(harness.characters.path_for(harness.hero.id)).unwrap();

    let report = harness
        .service
        .apply_direct_damage(&mut state, "Test Hero", 4, DamageSource::Effect)
        .unwrap();
    assert_eq!(report.remaining_hp, 24);
    assert_hp(&state, "Test Hero", 24, 28);
}

#[test]
fn test_end_combat_syncs_final_hp() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new(dir.path(), [10]);
    let mut state = start(&harness);

    // Change HP without going through the service, then close the fight.
    let hero_id = state.find_by_name("Test Hero").unwrap().id;
    state.get_combatant_mut(hero_id).unwrap().current_hit_points = 7;
    harness.service.end_combat(&mut state, "fled");

    assert_eq!(harness.stored_hero_hp(), 7);
}
