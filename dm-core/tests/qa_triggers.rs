//! QA tests for content triggers through a full session: one-shot enter
//! text, visibility, attacks of opportunity and the stuck-door check.

use dm_core::adventure::AdventureDef;
use dm_core::testing::{assert_narrates, assert_silent_on, TestHarness};

/// The sample adventure with a player tough enough to shrug off free
/// attacks, so walking past the rats never ends a test early.
fn tough_sample() -> AdventureDef {
    let mut def = AdventureDef::sample();
    def.player.hp_max = 60;
    def
}

/// The sample adventure with the monsters removed.
fn empty_cellar() -> AdventureDef {
    let mut def = AdventureDef::sample();
    def.monsters.clear();
    def
}

async fn accept_quest(harness: &mut TestHarness) {
    harness.session.start();
    harness.say_as("yes", "affirm", &[]).await;
}

#[tokio::test]
async fn test_enter_text_fires_once_description_repeats() {
    let mut harness = TestHarness::with_adventure(5, &tough_sample()).unwrap();
    accept_quest(&mut harness).await;
    harness
        .say_as("light my torch", "use", &[("equipment", "torch")])
        .await;

    let first = harness
        .say_as("go down to the cellar", "move", &[("location", "inns_cellar")])
        .await;
    assert_narrates(&first, "stairs groan");
    assert_narrates(&first, "Torchlight spills");

    harness
        .say_as("back upstairs", "move", &[("location", "stout_meal_inn")])
        .await;
    let again = harness
        .say_as("go down to the cellar", "move", &[("location", "inns_cellar")])
        .await;
    // Enter and visibility texts are spent; the description still shows.
    assert_silent_on(&again, "stairs groan");
    assert_silent_on(&again, "Torchlight spills");
    assert_narrates(&again, "Broken barrels");
}

#[tokio::test]
async fn test_darkness_hides_the_room_until_lit() {
    let mut harness = TestHarness::with_adventure(5, &empty_cellar()).unwrap();
    accept_quest(&mut harness).await;

    let narration = harness
        .say_as("go down to the cellar", "move", &[("location", "inns_cellar")])
        .await;
    assert_narrates(&narration, "pitch black");
    assert_silent_on(&narration, "Broken barrels");

    // Leaving in the dark is refused.
    let narration = harness
        .say_as("back upstairs", "move", &[("location", "stout_meal_inn")])
        .await;
    assert_narrates(&narration, "too dark");

    // Lighting the torch in place fires the visibility text.
    let narration = harness
        .say_as("light my torch", "use", &[("equipment", "torch")])
        .await;
    assert_narrates(&narration, "Torchlight spills");
}

#[tokio::test]
async fn test_attack_of_opportunity_when_fleeing() {
    let mut harness = TestHarness::with_adventure(5, &tough_sample()).unwrap();
    accept_quest(&mut harness).await;
    harness
        .say_as("light my torch", "use", &[("equipment", "torch")])
        .await;
    harness
        .say_as("go down to the cellar", "move", &[("location", "inns_cellar")])
        .await;

    let narration = harness
        .say_as("back upstairs", "move", &[("location", "stout_meal_inn")])
        .await;
    // Both rats get their free attack as the player flees.
    assert_eq!(narration.matches("snaps at you").count(), 2);
    assert_eq!(harness.session.state().player_room(), "stout_meal_inn");
}

#[tokio::test]
async fn test_stop_using_torch_restores_darkness() {
    let mut harness = TestHarness::with_adventure(5, &empty_cellar()).unwrap();
    accept_quest(&mut harness).await;
    harness
        .say_as("light my torch", "use", &[("equipment", "torch")])
        .await;
    harness
        .say_as("go down to the cellar", "move", &[("location", "inns_cellar")])
        .await;

    harness
        .say_as("put out the torch", "stop_using", &[("equipment", "torch")])
        .await;
    let narration = harness.say_as("look around", "explore", &[]).await;
    assert_narrates(&narration, "pitch black");
}

#[tokio::test]
async fn test_strength_check_opens_the_stuck_door() {
    let mut harness = TestHarness::with_adventure(5, &empty_cellar()).unwrap();
    accept_quest(&mut harness).await;
    harness
        .say_as("light my torch", "use", &[("equipment", "torch")])
        .await;
    harness
        .say_as("go down to the cellar", "move", &[("location", "inns_cellar")])
        .await;

    // The vault door is locked until the check succeeds.
    let narration = harness
        .say_as("into the vault", "move", &[("location", "storage_vault")])
        .await;
    assert_narrates(&narration, "locked");

    let mut attempts = 0;
    loop {
        let narration = harness
            .say_as("force the door", "ability_check", &[("ability", "strength")])
            .await;
        assert_narrates(&narration, "Make a Strength check");
        let narration = harness.say_as("here goes", "roll", &[]).await;
        if narration.contains("gives way") {
            break;
        }
        assert_narrates(&narration, "doesn't budge");
        attempts += 1;
        assert!(attempts < 50, "check never succeeded");
    }

    let narration = harness
        .say_as("into the vault", "move", &[("location", "storage_vault")])
        .await;
    assert_narrates(&narration, "dusty crates");
    assert_eq!(harness.session.state().player_room(), "storage_vault");
}

#[tokio::test]
async fn test_hacking_the_stuck_door_open() {
    let mut harness = TestHarness::with_adventure(9, &empty_cellar()).unwrap();
    accept_quest(&mut harness).await;
    harness
        .say_as("light my torch", "use", &[("equipment", "torch")])
        .await;
    harness
        .say_as("go down to the cellar", "move", &[("location", "inns_cellar")])
        .await;

    // The door soaks swings outside the combat machine until it breaks.
    let mut swings = 0;
    loop {
        let narration = harness
            .say_as("hack at the door", "attack", &[("monster", "stuck iron door")])
            .await;
        assert!(!harness.session.state().in_combat());
        if narration.contains("splinters apart") {
            break;
        }
        swings += 1;
        assert!(swings < 50, "door never broke");
    }

    let narration = harness
        .say_as("into the vault", "move", &[("location", "storage_vault")])
        .await;
    assert_narrates(&narration, "dusty crates");
    assert_eq!(harness.session.state().player_room(), "storage_vault");
}

#[tokio::test]
async fn test_ability_check_needs_a_matching_puzzle() {
    let mut harness = TestHarness::new(5);
    accept_quest(&mut harness).await;

    let narration = harness
        .say_as("charm the door", "ability_check", &[("ability", "charisma")])
        .await;
    assert_narrates(&narration, "nothing here that calls for");
}

#[tokio::test]
async fn test_quest_offer_does_not_repeat() {
    let mut harness = TestHarness::new(5);
    let opening = harness.session.start();
    assert_narrates(&opening, "Will you do it?");
    harness.say_as("yes", "affirm", &[]).await;

    let narration = harness.say_as("look around", "explore", &[]).await;
    assert_silent_on(&narration, "Will you do it?");
}
