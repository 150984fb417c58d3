//! QA tests for snapshot persistence: a saved session resumes with its
//! world, progress markers and spent triggers intact, and two resumptions
//! of the same snapshot replay identically.

use dm_core::testing::{assert_narrates, assert_silent_on, MockClassifier, ScriptedPlanner, TestHarness};
use dm_core::{CombatStatus, Session};
use tempfile::tempdir;

fn teach_standard(classifier: &MockClassifier) {
    classifier.teach("yes", "affirm", 0.95, &[]);
    classifier.teach(
        "light my torch",
        "use",
        0.95,
        &[("equipment", "torch")],
    );
    classifier.teach(
        "go down to the cellar",
        "move",
        0.95,
        &[("location", "inns_cellar")],
    );
    classifier.teach(
        "back upstairs",
        "move",
        0.95,
        &[("location", "stout_meal_inn")],
    );
    classifier.teach(
        "attack the giant rat",
        "attack",
        0.95,
        &[("monster", "giant rat")],
    );
}

/// The sample adventure with a player tough enough that free attacks
/// never end a test run early.
fn tough_sample() -> dm_core::AdventureDef {
    let mut def = dm_core::AdventureDef::sample();
    def.player.hp_max = 60;
    def
}

/// Play up to the cellar, then save.
async fn play_and_save(path: &std::path::Path) {
    let mut harness = TestHarness::with_adventure(21, &tough_sample()).unwrap();
    teach_standard(&harness.classifier);
    harness.session.start();
    harness.say("yes").await;
    harness.say("light my torch").await;
    harness.say("go down to the cellar").await;
    assert_eq!(harness.session.state().player_room(), "inns_cellar");
    harness.session.save(path).await.unwrap();
}

async fn resume(path: &std::path::Path) -> Session<MockClassifier, ScriptedPlanner> {
    let classifier = MockClassifier::new();
    teach_standard(&classifier);
    Session::load(path, classifier, ScriptedPlanner::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_snapshot_preserves_progress() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    play_and_save(&path).await;

    let mut session = resume(&path).await;
    let state = session.state();
    assert_eq!(state.player_room(), "inns_cellar");
    assert!(state.quest_accepted());
    assert!(!state.in_combat());
    assert!(state.registry.player().in_use.contains("torch"));

    // The one-shot enter text was spent before the save and stays spent.
    let narration = session.input("back upstairs").await.text;
    assert_narrates(&narration, "snaps at you");
    let narration = session.input("go down to the cellar").await.text;
    assert_silent_on(&narration, "stairs groan");
    assert_narrates(&narration, "Broken barrels");
}

#[tokio::test]
async fn test_two_resumptions_replay_identically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    play_and_save(&path).await;

    let mut first = resume(&path).await;
    let mut second = resume(&path).await;

    for line in ["attack the giant rat", "", "", ""] {
        let a = first.input(line).await;
        let b = second.input(line).await;
        assert_eq!(a, b, "diverged on input {line:?}");
    }
    assert_eq!(first.state().combat_status(), second.state().combat_status());
    assert_eq!(
        first.state().registry.player().hp,
        second.state().registry.player().hp
    );
}

#[tokio::test]
async fn test_snapshot_survives_mid_combat() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("combat.json");

    let mut harness = TestHarness::new(9);
    teach_standard(&harness.classifier);
    harness.session.start();
    harness.say("yes").await;
    harness.say("light my torch").await;
    harness.say("go down to the cellar").await;
    harness.say("attack the giant rat").await;
    assert_eq!(
        harness.session.state().combat_status(),
        CombatStatus::Initiative
    );
    harness.session.save(&path).await.unwrap();

    let mut session = resume(&path).await;
    assert_eq!(session.state().combat_status(), CombatStatus::Initiative);
    // An empty line mid-combat still means "roll".
    let narration = session.input("").await.text;
    assert_narrates(&narration, "for initiative");
    assert_narrates(&narration, "Turn order");
}

#[tokio::test]
async fn test_corrupt_snapshot_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    tokio::fs::write(&path, b"{not json").await.unwrap();

    let classifier = MockClassifier::new();
    let result = Session::load(&path, classifier, ScriptedPlanner::new()).await;
    assert!(result.is_err());
}
