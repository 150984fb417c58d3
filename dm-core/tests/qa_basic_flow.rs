//! QA tests for the basic session flow over the sample adventure:
//! commands, the quest offer, movement gating and deferred intents.
//!
//! All NLU is scripted through the mock classifier, so these run without
//! a parse server.

use dm_core::adventure::AdventureDef;
use dm_core::testing::{assert_narrates, assert_silent_on, TestHarness};

#[tokio::test]
async fn test_opening_narration_offers_the_quest() {
    let mut harness = TestHarness::new(1);
    let opening = harness.session.start();
    assert_narrates(&opening, "Stout Meal Inn");
    assert_narrates(&opening, "Will you do it?");
    assert!(harness.session.state().quest_offered());
}

#[tokio::test]
async fn test_slash_commands_do_not_consume_a_turn() {
    let mut harness = TestHarness::new(1);
    harness.session.start();
    let before = harness.session.state().turn();

    let reply = harness.say("/help").await;
    assert_narrates(&reply.text, "/stats");
    let reply = harness.say("/stats").await;
    assert_narrates(&reply.text, "HP 11/11");
    assert_narrates(&reply.text, "Wielding: shortsword");
    assert_eq!(harness.session.state().turn(), before);

    let reply = harness.say("/exit").await;
    assert!(reply.exit);
}

#[tokio::test]
async fn test_unknown_command_is_reported() {
    let mut harness = TestHarness::new(1);
    let reply = harness.say("/teleport").await;
    assert_narrates(&reply.text, "Unknown command");
}

#[tokio::test]
async fn test_declined_quest_blocks_the_cellar() {
    let mut harness = TestHarness::new(1);
    harness.session.start();

    let narration = harness.say_as("no thanks", "deny", &[]).await;
    assert_narrates(&narration, "another time");
    assert!(!harness.session.state().quest_accepted());

    let narration = harness
        .say_as("go down to the cellar", "move", &[("location", "inns_cellar")])
        .await;
    assert_narrates(&narration, "no reason to go there yet");
    assert_eq!(harness.session.state().player_room(), "stout_meal_inn");
}

#[tokio::test]
async fn test_quest_offer_gates_unrelated_intents() {
    let mut harness = TestHarness::new(1);
    harness.session.start();

    // While a yes/no is expected, anything else gets a clarifying prompt
    // and consumes the turn.
    let narration = harness
        .say_as("look around", "explore", &[])
        .await;
    assert_narrates(&narration, "expecting you to");
    // Still expecting on the next turn; the answer goes through.
    let narration = harness.say_as("yes", "affirm", &[]).await;
    assert_narrates(&narration, "professional");
    assert!(harness.session.state().quest_accepted());
}

#[tokio::test]
async fn test_accepting_the_quest_opens_the_cellar() {
    let mut harness = TestHarness::new(1);
    harness.session.start();
    harness.say_as("sure", "affirm", &[]).await;

    let narration = harness
        .say_as("go down to the cellar", "move", &[("location", "inns_cellar")])
        .await;
    assert_narrates(&narration, "stairs groan");
    assert_narrates(&narration, "pitch black");
    assert_eq!(harness.session.state().player_room(), "inns_cellar");
}

#[tokio::test]
async fn test_deferred_move_completed_by_entity_only_reply() {
    let mut harness = TestHarness::new(1);
    harness.session.start();
    harness.say_as("yes", "affirm", &[]).await;

    let narration = harness.say_as("i want to go", "move", &[]).await;
    assert_narrates(&narration, "Where do you want to go?");
    assert_eq!(harness.session.state().player_room(), "stout_meal_inn");

    // The reply classifies as something else entirely, but carries the
    // expected location entity.
    let narration = harness
        .say_as("the cellar", "explore", &[("location", "inns_cellar")])
        .await;
    assert_narrates(&narration, "stairs groan");
    assert_eq!(harness.session.state().player_room(), "inns_cellar");
}

#[tokio::test]
async fn test_unrecognised_label_carries_over_last_intent() {
    let mut harness = TestHarness::new(1);
    harness.session.start();
    harness.say_as("yes", "affirm", &[]).await;
    harness
        .say_as("light my torch", "use", &[("equipment", "torch")])
        .await;

    // The classifier emits a label the dispatch map doesn't know; the
    // previous turn's intent is reused with the fresh entity.
    let narration = harness
        .say_as("the torch, again", "fiddle", &[("equipment", "torch")])
        .await;
    assert_narrates(&narration, "already using the torch");
}

#[tokio::test]
async fn test_carry_over_reuses_a_completed_move() {
    let mut def = AdventureDef::sample();
    def.monsters.clear();
    let mut harness = TestHarness::with_adventure(1, &def).unwrap();
    harness.session.start();
    harness.say_as("yes", "affirm", &[]).await;
    harness
        .say_as("light my torch", "use", &[("equipment", "torch")])
        .await;
    harness
        .say_as("go down to the cellar", "move", &[("location", "inns_cellar")])
        .await;
    assert_eq!(harness.session.state().player_room(), "inns_cellar");

    // A completed move stays stored; the unknown label rides it back up.
    harness
        .say_as("mumble back up", "wander", &[("location", "stout_meal_inn")])
        .await;
    assert_eq!(harness.session.state().player_room(), "stout_meal_inn");
}

#[tokio::test]
async fn test_low_confidence_is_ignored() {
    let mut harness = TestHarness::new(1);
    harness.session.start();
    harness.say_as("yes", "affirm", &[]).await;

    harness
        .classifier
        .teach("mumble mumble", "move", 0.2, &[("location", "inns_cellar")]);
    let reply = harness.say("mumble mumble").await;
    assert_narrates(&reply.text, "didn't catch that");
    assert_eq!(harness.session.state().player_room(), "stout_meal_inn");
}

#[tokio::test]
async fn test_stalled_player_gets_a_suggestion() {
    let mut harness = TestHarness::new(1);
    harness.session.start();
    harness.say_as("yes", "affirm", &[]).await;

    // An unparseable utterance draws a nudge toward the unexplored cellar.
    let reply = harness.say("hum a little tune").await;
    assert_narrates(&reply.text, "didn't catch that");
    assert_narrates(&reply.text, "You could head to the Inn's Cellar");

    let narration = harness.say_as("yes", "affirm", &[]).await;
    assert_narrates(&narration, "stairs groan");
    assert_eq!(harness.session.state().player_room(), "inns_cellar");
}

#[tokio::test]
async fn test_anything_but_yes_declines_a_suggestion() {
    let mut harness = TestHarness::new(1);
    harness.session.start();
    harness.say_as("yes", "affirm", &[]).await;
    harness.say("hum a little tune").await;

    let narration = harness.say_as("look around", "explore", &[]).await;
    assert_narrates(&narration, "warm and smells of stew");

    // The nudge is gone; a bare yes now means nothing.
    let narration = harness.say_as("yes", "affirm", &[]).await;
    assert_narrates(&narration, "didn't catch that");
    assert_eq!(harness.session.state().player_room(), "stout_meal_inn");
}

#[tokio::test]
async fn test_health_and_explore() {
    let mut harness = TestHarness::new(1);
    harness.session.start();
    harness.say_as("yes", "affirm", &[]).await;

    let narration = harness.say_as("how am i doing", "health", &[]).await;
    assert_narrates(&narration, "11 of 11 hit points");

    let narration = harness.say_as("look around", "explore", &[]).await;
    assert_narrates(&narration, "warm and smells of stew");
}

#[tokio::test]
async fn test_unknown_destination() {
    let mut harness = TestHarness::new(1);
    harness.session.start();
    harness.say_as("yes", "affirm", &[]).await;

    let narration = harness
        .say_as("go to the moon", "move", &[("location", "the moon")])
        .await;
    assert_narrates(&narration, "never heard of a place");
}

#[tokio::test]
async fn test_game_over_gates_all_input() {
    let mut harness = TestHarness::new(1);
    harness.session.start();

    // Attacking the innkeeper ends the session on the spot.
    let reply = harness.session.input("attack corvus").await;
    // First the quest gate clarifies; answer it, then attack.
    assert_narrates(&reply.text, "expecting you to");
    harness.say_as("yes", "affirm", &[]).await;

    harness
        .classifier
        .teach("attack corvus", "attack", 0.95, &[("npc", "Corvus")]);
    let reply = harness.say("attack corvus").await;
    assert_narrates(&reply.text, "ends here, in disgrace");
    assert!(reply.exit);

    let reply = harness.say("look around").await;
    assert_narrates(&reply.text, "Game over.");
    assert!(reply.exit);
    assert_silent_on(&reply.text, "stew");
}
